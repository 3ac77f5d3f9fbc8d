use thiserror::Error;

/// Crate-wide error taxonomy. Each variant corresponds to one of the error
/// policy classes: invalid input is a client error, index-coherence faults
/// are recovered locally by rebuild, store/parser/embedding failures
/// propagate, reranker failures never reach here (they degrade silently).
#[derive(Debug, Error)]
pub enum SecondBrainError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("index coherence fault: {0}")]
    IndexCoherence(String),

    #[error("parser failure: {0}")]
    Parser(String),

    #[error("embedding failure: {0}")]
    Embedding(String),

    #[error("generator failure: {0}")]
    Generator(String),

    #[error("store failure: {0}")]
    Store(#[from] sqlx::Error),

    #[error("store decode failure: {0}")]
    StoreDecode(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, SecondBrainError>;
