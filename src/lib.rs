pub mod api;
pub mod app;
pub mod chunker;
pub mod config;
pub mod context;
pub mod dedup;
pub mod embedder;
pub mod error;
pub mod eval;
pub mod generator;
pub mod ingest;
pub mod lexical_index;
pub mod llm_client;
pub mod normalize;
pub mod reranker;
pub mod retriever;
pub mod store;
pub mod types;
pub mod vector_index;

pub use app::{ChatResponse, SecondBrain};
pub use config::{Config, LlmProvider};
pub use error::{Result, SecondBrainError};
pub use types::{Chunk, Document, DocumentSummary, Hit};

/// Install a env-filter-driven `tracing` subscriber. The HTTP server binary
/// that embeds this crate is expected to call this once at startup, before
/// constructing a [`SecondBrain`]; the core itself never installs a global
/// subscriber so that embedding applications keep control of their own
/// logging setup.
pub fn init_tracing() {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}
