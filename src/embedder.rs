//! The embedding model is an external collaborator: an injected black-box
//! that maps text to a fixed-dimension unit-norm vector. This crate
//! designs only the trait boundary, not any concrete model.

use crate::error::Result;

pub trait Embedder: Send + Sync {
    /// Embed a search query.
    fn embed_query(&self, text: &str) -> Result<Vec<f32>>;

    /// Embed a document/passage.
    fn embed_document(&self, text: &str) -> Result<Vec<f32>>;

    /// Batch embed documents for ingestion. Default implementation embeds
    /// one at a time; implementations backed by a batching model should
    /// override this.
    fn embed_documents(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        texts.iter().map(|t| self.embed_document(t)).collect()
    }

    /// Embedding vector dimension.
    fn dimension(&self) -> usize;
}
