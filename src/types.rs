use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A single uploaded file. Created once on upload; never mutated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub id: Uuid,
    pub stored_name: String,
    pub original_name: String,
    pub mime_type: String,
    pub byte_len: i64,
    pub sha256: String,
    pub created_at: DateTime<Utc>,
}

/// A bounded, sentence-aligned slice of one document's text — the unit of
/// retrieval. Created once during ingestion; never mutated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    pub id: Uuid,
    pub doc_id: Uuid,
    pub chunk_index: i64,
    pub page_start: Option<i64>,
    pub page_end: Option<i64>,
    pub section: Option<String>,
    pub text: String,
    pub text_len: i64,
    pub sha256: String,
    pub created_at: DateTime<Utc>,
}

/// A chunk row joined with the owning document's names, as returned by
/// `fetch_chunks_by_ids`.
#[derive(Debug, Clone, PartialEq)]
pub struct JoinedChunk {
    pub chunk: Chunk,
    pub original_name: String,
    pub stored_name: String,
}

/// Positional entry in the vector index sidecar. Row `i` of this list and
/// row `i` of the lexical index must refer to the same chunk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VectorMeta {
    pub chunk_id: Uuid,
    pub doc_id: Uuid,
    pub chunk_index: i64,
    pub page_start: Option<i64>,
    pub page_end: Option<i64>,
    pub section: Option<String>,
}

/// A single retrieval result, threaded through dedup and rerank and
/// eventually handed to the context assembler and the HTTP layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Hit {
    pub chunk_id: Uuid,
    pub doc_id: Uuid,
    pub original_name: String,
    pub stored_name: String,
    pub chunk_index: i64,
    pub page_start: Option<i64>,
    pub page_end: Option<i64>,
    pub section: Option<String>,
    pub score: f32,
    pub vec_score: f32,
    pub bm25_score: f32,
    pub text: String,
}

/// Summary row returned by `list_documents`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentSummary {
    pub document: Document,
    pub chunks_count: i64,
}
