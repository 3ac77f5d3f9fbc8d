//! Request/response shapes for the HTTP surface described alongside this
//! crate. No web framework lives here — wiring these onto routes is an
//! external concern; this module only fixes the wire contract so a server
//! binary and its tests agree on it.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::eval::{EvalItem, EvalMetrics};
use crate::types::{DocumentSummary, Hit};

/// `POST /documents/upload` — the file body itself travels out of band
/// (multipart); this carries the accompanying metadata and response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadDocumentRequest {
    pub original_name: String,
    pub mime_type: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadDocumentResponse {
    pub document_id: Uuid,
    pub original_name: String,
    pub chunk_count: usize,
}

/// `GET /documents`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListDocumentsResponse {
    pub documents: Vec<DocumentSummary>,
}

/// `POST /search`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchRequest {
    pub query: String,
    #[serde(default)]
    pub top_k: Option<usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResponse {
    pub hits: Vec<Hit>,
}

/// `POST /chat`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatRequest {
    pub query: String,
    #[serde(default)]
    pub top_k: Option<usize>,
    #[serde(default = "default_true")]
    pub include_sources: bool,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatResponseBody {
    pub answer: String,
    pub sources: Vec<Hit>,
    pub refused: bool,
    pub reason: Option<String>,
}

/// `POST /eval/run`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunEvalRequest {
    pub items: Vec<EvalItem>,
    #[serde(default)]
    pub top_k: Option<usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunEvalResponse {
    pub metrics: EvalMetrics,
}

/// `GET /health`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub document_count: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chat_request_defaults_include_sources_true() {
        let request: ChatRequest = serde_json::from_str(r#"{"query": "what happened?"}"#).unwrap();
        assert!(request.include_sources);
        assert_eq!(request.top_k, None);
    }

    #[test]
    fn search_request_round_trips() {
        let request = SearchRequest { query: "q".to_string(), top_k: Some(5) };
        let json = serde_json::to_string(&request).unwrap();
        let parsed: SearchRequest = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.top_k, Some(5));
    }
}
