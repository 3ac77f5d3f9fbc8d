//! The explicit, non-global application context: owns the store, the live
//! index pair, the embedder, reranker, and generator, and is constructed
//! once at startup and handed to request handlers. No ambient global
//! state lives in the core.

use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tokio::sync::{Mutex, RwLock};
use uuid::Uuid;

use crate::chunker;
use crate::config::Config;
use crate::context;
use crate::dedup;
use crate::embedder::Embedder;
use crate::error::{Result, SecondBrainError};
use crate::eval::{evaluate, EvalItem, EvalMetrics};
use crate::generator::Generator;
use crate::ingest;
use crate::lexical_index::LexicalIndex;
use crate::normalize;
use crate::reranker::Reranker;
use crate::retriever::{HybridRetriever, IndexPair};
use crate::store::DocumentStore;
use crate::types::{Chunk, Document, DocumentSummary, Hit, VectorMeta};
use crate::vector_index::VectorIndex;

const EMBED_BATCH_SIZE: usize = 64;

pub struct SecondBrain {
    config: Config,
    store: DocumentStore,
    embedder: Arc<dyn Embedder>,
    reranker: Reranker,
    generator: Generator,
    indexes: RwLock<IndexPair>,
    ingest_lock: Mutex<()>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatResponse {
    pub answer: String,
    pub sources: Vec<Hit>,
    pub refused: bool,
    pub reason: Option<String>,
}

impl SecondBrain {
    /// Construct the context and load (or build, if absent/corrupt) the
    /// indexes from the store.
    pub async fn new(
        config: Config,
        embedder: Arc<dyn Embedder>,
        reranker: Reranker,
        generator: Generator,
    ) -> Result<Self> {
        std::fs::create_dir_all(config.uploads_dir())?;
        std::fs::create_dir_all(
            config
                .vector_index_path()
                .parent()
                .expect("vector index path always has a parent"),
        )?;

        let db_path = config
            .db_path
            .to_str()
            .ok_or_else(|| SecondBrainError::InvalidInput("db_path is not valid UTF-8".into()))?
            .to_string();
        let store = DocumentStore::connect(&db_path).await?;

        let app = Self {
            config,
            store,
            embedder,
            reranker,
            generator,
            indexes: RwLock::new(IndexPair::empty(0)),
            ingest_lock: Mutex::new(()),
        };

        let loaded = app.load_or_build().await?;
        *app.indexes.write().await = loaded;
        Ok(app)
    }

    /// Pull all chunk rows in canonical order from the store and attempt
    /// to load the persisted indexes. If the sidecar length disagrees with
    /// the vector index's row count (or nothing is persisted yet), rebuild
    /// from the store. Zero chunks means both indexes are explicitly
    /// empty.
    async fn load_or_build(&self) -> Result<IndexPair> {
        let chunks = self.store.fetch_chunks_for_index().await?;
        if chunks.is_empty() {
            return Ok(IndexPair::empty(self.embedder.dimension()));
        }

        match VectorIndex::load(&self.config.vector_index_path()) {
            Ok(vector) if vector.ntotal() == chunks.len() => {
                let texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();
                let lexical = LexicalIndex::build(&texts);
                Ok(IndexPair { vector, lexical })
            }
            _ => {
                tracing::warn!("index coherence fault on load, rebuilding from store");
                self.build_indexes(&chunks).await
            }
        }
    }

    async fn build_indexes(&self, chunks: &[Chunk]) -> Result<IndexPair> {
        let texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();
        let mut vectors: Vec<Vec<f32>> = Vec::with_capacity(chunks.len());

        for batch in texts.chunks(EMBED_BATCH_SIZE) {
            let refs: Vec<&str> = batch.iter().map(|s| s.as_str()).collect();
            let embedded = self
                .embedder
                .embed_documents(&refs)
                .map_err(|e| SecondBrainError::Embedding(e.to_string()))?;
            vectors.extend(embedded);
        }

        let meta: Vec<VectorMeta> = chunks
            .iter()
            .map(|c| VectorMeta {
                chunk_id: c.id,
                doc_id: c.doc_id,
                chunk_index: c.chunk_index,
                page_start: c.page_start,
                page_end: c.page_end,
                section: c.section.clone(),
            })
            .collect();

        let vector = VectorIndex::build(self.embedder.dimension(), vectors, meta)?;
        vector.save(&self.config.vector_index_path())?;
        let lexical = LexicalIndex::build(&texts);

        Ok(IndexPair { vector, lexical })
    }

    /// Ingest one uploaded file: parse, normalize, chunk, dedup, persist
    /// document + chunk rows atomically, then rebuild and swap the
    /// indexes. Serialized against other ingestions and against rebuilds.
    pub async fn ingest_document(
        &self,
        original_name: &str,
        mime_type: &str,
        bytes: &[u8],
    ) -> Result<Document> {
        if bytes.is_empty() {
            return Err(SecondBrainError::InvalidInput("upload is empty".into()));
        }

        let _guard = self.ingest_lock.lock().await;

        let pages = ingest::extract_pages(original_name, bytes)?;

        let mut page_chunks: Vec<(String, Option<i64>)> = Vec::new();
        for (page_number, page_text) in pages.iter().enumerate() {
            let page = if pages.len() > 1 {
                Some((page_number + 1) as i64)
            } else {
                None
            };
            for c in chunker::chunk_default(page_text) {
                page_chunks.push((c, page));
            }
        }

        let deduped = dedup::soft_dedup_keyed(page_chunks, dedup::DEFAULT_THRESHOLD);
        if deduped.is_empty() {
            return Err(SecondBrainError::InvalidInput(
                "document produced no indexable content".into(),
            ));
        }

        let doc_id = Uuid::new_v4();
        let safe_name = sanitize_filename(original_name);
        let stored_name = format!("{}_{}", doc_id, safe_name);
        let sha256 = hex_sha256(bytes);
        let created_at = Utc::now();

        let document = Document {
            id: doc_id,
            stored_name: stored_name.clone(),
            original_name: original_name.to_string(),
            mime_type: mime_type.to_string(),
            byte_len: bytes.len() as i64,
            sha256,
            created_at,
        };

        let chunks: Vec<Chunk> = deduped
            .into_iter()
            .enumerate()
            .map(|(index, (text, page))| {
                let normalized = normalize::normalize(&text);
                Chunk {
                    id: Uuid::new_v4(),
                    doc_id,
                    chunk_index: index as i64,
                    page_start: page,
                    page_end: page,
                    section: None,
                    text_len: normalized.chars().count() as i64,
                    sha256: hex_sha256(normalized.as_bytes()),
                    text: normalized,
                    created_at,
                }
            })
            .collect();

        std::fs::write(self.config.uploads_dir().join(&stored_name), bytes)?;
        self.store.insert_document_with_chunks(&document, &chunks).await?;
        tracing::info!(doc_id = %doc_id, chunks = chunks.len(), "document ingested");

        self.rebuild_and_swap().await?;

        Ok(document)
    }

    /// Build fresh indexes off to the side, then atomically swap them in
    /// under a write lock. Readers may proceed against the previous index
    /// until the swap completes.
    async fn rebuild_and_swap(&self) -> Result<()> {
        let chunks = self.store.fetch_chunks_for_index().await?;
        tracing::debug!(rows = chunks.len(), "rebuilding indexes");
        let fresh = self.build_indexes(&chunks).await?;
        *self.indexes.write().await = fresh;
        tracing::debug!("index rebuild complete, swapped under write lock");
        Ok(())
    }

    pub async fn list_documents(&self) -> Result<Vec<DocumentSummary>> {
        self.store.list_documents().await
    }

    pub async fn search(&self, query: &str, top_k: usize) -> Result<Vec<Hit>> {
        let indexes = self.indexes.read().await;
        let retriever = HybridRetriever {
            store: &self.store,
            index: &indexes,
            embedder: self.embedder.as_ref(),
            reranker: &self.reranker,
            hybrid_alpha: self.config.hybrid_alpha,
        };
        retriever.search(query, top_k).await
    }

    /// `refused` is strictly `hits.is_empty()` — no substring check on the
    /// generated answer.
    pub async fn chat(&self, query: &str, top_k: usize) -> Result<ChatResponse> {
        let hits = self.search(query, top_k).await?;
        if hits.is_empty() {
            return Ok(ChatResponse {
                answer: String::new(),
                sources: Vec::new(),
                refused: true,
                reason: Some("no_sources".to_string()),
            });
        }

        let assembled = context::assemble(&hits, self.config.max_context_chars);
        let answer = self.generator.generate(&assembled, query).await;

        Ok(ChatResponse {
            answer,
            sources: hits,
            refused: false,
            reason: None,
        })
    }

    pub async fn eval(&self, items: &[EvalItem], top_k: usize) -> Result<EvalMetrics> {
        let indexes = self.indexes.read().await;
        let retriever = HybridRetriever {
            store: &self.store,
            index: &indexes,
            embedder: self.embedder.as_ref(),
            reranker: &self.reranker,
            hybrid_alpha: self.config.hybrid_alpha,
        };
        evaluate(&retriever, items, top_k).await
    }
}

fn hex_sha256(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}

fn sanitize_filename(name: &str) -> String {
    name.chars()
        .map(|c| if c.is_alphanumeric() || c == '.' || c == '-' || c == '_' { c } else { '_' })
        .collect()
}
