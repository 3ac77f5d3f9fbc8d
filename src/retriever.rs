//! Orchestrates the dense and lexical indexes, normalizes and fuses their
//! scores, fetches joined rows, deduplicates, and invokes the reranker.
//! This is the core algorithm of the crate.

use std::collections::{HashMap, HashSet};

use uuid::Uuid;

use crate::embedder::Embedder;
use crate::error::Result;
use crate::lexical_index::LexicalIndex;
use crate::normalize::normalize;
use crate::reranker::Reranker;
use crate::store::DocumentStore;
use crate::types::{Hit, JoinedChunk, VectorMeta};
use crate::vector_index::VectorIndex;

/// The live, positionally-aligned pair of indexes. Rebuilt off to the side
/// and swapped in atomically by the owning application context.
pub struct IndexPair {
    pub vector: VectorIndex,
    pub lexical: LexicalIndex,
}

impl IndexPair {
    pub fn empty(dim: usize) -> Self {
        Self {
            vector: VectorIndex::empty(dim),
            lexical: LexicalIndex::empty(),
        }
    }
}

pub struct HybridRetriever<'a> {
    pub store: &'a DocumentStore,
    pub index: &'a IndexPair,
    pub embedder: &'a dyn Embedder,
    pub reranker: &'a Reranker,
    pub hybrid_alpha: f32,
}

impl<'a> HybridRetriever<'a> {
    /// Execute the ten-step hybrid search pipeline (spec §4.7).
    pub async fn search(&self, query: &str, k: usize) -> Result<Vec<Hit>> {
        let normalized_query = normalize(query);
        if normalized_query.is_empty() || self.index.vector.is_empty() {
            return Ok(Vec::new());
        }

        let query_vector = self.embedder.embed_query(&normalized_query)?;

        let candidate_k = (k * 4).max(k);
        let vector_hits: HashMap<usize, f32> = self
            .index
            .vector
            .search(&query_vector, candidate_k)
            .into_iter()
            .collect();
        let lexical_hits: HashMap<usize, f32> = self
            .index
            .lexical
            .search(&normalized_query, candidate_k)
            .into_iter()
            .collect();

        let fused = fuse(&vector_hits, &lexical_hits, self.hybrid_alpha);

        let mut ranked = attach_meta(fused, self.index);
        sort_hits(&mut ranked);
        ranked.truncate(candidate_k);

        let ids: Vec<Uuid> = ranked.iter().map(|r| r.meta.chunk_id).collect();
        let joined = self.store.fetch_chunks_by_ids(&ids).await?;
        let joined_by_id: HashMap<Uuid, JoinedChunk> =
            joined.into_iter().map(|j| (j.chunk.id, j)).collect();

        let mut hits: Vec<Hit> = Vec::with_capacity(ranked.len());
        for r in ranked {
            let Some(joined) = joined_by_id.get(&r.meta.chunk_id) else {
                continue; // defensive: row failed to join, drop it
            };
            hits.push(Hit {
                chunk_id: r.meta.chunk_id,
                doc_id: r.meta.doc_id,
                original_name: joined.original_name.clone(),
                stored_name: joined.stored_name.clone(),
                chunk_index: r.meta.chunk_index,
                page_start: r.meta.page_start,
                page_end: r.meta.page_end,
                section: r.meta.section.clone(),
                score: r.fused_score,
                vec_score: r.vec_score,
                bm25_score: r.bm25_score,
                text: joined.chunk.text.clone(),
            });
        }

        let hits = dedup_by_doc_and_index(hits);
        tracing::debug!(query = %normalized_query, candidates = hits.len(), "fused and deduped candidates");
        let hits = self.reranker.rerank(&normalized_query, hits).await;

        Ok(hits.into_iter().take(k).collect())
    }
}

struct RankedRow {
    row: usize,
    fused_score: f32,
    vec_score: f32,
    bm25_score: f32,
    meta: VectorMeta,
}

/// Min-max normalize each side independently, then fuse via
/// `alpha * norm_vec + (1 - alpha) * norm_bm25`. A row absent from a side
/// contributes 0 on that side. Candidates are the union of both key sets.
fn fuse(
    vector_raw: &HashMap<usize, f32>,
    lexical_raw: &HashMap<usize, f32>,
    alpha: f32,
) -> Vec<(usize, f32, f32, f32)> {
    let vector_norm = min_max_normalize(vector_raw);
    let lexical_norm = min_max_normalize(lexical_raw);

    let candidates: HashSet<usize> = vector_raw.keys().chain(lexical_raw.keys()).copied().collect();

    candidates
        .into_iter()
        .map(|row| {
            let v_norm = vector_norm.get(&row).copied().unwrap_or(0.0);
            let b_norm = lexical_norm.get(&row).copied().unwrap_or(0.0);
            let fused = alpha * v_norm + (1.0 - alpha) * b_norm;
            let v_raw = vector_raw.get(&row).copied().unwrap_or(0.0);
            let b_raw = lexical_raw.get(&row).copied().unwrap_or(0.0);
            (row, fused, v_raw, b_raw)
        })
        .collect()
}

fn min_max_normalize(raw: &HashMap<usize, f32>) -> HashMap<usize, f32> {
    if raw.is_empty() {
        return HashMap::new();
    }
    let min = raw.values().copied().fold(f32::INFINITY, f32::min);
    let max = raw.values().copied().fold(f32::NEG_INFINITY, f32::max);
    let range = max - min;

    raw.iter()
        .map(|(&row, &value)| {
            let norm = if range >= 1e-9 { (value - min) / range } else { 0.0 };
            (row, norm)
        })
        .collect()
}

fn attach_meta(fused: Vec<(usize, f32, f32, f32)>, index: &IndexPair) -> Vec<RankedRow> {
    fused
        .into_iter()
        .map(|(row, fused_score, vec_score, bm25_score)| RankedRow {
            row,
            fused_score,
            vec_score,
            bm25_score,
            meta: index.vector.meta(row).clone(),
        })
        .collect()
}

/// Sort descending by fused score; ties break by higher `vec_score`, then
/// by `chunk_id` lexicographically ascending, for reproducibility.
fn sort_hits(rows: &mut [RankedRow]) {
    rows.sort_by(|a, b| {
        b.fused_score
            .partial_cmp(&a.fused_score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| b.vec_score.partial_cmp(&a.vec_score).unwrap_or(std::cmp::Ordering::Equal))
            .then_with(|| a.meta.chunk_id.to_string().cmp(&b.meta.chunk_id.to_string()))
    });
}

/// Unique on `(doc_id, chunk_index)`, preserving fused-score order.
fn dedup_by_doc_and_index(hits: Vec<Hit>) -> Vec<Hit> {
    let mut seen = HashSet::new();
    hits.into_iter()
        .filter(|h| seen.insert((h.doc_id, h.chunk_index)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fuse_absent_side_contributes_zero() {
        let mut vector_raw = HashMap::new();
        vector_raw.insert(0usize, 0.9);
        vector_raw.insert(1usize, 0.1);
        let lexical_raw: HashMap<usize, f32> = HashMap::new();

        let fused = fuse(&vector_raw, &lexical_raw, 0.65);
        let row0 = fused.iter().find(|(row, ..)| *row == 0).unwrap();
        // lexical absent entirely: bm25 raw is 0, normalization is a no-op on an empty map.
        assert_eq!(row0.3, 0.0);
    }

    #[test]
    fn fuse_alpha_zero_is_pure_lexical() {
        let mut vector_raw = HashMap::new();
        vector_raw.insert(0usize, 1.0);
        let mut lexical_raw = HashMap::new();
        lexical_raw.insert(0usize, 1.0);
        lexical_raw.insert(1usize, 0.0);

        let fused = fuse(&vector_raw, &lexical_raw, 0.0);
        let row1 = fused.iter().find(|(row, ..)| *row == 1).unwrap();
        // row 1 has no vector score at all, pure-lexical fusion should still score it via bm25 norm.
        assert_eq!(row1.1, 0.0); // it's the min of the lexical side, normalizes to 0
    }

    #[test]
    fn fuse_alpha_one_is_pure_vector() {
        let mut vector_raw = HashMap::new();
        vector_raw.insert(0usize, 1.0);
        vector_raw.insert(1usize, 0.0);
        let mut lexical_raw = HashMap::new();
        lexical_raw.insert(0usize, 0.0);
        lexical_raw.insert(1usize, 1.0);

        let fused = fuse(&vector_raw, &lexical_raw, 1.0);
        let row0 = fused.iter().find(|(row, ..)| *row == 0).unwrap();
        let row1 = fused.iter().find(|(row, ..)| *row == 1).unwrap();
        assert!(row0.1 > row1.1);
    }

    #[test]
    fn dedup_keeps_first_occurrence_per_doc_chunk() {
        let doc_id = Uuid::new_v4();
        let mk = |chunk_index: i64, score: f32| Hit {
            chunk_id: Uuid::new_v4(),
            doc_id,
            original_name: "a.txt".into(),
            stored_name: "a.txt".into(),
            chunk_index,
            page_start: None,
            page_end: None,
            section: None,
            score,
            vec_score: score,
            bm25_score: score,
            text: "t".into(),
        };
        let hits = vec![mk(0, 0.9), mk(0, 0.5), mk(1, 0.8)];
        let result = dedup_by_doc_and_index(hits);
        assert_eq!(result.len(), 2);
        assert_eq!(result[0].score, 0.9);
    }
}
