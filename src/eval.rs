//! Runs a labeled question set through the retriever and computes
//! precision@k and recall@k.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::Result;
use crate::retriever::HybridRetriever;
use crate::types::Hit;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvalItem {
    pub question: String,
    #[serde(default)]
    pub expected_doc_ids: Vec<Uuid>,
    #[serde(default)]
    pub expected_chunk_ids: Vec<Uuid>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvalItemResult {
    pub question: String,
    pub precision: f64,
    pub recall_docs: f64,
    pub recall_chunks: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvalMetrics {
    pub precision: f64,
    pub recall_docs: f64,
    pub recall_chunks: f64,
    pub per_item: Vec<EvalItemResult>,
}

/// Run every item through `retriever.search(question, k)` and aggregate
/// precision@k / recall@k by arithmetic mean across items.
pub async fn evaluate(retriever: &HybridRetriever<'_>, items: &[EvalItem], k: usize) -> Result<EvalMetrics> {
    let mut per_item = Vec::with_capacity(items.len());

    for item in items {
        let hits = retriever.search(&item.question, k).await?;
        per_item.push(evaluate_item(item, &hits, k));
    }

    let count = per_item.len().max(1) as f64;
    let precision = per_item.iter().map(|r| r.precision).sum::<f64>() / count;
    let recall_docs = per_item.iter().map(|r| r.recall_docs).sum::<f64>() / count;
    let recall_chunks = per_item.iter().map(|r| r.recall_chunks).sum::<f64>() / count;

    Ok(EvalMetrics {
        precision,
        recall_docs,
        recall_chunks,
        per_item,
    })
}

fn evaluate_item(item: &EvalItem, hits: &[Hit], k: usize) -> EvalItemResult {
    let got_docs: Vec<Uuid> = hits.iter().map(|h| h.doc_id).collect();
    let got_chunks: Vec<Uuid> = hits.iter().map(|h| h.chunk_id).collect();

    let expected_docs: HashSet<Uuid> = item.expected_doc_ids.iter().copied().collect();
    let expected_chunks: HashSet<Uuid> = item.expected_chunk_ids.iter().copied().collect();

    let (precision, recall_chunks) = if !expected_chunks.is_empty() {
        let correct = got_chunks.iter().filter(|id| expected_chunks.contains(id)).count();
        let precision = correct as f64 / k as f64;
        let recall_chunks = correct as f64 / expected_chunks.len() as f64;
        (precision, recall_chunks)
    } else {
        let correct = got_docs.iter().filter(|id| expected_docs.contains(id)).count();
        let precision = correct as f64 / k as f64;
        (precision, 0.0)
    };

    let recall_docs = if !expected_docs.is_empty() {
        let correct = got_docs
            .iter()
            .collect::<HashSet<_>>()
            .intersection(&expected_docs.iter().collect())
            .count();
        correct as f64 / expected_docs.len() as f64
    } else {
        0.0
    };

    EvalItemResult {
        question: item.question.clone(),
        precision,
        recall_docs,
        recall_chunks,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hit_with_ids(doc_id: Uuid, chunk_id: Uuid) -> Hit {
        Hit {
            chunk_id,
            doc_id,
            original_name: "doc.txt".into(),
            stored_name: "doc.txt".into(),
            chunk_index: 0,
            page_start: None,
            page_end: None,
            section: None,
            score: 1.0,
            vec_score: 1.0,
            bm25_score: 1.0,
            text: "text".into(),
        }
    }

    #[test]
    fn precision_and_recall_with_expected_chunks() {
        let c1 = Uuid::new_v4();
        let c2 = Uuid::new_v4();
        let x = Uuid::new_v4();
        let y = Uuid::new_v4();
        let z = Uuid::new_v4();
        let doc = Uuid::new_v4();

        let item = EvalItem {
            question: "q".into(),
            expected_doc_ids: vec![],
            expected_chunk_ids: vec![c1, c2],
        };
        // retriever returns [c1, x, c2, y, z], k = 5
        let hits = vec![
            hit_with_ids(doc, c1),
            hit_with_ids(doc, x),
            hit_with_ids(doc, c2),
            hit_with_ids(doc, y),
            hit_with_ids(doc, z),
        ];

        let result = evaluate_item(&item, &hits, 5);
        assert_eq!(result.precision, 2.0 / 5.0);
        assert_eq!(result.recall_chunks, 1.0);
    }

    #[test]
    fn falls_back_to_doc_level_when_no_expected_chunks() {
        let doc_a = Uuid::new_v4();
        let doc_b = Uuid::new_v4();
        let item = EvalItem {
            question: "q".into(),
            expected_doc_ids: vec![doc_a],
            expected_chunk_ids: vec![],
        };
        let hits = vec![hit_with_ids(doc_a, Uuid::new_v4()), hit_with_ids(doc_b, Uuid::new_v4())];
        let result = evaluate_item(&item, &hits, 2);
        assert_eq!(result.precision, 1.0 / 2.0);
        assert_eq!(result.recall_docs, 1.0);
        assert_eq!(result.recall_chunks, 0.0);
    }

    #[test]
    fn no_matches_yields_zero_scores() {
        let item = EvalItem {
            question: "q".into(),
            expected_doc_ids: vec![Uuid::new_v4()],
            expected_chunk_ids: vec![],
        };
        let hits = vec![];
        let result = evaluate_item(&item, &hits, 3);
        assert_eq!(result.precision, 0.0);
        assert_eq!(result.recall_docs, 0.0);
    }
}
