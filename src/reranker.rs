//! Pluggable second-stage scorer over a short candidate list. All variants
//! honor a common contract: `rerank(query, hits) -> hits_in_new_order`,
//! total (never drops or duplicates an input) and terminating.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::anyhow;
use ort::session::builder::GraphOptimizationLevel;
use ort::session::Session;
use ort::value::Value;
use parking_lot::Mutex;

use crate::llm_client::LlmClient;
use crate::types::Hit;

const RERANK_TIMEOUT: Duration = Duration::from_secs(30);
const MAX_JUDGE_CANDIDATES: usize = 50;
const JUDGE_SNIPPET_CHARS: usize = 900;

pub enum Reranker {
    /// Returns input unchanged. Default.
    Identity,
    /// Scores each `(query, hit.text)` pair with a cross-encoder model;
    /// sorts descending.
    CrossEncoder(CrossEncoderScorer),
    /// Constructs a single listwise prompt and asks an LLM to rank
    /// passages by index; degrades to identity on any failure.
    LlmJudge(Arc<dyn LlmClient>),
}

impl Reranker {
    pub async fn rerank(&self, query: &str, hits: Vec<Hit>) -> Vec<Hit> {
        match self {
            Reranker::Identity => hits,
            Reranker::CrossEncoder(scorer) => scorer.rerank(query, hits),
            Reranker::LlmJudge(client) => llm_judge_rerank(client.as_ref(), query, hits).await,
        }
    }
}

/// Cross-encoder reranker backed by an ONNX sequence-classification model
/// (e.g. ms-marco-MiniLM). Scoring is CPU-bound and synchronous.
pub struct CrossEncoderScorer {
    session: Arc<Mutex<Session>>,
    tokenizer: Arc<tokenizers::Tokenizer>,
    max_length: usize,
}

impl CrossEncoderScorer {
    pub fn new(model_dir: &Path) -> anyhow::Result<Self> {
        let model_path = Self::find_model(model_dir)?;
        let tokenizer_path = model_dir.join("tokenizer.json");
        if !tokenizer_path.exists() {
            return Err(anyhow!("tokenizer not found at {}", tokenizer_path.display()));
        }

        let tokenizer = tokenizers::Tokenizer::from_file(&tokenizer_path)
            .map_err(|e| anyhow!("failed to load tokenizer: {:?}", e))?;
        let model_bytes = std::fs::read(&model_path)?;
        let session = Session::builder()?
            .with_optimization_level(GraphOptimizationLevel::Level3)?
            .commit_from_memory(&model_bytes)?;

        Ok(Self {
            session: Arc::new(Mutex::new(session)),
            tokenizer: Arc::new(tokenizer),
            max_length: 512,
        })
    }

    fn find_model(model_dir: &Path) -> anyhow::Result<PathBuf> {
        for candidate in ["model.onnx", "model_O4.onnx"] {
            let path = model_dir.join(candidate);
            if path.exists() {
                return Ok(path);
            }
        }
        Err(anyhow!("no reranker model found in {}", model_dir.display()))
    }

    /// Score a single `(query, document)` pair. Higher is more relevant.
    fn score(&self, query: &str, document: &str) -> anyhow::Result<f32> {
        let encoding = self
            .tokenizer
            .encode((query, document), true)
            .map_err(|e| anyhow!("tokenization failed: {:?}", e))?;

        let len = encoding.get_ids().len().min(self.max_length);
        let ids: Vec<i64> = encoding.get_ids()[..len].iter().map(|&v| v as i64).collect();
        let mask: Vec<i64> = encoding.get_attention_mask()[..len]
            .iter()
            .map(|&v| v as i64)
            .collect();
        let type_ids: Vec<i64> = encoding.get_type_ids()[..len]
            .iter()
            .map(|&v| v as i64)
            .collect();

        let shape = vec![1, len];
        let input_ids = Value::from_array((shape.clone(), ids))?;
        let attention_mask = Value::from_array((shape.clone(), mask))?;
        let token_type_ids = Value::from_array((shape, type_ids))?;

        let inputs = ort::inputs![
            "input_ids" => input_ids,
            "attention_mask" => attention_mask,
            "token_type_ids" => token_type_ids,
        ];

        let mut session = self.session.lock();
        let outputs = session.run(inputs)?;
        let (_shape, data) = outputs["logits"].try_extract_tensor::<f32>()?;
        data.first().copied().ok_or_else(|| anyhow!("empty logits tensor"))
    }

    fn rerank(&self, query: &str, mut hits: Vec<Hit>) -> Vec<Hit> {
        let mut scored: Vec<(Hit, f32)> = hits
            .drain(..)
            .map(|hit| {
                let score = self.score(query, &hit.text).unwrap_or_else(|e| {
                    tracing::warn!("cross-encoder scoring failed, keeping original order: {}", e);
                    f32::MIN
                });
                (hit, score)
            })
            .collect();

        scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        scored.into_iter().map(|(hit, _)| hit).collect()
    }
}

/// Ask the LLM to rank numbered passage snippets, then apply the returned
/// permutation. Falls back to input order on timeout, transport error, or
/// unparseable output — the reranker must never fail a query.
async fn llm_judge_rerank(client: &dyn LlmClient, query: &str, hits: Vec<Hit>) -> Vec<Hit> {
    if hits.len() <= 1 {
        return hits;
    }

    let candidate_count = hits.len().min(MAX_JUDGE_CANDIDATES);
    let snippets: String = hits
        .iter()
        .take(candidate_count)
        .enumerate()
        .map(|(i, h)| {
            let collapsed = h.text.replace('\n', " ");
            let truncated: String = collapsed.chars().take(JUDGE_SNIPPET_CHARS).collect();
            format!("[{}] {}", i, truncated)
        })
        .collect::<Vec<_>>()
        .join("\n");

    let prompt = format!(
        "Rank the following passages by relevance to the query, most relevant first.\n\
         Query: \"{}\"\n\nPassages:\n{}\n\n\
         Return ONLY a JSON array of passage indices, e.g. [2, 0, 1].",
        query, snippets
    );

    let raw = match client.complete(&prompt, RERANK_TIMEOUT).await {
        Ok(output) => output,
        Err(e) => {
            tracing::warn!("llm reranking call failed, keeping fused order: {}", e);
            return hits;
        }
    };

    match parse_ranking(&raw, candidate_count) {
        Some(order) => apply_ranking(hits, &order),
        None => {
            tracing::warn!("could not parse llm reranking output, keeping fused order");
            hits
        }
    }
}

/// Parse a zero-indexed ranking from free-form LLM output: direct JSON
/// parse, then the first bracketed substring, then bare integer
/// extraction, deduplicated preserving first occurrence.
fn parse_ranking(output: &str, expected_count: usize) -> Option<Vec<usize>> {
    let trimmed = output
        .trim()
        .trim_start_matches("```json")
        .trim_start_matches("```")
        .trim_end_matches("```")
        .trim();

    if let Ok(indices) = serde_json::from_str::<Vec<usize>>(trimmed) {
        if validate_ranking(&indices, expected_count) {
            return Some(indices);
        }
    }

    if let Some(start) = trimmed.find('[') {
        if let Some(end) = trimmed[start..].find(']') {
            let slice = &trimmed[start..=start + end];
            if let Ok(indices) = serde_json::from_str::<Vec<usize>>(slice) {
                if validate_ranking(&indices, expected_count) {
                    return Some(indices);
                }
            }
        }
    }

    let numbers: Vec<usize> = trimmed
        .split(|c: char| !c.is_ascii_digit())
        .filter_map(|s| s.parse::<usize>().ok())
        .filter(|&n| n < expected_count)
        .collect();

    if numbers.is_empty() {
        return None;
    }
    let mut seen = HashSet::new();
    let deduped: Vec<usize> = numbers.into_iter().filter(|n| seen.insert(*n)).collect();
    Some(deduped)
}

fn validate_ranking(indices: &[usize], expected_count: usize) -> bool {
    !indices.is_empty() && indices.iter().all(|&i| i < expected_count)
}

/// Apply the ranking permutation. Indices out of bounds are ignored; any
/// hit not mentioned is appended afterward in its original relative order,
/// preserving the total-permutation contract.
fn apply_ranking(mut hits: Vec<Hit>, order: &[usize]) -> Vec<Hit> {
    let mut reordered: Vec<Hit> = Vec::with_capacity(hits.len());
    let mut used = HashSet::new();

    for &idx in order {
        if idx < hits.len() && used.insert(idx) {
            reordered.push(hits[idx].clone());
        }
    }
    for (i, hit) in hits.drain(..).enumerate() {
        if !used.contains(&i) {
            reordered.push(hit);
        }
    }
    reordered
}
