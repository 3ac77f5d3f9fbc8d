//! The answer-generation model is an external collaborator: an injected
//! generator that receives an assembled context and citations, not prompt
//! engineering. This module designs only the selection/dispatch boundary.

use std::sync::Arc;
use std::time::Duration;

use crate::llm_client::LlmClient;

const GENERATE_TIMEOUT: Duration = Duration::from_secs(60);
const NO_CONTENT_MESSAGE: &str = "No relevant content was found to answer this question.";

/// Selectable once at startup from `llm_provider`. The retriever depends
/// only on the common `generate` capability.
pub enum Generator {
    /// No external model: returns the assembled context verbatim as a
    /// best-effort extractive answer.
    Extractive,
    Openai(Arc<dyn LlmClient>),
    Ollama(Arc<dyn LlmClient>),
}

impl Generator {
    pub async fn generate(&self, context: &str, query: &str) -> String {
        let raw = match self {
            Generator::Extractive => extractive_answer(context),
            Generator::Openai(client) | Generator::Ollama(client) => {
                let prompt = format!(
                    "Answer the question using only the provided context. \
                     Cite sources using the bracketed numbers.\n\nContext:\n{}\n\nQuestion: {}",
                    context, query
                );
                match client.complete(&prompt, GENERATE_TIMEOUT).await {
                    Ok(answer) => answer,
                    Err(e) => {
                        tracing::warn!("generator call failed: {}", e);
                        String::new()
                    }
                }
            }
        };

        postprocess(&raw)
    }
}

/// A context-only fallback answer: the first paragraph of the assembled
/// context, or the stock message if the context is empty.
fn extractive_answer(context: &str) -> String {
    context
        .split("\n\n")
        .find(|p| !p.trim().is_empty())
        .unwrap_or("")
        .trim()
        .to_string()
}

/// Normalize the bullet character `U+2022` to `-`; replace an empty answer
/// with the stock "no relevant content" message.
fn postprocess(answer: &str) -> String {
    let normalized = answer.replace('\u{2022}', "-");
    if normalized.trim().is_empty() {
        NO_CONTENT_MESSAGE.to_string()
    } else {
        normalized
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn extractive_returns_first_paragraph() {
        let context = "[1] doc=a chunk=0\nfirst paragraph text\n\n[2] doc=b chunk=1\nsecond";
        let answer = Generator::Extractive.generate(context, "q").await;
        assert!(answer.contains("first paragraph text"));
    }

    #[tokio::test]
    async fn empty_context_yields_stock_message() {
        let answer = Generator::Extractive.generate("", "q").await;
        assert_eq!(answer, NO_CONTENT_MESSAGE);
    }

    #[test]
    fn postprocess_normalizes_bullet_character() {
        assert_eq!(postprocess("\u{2022} item one"), "- item one");
    }

    #[test]
    fn postprocess_replaces_empty_with_stock_message() {
        assert_eq!(postprocess("   "), NO_CONTENT_MESSAGE);
    }
}
