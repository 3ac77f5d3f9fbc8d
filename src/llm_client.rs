//! Thin async HTTP clients for the external answer-generation and
//! LLM-judge-reranking providers. Neither provider's prompt design is part
//! of this crate's scope; these are narrow transport adapters only.

use async_trait::async_trait;
use std::time::Duration;

use crate::error::{Result, SecondBrainError};

#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Send a single completion request, bounded by `timeout`. Any
    /// network, status, or parse failure is surfaced as
    /// `SecondBrainError::Generator`.
    async fn complete(&self, prompt: &str, timeout: Duration) -> Result<String>;
}

pub struct OpenAiClient {
    client: reqwest::Client,
    api_key: String,
    model: String,
}

impl OpenAiClient {
    pub fn new(api_key: String, model: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key,
            model,
        }
    }
}

#[async_trait]
impl LlmClient for OpenAiClient {
    async fn complete(&self, prompt: &str, timeout: Duration) -> Result<String> {
        let body = serde_json::json!({
            "model": self.model,
            "messages": [{"role": "user", "content": prompt}],
        });

        let response = self
            .client
            .post("https://api.openai.com/v1/chat/completions")
            .bearer_auth(&self.api_key)
            .json(&body)
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| SecondBrainError::Generator(e.to_string()))?;

        let status = response.status();
        let payload: serde_json::Value = response
            .json()
            .await
            .map_err(|e| SecondBrainError::Generator(e.to_string()))?;

        if !status.is_success() {
            return Err(SecondBrainError::Generator(format!(
                "openai returned {}: {}",
                status, payload
            )));
        }

        payload["choices"][0]["message"]["content"]
            .as_str()
            .map(|s| s.to_string())
            .ok_or_else(|| SecondBrainError::Generator("missing choices[0].message.content".into()))
    }
}

pub struct OllamaClient {
    client: reqwest::Client,
    base_url: String,
    model: String,
}

impl OllamaClient {
    pub fn new(base_url: String, model: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url,
            model,
        }
    }
}

#[async_trait]
impl LlmClient for OllamaClient {
    async fn complete(&self, prompt: &str, timeout: Duration) -> Result<String> {
        let body = serde_json::json!({
            "model": self.model,
            "prompt": prompt,
            "stream": false,
        });

        let url = format!("{}/api/generate", self.base_url.trim_end_matches('/'));
        let response = self
            .client
            .post(url)
            .json(&body)
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| SecondBrainError::Generator(e.to_string()))?;

        let status = response.status();
        let payload: serde_json::Value = response
            .json()
            .await
            .map_err(|e| SecondBrainError::Generator(e.to_string()))?;

        if !status.is_success() {
            return Err(SecondBrainError::Generator(format!(
                "ollama returned {}: {}",
                status, payload
            )));
        }

        payload["response"]
            .as_str()
            .map(|s| s.to_string())
            .ok_or_else(|| SecondBrainError::Generator("missing response field".into()))
    }
}
