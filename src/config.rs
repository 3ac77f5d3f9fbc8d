use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Selects the answer-generation model. `Ollama` also selects the
/// LLM-judge reranker variant when reranking is enabled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LlmProvider {
    #[default]
    #[serde(rename = "")]
    None,
    Openai,
    Ollama,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub data_dir: PathBuf,
    pub db_path: PathBuf,
    pub embed_model: String,
    pub top_k: usize,
    pub hybrid_alpha: f32,
    pub max_context_chars: usize,
    pub llm_provider: LlmProvider,
    pub openai_api_key: Option<String>,
    pub openai_model: Option<String>,
    pub ollama_base_url: Option<String>,
    pub ollama_model: Option<String>,
}

impl Config {
    pub fn uploads_dir(&self) -> PathBuf {
        self.data_dir.join("uploads")
    }

    pub fn vector_index_path(&self) -> PathBuf {
        self.data_dir.join("index").join("chunks.faiss")
    }

    pub fn vector_sidecar_path(&self) -> PathBuf {
        let mut p = self.vector_index_path().into_os_string();
        p.push(".meta.json");
        PathBuf::from(p)
    }

    /// Validate config values, returning errors for clearly broken configurations.
    pub fn validate(&self) -> Result<(), String> {
        if self.embed_model.trim().is_empty() {
            return Err("embed_model must not be empty".into());
        }
        if self.top_k == 0 {
            return Err("top_k must be > 0".into());
        }
        if !(0.0..=1.0).contains(&self.hybrid_alpha) {
            return Err("hybrid_alpha must be in [0.0, 1.0]".into());
        }
        if self.max_context_chars == 0 {
            return Err("max_context_chars must be > 0".into());
        }
        if matches!(self.llm_provider, LlmProvider::Openai) && self.openai_api_key.is_none() {
            return Err("openai_api_key is required when llm_provider = openai".into());
        }
        if matches!(self.llm_provider, LlmProvider::Ollama) && self.ollama_base_url.is_none() {
            return Err("ollama_base_url is required when llm_provider = ollama".into());
        }
        Ok(())
    }

    /// Load config from a JSON file, validating before returning.
    pub fn from_file(path: &Path) -> Result<Self, String> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| format!("Failed to read config file: {}", e))?;
        let config: Self = serde_json::from_str(&content)
            .map_err(|e| format!("Failed to parse config: {}", e))?;
        config.validate()?;
        Ok(config)
    }
}

impl Default for Config {
    fn default() -> Self {
        let data_dir = PathBuf::from("./data");
        let db_path = data_dir.join("second_brain.db");

        Self {
            data_dir,
            db_path,
            embed_model: "default".to_string(),
            top_k: 8,
            hybrid_alpha: 0.65,
            max_context_chars: 14000,
            llm_provider: LlmProvider::None,
            openai_api_key: None,
            openai_model: None,
            ollama_base_url: None,
            ollama_model: None,
        }
    }
}
