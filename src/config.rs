use std::env;
use std::path::PathBuf;

use anyhow::Result;

/// Which labeling backend turns keyword clusters into topic names.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LabelerMode {
    /// Local Ollama instance (default) — no API key, runs offline
    Local,
    /// Hosted OpenAI-compatible API — requires OPENAI_API_KEY
    Api,
}

/// Central configuration loaded from environment variables.
///
/// All secrets come from env vars (never hardcoded). The .env file
/// is loaded automatically at startup via dotenvy.
pub struct Config {
    pub db_path: String,
    /// Directory containing the sentence embedding model files
    pub model_dir: PathBuf,
    /// Which labeler to use (default: Local)
    pub labeler_mode: LabelerMode,
    pub openai_api_key: String,
    pub openai_model: String,
    /// OpenAI-compatible endpoint, without the /v1/chat/completions suffix
    pub openai_base_url: String,
    pub ollama_base_url: String,
    pub ollama_model: String,
    /// Sampling temperature for labeling calls — 0 keeps labels reproducible
    pub temperature: f64,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// Everything has a workable default except the hosted-API key, which
    /// is only required when LLM_MODE=api.
    pub fn load() -> Result<Self> {
        let labeler_mode = match env::var("LLM_MODE").as_deref() {
            Ok("api") => LabelerMode::Api,
            // "local" or unset both default to Ollama
            Ok("local") | Err(_) => LabelerMode::Local,
            Ok(other) => {
                anyhow::bail!("Unknown LLM_MODE '{}': expected 'api' or 'local'", other)
            }
        };

        let model_dir = env::var("SIFT_MODEL_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| crate::topics::download::default_model_dir());

        let temperature = match env::var("LLM_TEMPERATURE") {
            Ok(raw) => raw
                .parse::<f64>()
                .map_err(|_| anyhow::anyhow!("LLM_TEMPERATURE must be a number, got '{}'", raw))?,
            Err(_) => 0.0,
        };

        Ok(Self {
            db_path: env::var("SIFT_DB_PATH").unwrap_or_else(|_| "./sift.db".to_string()),
            model_dir,
            labeler_mode,
            openai_api_key: env::var("OPENAI_API_KEY").unwrap_or_default(),
            openai_model: env::var("OPENAI_MODEL").unwrap_or_else(|_| "gpt-4o-mini".to_string()),
            openai_base_url: env::var("OPENAI_BASE_URL")
                .unwrap_or_else(|_| "https://api.openai.com".to_string()),
            ollama_base_url: env::var("OLLAMA_BASE_URL")
                .unwrap_or_else(|_| "http://localhost:11434".to_string()),
            ollama_model: env::var("OLLAMA_MODEL").unwrap_or_else(|_| "llama3.2:3b".to_string()),
            temperature,
        })
    }

    /// Check that the chosen labeler has what it needs.
    /// Local Ollama needs nothing up front; the hosted API needs a key.
    pub fn require_labeler(&self) -> Result<()> {
        if self.labeler_mode == LabelerMode::Api && self.openai_api_key.is_empty() {
            anyhow::bail!(
                "OPENAI_API_KEY not set. Add it to your .env file,\n\
                 or set LLM_MODE=local to label through Ollama instead."
            );
        }
        Ok(())
    }

    /// Check that the embedding model files are downloaded.
    /// Call this before any operation that embeds review text.
    pub fn require_embedder(&self) -> Result<()> {
        if !crate::topics::download::model_files_present(&self.model_dir) {
            anyhow::bail!(
                "Embedding model files not found in {}\n\
                 Run `sift download-model` to download them.",
                self.model_dir.display()
            );
        }
        Ok(())
    }

    /// Base URL for the active labeler.
    pub fn labeler_base_url(&self) -> &str {
        match self.labeler_mode {
            LabelerMode::Api => &self.openai_base_url,
            LabelerMode::Local => &self.ollama_base_url,
        }
    }

    /// Model name for the active labeler.
    pub fn labeler_model(&self) -> &str {
        match self.labeler_mode {
            LabelerMode::Api => &self.openai_model,
            LabelerMode::Local => &self.ollama_model,
        }
    }

    /// API key for the active labeler, when it needs one.
    pub fn labeler_api_key(&self) -> Option<String> {
        match self.labeler_mode {
            LabelerMode::Api => Some(self.openai_api_key.clone()),
            LabelerMode::Local => None,
        }
    }
}
