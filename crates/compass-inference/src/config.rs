//! Inference configuration from the environment.

use compass_core::defaults;

/// Runtime configuration for the generation/embedding backends.
#[derive(Debug, Clone)]
pub struct InferenceConfig {
    /// API key for the OpenAI-compatible endpoint. `None` is only valid in
    /// offline mode.
    pub api_key: Option<String>,
    /// Base URL of the OpenAI-compatible API.
    pub base_url: String,
    /// Generation model slug.
    pub model: String,
    /// Embedding model slug.
    pub embed_model: String,
    /// Request timeout in seconds.
    pub timeout_secs: u64,
    /// Offline mode: use the deterministic mock backends, no network calls.
    pub offline: bool,
}

impl Default for InferenceConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: defaults::OPENAI_URL.to_string(),
            model: defaults::GEN_MODEL.to_string(),
            embed_model: defaults::OPENAI_EMBED_MODEL.to_string(),
            timeout_secs: defaults::GEN_TIMEOUT_SECS,
            offline: false,
        }
    }
}

impl InferenceConfig {
    /// Create config from environment variables (with defaults).
    ///
    /// | Variable | Default | Description |
    /// |----------|---------|-------------|
    /// | `OPENAI_API_KEY` | (unset) | API key for live generation |
    /// | `OPENAI_BASE_URL` | `https://api.openai.com/v1` | Endpoint base |
    /// | `OPENAI_MODEL` | `gpt-4o-mini` | Generation model |
    /// | `OPENAI_EMBED_MODEL` | `text-embedding-3-small` | Embedding model |
    /// | `OPENAI_TIMEOUT_SECS` | `60` | Request timeout |
    /// | `COMPASS_OFFLINE` | `false` | Use mock backends |
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            api_key: std::env::var("OPENAI_API_KEY").ok().filter(|k| !k.is_empty()),
            base_url: std::env::var("OPENAI_BASE_URL").unwrap_or(defaults.base_url),
            model: std::env::var("OPENAI_MODEL").unwrap_or(defaults.model),
            embed_model: std::env::var("OPENAI_EMBED_MODEL").unwrap_or(defaults.embed_model),
            timeout_secs: std::env::var("OPENAI_TIMEOUT_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.timeout_secs),
            offline: std::env::var("COMPASS_OFFLINE")
                .map(|v| v == "true" || v == "1")
                .unwrap_or(false),
        }
    }
}
