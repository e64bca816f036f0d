//! OpenAI-compatible generation and embedding backend.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use compass_core::{
    defaults, CompletionRequest, EmbeddingBackend, Error, GenerationBackend, Result,
};

use crate::config::InferenceConfig;

/// Backend for an OpenAI-compatible chat-completions and embeddings API.
#[derive(Debug)]
pub struct OpenAiBackend {
    client: Client,
    api_key: String,
    base_url: String,
    model: String,
    embed_model: String,
    embed_dimension: usize,
    timeout_secs: u64,
}

impl OpenAiBackend {
    /// Create a backend from configuration. Requires an API key.
    pub fn from_config(config: &InferenceConfig) -> Result<Self> {
        let api_key = config
            .api_key
            .clone()
            .ok_or_else(|| Error::Config("OPENAI_API_KEY is not set".into()))?;

        Ok(Self {
            client: Client::new(),
            api_key,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            embed_model: config.embed_model.clone(),
            embed_dimension: defaults::OPENAI_EMBED_DIMENSION,
            timeout_secs: config.timeout_secs,
        })
    }

    /// Create from environment variables.
    pub fn from_env() -> Result<Self> {
        Self::from_config(&InferenceConfig::from_env())
    }

    fn classify_status(status: reqwest::StatusCode, body: &str) -> Error {
        // Rate limits and server-side trouble may clear on redelivery;
        // anything else means the request itself is wrong.
        if status.is_server_error() || status.as_u16() == 429 {
            Error::Transient(format!("generation endpoint returned {}: {}", status, body))
        } else {
            Error::Inference(format!("generation endpoint returned {}: {}", status, body))
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Debug, Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    format_type: &'static str,
}

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    temperature: f32,
    response_format: ResponseFormat,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: Vec<&'a str>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[async_trait]
impl GenerationBackend for OpenAiBackend {
    async fn complete(&self, request: &CompletionRequest) -> Result<String> {
        let start = Instant::now();

        let body = ChatRequest {
            model: self.model.clone(),
            messages: vec![
                ChatMessage {
                    role: "system".into(),
                    content: request.system.clone(),
                },
                ChatMessage {
                    role: "user".into(),
                    content: request.prompt.clone(),
                },
            ],
            temperature: 0.7,
            response_format: ResponseFormat {
                format_type: "json_object",
            },
        };

        debug!(
            kind = %request.kind,
            prompt_len = request.prompt.len(),
            "Requesting completion"
        );

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .timeout(Duration::from_secs(self.timeout_secs))
            .json(&body)
            .send()
            .await
            .map_err(|e| Error::Transient(format!("generation request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(%status, "Generation request rejected");
            return Err(Self::classify_status(status, &body));
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| Error::Inference(format!("malformed completion response: {}", e)))?;

        let content = parsed
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| Error::Inference("completion response had no choices".into()))?;

        debug!(
            response_len = content.len(),
            duration_ms = start.elapsed().as_millis() as u64,
            "Completion received"
        );
        Ok(content)
    }
}

#[async_trait]
impl EmbeddingBackend for OpenAiBackend {
    fn dimension(&self) -> usize {
        self.embed_dimension
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let body = EmbeddingRequest {
            model: &self.embed_model,
            input: vec![text],
        };

        let response = self
            .client
            .post(format!("{}/embeddings", self.base_url))
            .bearer_auth(&self.api_key)
            .timeout(Duration::from_secs(self.timeout_secs))
            .json(&body)
            .send()
            .await
            .map_err(|e| Error::Transient(format!("embedding request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Self::classify_status(status, &body));
        }

        let parsed: EmbeddingResponse = response
            .json()
            .await
            .map_err(|e| Error::Inference(format!("malformed embedding response: {}", e)))?;

        parsed
            .data
            .into_iter()
            .next()
            .map(|d| d.embedding)
            .ok_or_else(|| Error::Inference("embedding response had no data".into()))
    }
}
