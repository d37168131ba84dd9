//! OpenAI-compatible adapter for streamed generation.
//!
//! Supports OpenAI API, Azure OpenAI, and local Ollama instances.
//! Implements `GenerationPort` over the chat completions SSE stream.

use crate::adapters::ai::sse::{self, SseData};
use crate::domain::DomainError;
use crate::ports::{ChunkReceiver, GenerationPort};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// OpenAI-compatible streaming adapter.
///
/// Can be configured to work with:
/// - OpenAI API (api.openai.com)
/// - Azure OpenAI
/// - Ollama (localhost)
/// - Any OpenAI-compatible API
pub struct OpenAiAdapter {
    client: reqwest::Client,
    api_url: String,
    api_key: String,
    model: String,
}

impl OpenAiAdapter {
    /// Create a new OpenAI adapter.
    ///
    /// # Arguments
    /// * `api_url` - API endpoint (e.g., "https://api.openai.com/v1/chat/completions")
    /// * `api_key` - API key (can be empty for local Ollama)
    /// * `model` - Model name (e.g., "gpt-4o-mini", "llama3.2")
    pub fn new(api_url: String, api_key: String, model: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_url,
            api_key,
            model,
        }
    }

    /// Parse one SSE payload: a `chat.completion.chunk` or the `[DONE]` sentinel.
    fn parse_chunk(data: &str) -> Result<SseData, DomainError> {
        if data == "[DONE]" {
            return Ok(SseData::Done);
        }
        let chunk: StreamResponse = serde_json::from_str(data).map_err(|e| {
            warn!(error = %e, data = %data.chars().take(200).collect::<String>(), "bad stream chunk");
            DomainError::Generation(format!("Malformed stream chunk: {}", e))
        })?;
        if let Some(err) = chunk.error {
            return Err(DomainError::Generation(err.message));
        }
        let text = chunk
            .choices
            .into_iter()
            .filter_map(|c| c.delta.content)
            .collect::<String>();
        if text.is_empty() {
            Ok(SseData::Skip)
        } else {
            Ok(SseData::Chunk(text))
        }
    }
}

/// OpenAI API request structure.
#[derive(Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    temperature: f32,
    stream: bool,
}

#[derive(Serialize)]
struct ChatMessage {
    role: String,
    content: String,
}

/// Streamed response chunk.
#[derive(Deserialize)]
struct StreamResponse {
    #[serde(default)]
    choices: Vec<StreamChoice>,
    #[serde(default)]
    error: Option<ApiError>,
}

#[derive(Deserialize)]
struct StreamChoice {
    #[serde(default)]
    delta: StreamDelta,
}

#[derive(Deserialize, Default)]
struct StreamDelta {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Deserialize)]
struct ApiError {
    message: String,
}

#[async_trait::async_trait]
impl GenerationPort for OpenAiAdapter {
    async fn generate(&self, prompt: &str) -> Result<ChunkReceiver, DomainError> {
        info!(
            model = %self.model,
            prompt_len = prompt.len(),
            "sending prompt to OpenAI-compatible API"
        );

        let request = ChatRequest {
            model: self.model.clone(),
            messages: vec![ChatMessage {
                role: "user".to_string(),
                content: prompt.to_string(),
            }],
            temperature: 0.7,
            stream: true,
        };

        let response = self
            .client
            .post(&self.api_url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .header("Accept", "text/event-stream")
            .json(&request)
            .send()
            .await
            .map_err(|e| DomainError::Generation(format!("HTTP request failed: {}", e)))?;

        let status = response.status();
        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
            return Err(DomainError::Generation(
                "Authentication failed: invalid API key or insufficient permissions".into(),
            ));
        }
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            warn!(status = %status, body = %text, "AI API returned error");
            return Err(DomainError::Generation(format!(
                "API error {}: {}",
                status,
                text.chars().take(200).collect::<String>()
            )));
        }

        Ok(sse::spawn_reader(response, "openai", Self::parse_chunk))
    }
}
