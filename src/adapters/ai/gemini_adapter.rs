//! Google Gemini adapter. Streams `streamGenerateContent` over SSE.

use crate::adapters::ai::sse::{self, SseData};
use crate::domain::DomainError;
use crate::ports::{ChunkReceiver, GenerationPort};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

pub const DEFAULT_GEMINI_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_GEMINI_MODEL: &str = "gemini-2.5-flash";

pub struct GeminiAdapter {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
}

impl GeminiAdapter {
    /// # Arguments
    /// * `base_url` - API root (e.g., "https://generativelanguage.googleapis.com/v1beta")
    /// * `api_key` - Gemini API key
    /// * `model` - Model name (e.g., "gemini-2.5-flash")
    pub fn new(base_url: String, api_key: String, model: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            model,
        }
    }

    fn stream_url(&self) -> String {
        format!(
            "{}/models/{}:streamGenerateContent?alt=sse",
            self.base_url, self.model
        )
    }

    fn parse_chunk(data: &str) -> Result<SseData, DomainError> {
        let chunk: GenerateResponse = serde_json::from_str(data).map_err(|e| {
            warn!(error = %e, data = %data.chars().take(200).collect::<String>(), "bad stream chunk");
            DomainError::Generation(format!("Malformed stream chunk: {}", e))
        })?;
        if let Some(err) = chunk.error {
            return Err(DomainError::Generation(err.message));
        }
        if let Some(reason) = chunk.prompt_feedback.and_then(|f| f.block_reason) {
            return Err(DomainError::Generation(format!(
                "Prompt blocked: {}",
                reason
            )));
        }
        let Some(candidate) = chunk.candidates.into_iter().next() else {
            return Ok(SseData::Skip);
        };
        let text: String = candidate
            .content
            .into_iter()
            .flat_map(|c| c.parts)
            .filter_map(|p| p.text)
            .collect();
        if candidate.finish_reason.is_some() {
            Ok(SseData::Final(text))
        } else if text.is_empty() {
            Ok(SseData::Skip)
        } else {
            Ok(SseData::Chunk(text))
        }
    }
}

#[derive(Serialize)]
struct GenerateRequest {
    contents: Vec<Content>,
}

#[derive(Serialize, Deserialize)]
struct Content {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Serialize, Deserialize)]
struct Part {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    text: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    #[serde(default)]
    prompt_feedback: Option<PromptFeedback>,
    #[serde(default)]
    error: Option<ApiError>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    #[serde(default)]
    content: Option<Content>,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    #[serde(default)]
    block_reason: Option<String>,
}

#[derive(Deserialize)]
struct ApiError {
    message: String,
}

#[async_trait::async_trait]
impl GenerationPort for GeminiAdapter {
    async fn generate(&self, prompt: &str) -> Result<ChunkReceiver, DomainError> {
        info!(
            model = %self.model,
            prompt_len = prompt.len(),
            "sending prompt to Gemini"
        );

        let request = GenerateRequest {
            contents: vec![Content {
                role: Some("user".to_string()),
                parts: vec![Part {
                    text: Some(prompt.to_string()),
                }],
            }],
        };

        let response = self
            .client
            .post(self.stream_url())
            .header("x-goog-api-key", &self.api_key)
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await
            .map_err(|e| DomainError::Generation(format!("HTTP request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            warn!(status = %status, body = %text, "Gemini API returned error");
            return Err(DomainError::Generation(format!(
                "API error {}: {}",
                status,
                text.chars().take(200).collect::<String>()
            )));
        }

        Ok(sse::spawn_reader(response, "gemini", Self::parse_chunk))
    }
}
