//! Application configuration. AI credentials, document source, paths.

use crate::adapters::ai::gemini_adapter::{DEFAULT_GEMINI_MODEL, DEFAULT_GEMINI_URL};
use crate::domain::DomainError;
use serde::Deserialize;
use std::path::PathBuf;
use std::str::FromStr;

const DEFAULT_OPENAI_URL: &str = "https://api.openai.com/v1/chat/completions";
const DEFAULT_OPENAI_MODEL: &str = "gpt-4o-mini";

/// Which generation backend to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AiProvider {
    OpenAi,
    Gemini,
    Mock,
}

impl FromStr for AiProvider {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "openai" => Ok(AiProvider::OpenAi),
            "gemini" => Ok(AiProvider::Gemini),
            "mock" => Ok(AiProvider::Mock),
            other => Err(DomainError::Config(format!(
                "unknown AI provider '{}' (expected openai, gemini or mock)",
                other
            ))),
        }
    }
}

#[derive(Debug, Deserialize, Default)]
pub struct AppConfig {
    /// Base directory for the note database, session file and exports. Read from NOTE_ASSIST_DATA_DIR.
    #[serde(default)]
    pub data_dir: Option<String>,

    /// Markdown file to edit. Read from NOTE_ASSIST_DOCUMENT_PATH.
    #[serde(default)]
    pub document_path: Option<String>,

    /// Stored note to edit (SQLite). Read from NOTE_ASSIST_NOTE_ID. Ignored when document_path is set.
    #[serde(default)]
    pub note_id: Option<i64>,

    /// Session snapshot file. Defaults to {data_dir}/session.json. Read from NOTE_ASSIST_SESSION_PATH.
    #[serde(default)]
    pub session_path: Option<String>,

    // ─────────────────────────────────────────────────────────────────────────
    // AI Configuration
    // ─────────────────────────────────────────────────────────────────────────
    /// openai | gemini | mock. Read from NOTE_ASSIST_AI_PROVIDER.
    #[serde(default)]
    pub ai_provider: Option<String>,

    /// AI API key. Read from NOTE_ASSIST_AI_API_KEY.
    #[serde(default)]
    pub ai_api_key: Option<String>,

    /// AI API URL. Defaults per provider. Read from NOTE_ASSIST_AI_API_URL.
    #[serde(default)]
    pub ai_api_url: Option<String>,

    /// AI model name. Defaults per provider. Read from NOTE_ASSIST_AI_MODEL.
    #[serde(default)]
    pub ai_model: Option<String>,

    /// Per-chunk delay for the mock provider in ms. Read from NOTE_ASSIST_MOCK_DELAY_MS.
    #[serde(default)]
    pub mock_delay_ms: Option<u64>,
}

impl AppConfig {
    pub fn load() -> Result<Self, config::ConfigError> {
        dotenv::dotenv().ok();
        let mut c = config::Config::builder();
        c = c.add_source(config::Environment::with_prefix("NOTE_ASSIST"));
        if let Ok(path) = std::env::var("NOTE_ASSIST_CONFIG") {
            c = c.add_source(config::File::with_name(&path));
        }
        let mut cfg: Self = c.build()?.try_deserialize()?;
        // Numeric env values arrive as strings; parse them explicitly.
        if let Ok(s) = std::env::var("NOTE_ASSIST_NOTE_ID") {
            if let Ok(id) = s.parse::<i64>() {
                cfg.note_id = Some(id);
            }
        }
        if let Ok(s) = std::env::var("NOTE_ASSIST_MOCK_DELAY_MS") {
            if let Ok(ms) = s.parse::<u64>() {
                cfg.mock_delay_ms = Some(ms);
            }
        }
        Ok(cfg)
    }

    pub fn data_dir_or_default(&self) -> PathBuf {
        PathBuf::from(self.data_dir.as_deref().unwrap_or("./data"))
    }

    pub fn session_path_or_default(&self) -> PathBuf {
        self.session_path
            .as_deref()
            .map(PathBuf::from)
            .unwrap_or_else(|| self.data_dir_or_default().join("session.json"))
    }

    pub fn mock_delay_ms_or_default(&self) -> u64 {
        self.mock_delay_ms.unwrap_or(100)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // AI Configuration Helpers
    // ─────────────────────────────────────────────────────────────────────────

    /// Returns the AI API key if configured and non-empty.
    pub fn ai_api_key(&self) -> Option<String> {
        self.ai_api_key.clone().filter(|k| !k.trim().is_empty())
    }

    /// Explicit provider if set; otherwise OpenAI when a key is present, else Mock.
    pub fn ai_provider(&self) -> Result<AiProvider, DomainError> {
        match self.ai_provider.as_deref() {
            Some(p) => p.parse(),
            None if self.ai_api_key().is_some() => Ok(AiProvider::OpenAi),
            None => Ok(AiProvider::Mock),
        }
    }

    pub fn ai_api_url_or_default(&self, provider: AiProvider) -> String {
        self.ai_api_url.clone().unwrap_or_else(|| match provider {
            AiProvider::Gemini => DEFAULT_GEMINI_URL.to_string(),
            _ => DEFAULT_OPENAI_URL.to_string(),
        })
    }

    pub fn ai_model_or_default(&self, provider: AiProvider) -> String {
        self.ai_model.clone().unwrap_or_else(|| match provider {
            AiProvider::Gemini => DEFAULT_GEMINI_MODEL.to_string(),
            _ => DEFAULT_OPENAI_MODEL.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_parse() {
        assert_eq!("OpenAI".parse::<AiProvider>().unwrap(), AiProvider::OpenAi);
        assert_eq!(" gemini ".parse::<AiProvider>().unwrap(), AiProvider::Gemini);
        assert!(matches!(
            "claude".parse::<AiProvider>(),
            Err(DomainError::Config(_))
        ));
    }

    #[test]
    fn test_provider_defaults_to_key_presence() {
        let mut cfg = AppConfig::default();
        assert_eq!(cfg.ai_provider().unwrap(), AiProvider::Mock);
        cfg.ai_api_key = Some("sk-test".into());
        assert_eq!(cfg.ai_provider().unwrap(), AiProvider::OpenAi);
        cfg.ai_provider = Some("gemini".into());
        assert_eq!(cfg.ai_provider().unwrap(), AiProvider::Gemini);
    }

    #[test]
    fn test_defaults_per_provider() {
        let cfg = AppConfig::default();
        assert_eq!(cfg.ai_model_or_default(AiProvider::Gemini), "gemini-2.5-flash");
        assert_eq!(cfg.ai_model_or_default(AiProvider::OpenAi), "gpt-4o-mini");
        assert_eq!(
            cfg.ai_api_url_or_default(AiProvider::OpenAi),
            "https://api.openai.com/v1/chat/completions"
        );
        assert_eq!(
            cfg.session_path_or_default(),
            PathBuf::from("./data").join("session.json")
        );
    }
}
