//! AI adapter module. Implements GenerationPort for LLM integration.
//!
//! Provides OpenAI-compatible and Gemini streaming adapters, and a mock adapter for testing.

pub mod csv_utils;
pub mod gemini_adapter;
pub mod mock_adapter;
pub mod openai_adapter;
pub mod sse;

pub use csv_utils::turns_to_csv;
pub use gemini_adapter::GeminiAdapter;
pub use mock_adapter::{MockAiAdapter, MockReply};
pub use openai_adapter::OpenAiAdapter;
