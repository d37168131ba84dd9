//! Mock AI adapter for testing without API calls.
//!
//! Streams scripted replies. Queued replies are used first, in order; once the
//! queue is empty every call gets the default reply.

use crate::domain::DomainError;
use crate::ports::{ChunkReceiver, GenerationPort};
use std::collections::VecDeque;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::info;

/// One scripted generation outcome.
#[derive(Debug, Clone, PartialEq)]
pub enum MockReply {
    /// Stream these chunks, then finish.
    Chunks(Vec<String>),
    /// Fail before any chunk is produced.
    Fail(String),
    /// Stream these chunks, then fail mid-stream.
    FailAfter(Vec<String>, String),
}

impl MockReply {
    pub fn chunks<I, S>(chunks: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        MockReply::Chunks(chunks.into_iter().map(Into::into).collect())
    }
}

/// Mock generator.
///
/// Returns predetermined chunks without making API calls.
/// Simulates network latency with a configurable per-chunk delay.
pub struct MockAiAdapter {
    default_reply: MockReply,
    queue: Mutex<VecDeque<MockReply>>,
    prompts: Mutex<Vec<String>>,
    /// Simulated delay between chunks in milliseconds.
    delay_ms: u64,
}

impl MockAiAdapter {
    /// Mock with a canned markdown reply and no delay.
    pub fn new() -> Self {
        Self::with_reply(MockReply::chunks([
            "## [MOCK] Generated section\n\n",
            "This is a simulated response. ",
            "Configure an API key to generate real content.",
        ]))
    }

    pub fn with_chunks<I, S>(chunks: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::with_reply(MockReply::chunks(chunks))
    }

    /// Mock whose every call fails with `message`.
    pub fn failing(message: impl Into<String>) -> Self {
        Self::with_reply(MockReply::Fail(message.into()))
    }

    pub fn with_reply(reply: MockReply) -> Self {
        Self {
            default_reply: reply,
            queue: Mutex::new(VecDeque::new()),
            prompts: Mutex::new(Vec::new()),
            delay_ms: 0,
        }
    }

    /// Set the simulated per-chunk delay.
    pub fn with_delay(mut self, delay_ms: u64) -> Self {
        self.delay_ms = delay_ms;
        self
    }

    /// Queue a one-shot reply for the next call.
    pub fn push_reply(&self, reply: MockReply) {
        self.queue
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push_back(reply);
    }

    /// Prompts received so far, in call order.
    pub fn prompts(&self) -> Vec<String> {
        self.prompts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn next_reply(&self) -> MockReply {
        self.queue
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front()
            .unwrap_or_else(|| self.default_reply.clone())
    }
}

impl Default for MockAiAdapter {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl GenerationPort for MockAiAdapter {
    async fn generate(&self, prompt: &str) -> Result<ChunkReceiver, DomainError> {
        info!(prompt_len = prompt.len(), "[MOCK] Simulating generation");
        self.prompts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(prompt.to_string());

        let (chunks, failure) = match self.next_reply() {
            MockReply::Fail(message) => return Err(DomainError::Generation(message)),
            MockReply::Chunks(chunks) => (chunks, None),
            MockReply::FailAfter(chunks, message) => (chunks, Some(message)),
        };

        let delay = Duration::from_millis(self.delay_ms);
        let (tx, rx) = mpsc::channel(chunks.len().max(1));
        tokio::spawn(async move {
            for chunk in chunks {
                if !delay.is_zero() {
                    tokio::time::sleep(delay).await;
                }
                if tx.send(Ok(chunk)).await.is_err() {
                    return;
                }
            }
            if let Some(message) = failure {
                let _ = tx.send(Err(DomainError::Generation(message))).await;
            }
        });
        Ok(rx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn collect(mut rx: ChunkReceiver) -> Vec<Result<String, DomainError>> {
        let mut out = Vec::new();
        while let Some(item) = rx.recv().await {
            out.push(item);
        }
        out
    }

    #[tokio::test]
    async fn test_streams_chunks_in_order() {
        let adapter = MockAiAdapter::with_chunks(["Hello ", "world"]).with_delay(1);
        let rx = adapter.generate("p").await.unwrap();
        assert_eq!(
            collect(rx).await,
            vec![Ok("Hello ".to_string()), Ok("world".to_string())]
        );
        assert_eq!(adapter.prompts(), vec!["p".to_string()]);
    }

    #[tokio::test]
    async fn test_queue_before_default() {
        let adapter = MockAiAdapter::with_chunks(["default"]);
        adapter.push_reply(MockReply::Fail("boom".into()));

        assert_eq!(
            adapter.generate("a").await.err(),
            Some(DomainError::Generation("boom".into()))
        );
        let rx = adapter.generate("b").await.unwrap();
        assert_eq!(collect(rx).await, vec![Ok("default".to_string())]);
    }

    #[tokio::test]
    async fn test_fail_after_chunks() {
        let adapter = MockAiAdapter::with_reply(MockReply::FailAfter(
            vec!["partial".into()],
            "reset".into(),
        ));
        let rx = adapter.generate("p").await.unwrap();
        assert_eq!(
            collect(rx).await,
            vec![
                Ok("partial".to_string()),
                Err(DomainError::Generation("reset".into()))
            ]
        );
    }
}
