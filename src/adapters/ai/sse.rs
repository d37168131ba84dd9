//! Server-sent events framing shared by the streaming adapters.
//!
//! Reads the HTTP body as a byte stream, splits it into lines and hands each
//! `data:` payload to a provider-specific parser. Chunks are forwarded over a
//! bounded channel; the channel closes when the body ends or a terminal event
//! (`Done`, error) is seen. A body that ends before the provider signalled
//! completion is reported as a generation failure.

use crate::domain::DomainError;
use crate::ports::ChunkReceiver;
use futures::{Stream, StreamExt};
use std::fmt;
use tokio::sync::mpsc;
use tracing::{debug, warn};

const CHANNEL_CAPACITY: usize = 64;

/// Result of parsing one `data:` payload.
#[derive(Debug, PartialEq, Eq)]
pub enum SseData {
    Chunk(String),
    /// Last content event of a stream (may be empty). Marks completion;
    /// later lines are still read.
    Final(String),
    Skip,
    /// Sentinel; the reader stops here.
    Done,
}

/// Byte buffer that yields complete `data:` payloads.
///
/// Splits on `\n` at the byte level so multi-byte characters that straddle
/// network chunks are decoded intact.
#[derive(Debug, Default)]
pub struct SseLineBuffer {
    buffer: Vec<u8>,
}

impl SseLineBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append bytes and return the payloads of all lines completed by them.
    pub fn push(&mut self, bytes: &[u8]) -> Vec<String> {
        self.buffer.extend_from_slice(bytes);
        let mut payloads = Vec::new();
        while let Some(nl) = self.buffer.iter().position(|&b| b == b'\n') {
            let line: Vec<u8> = self.buffer.drain(..=nl).collect();
            if let Some(data) = data_payload(&line[..line.len() - 1]) {
                payloads.push(data);
            }
        }
        payloads
    }

    /// Payload of a trailing line not terminated by a newline, if any.
    pub fn finish(&mut self) -> Option<String> {
        let rest = std::mem::take(&mut self.buffer);
        data_payload(&rest)
    }
}

fn data_payload(line: &[u8]) -> Option<String> {
    let line = String::from_utf8_lossy(line);
    let line = line.trim_end_matches('\r');
    // Empty lines separate events; ':' starts a comment.
    if line.is_empty() || line.starts_with(':') {
        return None;
    }
    line.strip_prefix("data:")
        .map(|data| data.trim_start().to_string())
}

/// Spawn a task that turns an SSE response body into a chunk stream.
pub fn spawn_reader<F>(response: reqwest::Response, provider: &'static str, parse: F) -> ChunkReceiver
where
    F: Fn(&str) -> Result<SseData, DomainError> + Send + 'static,
{
    spawn_stream(response.bytes_stream(), provider, parse)
}

/// Like [`spawn_reader`], over any byte stream.
///
/// The body must carry a terminal event (`Done` or `Final`); a body that ends
/// without one yields a trailing `Generation` error.
pub fn spawn_stream<S, B, E, F>(mut body: S, provider: &'static str, parse: F) -> ChunkReceiver
where
    S: Stream<Item = Result<B, E>> + Unpin + Send + 'static,
    B: AsRef<[u8]> + Send + 'static,
    E: fmt::Display + Send + 'static,
    F: Fn(&str) -> Result<SseData, DomainError> + Send + 'static,
{
    let (tx, rx) = mpsc::channel(CHANNEL_CAPACITY);

    tokio::spawn(async move {
        let mut lines = SseLineBuffer::new();
        let mut forwarded = 0usize;
        let mut completed = false;

        while let Some(next) = body.next().await {
            let bytes = match next {
                Ok(b) => b,
                Err(e) => {
                    warn!(provider, error = %e, "stream interrupted");
                    let _ = tx
                        .send(Err(DomainError::Generation(format!("Stream interrupted: {}", e))))
                        .await;
                    return;
                }
            };

            for payload in lines.push(bytes.as_ref()) {
                match forward(&tx, parse(&payload), &mut forwarded, &mut completed).await {
                    Flow::Continue => {}
                    Flow::Stop => {
                        debug!(provider, chunks = forwarded, "stream done");
                        return;
                    }
                }
            }
        }

        if let Some(payload) = lines.finish() {
            if let Flow::Stop = forward(&tx, parse(&payload), &mut forwarded, &mut completed).await {
                debug!(provider, chunks = forwarded, "stream done");
                return;
            }
        }

        if completed {
            debug!(provider, chunks = forwarded, "stream ended");
        } else {
            warn!(provider, chunks = forwarded, "stream ended before completion");
            let _ = tx
                .send(Err(DomainError::Generation(
                    "stream ended before completion".to_string(),
                )))
                .await;
        }
    });

    rx
}

enum Flow {
    Continue,
    Stop,
}

async fn forward(
    tx: &mpsc::Sender<Result<String, DomainError>>,
    parsed: Result<SseData, DomainError>,
    forwarded: &mut usize,
    completed: &mut bool,
) -> Flow {
    match parsed {
        Ok(SseData::Chunk(text)) => {
            *forwarded += 1;
            // Receiver dropped: the caller discarded the generation.
            if tx.send(Ok(text)).await.is_err() {
                return Flow::Stop;
            }
            Flow::Continue
        }
        Ok(SseData::Final(text)) => {
            *completed = true;
            if !text.is_empty() {
                *forwarded += 1;
                if tx.send(Ok(text)).await.is_err() {
                    return Flow::Stop;
                }
            }
            Flow::Continue
        }
        Ok(SseData::Skip) => Flow::Continue,
        Ok(SseData::Done) => {
            *completed = true;
            Flow::Stop
        }
        Err(e) => {
            let _ = tx.send(Err(e)).await;
            Flow::Stop
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_complete_lines_only() {
        let mut buf = SseLineBuffer::new();
        assert!(buf.push(b"data: {\"a\"").is_empty());
        assert_eq!(buf.push(b":1}\n\n"), vec!["{\"a\":1}".to_string()]);
    }

    #[test]
    fn test_skips_comments_and_other_fields() {
        let mut buf = SseLineBuffer::new();
        let out = buf.push(b": keep-alive\nevent: message\ndata: x\r\n\r\ndata:y\n");
        assert_eq!(out, vec!["x".to_string(), "y".to_string()]);
    }

    #[test]
    fn test_multibyte_split_across_pushes() {
        let mut buf = SseLineBuffer::new();
        let line = "data: héllo\n".as_bytes();
        let split = line.iter().position(|&b| b == 0xC3).unwrap() + 1;
        assert!(buf.push(&line[..split]).is_empty());
        assert_eq!(buf.push(&line[split..]), vec!["héllo".to_string()]);
    }

    #[test]
    fn test_finish_returns_trailing_line() {
        let mut buf = SseLineBuffer::new();
        assert!(buf.push(b"data: tail").is_empty());
        assert_eq!(buf.finish(), Some("tail".to_string()));
        assert_eq!(buf.finish(), None);
    }

    type Body = futures::stream::Iter<std::vec::IntoIter<Result<Vec<u8>, String>>>;

    fn body(parts: &[&str]) -> Body {
        let parts: Vec<Result<Vec<u8>, String>> =
            parts.iter().map(|p| Ok(p.as_bytes().to_vec())).collect();
        futures::stream::iter(parts)
    }

    fn text_or_done(data: &str) -> Result<SseData, DomainError> {
        match data {
            "[DONE]" => Ok(SseData::Done),
            "[END]" => Ok(SseData::Final(String::new())),
            other => Ok(SseData::Chunk(other.to_string())),
        }
    }

    async fn drain(mut rx: ChunkReceiver) -> Vec<Result<String, DomainError>> {
        let mut out = Vec::new();
        while let Some(item) = rx.recv().await {
            out.push(item);
        }
        out
    }

    #[tokio::test]
    async fn test_stream_with_sentinel_completes() {
        let rx = spawn_stream(body(&["data: Hel", "lo\n\ndata: [DONE]\n\n"]), "test", text_or_done);
        assert_eq!(drain(rx).await, vec![Ok("Hello".to_string())]);
    }

    #[tokio::test]
    async fn test_stream_without_sentinel_fails() {
        let rx = spawn_stream(body(&["data: Half a sent\n\n"]), "test", text_or_done);
        assert_eq!(
            drain(rx).await,
            vec![
                Ok("Half a sent".to_string()),
                Err(DomainError::Generation("stream ended before completion".into())),
            ]
        );
    }

    #[tokio::test]
    async fn test_final_event_completes_stream() {
        let rx = spawn_stream(body(&["data: a\n", "data: [END]"]), "test", text_or_done);
        assert_eq!(drain(rx).await, vec![Ok("a".to_string())]);
    }

    #[tokio::test]
    async fn test_transport_error_is_reported() {
        let parts: Vec<Result<Vec<u8>, String>> =
            vec![Ok(b"data: a\n".to_vec()), Err("reset".to_string())];
        let rx = spawn_stream(futures::stream::iter(parts), "test", text_or_done);
        assert_eq!(
            drain(rx).await,
            vec![
                Ok("a".to_string()),
                Err(DomainError::Generation("Stream interrupted: reset".into())),
            ]
        );
    }
}
