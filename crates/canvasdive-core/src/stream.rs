//! Incremental accumulation of streamed model output.
//!
//! Chunk boundaries carry no meaning, so observers only ever see the cumulative
//! text published through a `watch` channel.

use crate::error::{Error, Result};
use canvasdive_llm::util::sanitize_error_for_user;
use canvasdive_llm::TextStream;
use futures::StreamExt;
use tokio::sync::watch;
use tracing::{debug, warn};

/// Concatenates chunks in arrival order and publishes the running value
#[derive(Debug)]
pub struct StreamAccumulator {
    buffer: String,
    chunks: usize,
    sender: watch::Sender<String>,
}

impl Default for StreamAccumulator {
    fn default() -> Self {
        Self::new()
    }
}

impl StreamAccumulator {
    /// Create an accumulator with its own channel
    #[must_use]
    pub fn new() -> Self {
        let (sender, _) = watch::channel(String::new());
        Self::with_sender(sender)
    }

    /// Publish into an existing channel, resetting it to empty
    #[must_use]
    pub fn with_sender(sender: watch::Sender<String>) -> Self {
        sender.send_replace(String::new());
        Self {
            buffer: String::new(),
            chunks: 0,
            sender,
        }
    }

    /// Observe the cumulative value
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<String> {
        self.sender.subscribe()
    }

    /// Append a chunk and publish the new cumulative value
    pub fn push(&mut self, chunk: &str) {
        if chunk.is_empty() {
            return;
        }
        self.buffer.push_str(chunk);
        self.chunks += 1;
        self.sender.send_replace(self.buffer.clone());
    }

    /// Text accumulated so far
    #[must_use]
    pub fn value(&self) -> &str {
        &self.buffer
    }

    /// Number of non-empty chunks received
    #[must_use]
    pub fn chunk_count(&self) -> usize {
        self.chunks
    }

    /// Drain a stream to completion.
    ///
    /// A mid-stream failure becomes [`Error::UpstreamGeneration`] carrying the
    /// text received before it.
    pub async fn consume(mut self, mut stream: TextStream) -> Result<String> {
        while let Some(next) = stream.next().await {
            match next {
                Ok(chunk) => self.push(&chunk),
                Err(e) => {
                    warn!(error = %e, received = self.buffer.len(), "Stream failed mid-response");
                    return Err(Error::upstream_with_partial(
                        sanitize_error_for_user(&e.to_string()),
                        self.buffer,
                    ));
                }
            }
        }
        debug!(chunks = self.chunks, bytes = self.buffer.len(), "Stream complete");
        Ok(self.buffer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use canvasdive_llm::{CompletionRequest, LlmProvider, MockProvider};

    #[test]
    fn test_push_publishes_cumulative_value() {
        let mut acc = StreamAccumulator::new();
        let rx = acc.subscribe();

        acc.push("Hel");
        assert_eq!(*rx.borrow(), "Hel");
        acc.push("");
        acc.push("lo wor");
        acc.push("ld");
        assert_eq!(*rx.borrow(), "Hello world");
        assert_eq!(acc.chunk_count(), 3);
    }

    #[tokio::test]
    async fn test_consume_full_stream() {
        let mock = MockProvider::new();
        mock.add_chunks(["[{\"content\":", " \"Cafe\"}]"]);
        let stream = mock
            .complete_stream(CompletionRequest::new("m"))
            .await
            .unwrap();

        let acc = StreamAccumulator::new();
        let rx = acc.subscribe();
        let text = acc.consume(stream).await.unwrap();
        assert_eq!(text, "[{\"content\": \"Cafe\"}]");
        assert_eq!(*rx.borrow(), text);
    }

    #[tokio::test]
    async fn test_consume_preserves_partial_on_failure() {
        let mock = MockProvider::new();
        mock.add_broken_stream(["Local ", "bakeries"], "connection reset");
        let stream = mock
            .complete_stream(CompletionRequest::new("m"))
            .await
            .unwrap();

        let acc = StreamAccumulator::new();
        let rx = acc.subscribe();
        let err = acc.consume(stream).await.unwrap_err();
        assert_eq!(err.partial(), Some("Local bakeries"));
        assert_eq!(*rx.borrow(), "Local bakeries");
    }

    #[test]
    fn test_with_sender_resets_channel() {
        let (tx, rx) = watch::channel("stale".to_string());
        let _acc = StreamAccumulator::with_sender(tx);
        assert_eq!(*rx.borrow(), "");
    }
}
