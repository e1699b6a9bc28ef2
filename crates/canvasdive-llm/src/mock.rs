//! Mock LLM Provider for testing
//!
//! Responses are scripted up front and consumed in order. Each script entry is
//! either a full reply, a chunked stream that may break off partway, or an error.

use super::provider::{LlmProvider, TextStream};
use crate::completion::{CompletionRequest, CompletionResponse};
use crate::error::{Error, Result};
use futures::stream::{self, StreamExt};

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

const MOCK_MODEL: &str = "mock-model";

#[derive(Debug, Clone)]
enum Scripted {
    Reply(String),
    Chunks {
        chunks: Vec<String>,
        fail_with: Option<String>,
    },
    Fail(String),
}

/// A mock LLM provider that returns queued responses or a default reply.
#[derive(Clone)]
pub struct MockProvider {
    script: Arc<Mutex<VecDeque<Scripted>>>,
    requests: Arc<Mutex<Vec<CompletionRequest>>>,
}

impl Default for MockProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl MockProvider {
    /// Create a new mock provider.
    #[must_use]
    pub fn new() -> Self {
        Self {
            script: Arc::new(Mutex::new(VecDeque::new())),
            requests: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Queue a complete reply.
    pub fn add_response(&self, content: impl Into<String>) {
        self.push(Scripted::Reply(content.into()));
    }

    /// Queue a reply delivered as separate stream chunks.
    pub fn add_chunks<I, S>(&self, chunks: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.push(Scripted::Chunks {
            chunks: chunks.into_iter().map(Into::into).collect(),
            fail_with: None,
        });
    }

    /// Queue a stream that yields `chunks` and then fails.
    pub fn add_broken_stream<I, S>(&self, chunks: I, message: impl Into<String>)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.push(Scripted::Chunks {
            chunks: chunks.into_iter().map(Into::into).collect(),
            fail_with: Some(message.into()),
        });
    }

    /// Queue an upstream failure.
    pub fn add_error(&self, message: impl Into<String>) {
        self.push(Scripted::Fail(message.into()));
    }

    /// Requests received so far.
    #[must_use]
    pub fn requests(&self) -> Vec<CompletionRequest> {
        self.requests
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    fn push(&self, entry: Scripted) {
        self.script
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push_back(entry);
    }

    fn next(&self, request: CompletionRequest) -> Option<Scripted> {
        self.requests
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(request);
        self.script
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .pop_front()
    }

    fn response(content: String) -> CompletionResponse {
        CompletionResponse {
            content,
            usage: None,
            finish_reason: Some("stop".to_string()),
            model: MOCK_MODEL.to_string(),
        }
    }
}

#[async_trait::async_trait]
impl LlmProvider for MockProvider {
    fn name(&self) -> &str {
        "mock"
    }

    fn default_model(&self) -> &str {
        MOCK_MODEL
    }

    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse> {
        match self.next(request) {
            Some(Scripted::Reply(content)) => Ok(Self::response(content)),
            Some(Scripted::Chunks {
                fail_with: Some(message),
                ..
            }) => Err(Error::Stream(message)),
            Some(Scripted::Chunks { chunks, .. }) => Ok(Self::response(chunks.concat())),
            Some(Scripted::Fail(message)) => Err(Error::Api(message)),
            None => Ok(Self::response("mock response".to_string())),
        }
    }

    async fn complete_stream(&self, request: CompletionRequest) -> Result<TextStream> {
        match self.next(request) {
            Some(Scripted::Reply(content)) => Ok(stream::once(async move { Ok(content) }).boxed()),
            Some(Scripted::Chunks { chunks, fail_with }) => {
                let mut items: Vec<Result<String>> = chunks.into_iter().map(Ok).collect();
                if let Some(message) = fail_with {
                    items.push(Err(Error::Stream(message)));
                }
                Ok(stream::iter(items).boxed())
            }
            Some(Scripted::Fail(message)) => Err(Error::Api(message)),
            None => Ok(stream::once(async { Ok("mock response".to_string()) }).boxed()),
        }
    }
}
