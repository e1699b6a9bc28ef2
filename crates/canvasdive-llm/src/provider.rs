//! LLM Provider trait definition
//!
//! This module defines the core trait that all text-generation providers must implement.

use crate::completion::{CompletionRequest, CompletionResponse};
use crate::error::Result;
use futures::stream::{self, BoxStream, StreamExt};

/// Incremental text chunks from a streaming completion
pub type TextStream = BoxStream<'static, Result<String>>;

/// Trait for LLM providers
#[async_trait::async_trait]
pub trait LlmProvider: Send + Sync {
    /// Get the provider name
    fn name(&self) -> &str;

    /// Get the default model
    fn default_model(&self) -> &str;

    /// Complete a conversation
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse>;

    /// Complete a conversation, yielding text as it arrives.
    ///
    /// Providers without native streaming return the whole completion as a single chunk.
    async fn complete_stream(&self, request: CompletionRequest) -> Result<TextStream> {
        let response = self.complete(request).await?;
        Ok(stream::once(async move { Ok(response.content) }).boxed())
    }
}
