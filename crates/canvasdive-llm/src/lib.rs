//! Canvasdive LLM - Text generation provider abstraction
//!
//! This crate provides the seam between Canvasdive and a generative-text service:
//! - Provider: the `LlmProvider` trait with buffered and streamed completion
//! - Message/Completion: request and response types
//! - Mock: a scripted provider for tests
//! - Util: JSON extraction from free-form model output

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod completion;
pub mod error;
pub mod message;
pub mod mock;
pub mod provider;
pub mod util;

pub use completion::{CompletionRequest, CompletionResponse, TokenUsage};
pub use error::{Error, Result};
pub use message::{Message, MessageRole};
pub use mock::MockProvider;
pub use provider::{LlmProvider, TextStream};
