pub mod http;

use async_trait::async_trait;
use imchat_core::ImChatResult;
use serde::Serialize;

pub use http::HttpCompletionBackend;

/// One call to a text-completion endpoint.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompletionRequest {
    /// Model or deployment name.
    pub model: String,
    /// Fully rendered ChatML prompt.
    pub prompt: String,
    pub temperature: f32,
    pub max_tokens: u32,
    pub top_p: f32,
    pub frequency_penalty: f32,
    pub presence_penalty: f32,
    pub stop: Vec<String>,
}

/// Trait for completion providers.
///
/// Implementations return the assistant text with surrounding whitespace
/// removed. Failures must not have side effects on the caller's state; the
/// controller relies on that to roll back the pending user message.
#[async_trait]
pub trait CompletionBackend: Send + Sync {
    async fn complete(&self, request: &CompletionRequest) -> ImChatResult<String>;
}
