//! Conversation engine: one stateless inference step per call
//!
//! The engine receives the complete history every time and answers with
//! either a final utterance or a set of tool calls.

mod openrouter;
mod types;

use async_trait::async_trait;

pub use openrouter::{OpenRouterClient, OpenRouterConfig};
pub use types::{ModelResponse, Role, ToolCall, ToolDefinition, Turn};

use crate::Result;

/// Inference capability consumed by the agent loop
#[async_trait]
pub trait ChatModel: Send + Sync {
    /// Run one inference step over the full history
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Inference`] when the endpoint is unreachable,
    /// times out or returns malformed output
    async fn complete(&self, history: &[Turn], tools: &[ToolDefinition]) -> Result<ModelResponse>;
}
