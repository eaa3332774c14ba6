//! Append-only conversation history

use crate::llm::{Role, ToolCall, Turn};
use crate::{Error, Result};

/// Ordered, append-only sequence of turns for one session
///
/// Every tool turn answers a call id from the most recent assistant turn,
/// and each id is answered at most once.
#[derive(Debug, Clone, Default)]
pub struct History {
    turns: Vec<Turn>,
}

impl History {
    #[must_use]
    pub const fn new() -> Self {
        Self { turns: Vec::new() }
    }

    #[must_use]
    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.turns.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    pub fn push_user(&mut self, content: &str) {
        self.turns.push(Turn::user(content));
    }

    pub fn push_assistant(&mut self, content: &str) {
        self.turns.push(Turn::assistant(content));
    }

    /// Record an assistant turn that requested tools
    pub fn push_tool_calls(&mut self, content: &str, calls: Vec<ToolCall>) {
        self.turns.push(Turn::assistant_tool_calls(content, calls));
    }

    /// Record a tool result
    ///
    /// # Errors
    ///
    /// Returns [`Error::Agent`] if `call` was not requested by the latest
    /// assistant turn or has already been answered
    pub fn push_tool_result(&mut self, call: &ToolCall, content: &str) -> Result<()> {
        let answered = self
            .turns
            .iter()
            .rev()
            .take_while(|t| t.role == Role::Tool)
            .any(|t| t.tool_call_id.as_deref() == Some(call.id.as_str()));

        let requested = self
            .turns
            .iter()
            .rev()
            .find(|t| t.role != Role::Tool)
            .is_some_and(|t| {
                t.role == Role::Assistant && t.tool_calls.iter().any(|tc| tc.id == call.id)
            });

        if !requested || answered {
            return Err(Error::Agent(format!(
                "tool result for call {} does not answer the latest assistant turn",
                call.id
            )));
        }

        self.turns.push(Turn::tool(call, content));
        Ok(())
    }

    /// Tool turns since the latest assistant turn
    #[must_use]
    pub fn pending_tool_results(&self) -> usize {
        self.turns
            .iter()
            .rev()
            .take_while(|t| t.role == Role::Tool)
            .count()
    }
}
