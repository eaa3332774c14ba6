//! Agentic turn runner

use std::collections::HashSet;
use std::sync::Arc;

use super::History;
use crate::llm::{ChatModel, ToolCall, ToolDefinition};
use crate::tools::{ToolExecutor, catalog};

/// Spoken when the model keeps requesting tools past the round cap
pub const ITERATION_CAP_FALLBACK: &str =
    "Sorry, I couldn't finish that request. Please try again.";

/// Spoken when the inference capability fails
pub const INFERENCE_FAILURE_FALLBACK: &str =
    "Sorry, I'm having trouble reaching my brain right now. Please try again in a moment.";

/// Limits and fallback utterances for the loop
#[derive(Debug, Clone)]
pub struct AgentConfig {
    /// Max consecutive tool-call rounds before giving up
    pub max_tool_rounds: u32,
    pub iteration_cap_fallback: String,
    pub inference_failure_fallback: String,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            max_tool_rounds: 5,
            iteration_cap_fallback: ITERATION_CAP_FALLBACK.to_string(),
            inference_failure_fallback: INFERENCE_FAILURE_FALLBACK.to_string(),
        }
    }
}

/// Tool lifecycle events for hosts that display tool activity
#[derive(Debug, Clone)]
pub enum AgentEvent {
    /// Tool invocation started
    ToolStart { tool_id: String, name: String },
    /// Tool invocation completed
    ToolResult {
        tool_id: String,
        name: String,
        output: String,
        is_error: bool,
    },
}

/// Why the loop stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// Model produced a final utterance
    Final,
    /// Model kept requesting tools; fallback spoken
    IterationCap,
    /// Inference call failed; fallback spoken
    InferenceFailed,
}

/// Outcome of one user turn
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgentReply {
    /// Text to speak
    pub text: String,
    pub stop: StopReason,
    /// Tool rounds executed
    pub tool_rounds: u32,
}

/// Give every call in one response a distinct, non-empty id
///
/// Tool results are matched to calls by id, so a blank or repeated id would
/// leave an executed call without its result in history.
fn assign_unique_ids(calls: &mut [ToolCall]) {
    let mut seen = HashSet::new();
    for call in calls {
        if call.id.is_empty() || !seen.insert(call.id.clone()) {
            let fresh = format!("call_{}", uuid::Uuid::new_v4().simple());
            tracing::debug!(original = %call.id, id = %fresh, "reassigned tool call id");
            call.id = fresh;
            seen.insert(call.id.clone());
        }
    }
}

/// Drives inference and tool execution for one conversation
pub struct Agent {
    model: Arc<dyn ChatModel>,
    executor: ToolExecutor,
    tools: Vec<ToolDefinition>,
    history: History,
    config: AgentConfig,
    notify: Option<tokio::sync::mpsc::Sender<AgentEvent>>,
}

impl Agent {
    /// Create an agent with the full CRM tool catalog
    #[must_use]
    pub fn new(model: Arc<dyn ChatModel>, executor: ToolExecutor, config: AgentConfig) -> Self {
        Self {
            model,
            executor,
            tools: catalog(),
            history: History::new(),
            config,
            notify: None,
        }
    }

    /// Emit tool events to `tx`
    #[must_use]
    pub fn with_notify(mut self, tx: tokio::sync::mpsc::Sender<AgentEvent>) -> Self {
        self.notify = Some(tx);
        self
    }

    #[must_use]
    pub const fn history(&self) -> &History {
        &self.history
    }

    /// Record something the assistant said outside the loop (e.g. the greeting)
    pub fn record_assistant(&mut self, text: &str) {
        self.history.push_assistant(text);
    }

    /// Run a full agentic turn for one user utterance.
    ///
    /// Loops until the model stops calling tools or `max_tool_rounds` is
    /// exhausted. Failures never escape: tool errors become tool turns, and
    /// inference failures or cap exhaustion end the turn with a fallback
    /// utterance that is also recorded in history.
    ///
    /// Dropping the future mid-turn can leave unanswered tool calls in
    /// history; callers cancel only when the session is ending.
    pub async fn respond(&mut self, user_text: &str) -> AgentReply {
        self.history.push_user(user_text);

        let mut tool_rounds = 0;

        loop {
            let response = match self.model.complete(self.history.turns(), &self.tools).await {
                Ok(response) => response,
                Err(e) => {
                    tracing::warn!(error = %e, tool_rounds, "inference failed, using fallback");
                    return self.finish(
                        self.config.inference_failure_fallback.clone(),
                        StopReason::InferenceFailed,
                        tool_rounds,
                    );
                }
            };

            if !response.has_tool_calls() {
                tracing::debug!(tool_rounds, chars = response.text.len(), "final utterance");
                return self.finish(response.text, StopReason::Final, tool_rounds);
            }

            if tool_rounds >= self.config.max_tool_rounds {
                tracing::warn!(
                    tool_rounds,
                    requested = response.tool_calls.len(),
                    "tool round cap reached, using fallback"
                );
                return self.finish(
                    self.config.iteration_cap_fallback.clone(),
                    StopReason::IterationCap,
                    tool_rounds,
                );
            }

            tool_rounds += 1;
            let mut calls = response.tool_calls;
            assign_unique_ids(&mut calls);
            self.history.push_tool_calls(&response.text, calls.clone());

            // List order: later calls may depend on earlier writes
            for call in &calls {
                let output = self.run_tool(call).await;
                if let Err(e) = self.history.push_tool_result(call, &output) {
                    tracing::warn!(error = %e, tool_id = %call.id, "dropping tool result");
                }
            }
        }
    }

    fn finish(&mut self, text: String, stop: StopReason, tool_rounds: u32) -> AgentReply {
        self.history.push_assistant(&text);
        AgentReply {
            text,
            stop,
            tool_rounds,
        }
    }

    /// Execute one call; errors are rendered as `Error: ...` text
    async fn run_tool(&self, call: &ToolCall) -> String {
        tracing::debug!(tool_id = %call.id, name = %call.name, "executing tool");

        if let Some(n) = &self.notify {
            let _ = n
                .send(AgentEvent::ToolStart {
                    tool_id: call.id.clone(),
                    name: call.name.clone(),
                })
                .await;
        }

        let result = self.executor.execute(&call.name, &call.arguments).await;
        let (output, is_error) = match result {
            Ok(out) => (out, false),
            Err(e) => {
                tracing::warn!(tool_id = %call.id, name = %call.name, error = %e, "tool failed");
                (format!("Error: {e}"), true)
            }
        };

        if let Some(n) = &self.notify {
            let _ = n
                .send(AgentEvent::ToolResult {
                    tool_id: call.id.clone(),
                    name: call.name.clone(),
                    output: output.clone(),
                    is_error,
                })
                .await;
        }

        output
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_and_repeated_ids_are_reassigned() {
        let mut calls = vec![
            ToolCall::new("call_1", "search_contact", "{}"),
            ToolCall::new("call_1", "search_contact", "{}"),
            ToolCall::new("", "search_contact", "{}"),
            ToolCall::new("call_2", "search_contact", "{}"),
        ];

        assign_unique_ids(&mut calls);

        assert_eq!(calls[0].id, "call_1");
        assert_eq!(calls[3].id, "call_2");
        assert!(calls.iter().all(|c| !c.id.is_empty()));
        let distinct: HashSet<_> = calls.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(distinct.len(), calls.len());
    }

    #[test]
    fn default_config_caps_tool_rounds() {
        let config = AgentConfig::default();
        assert_eq!(config.max_tool_rounds, 5);
        assert_eq!(config.iteration_cap_fallback, ITERATION_CAP_FALLBACK);
    }
}
