//! Agent orchestration: alternate inference and tool execution until the
//! model produces a final utterance

mod history;
mod runner;

pub use history::History;
pub use runner::{
    Agent, AgentConfig, AgentEvent, AgentReply, INFERENCE_FAILURE_FALLBACK, ITERATION_CAP_FALLBACK,
    StopReason,
};
