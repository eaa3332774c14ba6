//! CRM Voice - Voice-driven assistant over a small contact database
//!
//! This library provides the core functionality for the assistant:
//! - CRM store (contacts, notes, tasks) on `SQLite`
//! - Tool catalog and executor exposed to the model
//! - Agent loop alternating inference and tool execution
//! - Reply chunking and paced PCM audio emission to sinks
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────┐
//! │                   VoiceSession                       │
//! │   utterance → Agent → chunker → SpeechEmitter → sink │
//! └──────────┬───────────────────────────┬──────────────┘
//!            │                           │
//! ┌──────────▼──────────┐     ┌──────────▼──────────────┐
//! │ ChatModel (OpenAI-  │     │ Synthesizer (OpenAI-    │
//! │ compatible chat)    │     │ compatible /audio/speech)│
//! └──────────┬──────────┘     └─────────────────────────┘
//!            │ tool calls
//! ┌──────────▼──────────────────────────────────────────┐
//! │        ToolExecutor → CrmStore → SQLite              │
//! └─────────────────────────────────────────────────────┘
//! ```

pub mod agent;
pub mod config;
pub mod db;
pub mod error;
pub mod llm;
pub mod prompt;
pub mod session;
pub mod shutdown;
pub mod tools;
pub mod voice;

pub use agent::{Agent, AgentConfig, AgentReply, History, StopReason};
pub use config::Config;
pub use db::{CrmStore, DbConn, DbPool};
pub use error::{Error, Result};
pub use llm::{ChatModel, OpenRouterClient};
pub use session::{SessionHandle, SpokenTurn, VoiceSession};
pub use tools::{CrmTool, ToolExecutor};
pub use voice::{AudioSink, HttpSpeech, SpeechEmitter, Synthesizer};
