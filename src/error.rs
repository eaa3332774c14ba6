//! Error types for the CRM voice assistant

use thiserror::Error;

/// Result type alias for assistant operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in the CRM voice assistant
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// Referenced contact does not exist
    #[error("No contact found for '{0}'.")]
    NotFound(String),

    /// Tool arguments were well-formed but semantically invalid
    #[error("{0}")]
    InvalidArguments(String),

    /// Model requested a tool that is not in the catalog
    #[error("unknown tool: {0}")]
    UnknownTool(String),

    /// Tool executor failed
    #[error("tool error: {0}")]
    Tool(String),

    /// Agent loop error (history bookkeeping)
    #[error("agent error: {0}")]
    Agent(String),

    /// Inference capability unreachable, timed out or returned garbage
    #[error("inference error: {0}")]
    Inference(String),

    /// Text-to-speech error
    #[error("TTS error: {0}")]
    Tts(String),

    /// Audio sink error
    #[error("audio error: {0}")]
    Audio(String),

    /// Session ended while work was outstanding
    #[error("session cancelled")]
    Cancelled,

    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP error
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// TOML parsing error
    #[error("toml error: {0}")]
    Toml(#[from] toml::de::Error),

    /// Database error
    #[error("database error: {0}")]
    Database(String),

    /// `SQLite` error
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

impl Error {
    /// Whether the error is meant to be spoken back to the user rather than
    /// treated as a failure
    #[must_use]
    pub const fn is_recoverable(&self) -> bool {
        matches!(self, Self::NotFound(_) | Self::InvalidArguments(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_renders_as_spoken_text() {
        let err = Error::NotFound("Ada".to_string());
        assert_eq!(err.to_string(), "No contact found for 'Ada'.");
        assert!(err.is_recoverable());
    }

    #[test]
    fn infrastructure_errors_are_not_recoverable() {
        assert!(!Error::Database("locked".to_string()).is_recoverable());
        assert!(!Error::UnknownTool("delete_contact".to_string()).is_recoverable());
    }
}
