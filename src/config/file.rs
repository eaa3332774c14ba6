//! TOML configuration file loading
//!
//! Supports `<config_dir>/crm-voice/config.toml` as a persistent config source.
//! All fields are optional; the file is a partial overlay on top of defaults.

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::{Error, Result};

/// Top-level TOML configuration file schema
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CrmConfigFile {
    /// Chat model configuration
    #[serde(default)]
    pub llm: LlmFileConfig,

    /// Speech synthesis and pacing
    #[serde(default)]
    pub voice: VoiceFileConfig,

    /// Orchestration loop limits
    #[serde(default)]
    pub agent: AgentFileConfig,

    #[serde(default)]
    pub database: DatabaseFileConfig,
}

/// LLM-related configuration
#[derive(Debug, Default, Deserialize)]
pub struct LlmFileConfig {
    pub base_url: Option<String>,
    pub api_key: Option<String>,
    /// Model identifier (e.g. "meta-llama/llama-3.2-3b-instruct:free")
    pub model: Option<String>,
    pub max_tokens: Option<u32>,
    pub temperature: Option<f32>,
    pub timeout_secs: Option<u64>,
}

/// Voice processing configuration
#[derive(Debug, Default, Deserialize)]
pub struct VoiceFileConfig {
    /// `OpenAI`-compatible speech endpoint base
    pub tts_base_url: Option<String>,
    pub tts_api_key: Option<String>,
    /// TTS model (e.g. "kokoro")
    pub tts_model: Option<String>,
    /// TTS voice identifier (e.g. "af_nicole")
    pub tts_voice: Option<String>,
    pub tts_speed: Option<f32>,
    /// Pause between reply segments
    pub segment_delay_ms: Option<u64>,
    /// Pause after each pushed audio frame
    pub frame_delay_ms: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
pub struct AgentFileConfig {
    pub max_tool_rounds: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
pub struct DatabaseFileConfig {
    pub path: Option<PathBuf>,
}

impl CrmConfigFile {
    /// Parse config file contents
    ///
    /// # Errors
    ///
    /// Returns error if the TOML is malformed or has unknown keys
    pub fn parse(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }
}

/// Load the TOML config file
///
/// An explicit path must exist and parse. The default path is optional:
/// a missing or unreadable default file falls back to defaults.
///
/// # Errors
///
/// Returns error if an explicitly requested file cannot be read or parsed
pub fn load_config_file(explicit: Option<&Path>) -> Result<CrmConfigFile> {
    if let Some(path) = explicit {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("cannot read config file {}: {e}", path.display()))
        })?;
        let config = CrmConfigFile::parse(&content)?;
        tracing::info!(path = %path.display(), "loaded config file");
        return Ok(config);
    }

    let Some(path) = config_file_path() else {
        return Ok(CrmConfigFile::default());
    };

    if !path.exists() {
        return Ok(CrmConfigFile::default());
    }

    match std::fs::read_to_string(&path) {
        Ok(content) => match CrmConfigFile::parse(&content) {
            Ok(config) => {
                tracing::info!(path = %path.display(), "loaded config file");
                Ok(config)
            }
            Err(e) => {
                tracing::warn!(
                    path = %path.display(),
                    error = %e,
                    "failed to parse config file, using defaults"
                );
                Ok(CrmConfigFile::default())
            }
        },
        Err(e) => {
            tracing::warn!(
                path = %path.display(),
                error = %e,
                "failed to read config file"
            );
            Ok(CrmConfigFile::default())
        }
    }
}

/// Return the default config file path: `<config_dir>/crm-voice/config.toml`
#[must_use]
pub fn config_file_path() -> Option<PathBuf> {
    directories::ProjectDirs::from("", "", "crm-voice").map(|d| d.config_dir().join("config.toml"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_partial_overlay() {
        let fc = CrmConfigFile::parse(
            r#"
            [llm]
            model = "openai/gpt-4o-mini"

            [voice]
            frame_delay_ms = 0
            "#,
        )
        .unwrap();

        assert_eq!(fc.llm.model.as_deref(), Some("openai/gpt-4o-mini"));
        assert_eq!(fc.voice.frame_delay_ms, Some(0));
        assert!(fc.agent.max_tool_rounds.is_none());
        assert!(fc.database.path.is_none());
    }

    #[test]
    fn rejects_unknown_tables() {
        assert!(CrmConfigFile::parse("[server]\nport = 1").is_err());
    }

    #[test]
    fn explicit_missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_config_file(Some(&dir.path().join("nope.toml"))).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }
}
