//! Configuration management for the CRM voice assistant
//!
//! Precedence, lowest to highest: built-in defaults, the TOML overlay file,
//! environment variables.

pub mod file;

use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use crate::agent::AgentConfig;
use crate::llm::OpenRouterConfig;
use crate::prompt;
use crate::voice::SpeechConfig;
use crate::{Error, Result};

use file::CrmConfigFile;

pub const DEFAULT_LLM_BASE_URL: &str = "https://openrouter.ai/api/v1";
pub const DEFAULT_LLM_MODEL: &str = "meta-llama/llama-3.2-3b-instruct:free";
pub const DEFAULT_TTS_BASE_URL: &str = "http://localhost:8880/v1";
pub const DEFAULT_TTS_MODEL: &str = "kokoro";
pub const DEFAULT_TTS_VOICE: &str = "af_nicole";
const DB_FILE_NAME: &str = "mini_crm.db";

/// Chat model settings
#[derive(Debug, Clone)]
pub struct LlmConfig {
    pub base_url: String,
    /// `OpenRouter` API key, see <https://openrouter.ai/keys>
    pub api_key: Option<String>,
    pub model: String,
    pub max_tokens: u32,
    pub temperature: f32,
    pub timeout: Duration,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_LLM_BASE_URL.to_string(),
            api_key: None,
            model: DEFAULT_LLM_MODEL.to_string(),
            max_tokens: 300,
            temperature: 0.7,
            timeout: Duration::from_secs(30),
        }
    }
}

/// Speech synthesis and pacing settings
#[derive(Debug, Clone)]
pub struct VoiceConfig {
    pub tts_base_url: String,
    pub tts_api_key: Option<String>,
    pub tts_model: String,
    pub tts_voice: String,
    /// TTS speed multiplier
    pub tts_speed: f32,
    pub segment_delay: Duration,
    pub frame_delay: Duration,
}

impl Default for VoiceConfig {
    fn default() -> Self {
        Self {
            tts_base_url: DEFAULT_TTS_BASE_URL.to_string(),
            tts_api_key: None,
            tts_model: DEFAULT_TTS_MODEL.to_string(),
            tts_voice: DEFAULT_TTS_VOICE.to_string(),
            tts_speed: 1.0,
            segment_delay: Duration::from_millis(50),
            frame_delay: Duration::from_millis(20),
        }
    }
}

/// Resolved assistant configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Path to data directory (database)
    pub data_dir: PathBuf,
    pub db_path: PathBuf,
    pub llm: LlmConfig,
    pub voice: VoiceConfig,
    /// Max tool-call rounds per user turn
    pub max_tool_rounds: u32,
}

/// Platform data directory, e.g. `~/.local/share/crm-voice` on Linux
#[must_use]
pub fn default_data_dir() -> PathBuf {
    directories::ProjectDirs::from("", "", "crm-voice").map_or_else(
        || PathBuf::from(".crm-voice"),
        |d| d.data_dir().to_path_buf(),
    )
}

/// Parse an optional env value, naming the variable on failure
fn parse_env<T: FromStr>(key: &str, value: Option<String>) -> Result<Option<T>>
where
    T::Err: std::fmt::Display,
{
    value
        .map(|raw| {
            raw.trim()
                .parse()
                .map_err(|e| Error::Config(format!("{key}={raw:?}: {e}")))
        })
        .transpose()
}

impl Config {
    /// Load configuration from the overlay file and the process environment
    ///
    /// # Errors
    ///
    /// Returns error if an explicit config file is unusable or an env
    /// variable does not parse
    pub fn load(config_path: Option<&Path>) -> Result<Self> {
        let fc = file::load_config_file(config_path)?;
        Self::resolve(fc, |key| std::env::var(key).ok())
    }

    /// Resolve configuration with an injected env lookup
    ///
    /// # Errors
    ///
    /// Returns error if an env variable does not parse or a value is out of
    /// range
    pub fn resolve(fc: CrmConfigFile, env: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let env = |key: &str| env(key).filter(|v| !v.trim().is_empty());
        let llm_default = LlmConfig::default();
        let voice_default = VoiceConfig::default();

        let llm = LlmConfig {
            base_url: env("CRM_LLM_BASE_URL")
                .or(fc.llm.base_url)
                .unwrap_or(llm_default.base_url),
            api_key: env("OPENROUTER_API_KEY").or(fc.llm.api_key),
            model: env("CRM_LLM_MODEL")
                .or(fc.llm.model)
                .unwrap_or(llm_default.model),
            max_tokens: parse_env("CRM_LLM_MAX_TOKENS", env("CRM_LLM_MAX_TOKENS"))?
                .or(fc.llm.max_tokens)
                .unwrap_or(llm_default.max_tokens),
            temperature: parse_env("CRM_LLM_TEMPERATURE", env("CRM_LLM_TEMPERATURE"))?
                .or(fc.llm.temperature)
                .unwrap_or(llm_default.temperature),
            timeout: parse_env("CRM_LLM_TIMEOUT_SECS", env("CRM_LLM_TIMEOUT_SECS"))?
                .or(fc.llm.timeout_secs)
                .map_or(llm_default.timeout, Duration::from_secs),
        };

        let voice = VoiceConfig {
            tts_base_url: env("CRM_TTS_BASE_URL")
                .or(fc.voice.tts_base_url)
                .unwrap_or(voice_default.tts_base_url),
            tts_api_key: env("CRM_TTS_API_KEY").or(fc.voice.tts_api_key),
            tts_model: env("CRM_TTS_MODEL")
                .or(fc.voice.tts_model)
                .unwrap_or(voice_default.tts_model),
            tts_voice: env("CRM_TTS_VOICE")
                .or(fc.voice.tts_voice)
                .unwrap_or(voice_default.tts_voice),
            tts_speed: parse_env("CRM_TTS_SPEED", env("CRM_TTS_SPEED"))?
                .or(fc.voice.tts_speed)
                .unwrap_or(voice_default.tts_speed),
            segment_delay: fc
                .voice
                .segment_delay_ms
                .map_or(voice_default.segment_delay, Duration::from_millis),
            frame_delay: fc
                .voice
                .frame_delay_ms
                .map_or(voice_default.frame_delay, Duration::from_millis),
        };

        let max_tool_rounds = parse_env("CRM_MAX_TOOL_ROUNDS", env("CRM_MAX_TOOL_ROUNDS"))?
            .or(fc.agent.max_tool_rounds)
            .unwrap_or_else(|| AgentConfig::default().max_tool_rounds);

        if max_tool_rounds == 0 {
            return Err(Error::Config("max_tool_rounds must be at least 1".to_string()));
        }
        if !(0.25..=4.0).contains(&voice.tts_speed) {
            return Err(Error::Config(format!(
                "tts_speed {} outside 0.25..=4.0",
                voice.tts_speed
            )));
        }

        let data_dir = default_data_dir();
        let db_path = env("CRM_DB_PATH")
            .map(PathBuf::from)
            .or(fc.database.path)
            .unwrap_or_else(|| data_dir.join(DB_FILE_NAME));

        Ok(Self {
            data_dir,
            db_path,
            llm,
            voice,
            max_tool_rounds,
        })
    }

    /// Chat client settings with today's instructions
    #[must_use]
    pub fn openrouter_config(&self) -> OpenRouterConfig {
        OpenRouterConfig {
            base_url: self.llm.base_url.clone(),
            api_key: self.llm.api_key.clone(),
            model: self.llm.model.clone(),
            max_tokens: self.llm.max_tokens,
            temperature: self.llm.temperature,
            timeout: self.llm.timeout,
            instructions: prompt::instructions_for(chrono::Local::now().date_naive()),
        }
    }

    #[must_use]
    pub fn speech_config(&self) -> SpeechConfig {
        SpeechConfig {
            base_url: self.voice.tts_base_url.clone(),
            api_key: self.voice.tts_api_key.clone(),
            model: self.voice.tts_model.clone(),
            voice: self.voice.tts_voice.clone(),
            speed: self.voice.tts_speed,
        }
    }

    #[must_use]
    pub fn agent_config(&self) -> AgentConfig {
        AgentConfig {
            max_tool_rounds: self.max_tool_rounds,
            ..AgentConfig::default()
        }
    }
}
