//! Text-to-speech (TTS) processing
//!
//! Talks to an `OpenAI`-compatible `/audio/speech` endpoint (a local Kokoro
//! server by default) and streams raw 16-bit PCM back as f32 sample blocks.

use async_trait::async_trait;
use futures::StreamExt;
use futures::stream::BoxStream;

use crate::{Error, Result};

/// Output sample rate of the speech endpoint (mono)
pub const TTS_SAMPLE_RATE: u32 = 24000;

/// Blocks of mono f32 samples, nominally in `[-1.0, 1.0]`
pub type SampleStream = BoxStream<'static, Result<Vec<f32>>>;

/// Synthesis capability consumed by the emitter
#[async_trait]
pub trait Synthesizer: Send + Sync {
    /// Sample rate of produced blocks
    fn sample_rate(&self) -> u32;

    /// Start synthesizing `text`
    ///
    /// # Errors
    ///
    /// Returns [`Error::Tts`] if synthesis cannot start; failures after the
    /// first block arrive as stream items
    async fn synthesize(&self, text: &str) -> Result<SampleStream>;
}

/// Settings for the speech endpoint
#[derive(Debug, Clone)]
pub struct SpeechConfig {
    pub base_url: String,
    pub api_key: Option<String>,
    pub model: String,
    pub voice: String,
    pub speed: f32,
}

/// Synthesizes speech from text over HTTP
pub struct HttpSpeech {
    client: reqwest::Client,
    config: SpeechConfig,
}

impl HttpSpeech {
    /// Create a new TTS client
    ///
    /// # Errors
    ///
    /// Returns error if the base URL or voice is empty
    pub fn new(config: SpeechConfig) -> Result<Self> {
        if config.base_url.trim().is_empty() {
            return Err(Error::Config("TTS base URL required".to_string()));
        }
        if config.voice.trim().is_empty() {
            return Err(Error::Config("TTS voice required".to_string()));
        }

        Ok(Self {
            client: reqwest::Client::new(),
            config,
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/audio/speech", self.config.base_url.trim_end_matches('/'))
    }
}

#[async_trait]
impl Synthesizer for HttpSpeech {
    fn sample_rate(&self) -> u32 {
        TTS_SAMPLE_RATE
    }

    async fn synthesize(&self, text: &str) -> Result<SampleStream> {
        #[derive(serde::Serialize)]
        struct TtsRequest<'a> {
            model: &'a str,
            input: &'a str,
            voice: &'a str,
            speed: f32,
            response_format: &'a str,
        }

        let request = TtsRequest {
            model: &self.config.model,
            input: text,
            voice: &self.config.voice,
            speed: self.config.speed,
            response_format: "pcm",
        };

        let mut builder = self.client.post(self.endpoint()).json(&request);
        if let Some(key) = self.config.api_key.as_deref().filter(|k| !k.is_empty()) {
            builder = builder.bearer_auth(key);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| Error::Tts(format!("request failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Tts(format!("TTS error {status}: {body}")));
        }

        tracing::debug!(voice = %self.config.voice, chars = text.len(), "tts stream started");

        let mut decoder = PcmDecoder::default();
        let blocks = response.bytes_stream().map(move |chunk| {
            chunk
                .map(|bytes| decoder.decode(&bytes))
                .map_err(|e| Error::Tts(format!("stream interrupted: {e}")))
        });

        Ok(blocks.boxed())
    }
}

/// Decodes s16le bytes to f32, carrying an odd trailing byte across chunks
///
/// Each sample lands half a step away from zero on the 32767 scale, so
/// [`f32_to_pcm16`](crate::voice::f32_to_pcm16) truncates it back to the
/// original value.
#[derive(Debug, Default)]
pub struct PcmDecoder {
    carry: Option<u8>,
}

impl PcmDecoder {
    /// Decode the next chunk of bytes
    pub fn decode(&mut self, bytes: &[u8]) -> Vec<f32> {
        let mut buf = Vec::with_capacity(bytes.len() + 1);
        buf.extend(self.carry.take());
        buf.extend_from_slice(bytes);

        let mut pairs = buf.chunks_exact(2);
        let samples = pairs
            .by_ref()
            .map(|pair| decode_sample(i16::from_le_bytes([pair[0], pair[1]])))
            .collect();
        self.carry = pairs.remainder().first().copied();

        samples
    }
}

fn decode_sample(value: i16) -> f32 {
    (f32::from(value) + 0.5 * f32::from(value.signum())) / 32767.0
}
