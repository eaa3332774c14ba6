//! Audio emission: text segment → synthesized PCM frames → sink
//!
//! Framing per segment is `initialize → push* → flush → end`. Blank text goes
//! straight to `end`. Once a sink has been initialized, `end` is reached on
//! every path: success, synthesis failure, sink failure and shutdown.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;

use super::tts::Synthesizer;
use crate::shutdown::Shutdown;
use crate::Result;

/// MIME type announced to sinks
pub const PCM_MIME_TYPE: &str = "audio/pcm";

/// Stream parameters announced by `initialize`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioFormat {
    pub request_id: String,
    pub sample_rate: u32,
    pub channels: u16,
    pub mime_type: &'static str,
}

/// Downstream consumer of synthesized audio
///
/// A sink may go through several `initialize … end` cycles, one per segment.
/// Every method returns [`crate::Error::Audio`] when the transport or file
/// behind the sink fails.
#[async_trait]
pub trait AudioSink: Send {
    /// Open a stream
    ///
    /// # Errors
    ///
    /// Returns error if the stream cannot be opened
    async fn initialize(&mut self, format: &AudioFormat) -> Result<()>;

    /// Append one frame of s16le PCM
    ///
    /// # Errors
    ///
    /// Returns error if the frame cannot be delivered
    async fn push(&mut self, frame: Vec<u8>) -> Result<()>;

    /// Mark all pushed frames as complete
    ///
    /// # Errors
    ///
    /// Returns error if buffered audio cannot be written out
    async fn flush(&mut self) -> Result<()>;

    /// Close the stream; also the only call made for blank input
    ///
    /// # Errors
    ///
    /// Returns error if the stream cannot be closed cleanly
    async fn end(&mut self) -> Result<()>;
}

/// What happened while emitting one segment
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EmitReport {
    /// `None` when the segment was blank and the sink was never initialized
    pub request_id: Option<String>,
    pub frames: usize,
    pub samples: usize,
    /// Shutdown interrupted the segment
    pub cancelled: bool,
}

/// Convert f32 samples to s16le bytes, scaling by 32767 and clamping
#[must_use]
pub fn f32_to_pcm16(samples: &[f32]) -> Vec<u8> {
    let mut out = Vec::with_capacity(samples.len() * 2);
    for &sample in samples {
        #[allow(clippy::cast_possible_truncation)]
        let value = (sample * 32767.0).clamp(-32768.0, 32767.0) as i16;
        out.extend_from_slice(&value.to_le_bytes());
    }
    out
}

/// Short request id for sink streams
fn short_request_id() -> String {
    uuid::Uuid::new_v4().simple().to_string()[..12].to_string()
}

/// Drives one synthesizer into sinks with fixed frame pacing
#[derive(Clone)]
pub struct SpeechEmitter {
    synth: Arc<dyn Synthesizer>,
    frame_delay: Duration,
}

impl SpeechEmitter {
    /// Create an emitter; `frame_delay` is waited after every pushed frame
    #[must_use]
    pub fn new(synth: Arc<dyn Synthesizer>, frame_delay: Duration) -> Self {
        Self { synth, frame_delay }
    }

    /// Synthesize `text` into `sink`
    ///
    /// # Errors
    ///
    /// Returns the synthesis or sink error after the sink has been ended
    pub async fn emit(
        &self,
        text: &str,
        sink: &mut dyn AudioSink,
        shutdown: &Shutdown,
    ) -> Result<EmitReport> {
        let mut report = EmitReport::default();

        if text.trim().is_empty() {
            sink.end().await?;
            return Ok(report);
        }

        let format = AudioFormat {
            request_id: short_request_id(),
            sample_rate: self.synth.sample_rate(),
            channels: 1,
            mime_type: PCM_MIME_TYPE,
        };
        report.request_id = Some(format.request_id.clone());

        let mut shutdown = shutdown.clone();
        let outcome = match sink.initialize(&format).await {
            Ok(()) => self.pump(text, sink, &mut shutdown, &mut report).await,
            Err(e) => Err(e),
        };

        let flushed = match &outcome {
            Ok(()) if !report.cancelled => sink.flush().await,
            _ => Ok(()),
        };
        let ended = sink.end().await;

        if let Err(e) = &outcome {
            tracing::warn!(
                request_id = %format.request_id,
                frames = report.frames,
                error = %e,
                "speech emission failed"
            );
        }

        outcome?;
        flushed?;
        ended?;

        tracing::debug!(
            request_id = %format.request_id,
            frames = report.frames,
            samples = report.samples,
            cancelled = report.cancelled,
            "segment emitted"
        );
        Ok(report)
    }

    async fn pump(
        &self,
        text: &str,
        sink: &mut dyn AudioSink,
        shutdown: &mut Shutdown,
        report: &mut EmitReport,
    ) -> Result<()> {
        let mut blocks = tokio::select! {
            biased;
            () = shutdown.wait() => {
                report.cancelled = true;
                return Ok(());
            }
            blocks = self.synth.synthesize(text) => blocks?,
        };

        loop {
            let next = tokio::select! {
                biased;
                () = shutdown.wait() => {
                    report.cancelled = true;
                    return Ok(());
                }
                next = blocks.next() => next,
            };

            let Some(block) = next else {
                return Ok(());
            };
            let block = block?;
            if block.is_empty() {
                continue;
            }

            sink.push(f32_to_pcm16(&block)).await?;
            report.frames += 1;
            report.samples += block.len();

            if !self.frame_delay.is_zero() {
                tokio::select! {
                    biased;
                    () = shutdown.wait() => {
                        report.cancelled = true;
                        return Ok(());
                    }
                    () = tokio::time::sleep(self.frame_delay) => {}
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pcm16_scales_and_clamps() {
        let bytes = f32_to_pcm16(&[0.0, 1.0, -1.0, 2.0, -2.0, 0.5]);
        let values: Vec<i16> = bytes
            .chunks_exact(2)
            .map(|b| i16::from_le_bytes([b[0], b[1]]))
            .collect();
        assert_eq!(values, vec![0, 32767, -32767, 32767, -32768, 16383]);
    }

    #[test]
    fn request_ids_are_short_and_distinct() {
        let a = short_request_id();
        let b = short_request_id();
        assert_eq!(a.len(), 12);
        assert_ne!(a, b);
    }
}
