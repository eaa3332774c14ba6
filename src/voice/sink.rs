//! Audio sinks: a channel bridge for real-time transports and a WAV writer

use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::sync::mpsc;

use super::emitter::{AudioFormat, AudioSink};
use crate::{Error, Result};

/// Sink protocol step, as forwarded by [`ChannelSink`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SinkEvent {
    Initialized(AudioFormat),
    Frame(Vec<u8>),
    Flushed,
    Ended,
}

/// Forwards sink calls over a bounded channel
///
/// A slow consumer blocks `push`, so the channel bound is real backpressure.
pub struct ChannelSink {
    tx: mpsc::Sender<SinkEvent>,
}

impl ChannelSink {
    /// Create a sink and the receiver a transport reads from
    #[must_use]
    pub fn new(capacity: usize) -> (Self, mpsc::Receiver<SinkEvent>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (Self { tx }, rx)
    }

    async fn send(&self, event: SinkEvent) -> Result<()> {
        self.tx
            .send(event)
            .await
            .map_err(|_| Error::Audio("audio transport closed".to_string()))
    }
}

#[async_trait]
impl AudioSink for ChannelSink {
    async fn initialize(&mut self, format: &AudioFormat) -> Result<()> {
        self.send(SinkEvent::Initialized(format.clone())).await
    }

    async fn push(&mut self, frame: Vec<u8>) -> Result<()> {
        self.send(SinkEvent::Frame(frame)).await
    }

    async fn flush(&mut self) -> Result<()> {
        self.send(SinkEvent::Flushed).await
    }

    async fn end(&mut self) -> Result<()> {
        self.send(SinkEvent::Ended).await
    }
}

/// Writes one WAV file per `initialize … end` cycle into a directory
pub struct WavSink {
    dir: PathBuf,
    writer: Option<hound::WavWriter<BufWriter<File>>>,
    current: Option<PathBuf>,
    written: Vec<PathBuf>,
}

impl WavSink {
    /// Create a sink writing into `dir` (created if missing)
    ///
    /// # Errors
    ///
    /// Returns error if the directory cannot be created
    pub fn new(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&dir)?;
        Ok(Self {
            dir,
            writer: None,
            current: None,
            written: Vec::new(),
        })
    }

    /// Files finalized so far, in order
    #[must_use]
    pub fn written(&self) -> &[PathBuf] {
        &self.written
    }
}

#[async_trait]
impl AudioSink for WavSink {
    async fn initialize(&mut self, format: &AudioFormat) -> Result<()> {
        let spec = hound::WavSpec {
            channels: format.channels,
            sample_rate: format.sample_rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };

        let path = self
            .dir
            .join(format!("{:03}-{}.wav", self.written.len() + 1, format.request_id));
        let writer = hound::WavWriter::create(&path, spec).map_err(|e| Error::Audio(e.to_string()))?;

        self.writer = Some(writer);
        self.current = Some(path);
        Ok(())
    }

    async fn push(&mut self, frame: Vec<u8>) -> Result<()> {
        let writer = self
            .writer
            .as_mut()
            .ok_or_else(|| Error::Audio("push before initialize".to_string()))?;

        for pair in frame.chunks_exact(2) {
            writer
                .write_sample(i16::from_le_bytes([pair[0], pair[1]]))
                .map_err(|e| Error::Audio(e.to_string()))?;
        }
        Ok(())
    }

    async fn flush(&mut self) -> Result<()> {
        if let Some(writer) = self.writer.as_mut() {
            writer.flush().map_err(|e| Error::Audio(e.to_string()))?;
        }
        Ok(())
    }

    async fn end(&mut self) -> Result<()> {
        if let Some(writer) = self.writer.take() {
            writer.finalize().map_err(|e| Error::Audio(e.to_string()))?;
        }
        if let Some(path) = self.current.take() {
            tracing::debug!(path = %path.display(), "wav segment written");
            self.written.push(path);
        }
        Ok(())
    }
}
