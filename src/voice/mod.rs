//! Voice output module
//!
//! Splits replies into sentences, synthesizes each through the TTS endpoint
//! and streams paced PCM frames to an audio sink.

pub mod chunker;
mod emitter;
mod sink;
mod tts;

pub use chunker::{paced_segments, split_sentences};
pub use emitter::{AudioFormat, AudioSink, EmitReport, PCM_MIME_TYPE, SpeechEmitter, f32_to_pcm16};
pub use sink::{ChannelSink, SinkEvent, WavSink};
pub use tts::{HttpSpeech, PcmDecoder, SampleStream, SpeechConfig, Synthesizer, TTS_SAMPLE_RATE};
