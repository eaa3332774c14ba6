//! Shared test utilities
#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use futures::StreamExt;
use futures::stream;

use crm_voice::llm::{ModelResponse, ToolDefinition, Turn};
use crm_voice::voice::{AudioFormat, SampleStream, SinkEvent};
use crm_voice::{AudioSink, ChatModel, CrmStore, DbPool, Error, Result, Synthesizer, db};

/// Set up an in-memory test database
#[must_use]
pub fn setup_test_db() -> DbPool {
    db::init_memory().expect("failed to init test db")
}

/// Store over a fresh in-memory database
#[must_use]
pub fn setup_test_store() -> CrmStore {
    CrmStore::new(setup_test_db())
}

/// Chat model answering from a fixed script; an exhausted script is an
/// inference failure
#[derive(Default)]
pub struct ScriptedModel {
    script: Mutex<VecDeque<ModelResponse>>,
    seen: Mutex<Vec<Vec<Turn>>>,
}

impl ScriptedModel {
    pub fn new(responses: impl IntoIterator<Item = ModelResponse>) -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(responses.into_iter().collect()),
            seen: Mutex::new(Vec::new()),
        })
    }

    /// Histories passed to each `complete` call, in order
    pub fn seen(&self) -> Vec<Vec<Turn>> {
        self.seen.lock().unwrap().clone()
    }
}

#[async_trait]
impl ChatModel for ScriptedModel {
    async fn complete(&self, history: &[Turn], _tools: &[ToolDefinition]) -> Result<ModelResponse> {
        self.seen.lock().unwrap().push(history.to_vec());
        self.script
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| Error::Inference("script exhausted".to_string()))
    }
}

/// Chat model that never answers
pub struct PendingModel;

#[async_trait]
impl ChatModel for PendingModel {
    async fn complete(&self, _history: &[Turn], _tools: &[ToolDefinition]) -> Result<ModelResponse> {
        std::future::pending().await
    }
}

/// Synthesizer yielding fixed blocks, optionally failing after `fail_after`
/// blocks
pub struct ScriptedSynth {
    pub blocks: Vec<Vec<f32>>,
    pub fail_after: Option<usize>,
    pub texts: Mutex<Vec<String>>,
}

impl ScriptedSynth {
    pub fn new(blocks: Vec<Vec<f32>>) -> Arc<Self> {
        Arc::new(Self {
            blocks,
            fail_after: None,
            texts: Mutex::new(Vec::new()),
        })
    }

    pub fn failing_after(blocks: Vec<Vec<f32>>, fail_after: usize) -> Arc<Self> {
        Arc::new(Self {
            blocks,
            fail_after: Some(fail_after),
            texts: Mutex::new(Vec::new()),
        })
    }

    pub fn texts(&self) -> Vec<String> {
        self.texts.lock().unwrap().clone()
    }
}

#[async_trait]
impl Synthesizer for ScriptedSynth {
    fn sample_rate(&self) -> u32 {
        24000
    }

    async fn synthesize(&self, text: &str) -> Result<SampleStream> {
        self.texts.lock().unwrap().push(text.to_string());

        let mut items: Vec<Result<Vec<f32>>> = Vec::new();
        for (i, block) in self.blocks.iter().enumerate() {
            if self.fail_after == Some(i) {
                items.push(Err(Error::Tts("stream broke".to_string())));
                break;
            }
            items.push(Ok(block.clone()));
        }
        Ok(stream::iter(items).boxed())
    }
}

/// Synthesizer that cannot start
pub struct FailingSynth;

#[async_trait]
impl Synthesizer for FailingSynth {
    fn sample_rate(&self) -> u32 {
        24000
    }

    async fn synthesize(&self, _text: &str) -> Result<SampleStream> {
        Err(Error::Tts("speech endpoint unreachable".to_string()))
    }
}

/// Sink recording every protocol call into a shared log
#[derive(Clone, Default)]
pub struct RecordingSink {
    events: Arc<Mutex<Vec<SinkEvent>>>,
}

impl RecordingSink {
    pub fn events(&self) -> Vec<SinkEvent> {
        self.events.lock().unwrap().clone()
    }

    /// Event names only, e.g. `["init", "push", "flush", "end"]`
    pub fn trace(&self) -> Vec<&'static str> {
        self.events()
            .iter()
            .map(|e| match e {
                SinkEvent::Initialized(_) => "init",
                SinkEvent::Frame(_) => "push",
                SinkEvent::Flushed => "flush",
                SinkEvent::Ended => "end",
            })
            .collect()
    }
}

#[async_trait]
impl AudioSink for RecordingSink {
    async fn initialize(&mut self, format: &AudioFormat) -> Result<()> {
        self.events
            .lock()
            .unwrap()
            .push(SinkEvent::Initialized(format.clone()));
        Ok(())
    }

    async fn push(&mut self, frame: Vec<u8>) -> Result<()> {
        self.events.lock().unwrap().push(SinkEvent::Frame(frame));
        Ok(())
    }

    async fn flush(&mut self) -> Result<()> {
        self.events.lock().unwrap().push(SinkEvent::Flushed);
        Ok(())
    }

    async fn end(&mut self) -> Result<()> {
        self.events.lock().unwrap().push(SinkEvent::Ended);
        Ok(())
    }
}
