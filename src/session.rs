//! Voice session: agent loop → sentence chunker → speech emitter → sink
//!
//! One session is one cooperative task. Ending it through [`SessionHandle`]
//! abandons an outstanding inference call, stops audio emission, and still
//! closes any sink stream that was opened.

use std::time::Duration;

use futures::StreamExt;

use crate::agent::{Agent, AgentReply, StopReason};
use crate::prompt::GREETING;
use crate::shutdown::{self, Shutdown, ShutdownTrigger};
use crate::voice::{AudioSink, SpeechEmitter, paced_segments};
use crate::{Error, Result};

/// Ends a running session from another task
#[derive(Debug)]
pub struct SessionHandle {
    trigger: ShutdownTrigger,
}

impl SessionHandle {
    /// Request the session to end
    pub fn end(&self) {
        tracing::info!("voice session end requested");
        self.trigger.trigger();
    }
}

/// Result of speaking one reply
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpokenTurn {
    pub reply: AgentReply,
    /// Segments fully emitted
    pub segments: usize,
    /// Segments whose synthesis failed (the sink was still closed)
    pub failed_segments: usize,
    /// Shutdown interrupted playback
    pub cancelled: bool,
}

/// A conversation that speaks its replies
pub struct VoiceSession {
    agent: Agent,
    emitter: SpeechEmitter,
    sink: Box<dyn AudioSink>,
    segment_delay: Duration,
    shutdown: Shutdown,
}

impl VoiceSession {
    /// Create a session and the handle that ends it
    #[must_use]
    pub fn new(
        agent: Agent,
        emitter: SpeechEmitter,
        sink: Box<dyn AudioSink>,
        segment_delay: Duration,
    ) -> (Self, SessionHandle) {
        let (trigger, shutdown) = shutdown::channel();
        let session = Self {
            agent,
            emitter,
            sink,
            segment_delay,
            shutdown,
        };
        (session, SessionHandle { trigger })
    }

    #[must_use]
    pub const fn agent(&self) -> &Agent {
        &self.agent
    }

    /// Speak the greeting and record it in history
    ///
    /// # Errors
    ///
    /// Returns [`Error::Cancelled`] if the session already ended
    pub async fn greet(&mut self) -> Result<SpokenTurn> {
        self.ensure_running()?;
        self.agent.record_assistant(GREETING);
        let reply = AgentReply {
            text: GREETING.to_string(),
            stop: StopReason::Final,
            tool_rounds: 0,
        };
        Ok(self.speak(reply).await)
    }

    /// Run the agent loop for one user utterance and speak the reply
    ///
    /// # Errors
    ///
    /// Returns [`Error::Cancelled`] if the session ends before the reply is
    /// ready
    pub async fn handle_utterance(&mut self, text: &str) -> Result<SpokenTurn> {
        self.ensure_running()?;

        let mut shutdown = self.shutdown.clone();
        let reply = tokio::select! {
            biased;
            () = shutdown.wait() => {
                tracing::info!("session ended during inference");
                return Err(Error::Cancelled);
            }
            reply = self.agent.respond(text) => reply,
        };

        tracing::info!(
            stop = ?reply.stop,
            tool_rounds = reply.tool_rounds,
            "reply ready"
        );

        Ok(self.speak(reply).await)
    }

    fn ensure_running(&self) -> Result<()> {
        if self.shutdown.is_triggered() {
            return Err(Error::Cancelled);
        }
        Ok(())
    }

    /// Emit every segment of the reply; synthesis failures skip the segment
    async fn speak(&mut self, reply: AgentReply) -> SpokenTurn {
        let mut spoken = SpokenTurn {
            segments: 0,
            failed_segments: 0,
            cancelled: false,
            reply,
        };

        let mut shutdown = self.shutdown.clone();
        let mut segments = paced_segments(&spoken.reply.text, self.segment_delay);

        loop {
            let next = tokio::select! {
                biased;
                () = shutdown.wait() => None,
                next = segments.next() => next,
            };
            let Some(segment) = next else {
                break;
            };

            match self
                .emitter
                .emit(&segment, self.sink.as_mut(), &self.shutdown)
                .await
            {
                Ok(report) if report.cancelled => break,
                Ok(_) => spoken.segments += 1,
                Err(e) => {
                    tracing::warn!(error = %e, "segment synthesis failed, skipping");
                    spoken.failed_segments += 1;
                }
            }
        }

        spoken.cancelled = self.shutdown.is_triggered();
        spoken
    }
}
