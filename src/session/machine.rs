//! # Session State Machine
//!
//! One [`StreamingSession`] per connection, owned exclusively by that
//! connection's actor. The lifecycle is linear:
//!
//! ```text
//! AwaitingInit --handshake--> Streaming --stop/disconnect/error--> Terminating --> Closed
//! ```
//!
//! Invariants:
//! - The recognizer handle exists iff the state is Streaming or Terminating,
//!   and a session never holds more than one live handle.
//! - The handle is flushed at most once; `terminate` takes it out, so a
//!   second stop and the final `close` are no-ops with respect to the engine.
//! - Events come back to the caller in the order their triggering frames
//!   were processed; each audio chunk yields at most one event.
//!
//! The machine itself never touches the transport. The caller sends the
//! events it returns and decides which sends are best-effort.

use crate::error::SessionError;
use crate::recognizer::{FeedOutcome, RecognizerEngine, RecognizerStream};
use crate::session::events::OutboundEvent;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, warn};

/// Lifecycle state of one streaming session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Waiting for the single JSON initialization frame
    AwaitingInit,
    /// Handshake done, feeding audio to the recognizer
    Streaming,
    /// Stop or error received; recognizer flushed, final segment pending
    Terminating,
    /// Terminal; no further frames are processed
    Closed,
}

/// State and resources for one connection's transcription lifecycle.
pub struct StreamingSession {
    state: SessionState,
    engine: Arc<dyn RecognizerEngine>,
    recognizer: Option<Box<dyn RecognizerStream>>,
    sample_rate: u32,
    participant_identity: String,
    room_id: String,
}

impl StreamingSession {
    /// New session in AwaitingInit. `default_sample_rate` is used when the
    /// handshake omits or garbles `sampleRate`.
    pub fn new(engine: Arc<dyn RecognizerEngine>, default_sample_rate: u32) -> Self {
        Self {
            state: SessionState::AwaitingInit,
            engine,
            recognizer: None,
            sample_rate: default_sample_rate,
            participant_identity: "unknown".to_string(),
            room_id: "unknown".to_string(),
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn participant_identity(&self) -> &str {
        &self.participant_identity
    }

    pub fn room_id(&self) -> &str {
        &self.room_id
    }

    /// Process the initialization frame and create the recognizer.
    ///
    /// `sampleRate`, `participantIdentity`, and `roomId` are all optional;
    /// a non-positive or non-numeric `sampleRate` falls back to the default.
    /// A payload that is not JSON at all is a handshake error.
    pub fn handle_init(&mut self, payload: &str) -> Result<(), SessionError> {
        if self.state != SessionState::AwaitingInit {
            return Err(SessionError::Protocol(
                "initialization frame received after handshake".to_string(),
            ));
        }

        let init: Value = serde_json::from_str(payload)
            .map_err(|err| SessionError::Handshake(format!("invalid JSON: {}", err)))?;

        if let Some(rate) = init.get("sampleRate").and_then(coerce_sample_rate) {
            self.sample_rate = rate;
        }
        if let Some(identity) = init.get("participantIdentity").and_then(Value::as_str) {
            self.participant_identity = identity.to_string();
        }
        if let Some(room) = init.get("roomId").and_then(Value::as_str) {
            self.room_id = room.to_string();
        }

        let recognizer = self
            .engine
            .create_stream(self.sample_rate)
            .map_err(|err| SessionError::Recognizer(err.to_string()))?;

        self.recognizer = Some(recognizer);
        self.state = SessionState::Streaming;

        debug!(
            sample_rate = self.sample_rate,
            participant = %self.participant_identity,
            room = %self.room_id,
            "Session initialized"
        );

        Ok(())
    }

    /// Feed one audio chunk and return the resulting event, if any.
    ///
    /// An utterance boundary yields a `segment`, in-progress speech yields a
    /// `partial`; empty text yields nothing. Chunks arriving after the
    /// session started terminating are dropped.
    pub fn handle_audio(&mut self, chunk: &[u8]) -> Result<Option<OutboundEvent>, SessionError> {
        match self.state {
            SessionState::Streaming => {}
            SessionState::AwaitingInit => {
                return Err(SessionError::Handshake(
                    "audio received before initialization frame".to_string(),
                ));
            }
            SessionState::Terminating | SessionState::Closed => return Ok(None),
        }

        let recognizer = self
            .recognizer
            .as_mut()
            .ok_or_else(|| SessionError::Protocol("no live recognizer".to_string()))?;

        let outcome = recognizer
            .feed(chunk)
            .map_err(|err| SessionError::Recognizer(err.to_string()))?;

        let event = match outcome {
            FeedOutcome::Final(result) if !result.text.is_empty() => Some(OutboundEvent::segment(
                result.text,
                result.confidence,
                self.participant_identity.clone(),
                self.room_id.clone(),
            )),
            FeedOutcome::Partial(text) if !text.is_empty() => Some(OutboundEvent::partial(
                text,
                self.participant_identity.clone(),
                self.room_id.clone(),
            )),
            _ => None,
        };

        Ok(event)
    }

    /// Enter Terminating: flush the recognizer and hand back the trailing
    /// segment, if the flushed text is non-empty.
    ///
    /// Idempotent — the handle is taken on the first call, so repeated stops
    /// and the disconnect safety net cannot double-flush. Flush failures are
    /// logged and swallowed; the session is ending either way.
    pub fn terminate(&mut self) -> Option<OutboundEvent> {
        if self.state == SessionState::Closed {
            return None;
        }
        self.state = SessionState::Terminating;

        let mut recognizer = self.recognizer.take()?;

        match recognizer.flush() {
            Ok(result) if !result.text.is_empty() => Some(OutboundEvent::segment(
                result.text,
                result.confidence,
                self.participant_identity.clone(),
                self.room_id.clone(),
            )),
            Ok(_) => None,
            Err(err) => {
                warn!(
                    participant = %self.participant_identity,
                    room = %self.room_id,
                    "Recognizer flush failed during shutdown: {}",
                    err
                );
                None
            }
        }
    }

    /// Enter Closed and release whatever is left. Never flushes — that
    /// already happened in `terminate` if it was going to.
    pub fn close(&mut self) {
        self.state = SessionState::Closed;
        self.recognizer = None;
    }
}

/// Coerce a handshake `sampleRate` value to a positive integer.
fn coerce_sample_rate(value: &Value) -> Option<u32> {
    let rate = if let Some(n) = value.as_u64() {
        u32::try_from(n).ok()
    } else if let Some(f) = value.as_f64() {
        (f.is_finite() && f > 0.0 && f < f64::from(u32::MAX)).then_some(f as u32)
    } else {
        value.as_str().and_then(|s| s.trim().parse::<u32>().ok())
    };

    rate.filter(|r| *r > 0)
}
