//! # Recognition Engine Adapter
//!
//! The speech engine is an external collaborator. The session protocol only
//! ever sees two operations: feed a waveform chunk, or flush whatever is
//! buffered. Both traits in this module exist so the protocol core can be
//! exercised against scripted fakes without linking a native engine.
//!
//! ## Shape:
//! - [`RecognizerEngine`]: process-wide factory around the loaded model.
//!   Read-only after startup, shared by every session.
//! - [`RecognizerStream`]: one per session, owned exclusively by that
//!   session's actor. Created at handshake with the negotiated sample rate,
//!   flushed exactly once on termination.
//!
//! ## Audio format:
//! Incoming chunks are raw little-endian 16-bit PCM, mono, at the sample
//! rate negotiated in the handshake. Chunk size is whatever the client sends.

use crate::config::ModelsConfig;
use anyhow::Result;
use byteorder::{ByteOrder, LittleEndian};
use std::path::Path;
use std::sync::Arc;

#[cfg(feature = "vosk")]
pub mod vosk;

/// A committed transcription for a completed utterance.
///
/// `confidence` is engine-defined and passed through unvalidated; engines
/// that do not score their output leave it as `None`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FinalResult {
    pub text: String,
    pub confidence: Option<f64>,
}

/// Outcome of feeding one audio chunk to the engine.
#[derive(Debug, Clone, PartialEq)]
pub enum FeedOutcome {
    /// The engine reached an utterance boundary and committed a hypothesis
    Final(FinalResult),

    /// The utterance is still in progress; text is provisional and revisable
    Partial(String),
}

/// Per-session recognition stream.
pub trait RecognizerStream: Send {
    /// Feed one chunk of little-endian 16-bit PCM audio.
    fn feed(&mut self, audio: &[u8]) -> Result<FeedOutcome>;

    /// Commit and return whatever audio is still buffered.
    fn flush(&mut self) -> Result<FinalResult>;
}

/// Process-wide engine around the loaded model.
pub trait RecognizerEngine: Send + Sync {
    /// Create a recognition stream for one session.
    ///
    /// The stream must report word-level detail so final results can carry
    /// a confidence score.
    fn create_stream(&self, sample_rate: u32) -> Result<Box<dyn RecognizerStream>>;
}

/// Load the recognition engine configured for this process.
///
/// The model directory is checked here, before the server starts accepting
/// connections; a missing directory aborts startup even in builds without a
/// compiled-in backend.
pub fn load_engine(config: &ModelsConfig) -> Result<Arc<dyn RecognizerEngine>> {
    let model_dir = Path::new(&config.model_dir);
    if !model_dir.is_dir() {
        anyhow::bail!(
            "Recognition model directory not found at {}",
            model_dir.display()
        );
    }

    #[cfg(feature = "vosk")]
    {
        Ok(Arc::new(vosk::VoskEngine::load(model_dir)?))
    }

    #[cfg(not(feature = "vosk"))]
    {
        anyhow::bail!("No recognition backend compiled in; rebuild with --features vosk")
    }
}

/// Decode little-endian 16-bit PCM bytes into samples.
///
/// A trailing odd byte is dropped rather than rejected; clients chunk on
/// arbitrary boundaries and the engine resynchronizes on the next chunk.
pub fn pcm_to_samples(bytes: &[u8]) -> Vec<i16> {
    bytes
        .chunks_exact(2)
        .map(LittleEndian::read_i16)
        .collect()
}

/// Scripted fakes for exercising the session protocol without an engine.
#[cfg(test)]
pub mod testing {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// Stream that replays a fixed script of feed outcomes.
    pub struct ScriptedStream {
        script: VecDeque<FeedOutcome>,
        flush_result: FinalResult,
        fail_feed: bool,
    }

    impl RecognizerStream for ScriptedStream {
        fn feed(&mut self, _audio: &[u8]) -> Result<FeedOutcome> {
            if self.fail_feed {
                anyhow::bail!("scripted feed failure");
            }
            Ok(self
                .script
                .pop_front()
                .unwrap_or_else(|| FeedOutcome::Partial(String::new())))
        }

        fn flush(&mut self) -> Result<FinalResult> {
            Ok(self.flush_result.clone())
        }
    }

    /// Engine that hands out scripted streams and records the sample rates
    /// it was asked for.
    pub struct ScriptedEngine {
        script: Mutex<Vec<FeedOutcome>>,
        flush_result: Mutex<FinalResult>,
        pub created_sample_rates: Mutex<Vec<u32>>,
        fail_feed: bool,
        fail_create: bool,
    }

    impl ScriptedEngine {
        /// Engine whose streams produce empty partials and flush to nothing.
        pub fn empty() -> Self {
            Self::with_script(Vec::new(), FinalResult::default())
        }

        pub fn with_script(script: Vec<FeedOutcome>, flush_result: FinalResult) -> Self {
            Self {
                script: Mutex::new(script),
                flush_result: Mutex::new(flush_result),
                created_sample_rates: Mutex::new(Vec::new()),
                fail_feed: false,
                fail_create: false,
            }
        }

        /// Engine whose streams reject every feed call.
        pub fn failing_feed() -> Self {
            Self {
                fail_feed: true,
                ..Self::empty()
            }
        }

        /// Engine that cannot create streams at all.
        pub fn failing_create() -> Self {
            Self {
                fail_create: true,
                ..Self::empty()
            }
        }
    }

    impl RecognizerEngine for ScriptedEngine {
        fn create_stream(&self, sample_rate: u32) -> Result<Box<dyn RecognizerStream>> {
            if self.fail_create {
                anyhow::bail!("scripted engine refused to create a stream");
            }
            self.created_sample_rates.lock().unwrap().push(sample_rate);
            Ok(Box::new(ScriptedStream {
                script: self.script.lock().unwrap().clone().into(),
                flush_result: self.flush_result.lock().unwrap().clone(),
                fail_feed: self.fail_feed,
            }))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pcm_to_samples_little_endian() {
        // 0x0100 = 1, 0xFFFF = -1
        let bytes = [0x01, 0x00, 0xFF, 0xFF];
        assert_eq!(pcm_to_samples(&bytes), vec![1, -1]);
    }

    #[test]
    fn test_pcm_to_samples_drops_trailing_byte() {
        let bytes = [0x00, 0x01, 0x7F];
        assert_eq!(pcm_to_samples(&bytes), vec![256]);
    }

    #[test]
    fn test_pcm_to_samples_empty() {
        assert!(pcm_to_samples(&[]).is_empty());
    }

    #[test]
    fn test_load_engine_rejects_missing_model_dir() {
        let config = ModelsConfig {
            model_dir: "/nonexistent/model/dir".to_string(),
        };
        let err = load_engine(&config).map(|_| ()).unwrap_err();
        assert!(err.to_string().contains("model directory not found"));
    }
}
