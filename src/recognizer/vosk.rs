//! Vosk/Kaldi recognition backend.
//!
//! One [`vosk::Model`] is loaded from disk at startup and shared read-only;
//! each session gets its own [`vosk::Recognizer`] at the negotiated sample
//! rate with word-level detail enabled, so final results carry a confidence
//! score (the mean over per-word confidences).

use super::{FeedOutcome, FinalResult, RecognizerEngine, RecognizerStream};
use anyhow::{anyhow, Result};
use std::path::Path;
use vosk::{CompleteResult, DecodingState, Model, Recognizer};

/// Process-wide engine holding the loaded Vosk model.
pub struct VoskEngine {
    model: Model,
}

impl VoskEngine {
    pub fn load(model_dir: &Path) -> Result<Self> {
        let model = Model::new(model_dir.to_string_lossy())
            .ok_or_else(|| anyhow!("Failed to load Vosk model from {}", model_dir.display()))?;

        tracing::info!("Vosk model loaded from {}", model_dir.display());
        Ok(Self { model })
    }
}

impl RecognizerEngine for VoskEngine {
    fn create_stream(&self, sample_rate: u32) -> Result<Box<dyn RecognizerStream>> {
        let mut recognizer = Recognizer::new(&self.model, sample_rate as f32)
            .ok_or_else(|| anyhow!("Failed to create recognizer at {} Hz", sample_rate))?;
        recognizer.set_words(true);

        Ok(Box::new(VoskStream { recognizer }))
    }
}

/// Per-session recognition stream backed by one Kaldi recognizer.
struct VoskStream {
    recognizer: Recognizer,
}

impl RecognizerStream for VoskStream {
    fn feed(&mut self, audio: &[u8]) -> Result<FeedOutcome> {
        let samples = super::pcm_to_samples(audio);

        match self.recognizer.accept_waveform(&samples) {
            DecodingState::Finalized => {
                Ok(FeedOutcome::Final(complete_to_final(self.recognizer.result())))
            }
            DecodingState::Running => {
                let partial = self.recognizer.partial_result().partial.to_string();
                Ok(FeedOutcome::Partial(partial))
            }
            DecodingState::Failed => Err(anyhow!("Recognizer failed to accept waveform")),
        }
    }

    fn flush(&mut self) -> Result<FinalResult> {
        Ok(complete_to_final(self.recognizer.final_result()))
    }
}

/// Collapse a Vosk result into text plus an optional mean word confidence.
fn complete_to_final(result: CompleteResult) -> FinalResult {
    match result {
        CompleteResult::Single(single) => {
            let confidence = mean_word_confidence(single.result.iter().map(|w| w.conf));
            FinalResult {
                text: single.text.to_string(),
                confidence,
            }
        }
        // Only produced when max_alternatives is set, which this service
        // never does; take the best alternative if it ever shows up.
        CompleteResult::Multiple(multiple) => multiple
            .alternatives
            .first()
            .map(|alt| FinalResult {
                text: alt.text.to_string(),
                confidence: Some(f64::from(alt.confidence)),
            })
            .unwrap_or_default(),
    }
}

fn mean_word_confidence(confidences: impl Iterator<Item = f32>) -> Option<f64> {
    let mut sum = 0.0f64;
    let mut count = 0u32;
    for conf in confidences {
        sum += f64::from(conf);
        count += 1;
    }

    if count > 0 {
        Some(sum / f64::from(count))
    } else {
        None
    }
}
