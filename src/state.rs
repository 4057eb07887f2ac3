//! # Application State Management
//!
//! Shared state handed to every HTTP handler and WebSocket actor:
//! the configuration, the process-wide recognition engine, and the runtime
//! counters reported by `/metrics`.
//!
//! The recognition model inside the engine is loaded once at startup and only
//! ever read, so it is shared as a plain `Arc` without a lock. Everything
//! mutable sits behind `Arc<RwLock<..>>`.

use crate::config::AppConfig;
use crate::recognizer::RecognizerEngine;
use std::sync::{Arc, RwLock};
use std::time::Instant;

/// State shared across all handlers and sessions.
#[derive(Clone)]
pub struct AppState {
    /// Application configuration
    config: Arc<RwLock<AppConfig>>,

    /// Process-wide recognition engine (read-only, shared by all sessions)
    engine: Arc<dyn RecognizerEngine>,

    /// Runtime counters, updated by middleware and session actors
    metrics: Arc<RwLock<AppMetrics>>,

    /// When the server started
    start_time: Instant,
}

/// Counters collected across the process lifetime.
#[derive(Debug, Default, Clone)]
pub struct AppMetrics {
    /// Total HTTP requests processed (including WebSocket upgrades)
    pub request_count: u64,

    /// Total HTTP requests that failed
    pub error_count: u64,

    /// Currently connected transcription sessions
    pub active_sessions: u32,

    /// Sessions accepted since startup
    pub total_sessions: u64,

    /// Final segments emitted across all sessions
    pub segments_emitted: u64,

    /// Partial hypotheses emitted across all sessions
    pub partials_emitted: u64,

    /// Sessions that ended because of a session-level error
    pub session_errors: u64,
}

impl AppState {
    pub fn new(config: AppConfig, engine: Arc<dyn RecognizerEngine>) -> Self {
        Self {
            config: Arc::new(RwLock::new(config)),
            engine,
            metrics: Arc::new(RwLock::new(AppMetrics::default())),
            start_time: Instant::now(),
        }
    }

    /// Get a copy of the current configuration.
    pub fn get_config(&self) -> AppConfig {
        self.config.read().unwrap().clone()
    }

    /// The shared recognition engine.
    pub fn engine(&self) -> Arc<dyn RecognizerEngine> {
        self.engine.clone()
    }

    pub fn increment_request_count(&self) {
        let mut metrics = self.metrics.write().unwrap();
        metrics.request_count += 1;
    }

    pub fn increment_error_count(&self) {
        let mut metrics = self.metrics.write().unwrap();
        metrics.error_count += 1;
    }

    /// Called when a WebSocket session is accepted.
    pub fn session_started(&self) {
        let mut metrics = self.metrics.write().unwrap();
        metrics.active_sessions += 1;
        metrics.total_sessions += 1;
    }

    /// Called when a WebSocket session ends, on every termination path.
    pub fn session_finished(&self) {
        let mut metrics = self.metrics.write().unwrap();
        if metrics.active_sessions > 0 {
            metrics.active_sessions -= 1;
        }
    }

    pub fn record_segment(&self) {
        let mut metrics = self.metrics.write().unwrap();
        metrics.segments_emitted += 1;
    }

    pub fn record_partial(&self) {
        let mut metrics = self.metrics.write().unwrap();
        metrics.partials_emitted += 1;
    }

    pub fn record_session_error(&self) {
        let mut metrics = self.metrics.write().unwrap();
        metrics.session_errors += 1;
    }

    /// Get a consistent snapshot of the counters.
    pub fn get_metrics_snapshot(&self) -> AppMetrics {
        self.metrics.read().unwrap().clone()
    }

    pub fn get_uptime_seconds(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recognizer::testing::ScriptedEngine;

    fn test_state() -> AppState {
        AppState::new(AppConfig::default(), Arc::new(ScriptedEngine::empty()))
    }

    #[test]
    fn test_session_counters() {
        let state = test_state();

        state.session_started();
        state.session_started();
        state.session_finished();

        let metrics = state.get_metrics_snapshot();
        assert_eq!(metrics.active_sessions, 1);
        assert_eq!(metrics.total_sessions, 2);
    }

    #[test]
    fn test_session_finished_does_not_underflow() {
        let state = test_state();
        state.session_finished();
        assert_eq!(state.get_metrics_snapshot().active_sessions, 0);
    }

    #[test]
    fn test_event_counters() {
        let state = test_state();
        state.record_segment();
        state.record_partial();
        state.record_partial();
        state.record_session_error();

        let metrics = state.get_metrics_snapshot();
        assert_eq!(metrics.segments_emitted, 1);
        assert_eq!(metrics.partials_emitted, 2);
        assert_eq!(metrics.session_errors, 1);
    }
}
