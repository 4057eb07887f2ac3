//! # Streaming Session Protocol
//!
//! The per-connection core of the service: classify inbound frames, run the
//! session state machine against the recognition engine, and produce outbound
//! events in processing order. Everything here is transport-agnostic; the
//! WebSocket actor in `crate::websocket` owns the wiring.

pub mod dispatch;
pub mod events;
pub mod machine;

pub use dispatch::{dispatch, Dispatch, InboundFrame};
pub use events::OutboundEvent;
pub use machine::{SessionState, StreamingSession};
