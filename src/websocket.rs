//! # WebSocket Transcription Handler
//!
//! Streaming speech-to-text over a persistent connection at `/ws/transcribe`.
//!
//! ## Protocol:
//! 1. **Connection**: client connects and is accepted immediately
//! 2. **Handshake**: the first frame must be JSON:
//!    `{"sampleRate": 16000, "participantIdentity": "alice", "roomId": "r1"}`
//!    (all fields optional; `sampleRate` defaults to 16000, labels to `"unknown"`)
//! 3. **Audio streaming**: binary frames carry raw little-endian 16-bit PCM,
//!    mono, at the negotiated sample rate, in chunks of any size
//! 4. **Results**: the server pushes `partial` and `segment` JSON events in
//!    the order the triggering frames were processed
//! 5. **Stop**: `{"type":"stop"}` flushes the recognizer, emits a trailing
//!    `segment` if any text is pending, and closes the connection. Any other
//!    control JSON is silently ignored.
//!
//! Every termination path — stop, disconnect, protocol error, engine
//! failure — releases the session's recognizer exactly once. A failing
//! session receives at most one `error` event before the connection closes;
//! failures never escape the session.

use crate::error::{AppError, SessionError};
use crate::session::{dispatch, Dispatch, InboundFrame, OutboundEvent, SessionState, StreamingSession};
use crate::state::AppState;

use actix::prelude::*;
use actix_web::{web, HttpRequest, HttpResponse};
use actix_web_actors::ws;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// WebSocket actor for one transcription session.
///
/// Each connection is an independent actor owning its session state machine
/// and recognizer handle; sessions share nothing but the read-only engine.
pub struct TranscribeSocket {
    /// Server-side identifier, used only for logging
    session_id: Uuid,

    /// The session state machine (handshake, streaming, termination)
    session: StreamingSession,

    /// Shared application state for metrics
    app_state: AppState,
}

impl TranscribeSocket {
    pub fn new(app_state: AppState) -> Self {
        let config = app_state.get_config();
        let session = StreamingSession::new(app_state.engine(), config.audio.default_sample_rate);

        Self {
            session_id: Uuid::new_v4(),
            session,
            app_state,
        }
    }

    /// Serialize one event onto the wire, preserving production order.
    fn emit(&self, ctx: &mut ws::WebsocketContext<Self>, event: &OutboundEvent) {
        match serde_json::to_string(event) {
            Ok(json) => {
                ctx.text(json);
                match event {
                    OutboundEvent::Segment { .. } => self.app_state.record_segment(),
                    OutboundEvent::Partial { .. } => self.app_state.record_partial(),
                    OutboundEvent::Error { .. } => {}
                }
            }
            Err(err) => {
                warn!(session_id = %self.session_id, "Failed to serialize event: {}", err);
            }
        }
    }

    /// Orderly shutdown: flush the recognizer, emit the trailing segment
    /// best-effort, then close the connection. Used for stop requests,
    /// client disconnects, and the tail end of error handling alike —
    /// writes may be lost if the peer is already gone, which is fine.
    fn finish(&mut self, ctx: &mut ws::WebsocketContext<Self>, reason: Option<ws::CloseReason>) {
        if let Some(event) = self.session.terminate() {
            self.emit(ctx, &event);
        }
        self.session.close();
        ctx.close(reason);
        ctx.stop();
    }

    /// Session-level failure: one best-effort `error` event, then shutdown.
    fn fail(&mut self, ctx: &mut ws::WebsocketContext<Self>, err: SessionError) {
        warn!(
            session_id = %self.session_id,
            participant = %self.session.participant_identity(),
            room = %self.session.room_id(),
            "Session failed: {}",
            err
        );

        self.app_state.record_session_error();
        self.emit(ctx, &OutboundEvent::error(err.to_string()));
        self.finish(ctx, Some(ws::CloseCode::Error.into()));
    }
}

impl Actor for TranscribeSocket {
    type Context = ws::WebsocketContext<Self>;

    fn started(&mut self, _ctx: &mut Self::Context) {
        self.app_state.session_started();
        info!(session_id = %self.session_id, "Transcription session connected");
    }

    /// Runs on every exit path, including abnormal ones; the recognizer
    /// handle is released here if the frame handlers did not get to it.
    fn stopped(&mut self, _ctx: &mut Self::Context) {
        if self.session.state() != SessionState::Closed {
            // too late to write anything; drop the trailing segment
            self.session.terminate();
            self.session.close();
        }

        self.app_state.session_finished();
        info!(
            session_id = %self.session_id,
            participant = %self.session.participant_identity(),
            room = %self.session.room_id(),
            "Transcription session closed"
        );
    }
}

impl StreamHandler<Result<ws::Message, ws::ProtocolError>> for TranscribeSocket {
    fn handle(&mut self, msg: Result<ws::Message, ws::ProtocolError>, ctx: &mut Self::Context) {
        match msg {
            Ok(ws::Message::Text(text)) => match self.session.state() {
                SessionState::AwaitingInit => match self.session.handle_init(&text) {
                    Ok(()) => {
                        info!(
                            session_id = %self.session_id,
                            sample_rate = self.session.sample_rate(),
                            participant = %self.session.participant_identity(),
                            room = %self.session.room_id(),
                            "Initialization complete"
                        );
                    }
                    Err(err) => self.fail(ctx, err),
                },
                SessionState::Streaming => {
                    if dispatch(InboundFrame::Text(&text)) == Dispatch::StopRequested {
                        info!(
                            session_id = %self.session_id,
                            participant = %self.session.participant_identity(),
                            "Stop requested"
                        );
                        self.finish(ctx, Some(ws::CloseCode::Normal.into()));
                    }
                    // anything else is a malformed or unknown control frame;
                    // keep streaming
                }
                SessionState::Terminating | SessionState::Closed => {}
            },
            Ok(ws::Message::Binary(data)) => match self.session.state() {
                SessionState::Streaming => {
                    if let Dispatch::AudioChunk(chunk) = dispatch(InboundFrame::Binary(&data)) {
                        debug!(
                            session_id = %self.session_id,
                            bytes = chunk.len(),
                            participant = %self.session.participant_identity(),
                            room = %self.session.room_id(),
                            "Received audio chunk"
                        );

                        match self.session.handle_audio(chunk) {
                            Ok(Some(event)) => self.emit(ctx, &event),
                            Ok(None) => {}
                            Err(err) => self.fail(ctx, err),
                        }
                    }
                }
                SessionState::AwaitingInit => self.fail(
                    ctx,
                    SessionError::Handshake(
                        "expected a JSON initialization frame before audio".to_string(),
                    ),
                ),
                SessionState::Terminating | SessionState::Closed => {}
            },
            Ok(ws::Message::Ping(data)) => {
                ctx.pong(&data);
            }
            Ok(ws::Message::Pong(_)) => {}
            Ok(ws::Message::Close(reason)) => {
                info!(session_id = %self.session_id, "Client disconnected: {:?}", reason);
                if dispatch(InboundFrame::Disconnect) == Dispatch::Disconnected {
                    // best-effort: the trailing segment goes out only if the
                    // transport still accepts writes
                    self.finish(ctx, reason);
                }
            }
            Ok(ws::Message::Continuation(_)) => {
                warn!(session_id = %self.session_id, "Received unexpected continuation frame");
            }
            Ok(ws::Message::Nop) => {}
            Err(err) => {
                error!(session_id = %self.session_id, "WebSocket protocol error: {}", err);
                // transport is broken; release resources without writing
                self.session.terminate();
                self.session.close();
                ctx.stop();
            }
        }
    }
}

/// HTTP → WebSocket upgrade for `/ws/transcribe`.
pub async fn transcribe_websocket(
    req: HttpRequest,
    stream: web::Payload,
    app_state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    info!(
        "New transcription connection from {:?}",
        req.connection_info().peer_addr()
    );

    let socket = TranscribeSocket::new(app_state.get_ref().clone());
    ws::start(socket, &req, stream).map_err(|err| AppError::Internal(err.to_string()))
}
