//! # Error Handling
//!
//! Two error surfaces live here:
//! - [`SessionError`]: failures inside one streaming session. These never
//!   escape the session — each one maps to a single best-effort `error`
//!   event on the wire and a transition to Terminating.
//! - [`AppError`]: failures on the plain HTTP surface, converted to JSON
//!   error responses via actix's `ResponseError`.
//!
//! Startup failures (bad config, missing model directory) use `anyhow` and
//! abort the process from `main`.

use actix_web::{HttpResponse, ResponseError};
use serde_json::json;
use std::fmt;

/// Failure inside one streaming session.
#[derive(Debug)]
pub enum SessionError {
    /// The initialization frame was missing, malformed, or not text
    Handshake(String),

    /// A frame arrived that the current state cannot accept
    Protocol(String),

    /// The recognition engine rejected a feed or flush call
    Recognizer(String),
}

impl fmt::Display for SessionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionError::Handshake(msg) => write!(f, "handshake error: {}", msg),
            SessionError::Protocol(msg) => write!(f, "protocol error: {}", msg),
            SessionError::Recognizer(msg) => write!(f, "recognizer error: {}", msg),
        }
    }
}

/// Errors returned from plain HTTP handlers.
#[derive(Debug)]
pub enum AppError {
    /// Server-side failures (500)
    Internal(String),

    /// Client sent invalid or malformed data (400)
    BadRequest(String),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Internal(msg) => write!(f, "Internal error: {}", msg),
            AppError::BadRequest(msg) => write!(f, "Bad request: {}", msg),
        }
    }
}

impl ResponseError for AppError {
    fn error_response(&self) -> HttpResponse {
        let (status, error_type, message) = match self {
            AppError::Internal(msg) => (
                actix_web::http::StatusCode::INTERNAL_SERVER_ERROR,
                "internal_error",
                msg.clone(),
            ),
            AppError::BadRequest(msg) => (
                actix_web::http::StatusCode::BAD_REQUEST,
                "bad_request",
                msg.clone(),
            ),
        };

        HttpResponse::build(status).json(json!({
            "error": {
                "type": error_type,
                "message": message,
                "timestamp": chrono::Utc::now().to_rfc3339()
            }
        }))
    }
}

/// Session errors that surface on the HTTP layer keep their category:
/// client-caused ones become 400s, engine failures become 500s.
impl From<SessionError> for AppError {
    fn from(err: SessionError) -> Self {
        match err {
            SessionError::Handshake(_) | SessionError::Protocol(_) => {
                AppError::BadRequest(err.to_string())
            }
            SessionError::Recognizer(_) => AppError::Internal(err.to_string()),
        }
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::Internal(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_error_display() {
        let err = SessionError::Handshake("expected JSON".to_string());
        assert_eq!(err.to_string(), "handshake error: expected JSON");

        let err = SessionError::Recognizer("feed rejected".to_string());
        assert_eq!(err.to_string(), "recognizer error: feed rejected");
    }

    #[test]
    fn test_session_error_http_mapping() {
        let err: AppError = SessionError::Handshake("bad init".to_string()).into();
        assert!(matches!(err, AppError::BadRequest(_)));

        let err: AppError = SessionError::Recognizer("engine died".to_string()).into();
        assert!(matches!(err, AppError::Internal(_)));
    }
}
