//! Outbound event schema.
//!
//! One JSON object per event, emitted in the order produced. The field set
//! per variant is fixed:
//!
//! ```json
//! { "type": "segment", "text": "...", "confidence": 0.87, "participantIdentity": "...", "roomId": "..." }
//! { "type": "partial", "text": "...", "participantIdentity": "...", "roomId": "..." }
//! { "type": "error", "message": "..." }
//! ```
//!
//! `confidence` is engine-defined and serialized as `null` when the engine
//! did not score the segment.

use serde::Serialize;

/// Event sent from server to client over the WebSocket.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum OutboundEvent {
    /// Committed transcription for a completed utterance
    Segment {
        text: String,
        confidence: Option<f64>,
        #[serde(rename = "participantIdentity")]
        participant_identity: String,
        #[serde(rename = "roomId")]
        room_id: String,
    },

    /// Provisional transcription of in-progress speech
    Partial {
        text: String,
        #[serde(rename = "participantIdentity")]
        participant_identity: String,
        #[serde(rename = "roomId")]
        room_id: String,
    },

    /// Session-level failure; at most one per session, then the connection closes
    Error { message: String },
}

impl OutboundEvent {
    pub fn segment(
        text: impl Into<String>,
        confidence: Option<f64>,
        participant_identity: impl Into<String>,
        room_id: impl Into<String>,
    ) -> Self {
        OutboundEvent::Segment {
            text: text.into(),
            confidence,
            participant_identity: participant_identity.into(),
            room_id: room_id.into(),
        }
    }

    pub fn partial(
        text: impl Into<String>,
        participant_identity: impl Into<String>,
        room_id: impl Into<String>,
    ) -> Self {
        OutboundEvent::Partial {
            text: text.into(),
            participant_identity: participant_identity.into(),
            room_id: room_id.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        OutboundEvent::Error {
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_segment_wire_format() {
        let event = OutboundEvent::segment("hello world", Some(0.87), "alice", "r1");
        let json = serde_json::to_string(&event).unwrap();
        assert_eq!(
            json,
            r#"{"type":"segment","text":"hello world","confidence":0.87,"participantIdentity":"alice","roomId":"r1"}"#
        );
    }

    #[test]
    fn test_segment_without_confidence_serializes_null() {
        let event = OutboundEvent::segment("done", None, "unknown", "unknown");
        let json = serde_json::to_string(&event).unwrap();
        assert_eq!(
            json,
            r#"{"type":"segment","text":"done","confidence":null,"participantIdentity":"unknown","roomId":"unknown"}"#
        );
    }

    #[test]
    fn test_partial_wire_format() {
        let event = OutboundEvent::partial("hel", "alice", "r1");
        let json = serde_json::to_string(&event).unwrap();
        assert_eq!(
            json,
            r#"{"type":"partial","text":"hel","participantIdentity":"alice","roomId":"r1"}"#
        );
    }

    #[test]
    fn test_error_wire_format() {
        let event = OutboundEvent::error("recognizer error: feed rejected");
        let json = serde_json::to_string(&event).unwrap();
        assert_eq!(
            json,
            r#"{"type":"error","message":"recognizer error: feed rejected"}"#
        );
    }
}
