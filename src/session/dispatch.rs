//! Inbound frame classification.
//!
//! Every frame the transport hands us falls into exactly one category, in
//! this priority order: disconnect, control text, binary audio. Malformed
//! control JSON and unrecognized control types are silently discarded — no
//! frame is fatal by itself.

use serde_json::Value;

/// One frame as received from the transport, consumed once.
#[derive(Debug)]
pub enum InboundFrame<'a> {
    Text(&'a str),
    Binary(&'a [u8]),
    Disconnect,
}

/// Classification of one inbound frame.
#[derive(Debug, PartialEq)]
pub enum Dispatch<'a> {
    /// Client asked for an orderly stop (`{"type":"stop"}`)
    StopRequested,

    /// Raw PCM audio to feed the recognizer
    AudioChunk(&'a [u8]),

    /// Transport reported the peer is gone
    Disconnected,

    /// Malformed or unrecognized frame; keep streaming
    Ignore,
}

/// Classify one inbound frame.
pub fn dispatch(frame: InboundFrame<'_>) -> Dispatch<'_> {
    match frame {
        InboundFrame::Disconnect => Dispatch::Disconnected,
        InboundFrame::Text(text) => match serde_json::from_str::<Value>(text) {
            Ok(payload) if payload.get("type").and_then(Value::as_str) == Some("stop") => {
                Dispatch::StopRequested
            }
            _ => Dispatch::Ignore,
        },
        InboundFrame::Binary(bytes) => Dispatch::AudioChunk(bytes),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stop_frame() {
        assert_eq!(
            dispatch(InboundFrame::Text(r#"{"type":"stop"}"#)),
            Dispatch::StopRequested
        );
    }

    #[test]
    fn test_stop_frame_with_extra_fields() {
        assert_eq!(
            dispatch(InboundFrame::Text(r#"{"type":"stop","reason":"done"}"#)),
            Dispatch::StopRequested
        );
    }

    #[test]
    fn test_unknown_control_type_is_ignored() {
        assert_eq!(
            dispatch(InboundFrame::Text(r#"{"type":"pause"}"#)),
            Dispatch::Ignore
        );
    }

    #[test]
    fn test_malformed_json_is_ignored() {
        assert_eq!(dispatch(InboundFrame::Text("{not json")), Dispatch::Ignore);
    }

    #[test]
    fn test_json_without_type_is_ignored() {
        assert_eq!(
            dispatch(InboundFrame::Text(r#"{"sampleRate":16000}"#)),
            Dispatch::Ignore
        );
    }

    #[test]
    fn test_non_object_json_is_ignored() {
        assert_eq!(dispatch(InboundFrame::Text("42")), Dispatch::Ignore);
    }

    #[test]
    fn test_binary_frame_is_audio() {
        let bytes = [0u8, 1, 2, 3];
        assert_eq!(
            dispatch(InboundFrame::Binary(&bytes)),
            Dispatch::AudioChunk(&bytes[..])
        );
    }

    #[test]
    fn test_empty_binary_frame_is_audio() {
        assert_eq!(
            dispatch(InboundFrame::Binary(&[])),
            Dispatch::AudioChunk(&[][..])
        );
    }

    #[test]
    fn test_disconnect() {
        assert_eq!(dispatch(InboundFrame::Disconnect), Dispatch::Disconnected);
    }
}
