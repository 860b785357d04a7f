//! Wire format of the realtime channel.
//!
//! The backend speaks bare strings: `ping` / `pong` for liveness and
//! `topic|json` for everything else. [`Frame`] gives those a discriminant
//! so the rest of the crate never splits strings by hand.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{ConsoleError, Result};

/// Liveness probe sent by the client.
pub const PING: &str = "ping";

/// Liveness reply sent by the server.
pub const PONG: &str = "pong";

/// Separator between topic and JSON payload.
pub const TOPIC_DELIMITER: char = '|';

/// Topic published when a verification video edit job has finished.
pub const VIDEO_EDIT_COMPLETED: &str = "edit-user-verification-video-completed";

/// A single text frame on the realtime channel.
#[derive(Debug, Clone, PartialEq)]
pub enum Frame {
    /// Client liveness probe
    Ping,
    /// Server liveness reply
    Pong,
    /// Topic-addressed event with a JSON body
    Event(RealtimeMessage),
}

/// A parsed `{topic, payload}` pair as delivered to subscribers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RealtimeMessage {
    /// Event topic (e.g. [`VIDEO_EDIT_COMPLETED`])
    pub topic: String,
    /// Decoded JSON body
    pub payload: Value,
}

impl RealtimeMessage {
    /// Create a message from a topic and payload.
    pub fn new(topic: impl Into<String>, payload: Value) -> Self {
        Self {
            topic: topic.into(),
            payload,
        }
    }

    /// Whether this message carries the given topic.
    pub fn is(&self, topic: &str) -> bool {
        self.topic == topic
    }
}

impl Frame {
    /// Decode an inbound text frame.
    ///
    /// The topic ends at the first delimiter; everything after it is JSON,
    /// so payloads may themselves contain the delimiter.
    pub fn decode(text: &str) -> Result<Self> {
        match text {
            PING => return Ok(Frame::Ping),
            PONG => return Ok(Frame::Pong),
            _ => {}
        }

        let (topic, body) = text
            .split_once(TOPIC_DELIMITER)
            .ok_or_else(|| ConsoleError::MalformedFrame(format!("missing delimiter: {text}")))?;

        if topic.is_empty() {
            return Err(ConsoleError::MalformedFrame(format!("empty topic: {text}")));
        }

        let payload = serde_json::from_str(body)
            .map_err(|e| ConsoleError::MalformedFrame(format!("bad payload for '{topic}': {e}")))?;

        Ok(Frame::Event(RealtimeMessage::new(topic, payload)))
    }

    /// Encode the frame into its wire string.
    pub fn encode(&self) -> Result<String> {
        Ok(match self {
            Frame::Ping => PING.to_string(),
            Frame::Pong => PONG.to_string(),
            Frame::Event(message) => format!(
                "{}{}{}",
                message.topic,
                TOPIC_DELIMITER,
                serde_json::to_string(&message.payload)?
            ),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_decode_liveness_tokens() {
        assert_eq!(Frame::decode("ping").unwrap(), Frame::Ping);
        assert_eq!(Frame::decode("pong").unwrap(), Frame::Pong);
    }

    #[test]
    fn test_decode_topic_event() {
        let frame = Frame::decode(r#"video-done|{"id":5}"#).unwrap();
        assert_eq!(
            frame,
            Frame::Event(RealtimeMessage::new("video-done", json!({ "id": 5 })))
        );
    }

    #[test]
    fn test_payload_may_contain_delimiter() {
        let frame = Frame::decode(r#"note|{"text":"a|b"}"#).unwrap();
        let Frame::Event(message) = frame else {
            panic!("expected event");
        };
        assert_eq!(message.payload["text"], "a|b");
    }

    #[test]
    fn test_decode_rejects_malformed_frames() {
        assert!(matches!(
            Frame::decode("no delimiter here"),
            Err(ConsoleError::MalformedFrame(_))
        ));
        assert!(matches!(
            Frame::decode("|{}"),
            Err(ConsoleError::MalformedFrame(_))
        ));
        assert!(matches!(
            Frame::decode("topic|{not json"),
            Err(ConsoleError::MalformedFrame(_))
        ));
        // "Pong" is not the liveness token
        assert!(Frame::decode("Pong").is_err());
    }

    #[test]
    fn test_encode_matches_wire_format() {
        assert_eq!(Frame::Ping.encode().unwrap(), "ping");
        let event = Frame::Event(RealtimeMessage::new(VIDEO_EDIT_COMPLETED, json!(null)));
        assert_eq!(
            event.encode().unwrap(),
            "edit-user-verification-video-completed|null"
        );
    }
}
