//! Inbound frame decoding for the display socket.
//!
//! Every frame is a JSON object with a `type` discriminant. The payload may
//! sit under `payload`, under `status`, or be the message itself;
//! [`Frame::parse`] normalizes that into one canonical value before anything
//! is dispatched.

use serde::Deserialize;
use serde_json::{Map, Value};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("frame is not valid JSON: {0}")]
    Malformed(#[from] serde_json::Error),
    #[error("frame is not a JSON object")]
    NotAnObject,
    #[error("frame has no 'type' discriminant")]
    MissingType,
    #[error("invalid '{kind}' payload: {reason}")]
    InvalidPayload { kind: String, reason: String },
}

/// A decoded frame with its payload already normalized.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    pub kind: String,
    /// `payload`, else `status`, else the whole message.
    pub payload: Value,
    /// Whether the frame carried an explicit non-null `payload` member.
    pub has_payload: bool,
}

impl Frame {
    pub fn parse(text: &str) -> Result<Self, ProtocolError> {
        let value: Value = serde_json::from_str(text)?;
        let Value::Object(mut object) = value else {
            return Err(ProtocolError::NotAnObject);
        };

        let kind = match object.get("type") {
            Some(Value::String(kind)) if !kind.is_empty() => kind.clone(),
            _ => return Err(ProtocolError::MissingType),
        };

        let explicit = take_non_null(&mut object, "payload");
        let has_payload = explicit.is_some();
        let payload = match explicit.or_else(|| take_non_null(&mut object, "status")) {
            Some(value) => value,
            None => Value::Object(object),
        };

        Ok(Self {
            kind,
            payload,
            has_payload,
        })
    }
}

fn take_non_null(object: &mut Map<String, Value>, key: &str) -> Option<Value> {
    match object.remove(key) {
        Some(Value::Null) | None => None,
        Some(value) => Some(value),
    }
}

/// Agent readiness as reported by a `connection_status` frame.
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
pub struct AgentStatus {
    #[serde(default)]
    pub connection: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

impl AgentStatus {
    pub fn is_connected(&self) -> bool {
        self.connection.as_deref() == Some("connected")
    }

    pub fn is_disconnected(&self) -> bool {
        self.connection.as_deref() == Some("disconnected")
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CallUpdate {
    pub contact_name: String,
    pub status_summary: String,
    #[serde(default)]
    pub job_id: Option<Value>,
}

impl CallUpdate {
    pub fn job_label(&self) -> Option<String> {
        match &self.job_id {
            Some(Value::String(s)) => Some(s.clone()),
            Some(Value::Null) | None => None,
            Some(other) => Some(other.to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DisplayKind {
    Markdown,
    /// Any `graph_*` type; the full type string is kept for the renderer.
    Graph(String),
    Html,
}

impl DisplayKind {
    pub fn from_type(kind: &str) -> Option<Self> {
        match kind {
            "markdown" => Some(DisplayKind::Markdown),
            "html" => Some(DisplayKind::Html),
            k if k.starts_with("graph_") => Some(DisplayKind::Graph(k.to_string())),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Inbound {
    ConnectionStatus(AgentStatus),
    CallUpdate(CallUpdate),
    ThinkingStart,
    ThinkingDelta(String),
    ThinkingEnd,
    ThinkingError(Option<String>),
    Display {
        kind: DisplayKind,
        /// Only the explicit `payload` member counts for display kinds.
        payload: Option<Value>,
    },
    Unknown(String),
}

impl Inbound {
    /// Display kinds are gated on agent readiness; control kinds are not.
    #[cfg(test)]
    pub fn is_display(&self) -> bool {
        matches!(self, Inbound::Display { .. })
    }
}

/// Parse and classify a raw text frame.
pub fn decode(text: &str) -> Result<Inbound, ProtocolError> {
    classify(Frame::parse(text)?)
}

pub fn classify(frame: Frame) -> Result<Inbound, ProtocolError> {
    let Frame {
        kind,
        payload,
        has_payload,
    } = frame;

    let inbound = match kind.as_str() {
        "connection_status" => {
            let status = serde_json::from_value(payload).unwrap_or_default();
            Inbound::ConnectionStatus(status)
        }
        "new_call_update_available" => {
            let update = serde_json::from_value(payload).map_err(|e| ProtocolError::InvalidPayload {
                kind: kind.clone(),
                reason: e.to_string(),
            })?;
            Inbound::CallUpdate(update)
        }
        "thinking_start" => Inbound::ThinkingStart,
        "thinking_delta" => Inbound::ThinkingDelta(string_field(&payload, "content").unwrap_or_default()),
        "thinking_end" => Inbound::ThinkingEnd,
        "thinking_error" => Inbound::ThinkingError(string_field(&payload, "error")),
        other => match DisplayKind::from_type(other) {
            Some(display) => Inbound::Display {
                kind: display,
                payload: has_payload.then_some(payload),
            },
            None => Inbound::Unknown(kind),
        },
    };
    Ok(inbound)
}

fn string_field(payload: &Value, key: &str) -> Option<String> {
    payload
        .get(key)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_payload_preferred_over_status() {
        let frame = Frame::parse(r#"{"type":"x","payload":{"a":1},"status":{"b":2}}"#).unwrap();
        assert_eq!(frame.payload, json!({"a": 1}));
        assert!(frame.has_payload);
    }

    #[test]
    fn test_status_used_when_payload_absent() {
        let frame = Frame::parse(
            r#"{"type":"connection_status","status":{"connection":"connected"}}"#,
        )
        .unwrap();
        assert_eq!(frame.payload, json!({"connection": "connected"}));
        assert!(!frame.has_payload);
    }

    #[test]
    fn test_message_root_used_as_last_resort() {
        let frame = Frame::parse(
            r#"{"type":"new_call_update_available","contact_name":"Ana","status_summary":"Booked"}"#,
        )
        .unwrap();
        assert_eq!(frame.payload["contact_name"], "Ana");
        assert!(!frame.has_payload);
    }

    #[test]
    fn test_null_payload_falls_through() {
        let frame = Frame::parse(r#"{"type":"x","payload":null,"status":{"s":1}}"#).unwrap();
        assert_eq!(frame.payload, json!({"s": 1}));
        assert!(!frame.has_payload);
    }

    #[test]
    fn test_missing_type_rejected() {
        assert!(matches!(
            Frame::parse(r#"{"payload":{}}"#),
            Err(ProtocolError::MissingType)
        ));
        assert!(matches!(
            Frame::parse(r#"{"type":5}"#),
            Err(ProtocolError::MissingType)
        ));
    }

    #[test]
    fn test_malformed_and_non_object_rejected() {
        assert!(matches!(Frame::parse("{not json"), Err(ProtocolError::Malformed(_))));
        assert!(matches!(Frame::parse("[1,2]"), Err(ProtocolError::NotAnObject)));
    }

    #[test]
    fn test_connection_status_decoding() {
        let inbound = decode(
            r#"{"type":"connection_status","status":{"connection":"connected","message":"Agent up"}}"#,
        )
        .unwrap();
        match inbound {
            Inbound::ConnectionStatus(status) => {
                assert!(status.is_connected());
                assert_eq!(status.message.as_deref(), Some("Agent up"));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_connection_status_without_field_is_not_connected() {
        let inbound = decode(r#"{"type":"connection_status"}"#).unwrap();
        assert!(matches!(
            inbound,
            Inbound::ConnectionStatus(ref s) if !s.is_connected() && !s.is_disconnected()
        ));
    }

    #[test]
    fn test_call_update_with_numeric_job() {
        let inbound = decode(
            r#"{"type":"new_call_update_available","contact_name":"Ana","status_summary":"Booked","job_id":17}"#,
        )
        .unwrap();
        match inbound {
            Inbound::CallUpdate(update) => assert_eq!(update.job_label().as_deref(), Some("17")),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_call_update_missing_fields_is_invalid() {
        assert!(matches!(
            decode(r#"{"type":"new_call_update_available","contact_name":"Ana"}"#),
            Err(ProtocolError::InvalidPayload { .. })
        ));
    }

    #[test]
    fn test_thinking_kinds() {
        assert_eq!(decode(r#"{"type":"thinking_start"}"#).unwrap(), Inbound::ThinkingStart);
        assert_eq!(
            decode(r#"{"type":"thinking_delta","payload":{"content":"hi"}}"#).unwrap(),
            Inbound::ThinkingDelta("hi".to_string())
        );
        assert_eq!(
            decode(r#"{"type":"thinking_error","payload":{"error":"quota"}}"#).unwrap(),
            Inbound::ThinkingError(Some("quota".to_string()))
        );
        assert_eq!(decode(r#"{"type":"thinking_end"}"#).unwrap(), Inbound::ThinkingEnd);
    }

    #[test]
    fn test_display_kinds() {
        let inbound = decode(r#"{"type":"graph_pie","payload":{"labels":[]}}"#).unwrap();
        assert!(inbound.is_display());
        assert!(matches!(
            inbound,
            Inbound::Display { kind: DisplayKind::Graph(ref k), payload: Some(_) } if k == "graph_pie"
        ));
    }

    #[test]
    fn test_display_without_explicit_payload() {
        let inbound = decode(r#"{"type":"markdown","status":{"content":"x"}}"#).unwrap();
        assert!(matches!(inbound, Inbound::Display { payload: None, .. }));
    }

    #[test]
    fn test_unknown_kind() {
        assert_eq!(
            decode(r#"{"type":"heartbeat"}"#).unwrap(),
            Inbound::Unknown("heartbeat".to_string())
        );
    }
}
