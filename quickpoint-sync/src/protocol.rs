//! Cross-window sync protocol.
//!
//! Wire format (JSON object, one per broadcast):
//! ```text
//! { "type": "SLIDE_CHANGED", "index": 2, "step": -1 }
//! { "type": "CMD_NEXT" }
//! { "type": "CMD_PREV" }
//! { "type": "REQUEST_STATE" }
//! ```
//!
//! `index` and `step` are 0-based; `step = -1` means no step revealed.
//! Messages carry no sequence number or timestamp; ordering is whatever
//! the broadcast medium delivers. Unknown `type` values are ignored, not
//! rejected, so older and newer viewers can share a channel.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use quickpoint_core::Position;

/// Role a viewer plays on the channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Role {
    /// Holds slide content and the authoritative Position.
    Primary,
    /// Mirrors Position via messages; sends commands instead of navigating.
    Satellite,
}

/// Identity of one viewer instance on a channel.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InstanceInfo {
    pub instance_id: Uuid,
    pub label: String,
    pub role: Role,
}

impl InstanceInfo {
    pub fn new(label: impl Into<String>, role: Role) -> Self {
        Self::with_id(Uuid::new_v4(), label, role)
    }

    /// Create with explicit instance_id (for testing)
    pub fn with_id(instance_id: Uuid, label: impl Into<String>, role: Role) -> Self {
        Self {
            instance_id,
            label: label.into(),
            role,
        }
    }
}

fn no_step() -> i64 {
    -1
}

/// Top-level protocol message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum SyncMessage {
    /// A viewer's Position changed (or is being reported on request).
    #[serde(rename = "SLIDE_CHANGED")]
    SlideChanged {
        index: i64,
        /// Missing in messages from viewers that predate steps.
        #[serde(default = "no_step")]
        step: i64,
    },
    /// Satellite asks the primary to advance.
    #[serde(rename = "CMD_NEXT")]
    CommandNext,
    /// Satellite asks the primary to retreat.
    #[serde(rename = "CMD_PREV")]
    CommandPrev,
    /// Newly opened satellite asks for the current Position.
    #[serde(rename = "REQUEST_STATE")]
    RequestState,
}

const KNOWN_TYPES: [&str; 4] = ["SLIDE_CHANGED", "CMD_NEXT", "CMD_PREV", "REQUEST_STATE"];

impl SyncMessage {
    /// Announce a Position.
    pub fn slide_changed(position: Position) -> Self {
        SyncMessage::SlideChanged {
            index: position.slide as i64,
            step: position.step_signed(),
        }
    }

    /// Wire `type` tag.
    pub fn type_name(&self) -> &'static str {
        match self {
            SyncMessage::SlideChanged { .. } => "SLIDE_CHANGED",
            SyncMessage::CommandNext => "CMD_NEXT",
            SyncMessage::CommandPrev => "CMD_PREV",
            SyncMessage::RequestState => "REQUEST_STATE",
        }
    }

    /// Serialize to the JSON wire format.
    pub fn encode(&self) -> Result<String, ProtocolError> {
        serde_json::to_string(self).map_err(|e| ProtocolError::SerializationError(e.to_string()))
    }

    /// Deserialize from the JSON wire format.
    ///
    /// Returns `Ok(None)` for a well-formed message of an unknown type.
    pub fn decode(text: &str) -> Result<Option<Self>, ProtocolError> {
        let value: Value = serde_json::from_str(text)
            .map_err(|e| ProtocolError::DeserializationError(e.to_string()))?;
        Self::from_value(value)
    }

    /// Interpret an already-parsed JSON value (e.g. a posted JS object).
    pub fn from_value(value: Value) -> Result<Option<Self>, ProtocolError> {
        match value.get("type").and_then(Value::as_str) {
            Some(kind) if KNOWN_TYPES.contains(&kind) => {}
            Some(kind) => {
                log::debug!("protocol: ignoring unknown message type {kind:?}");
                return Ok(None);
            }
            None => {
                return Err(ProtocolError::DeserializationError(
                    "message has no string `type` field".to_string(),
                ))
            }
        }
        serde_json::from_value(value)
            .map(Some)
            .map_err(|e| ProtocolError::DeserializationError(e.to_string()))
    }
}

/// Protocol errors.
#[derive(Debug, Clone, PartialEq)]
pub enum ProtocolError {
    SerializationError(String),
    DeserializationError(String),
    ChannelClosed,
}

impl std::fmt::Display for ProtocolError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::SerializationError(e) => write!(f, "Serialization error: {e}"),
            Self::DeserializationError(e) => write!(f, "Deserialization error: {e}"),
            Self::ChannelClosed => write!(f, "Channel closed"),
        }
    }
}

impl std::error::Error for ProtocolError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slide_changed_wire_shape() {
        let msg = SyncMessage::slide_changed(Position::new(2, Some(1)));
        let value: Value = serde_json::from_str(&msg.encode().unwrap()).unwrap();
        assert_eq!(value, serde_json::json!({ "type": "SLIDE_CHANGED", "index": 2, "step": 1 }));
    }

    #[test]
    fn test_no_step_encodes_minus_one() {
        let msg = SyncMessage::slide_changed(Position::slide(0));
        assert_eq!(msg, SyncMessage::SlideChanged { index: 0, step: -1 });
    }

    #[test]
    fn test_command_wire_shapes() {
        assert_eq!(SyncMessage::CommandNext.encode().unwrap(), r#"{"type":"CMD_NEXT"}"#);
        assert_eq!(SyncMessage::CommandPrev.encode().unwrap(), r#"{"type":"CMD_PREV"}"#);
        assert_eq!(SyncMessage::RequestState.encode().unwrap(), r#"{"type":"REQUEST_STATE"}"#);
    }

    #[test]
    fn test_decode_commands() {
        assert_eq!(
            SyncMessage::decode(r#"{"type":"CMD_NEXT"}"#).unwrap(),
            Some(SyncMessage::CommandNext)
        );
        assert_eq!(
            SyncMessage::decode(r#"{"type":"REQUEST_STATE","extra":true}"#).unwrap(),
            Some(SyncMessage::RequestState)
        );
    }

    #[test]
    fn test_decode_slide_changed_without_step() {
        assert_eq!(
            SyncMessage::decode(r#"{"type":"SLIDE_CHANGED","index":4}"#).unwrap(),
            Some(SyncMessage::SlideChanged { index: 4, step: -1 })
        );
    }

    #[test]
    fn test_unknown_type_is_ignored() {
        assert_eq!(SyncMessage::decode(r#"{"type":"CURSOR_MOVED","x":1}"#).unwrap(), None);
    }

    #[test]
    fn test_decode_invalid_input() {
        assert!(SyncMessage::decode("not json").is_err());
        assert!(SyncMessage::decode(r#"{"index":1}"#).is_err());
        assert!(SyncMessage::decode(r#"{"type":"SLIDE_CHANGED","index":"two"}"#).is_err());
    }

    #[test]
    fn test_type_names_match_wire() {
        for msg in [
            SyncMessage::SlideChanged { index: 0, step: -1 },
            SyncMessage::CommandNext,
            SyncMessage::CommandPrev,
            SyncMessage::RequestState,
        ] {
            let value: Value = serde_json::from_str(&msg.encode().unwrap()).unwrap();
            assert_eq!(value["type"], msg.type_name());
        }
    }

    #[test]
    fn test_instance_info_with_id() {
        let id = Uuid::parse_str("550e8400-e29b-41d4-a716-446655440000").unwrap();
        let info = InstanceInfo::with_id(id, "presenter", Role::Satellite);
        assert_eq!(info.instance_id, id);
        assert_eq!(info.role, Role::Satellite);
    }
}
