//! The inter-agent message record and its typed payloads.
//!
//! On the wire a message is a JSON object with exactly seven required keys
//! (`type`, `source`, `target`, `timestamp`, `payload`, `status`, `context`)
//! plus an optional `id` assigned by the bus at publish time.
//!
//! Presence of the keys is not enough: a record with `"payload": null` or a
//! non-object `context` is rejected on purpose, even though both keys exist.

use chrono::{SecondsFormat, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::MessageError;
use crate::ids::MessageId;
use crate::structs::{Inventory, Position, Requirements};

/// Target that every agent accepts.
pub const BROADCAST_TARGET: &str = "all";

/// Status carried by messages unless the sender says otherwise.
pub const STATUS_SUCCESS: &str = "SUCCESS";

/// Keys a raw wire record must carry.
pub const REQUIRED_FIELDS: [&str; 7] = [
    "type",
    "source",
    "target",
    "timestamp",
    "payload",
    "status",
    "context",
];

/// Message kinds exchanged between agents.
pub mod kinds {
    /// Explorer to builder: a flat zone was found.
    pub const MAP: &str = "map.v1";
    /// Builder to miner: materials still needed.
    pub const MATERIALS_REQUIREMENTS: &str = "materials.requirements.v1";
    /// Miner to builder: mining progress or final delivery.
    pub const INVENTORY: &str = "inventory.v1";
    /// Builder progress update after each placed block.
    pub const BUILD_PROGRESS: &str = "build.progress.v1";
    /// Builder finished its plan.
    pub const BUILD_COMPLETE: &str = "build.complete.v1";
    /// Orchestrator asks every agent to clear its session.
    pub const WORKFLOW_RESET: &str = "workflow.reset";
}

/// A message published on the bus. Never mutated after publish.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// Dotted, versioned kind such as `inventory.v1`.
    #[serde(rename = "type")]
    pub kind: String,
    /// Name of the sending agent.
    pub source: String,
    /// Name of the receiving agent, or [`BROADCAST_TARGET`].
    pub target: String,
    /// ISO-8601 UTC timestamp.
    pub timestamp: String,
    /// Kind-specific data.
    pub payload: Value,
    /// Outcome marker, `SUCCESS` by default.
    pub status: String,
    /// Free-form metadata (typically the sender's state).
    pub context: Value,
    /// Tracing id assigned at publish time.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<MessageId>,
}

impl Message {
    /// Create a message stamped now, with `SUCCESS` status and an empty
    /// context.
    pub fn new(
        kind: impl Into<String>,
        source: impl Into<String>,
        target: impl Into<String>,
        payload: Value,
    ) -> Self {
        Self {
            kind: kind.into(),
            source: source.into(),
            target: target.into(),
            timestamp: now_timestamp(),
            payload,
            status: STATUS_SUCCESS.to_owned(),
            context: Value::Object(serde_json::Map::new()),
            id: None,
        }
    }

    /// Create a message whose payload is the serialized form of `payload`.
    pub fn with_payload<T: Serialize>(
        kind: impl Into<String>,
        source: impl Into<String>,
        target: impl Into<String>,
        payload: &T,
    ) -> Result<Self, MessageError> {
        let value = serde_json::to_value(payload)?;
        Ok(Self::new(kind, source, target, value))
    }

    /// Replace the status.
    #[must_use]
    pub fn status(mut self, status: impl Into<String>) -> Self {
        self.status = status.into();
        self
    }

    /// Replace the context.
    #[must_use]
    pub fn context(mut self, context: Value) -> Self {
        self.context = context;
        self
    }

    /// Whether an agent called `name` should handle this message.
    pub fn is_addressed_to(&self, name: &str) -> bool {
        self.target == name || self.target == BROADCAST_TARGET
    }

    /// Whether this message is of the given kind.
    pub fn is_kind(&self, kind: &str) -> bool {
        self.kind == kind
    }

    /// Decode the payload into a typed struct.
    pub fn decode_payload<T: DeserializeOwned>(&self) -> Result<T, MessageError> {
        serde_json::from_value(self.payload.clone()).map_err(|source| MessageError::Payload {
            kind: self.kind.clone(),
            source,
        })
    }

    /// Check that every required field carries a usable value.
    ///
    /// Stricter than key presence: blank strings, a null payload and a
    /// non-object context are all rejected.
    pub fn validate(&self) -> Result<(), MessageError> {
        for (field, value) in [
            ("type", &self.kind),
            ("source", &self.source),
            ("target", &self.target),
            ("timestamp", &self.timestamp),
            ("status", &self.status),
        ] {
            if value.trim().is_empty() {
                return Err(MessageError::EmptyField(field));
            }
        }
        if self.payload.is_null() {
            return Err(MessageError::NullPayload);
        }
        if !self.context.is_object() {
            return Err(MessageError::ContextNotObject);
        }
        Ok(())
    }

    /// Check that a raw wire record carries all seven required keys.
    pub fn validate_value(value: &Value) -> Result<(), MessageError> {
        let object = value.as_object().ok_or(MessageError::NotAnObject)?;
        for field in REQUIRED_FIELDS {
            if !object.contains_key(field) {
                return Err(MessageError::MissingField(field));
            }
        }
        Ok(())
    }

    /// Validate and decode a raw wire record.
    pub fn from_value(value: Value) -> Result<Self, MessageError> {
        Self::validate_value(&value)?;
        let message: Self = serde_json::from_value(value)?;
        message.validate()?;
        Ok(message)
    }

    /// Encode as a JSON string.
    pub fn to_json(&self) -> Result<String, MessageError> {
        Ok(serde_json::to_string(self)?)
    }

    /// Decode and validate a JSON string.
    pub fn from_json(text: &str) -> Result<Self, MessageError> {
        let value: Value = serde_json::from_str(text)?;
        Self::from_value(value)
    }
}

/// Current UTC time formatted the way messages carry it.
pub fn now_timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true)
}

// ---------------------------------------------------------------------------
// Typed payloads
// ---------------------------------------------------------------------------

/// Payload of `map.v1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MapPayload {
    /// Surface position at the centre of the flat zone.
    pub zone: Position,
}

/// Payload of `materials.requirements.v1`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequirementsPayload {
    /// Quantities still needed.
    pub needs: Requirements,
    /// Zone the materials are for, when known.
    #[serde(default)]
    pub zone: Option<Position>,
}

/// Payload of `inventory.v1`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryPayload {
    /// Quantities held (progress) or handed over (delivery).
    pub inventory: Inventory,
    /// `true` only for the final hand-over once requirements are met.
    #[serde(default)]
    pub delivered: bool,
}

/// Payload of `build.progress.v1`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildProgressPayload {
    /// Name of the plan being built.
    pub plan: String,
    /// Blocks placed so far.
    pub placed: usize,
    /// Blocks in the plan.
    pub total: usize,
}

/// Payload of `build.complete.v1`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildCompletePayload {
    /// Name of the plan that was built.
    pub plan: String,
    /// Zone the plan was built on.
    pub zone: Position,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::enums::Material;

    fn wire() -> Value {
        json!({
            "type": "inventory.v1",
            "source": "MinerBot",
            "target": "BuilderBot",
            "timestamp": "2025-01-01T00:00:00.000000Z",
            "payload": {"inventory": {"dirt": 2}},
            "status": "SUCCESS",
            "context": {}
        })
    }

    #[test]
    fn new_message_has_defaults() {
        let msg = Message::new(kinds::MAP, "ExplorerBot", "BuilderBot", json!({}));
        assert_eq!(msg.status, STATUS_SUCCESS);
        assert!(msg.context.is_object());
        assert!(msg.timestamp.ends_with('Z'));
        assert!(msg.id.is_none());
        assert!(msg.validate().is_ok());
    }

    #[test]
    fn wire_record_round_trips() {
        let msg = Message::from_value(wire()).unwrap();
        assert_eq!(msg.kind, "inventory.v1");
        let text = msg.to_json().unwrap();
        assert!(text.contains("\"type\":\"inventory.v1\""));
        assert!(!text.contains("\"id\""));
        assert_eq!(Message::from_json(&text).unwrap(), msg);
    }

    #[test]
    fn every_missing_field_is_rejected() {
        for field in REQUIRED_FIELDS {
            let mut value = wire();
            value.as_object_mut().unwrap().remove(field);
            let err = Message::from_value(value).unwrap_err();
            assert!(matches!(err, MessageError::MissingField(f) if f == field));
        }
    }

    #[test]
    fn non_object_is_rejected() {
        assert!(matches!(
            Message::validate_value(&json!([1, 2])),
            Err(MessageError::NotAnObject)
        ));
    }

    #[test]
    fn empty_source_is_invalid() {
        let msg = Message::new(kinds::MAP, "", "BuilderBot", json!({}));
        assert!(matches!(msg.validate(), Err(MessageError::EmptyField("source"))));
    }

    #[test]
    fn context_must_be_object() {
        let msg = Message::new(kinds::MAP, "a", "b", json!({})).context(json!(3));
        assert!(matches!(msg.validate(), Err(MessageError::ContextNotObject)));
    }

    #[test]
    fn present_but_null_payload_is_rejected() {
        let mut value = wire();
        value["payload"] = Value::Null;
        assert!(Message::validate_value(&value).is_ok());
        assert!(matches!(Message::from_value(value), Err(MessageError::NullPayload)));

        let mut value = wire();
        value["context"] = json!("RUNNING");
        assert!(matches!(Message::from_value(value), Err(MessageError::ContextNotObject)));
    }

    #[test]
    fn addressing_honours_broadcast() {
        let direct = Message::new(kinds::MAP, "a", "BuilderBot", json!({}));
        let broadcast = Message::new(kinds::WORKFLOW_RESET, "a", BROADCAST_TARGET, json!({}));
        assert!(direct.is_addressed_to("BuilderBot"));
        assert!(!direct.is_addressed_to("MinerBot"));
        assert!(broadcast.is_addressed_to("MinerBot"));
    }

    #[test]
    fn typed_payload_decodes() {
        let msg = Message::from_value(wire()).unwrap();
        let payload: InventoryPayload = msg.decode_payload().unwrap();
        assert_eq!(payload.inventory.get(&Material::Dirt), Some(&2));
        assert!(!payload.delivered);
    }

    #[test]
    fn bad_payload_reports_kind() {
        let msg = Message::new(kinds::MAP, "a", "b", json!({"zone": "nowhere"}));
        let err = msg.decode_payload::<MapPayload>().unwrap_err();
        assert!(matches!(err, MessageError::Payload { ref kind, .. } if kind == "map.v1"));
    }
}
