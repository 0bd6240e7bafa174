//! Bridge response envelopes and raw device records.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::endpoint::CommandKind;
use crate::errors::Error;

type Result<T> = std::result::Result<T, Error>;

/// Error code the bridge returns while the link button has not been pressed.
pub const LINK_BUTTON_NOT_PRESSED: u16 = 101;

/// Error code for an unknown or revoked token.
pub const UNAUTHORIZED_USER: u16 = 1;

/// Error object reported by the bridge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BridgeError {
    #[serde(rename = "type")]
    pub code: u16,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub description: String,
}

impl BridgeError {
    /// Whether this is the "link button not pressed" error.
    pub fn is_link_button_pending(&self) -> bool {
        self.code == LINK_BUTTON_NOT_PRESSED
    }
}

impl fmt::Display for BridgeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "error {}", self.code)?;
        if !self.address.is_empty() {
            write!(f, " at {}", self.address)?;
        }
        if !self.description.is_empty() {
            write!(f, ": {}", self.description)?;
        }
        Ok(())
    }
}

/// One entry of the `[{"success": ...}, {"error": ...}]` arrays the bridge
/// returns for writes, pairing, and failed reads.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseEntry {
    Success(Value),
    Error(BridgeError),
}

/// Parse a response body as a list of entries.
///
/// Returns `None` when the body is not entry-shaped (e.g. a resource read).
pub(crate) fn entries(body: &Value) -> Option<Vec<ResponseEntry>> {
    let items = body.as_array()?;
    items
        .iter()
        .map(|item| serde_json::from_value(item.clone()).ok())
        .collect()
}

/// First error entry of an entry-shaped body, if any.
pub(crate) fn first_error(body: &Value) -> Option<BridgeError> {
    entries(body)?.into_iter().find_map(|entry| match entry {
        ResponseEntry::Error(e) => Some(e),
        ResponseEntry::Success(_) => None,
    })
}

/// Fail with [`Error::Device`] if the body carries an error entry.
pub(crate) fn check(kind: CommandKind, body: Value) -> Result<Value> {
    match first_error(&body) {
        Some(error) => Err(Error::device(kind, error)),
        None => Ok(body),
    }
}

/// Untyped attributes of one bridge resource (a light, a scene).
///
/// Collections arrive keyed by id with the id missing from the body, so the
/// client attaches it here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawDeviceRecord {
    id: String,
    attributes: Map<String, Value>,
}

impl RawDeviceRecord {
    /// Create a record from its id and attribute map.
    pub fn new(id: impl Into<String>, attributes: Map<String, Value>) -> Self {
        RawDeviceRecord {
            id: id.into(),
            attributes,
        }
    }

    pub(crate) fn from_value(kind: CommandKind, id: &str, value: Value) -> Result<Self> {
        match value {
            Value::Object(attributes) => Ok(RawDeviceRecord::new(id, attributes)),
            other => Err(Error::unexpected(
                kind,
                format!("record {id} is not an object: {other}"),
            )),
        }
    }

    /// Identifier the bridge keys this resource by.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// The `name` attribute, if it is a string.
    pub fn name(&self) -> Option<&str> {
        self.get("name").and_then(Value::as_str)
    }

    /// Look up a single attribute.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.attributes.get(key)
    }

    /// All attributes as returned by the bridge.
    pub fn attributes(&self) -> &Map<String, Value> {
        &self.attributes
    }

    /// Consume the record, keeping only its attributes.
    pub fn into_attributes(self) -> Map<String, Value> {
        self.attributes
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_entries() {
        let body = json!([
            {"success": {"/lights/1/state/on": true}},
            {"error": {"type": 201, "address": "/lights/1/state/hue", "description": "device is off"}}
        ]);
        let parsed = entries(&body).unwrap();
        assert_eq!(parsed.len(), 2);
        assert!(matches!(parsed[0], ResponseEntry::Success(_)));

        let error = first_error(&body).unwrap();
        assert_eq!(error.code, 201);
        assert_eq!(
            error.to_string(),
            "error 201 at /lights/1/state/hue: device is off"
        );
    }

    #[test]
    fn test_resource_bodies_are_not_entries() {
        assert!(entries(&json!({"1": {"name": "Lamp"}})).is_none());
        assert!(first_error(&json!([{"internalipaddress": "10.0.0.2"}])).is_none());
    }

    #[test]
    fn test_check_maps_errors_to_device() {
        let body = json!([{"error": {"type": 1, "address": "/", "description": "unauthorized user"}}]);
        let err = check(CommandKind::Lights, body).unwrap_err();
        assert_eq!(err.device_code(), Some(UNAUTHORIZED_USER));

        let ok = json!([{"success": {"/lights/2/state/on": false}}]);
        assert_eq!(check(CommandKind::LightState, ok.clone()).unwrap(), ok);
    }

    #[test]
    fn test_record_requires_object() {
        let err = RawDeviceRecord::from_value(CommandKind::Light, "4", json!(7)).unwrap_err();
        assert!(matches!(err, Error::UnexpectedResponse { .. }));

        let record =
            RawDeviceRecord::from_value(CommandKind::Light, "4", json!({"name": "Desk"})).unwrap();
        assert_eq!(record.id(), "4");
        assert_eq!(record.name(), Some("Desk"));
    }
}
