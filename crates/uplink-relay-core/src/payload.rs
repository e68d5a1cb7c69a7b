//! # Payload Types
//!
//! Inbound uplinks are kept as loosely-typed JSON: the network server owns the
//! shape and the relay only ever reads a handful of fields. Every lookup is a
//! checked accessor returning `Option`.
//!
//! Transformed payloads are either the inbound value untouched or a
//! [`MappedUplink`], the narrowed record sent to mapping targets.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

#[cfg(test)]
#[path = "payload_tests.rs"]
mod tests;

/// Device uplink as received from the network server
#[derive(Debug, Clone, PartialEq)]
pub struct InboundPayload(Value);

impl InboundPayload {
    /// Wrap an already parsed JSON value
    pub fn new(value: Value) -> Self {
        Self(value)
    }

    /// Parse a payload from a raw request body
    pub fn from_slice(body: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(body).map(Self)
    }

    /// Look up a top-level field
    ///
    /// Returns `None` when the payload is not a JSON object or the field is
    /// absent. A field explicitly set to `null` is returned as `Some(Null)`.
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.0.as_object().and_then(|fields| fields.get(field))
    }

    /// The nested `object` record holding decoded sensor values
    ///
    /// Returns `None` unless `object` is present and is itself a JSON object.
    pub fn object(&self) -> Option<&Map<String, Value>> {
        self.get("object").and_then(Value::as_object)
    }

    /// Look up a field inside the nested `object` record
    ///
    /// JSON `null` is treated as absent.
    pub fn object_field(&self, field: &str) -> Option<&Value> {
        self.object()
            .and_then(|object| object.get(field))
            .filter(|value| !value.is_null())
    }

    pub fn as_value(&self) -> &Value {
        &self.0
    }

    pub fn into_value(self) -> Value {
        self.0
    }
}

impl From<Value> for InboundPayload {
    fn from(value: Value) -> Self {
        Self(value)
    }
}

/// Location record carried in the `object` field of a [`MappedUplink`]
///
/// `accuracy` and `altitude` are always present (rounded or defaulted).
/// `latitude` and `longitude` are copied verbatim and left out when the
/// uplink did not carry them, so schema validation catches the gap.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UplinkLocation {
    pub accuracy: Value,
    pub altitude: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latitude: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub longitude: Option<Value>,
}

/// Narrowed uplink sent to mapping targets
///
/// Only the whitelisted top-level fields survive; absent fields stay absent
/// in the serialized output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MappedUplink {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub adr: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confirmed: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deduplication_id: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dev_addr: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device_info: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dr: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub f_cnt: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub f_port: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rx_info: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tx_info: Option<Value>,
    pub object: UplinkLocation,
}

impl MappedUplink {
    /// Copy the whitelisted top-level fields from an inbound payload and
    /// attach the given location record
    pub fn from_inbound(payload: &InboundPayload, object: UplinkLocation) -> Self {
        let copy = |field: &str| payload.get(field).cloned();

        Self {
            adr: copy("adr"),
            confirmed: copy("confirmed"),
            data: copy("data"),
            deduplication_id: copy("deduplicationId"),
            dev_addr: copy("devAddr"),
            device_info: copy("deviceInfo"),
            dr: copy("dr"),
            event: copy("event"),
            f_cnt: copy("fCnt"),
            f_port: copy("fPort"),
            rx_info: copy("rxInfo"),
            time: copy("time"),
            tx_info: copy("txInfo"),
            object,
        }
    }
}

/// Payload ready to be forwarded to one target
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum TransformedPayload {
    /// The inbound payload, unchanged
    PassThrough(Value),

    /// The narrowed record for mapping targets
    Mapped(MappedUplink),
}

impl TransformedPayload {
    /// Render the payload as the JSON value sent on the wire
    pub fn to_value(&self) -> Value {
        match self {
            Self::PassThrough(value) => value.clone(),
            // MappedUplink only holds JSON values and strings, so this cannot fail
            Self::Mapped(mapped) => serde_json::to_value(mapped).unwrap_or(Value::Null),
        }
    }
}
