//! # Payload Transformer
//!
//! Maps an inbound uplink into the shape a target expects.
//!
//! - [`TransformKind::PassThrough`] targets get the payload unchanged.
//! - [`TransformKind::Mappers`] targets get a [`MappedUplink`]: the whitelisted
//!   top-level fields plus a location `object` where `accuracy` and `altitude`
//!   are rounded to the nearest integer (or defaulted when absent) and
//!   `latitude`/`longitude` are copied verbatim.

use crate::{
    payload::{InboundPayload, MappedUplink, TransformedPayload, UplinkLocation},
    TargetSpec, TransformKind,
};
use serde_json::{Number, Value};
use tracing::debug;

#[cfg(test)]
#[path = "transform_tests.rs"]
mod tests;

/// Accuracy reported when the uplink carries none.
pub const DEFAULT_ACCURACY: f64 = 2.5;

/// Altitude reported when the uplink carries none.
pub const DEFAULT_ALTITUDE: i64 = 2;

/// Errors raised while reshaping a payload for a target
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransformError {
    /// A field the target's mapping depends on is absent
    #[error("Required field '{field}' is missing from the uplink payload")]
    MissingField { field: String },

    /// A field the mapping reads from is present but is not a JSON object
    #[error("Field '{field}' in the uplink payload is not a JSON object")]
    NotAnObject { field: String },
}

/// Reshapes inbound payloads per target
#[derive(Debug, Clone, Copy, Default)]
pub struct PayloadTransformer;

impl PayloadTransformer {
    /// Create new payload transformer
    pub fn new() -> Self {
        Self
    }

    /// Transform an inbound payload for the given target
    ///
    /// # Errors
    ///
    /// Returns [`TransformError::MissingField`] when a mapping target receives
    /// a payload without an `object` record and
    /// [`TransformError::NotAnObject`] when `object` is some other JSON type.
    /// Missing coordinates are not a transform failure; they are left for the
    /// schema validator to reject.
    pub fn transform(
        &self,
        payload: &InboundPayload,
        target: &TargetSpec,
    ) -> Result<TransformedPayload, TransformError> {
        let transformed = match target.transform {
            TransformKind::PassThrough => {
                TransformedPayload::PassThrough(payload.as_value().clone())
            }
            TransformKind::Mappers => TransformedPayload::Mapped(map_uplink(payload)?),
        };

        debug!(
            target_name = %target.name,
            transform = %target.transform,
            "Transformed payload for target"
        );

        Ok(transformed)
    }
}

fn map_uplink(payload: &InboundPayload) -> Result<MappedUplink, TransformError> {
    match payload.get("object") {
        None | Some(Value::Null) => {
            return Err(TransformError::MissingField {
                field: "object".to_string(),
            })
        }
        Some(Value::Object(_)) => {}
        Some(_) => {
            return Err(TransformError::NotAnObject {
                field: "object".to_string(),
            })
        }
    }

    let accuracy = payload
        .object_field("accuracy")
        .map(round_measurement)
        .unwrap_or_else(|| Value::from(DEFAULT_ACCURACY));

    let altitude = payload
        .object_field("altitude")
        .map(round_measurement)
        .unwrap_or_else(|| Value::from(DEFAULT_ALTITUDE));

    let location = UplinkLocation {
        accuracy,
        altitude,
        latitude: payload.object_field("latitude").cloned(),
        longitude: payload.object_field("longitude").cloned(),
    };

    Ok(MappedUplink::from_inbound(payload, location))
}

/// Round a numeric measurement half-up to an integer JSON number
///
/// Non-numeric values are returned untouched so schema validation reports
/// them.
fn round_measurement(value: &Value) -> Value {
    if value.is_i64() || value.is_u64() {
        return value.clone();
    }

    let Some(raw) = value.as_f64() else {
        return value.clone();
    };

    let floor = raw.floor();
    let rounded = if raw - floor >= 0.5 { floor + 1.0 } else { floor };
    if rounded >= i64::MIN as f64 && rounded < i64::MAX as f64 {
        Value::from(rounded as i64)
    } else {
        Number::from_f64(rounded)
            .map(Value::Number)
            .unwrap_or_else(|| value.clone())
    }
}
