//! # Schema Validator
//!
//! Structural check applied to transformed payloads before they are forwarded
//! to targets that declare themselves schema-checked.
//!
//! The default [`UplinkSchemaValidator`] compiles a fixed JSON Schema once and
//! requires a nested `object` record with numeric `accuracy`, `altitude`,
//! `latitude` and `longitude`. Validation is pure: no mutation, no I/O.

use jsonschema::Validator;
use serde::Serialize;
use serde_json::{json, Value};
use std::fmt;

#[cfg(test)]
#[path = "schema_tests.rs"]
mod tests;

/// One reason a payload failed validation
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SchemaViolation {
    /// JSON pointer to the offending value (`""` for the document root)
    pub path: String,
    pub reason: String,
}

impl fmt::Display for SchemaViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.path.is_empty() {
            write!(f, "{} at /", self.reason)
        } else {
            write!(f, "{} at {}", self.reason, self.path)
        }
    }
}

/// Error returned when a payload does not satisfy the schema
///
/// Carries every violation found, not just the first.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Schema validation failed: {}", join_violations(.violations))]
pub struct SchemaValidationError {
    pub violations: Vec<SchemaViolation>,
}

fn join_violations(violations: &[SchemaViolation]) -> String {
    violations
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Error returned when a schema document cannot be compiled
#[derive(Debug, Clone, thiserror::Error)]
#[error("Invalid JSON Schema: {message}")]
pub struct SchemaCompileError {
    pub message: String,
}

/// Validates transformed payloads against a structural schema
#[cfg_attr(test, mockall::automock)]
pub trait SchemaValidator: Send + Sync {
    /// Validate a payload
    ///
    /// # Returns
    /// * `Ok(())` if the payload satisfies the schema
    /// * `Err(SchemaValidationError)` listing every violation otherwise
    fn validate(&self, payload: &Value) -> Result<(), SchemaValidationError>;

    /// Boolean form of [`SchemaValidator::validate`]
    fn is_valid(&self, payload: &Value) -> bool {
        self.validate(payload).is_ok()
    }
}

/// Schema every validated uplink must satisfy
pub fn uplink_schema() -> Value {
    json!({
        "type": "object",
        "required": ["object"],
        "properties": {
            "object": {
                "type": "object",
                "required": ["accuracy", "altitude", "latitude", "longitude"],
                "properties": {
                    "accuracy": { "type": "number" },
                    "altitude": { "type": "number" },
                    "latitude": { "type": "number" },
                    "longitude": { "type": "number" }
                }
            }
        }
    })
}

/// JSON Schema backed validator
///
/// The schema is compiled once at construction and shared across requests.
pub struct UplinkSchemaValidator {
    validator: Validator,
}

impl UplinkSchemaValidator {
    /// Create a validator for the built-in uplink schema
    pub fn new() -> Result<Self, SchemaCompileError> {
        Self::with_schema(&uplink_schema())
    }

    /// Create a validator for a caller-supplied schema
    pub fn with_schema(schema: &Value) -> Result<Self, SchemaCompileError> {
        let validator = Validator::new(schema).map_err(|e| SchemaCompileError {
            message: e.to_string(),
        })?;

        Ok(Self { validator })
    }
}

impl fmt::Debug for UplinkSchemaValidator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UplinkSchemaValidator").finish_non_exhaustive()
    }
}

impl SchemaValidator for UplinkSchemaValidator {
    fn validate(&self, payload: &Value) -> Result<(), SchemaValidationError> {
        let violations: Vec<SchemaViolation> = self
            .validator
            .iter_errors(payload)
            .map(|e| SchemaViolation {
                path: e.instance_path.to_string(),
                reason: e.to_string(),
            })
            .collect();

        if violations.is_empty() {
            Ok(())
        } else {
            Err(SchemaValidationError { violations })
        }
    }
}
