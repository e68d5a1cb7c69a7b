//! # Uplink-Relay Core
//!
//! Core logic for the Uplink-Relay webhook fan-out service.
//!
//! This crate receives device uplinks (as forwarded by a LoRaWAN network
//! server), reshapes them per destination, validates the reshaped structure
//! and forwards the result concurrently to a fixed list of HTTP targets.
//!
//! ## Architecture
//!
//! - [`transform`]: per-target payload reshaping with field defaulting
//! - [`schema`]: structural validation of reshaped payloads
//! - [`forwarder`]: single-attempt outbound HTTP POST
//! - [`dispatcher`]: the transform → validate → forward fan-out
//!
//! Infrastructure (the HTTP client, the schema engine) sits behind the
//! [`Forwarder`] and [`SchemaValidator`] traits and is injected at
//! construction time.
//!
//! ## Usage
//!
//! ```rust
//! use uplink_relay_core::{TargetName, TargetSpec, TransformKind};
//!
//! let target = TargetSpec::new(
//!     "mappers",
//!     "https://mappers.example.com/api/v1/ingest/uplink",
//!     TransformKind::Mappers,
//!     true,
//! )
//! .unwrap();
//!
//! assert_eq!(target.name, TargetName::new("mappers").unwrap());
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub use url::Url;

// ============================================================================
// Domain Identifier Types
// ============================================================================

/// Name of a downstream target
///
/// Used as the target's identity in configuration, logs and error messages.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TargetName(String);

impl TargetName {
    /// Create new target name with validation
    ///
    /// # Validation Rules
    /// - Must be 1-64 characters
    /// - Must contain only alphanumeric characters, hyphens and underscores
    /// - Must not start or end with a hyphen
    pub fn new(name: impl Into<String>) -> Result<Self, ValidationError> {
        let name = name.into();

        if name.is_empty() {
            return Err(ValidationError::Required {
                field: "target_name".to_string(),
            });
        }

        if name.len() > 64 {
            return Err(ValidationError::TooLong {
                field: "target_name".to_string(),
                max_length: 64,
            });
        }

        if !name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        {
            return Err(ValidationError::InvalidCharacters {
                field: "target_name".to_string(),
                invalid_chars: "non-alphanumeric except hyphens and underscores".to_string(),
            });
        }

        if name.starts_with('-') || name.ends_with('-') {
            return Err(ValidationError::InvalidFormat {
                field: "target_name".to_string(),
                message: "cannot start or end with hyphen".to_string(),
            });
        }

        Ok(Self(name))
    }

    /// Get string representation
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TargetName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for TargetName {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for TargetName {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<TargetName> for String {
    fn from(name: TargetName) -> Self {
        name.0
    }
}

// ============================================================================
// Target Types
// ============================================================================

/// How a target wants the inbound payload shaped
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransformKind {
    /// Forward the inbound payload unchanged
    PassThrough,

    /// Narrow the payload to the whitelisted uplink fields and a normalized
    /// location `object`
    Mappers,
}

impl TransformKind {
    /// Get string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PassThrough => "pass_through",
            Self::Mappers => "mappers",
        }
    }
}

impl fmt::Display for TransformKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TransformKind {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pass_through" | "passthrough" | "pass-through" => Ok(Self::PassThrough),
            "mappers" => Ok(Self::Mappers),
            _ => Err(ParseError::InvalidFormat {
                expected: "pass_through or mappers".to_string(),
                actual: s.to_string(),
            }),
        }
    }
}

/// A configured downstream destination
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetSpec {
    pub name: TargetName,
    pub url: Url,
    pub transform: TransformKind,
    /// Run the schema validator on the transformed payload before forwarding
    pub validate_schema: bool,
}

impl TargetSpec {
    /// Create a target from raw configuration values
    ///
    /// The URL must be absolute and use the `http` or `https` scheme.
    pub fn new(
        name: &str,
        url: &str,
        transform: TransformKind,
        validate_schema: bool,
    ) -> Result<Self, ValidationError> {
        let name = TargetName::new(name)?;
        let url = parse_target_url(url)?;

        Ok(Self {
            name,
            url,
            transform,
            validate_schema,
        })
    }

    /// Target that receives the inbound payload unchanged and unvalidated
    pub fn pass_through(name: TargetName, url: Url) -> Self {
        Self {
            name,
            url,
            transform: TransformKind::PassThrough,
            validate_schema: false,
        }
    }

    /// Target that receives the mapped payload after schema validation
    pub fn mapped(name: TargetName, url: Url) -> Self {
        Self {
            name,
            url,
            transform: TransformKind::Mappers,
            validate_schema: true,
        }
    }
}

/// Parse and check a target URL
pub fn parse_target_url(value: &str) -> Result<Url, ValidationError> {
    let url = Url::parse(value).map_err(|e| ValidationError::InvalidFormat {
        field: "url".to_string(),
        message: e.to_string(),
    })?;

    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(ValidationError::InvalidFormat {
            field: "url".to_string(),
            message: format!("unsupported scheme '{}'", other),
        }),
    }
}

// ============================================================================
// Time and Metadata Types
// ============================================================================

/// UTC timestamp with microsecond precision
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Timestamp(DateTime<Utc>);

impl Timestamp {
    /// Create timestamp for current moment
    pub fn now() -> Self {
        Self(Utc::now())
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.to_rfc3339())
    }
}

// ============================================================================
// Error Types
// ============================================================================

/// Error type for input validation failures
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error, Serialize, Deserialize)]
pub enum ValidationError {
    #[error("Field '{field}' is required")]
    Required { field: String },

    #[error("Field '{field}' has invalid format: {message}")]
    InvalidFormat { field: String, message: String },

    #[error("Field '{field}' exceeds maximum length of {max_length}")]
    TooLong { field: String, max_length: usize },

    #[error("Field '{field}' contains invalid characters: {invalid_chars}")]
    InvalidCharacters {
        field: String,
        invalid_chars: String,
    },
}

/// Error type for string parsing failures
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    #[error("Invalid format: expected {expected}, got '{actual}'")]
    InvalidFormat { expected: String, actual: String },
}

// ============================================================================
// Module declarations
// ============================================================================

/// Inbound and transformed payload types
pub mod payload;

/// Per-target payload transformation
pub mod transform;

/// Structural validation of transformed payloads
pub mod schema;

/// Outbound HTTP delivery
pub mod forwarder;

/// Transform → validate → forward fan-out
pub mod dispatcher;

// Re-export key types for convenience
pub use dispatcher::{DispatchError, Dispatcher};
pub use forwarder::{ForwardError, Forwarder, ForwarderConfig, HttpForwarder};
pub use payload::{InboundPayload, MappedUplink, TransformedPayload, UplinkLocation};
pub use schema::{SchemaValidationError, SchemaValidator, SchemaViolation, UplinkSchemaValidator};
pub use transform::{PayloadTransformer, TransformError};

#[cfg(test)]
#[path = "lib_tests.rs"]
mod tests;
