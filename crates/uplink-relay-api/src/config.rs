//! Configuration types for the HTTP service

use crate::errors::ConfigError;
use serde::{Deserialize, Serialize};
use std::{collections::HashSet, time::Duration};
use uplink_relay_core::{ForwarderConfig, TargetSpec, TransformKind};

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;

/// Service configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    /// HTTP server settings
    pub server: ServerConfig,

    /// Logging configuration
    pub logging: LoggingConfig,

    /// Webhook endpoint settings
    pub relay: RelayConfig,

    /// Outbound HTTP settings
    pub forwarder: ForwarderSettings,

    /// Downstream targets, in dispatch order
    pub targets: Vec<TargetConfig>,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            logging: LoggingConfig::default(),
            relay: RelayConfig::default(),
            forwarder: ForwarderSettings::default(),
            targets: default_targets(),
        }
    }
}

impl ServiceConfig {
    /// Check the configuration before the service starts
    ///
    /// # Returns
    ///
    /// The dispatcher targets, converted once by [`ServiceConfig::target_specs`].
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] for a malformed endpoint path or body
    /// limit, [`ConfigError::InvalidTarget`] for a target whose name or URL
    /// is rejected and [`ConfigError::DuplicateTarget`] when two targets share
    /// a name.
    pub fn validate(&self) -> Result<Vec<TargetSpec>, ConfigError> {
        if !self.relay.endpoint_path.starts_with('/') {
            return Err(ConfigError::Invalid {
                message: format!(
                    "relay.endpoint_path must start with '/', got '{}'",
                    self.relay.endpoint_path
                ),
            });
        }

        if self.server.max_body_size == 0 {
            return Err(ConfigError::Invalid {
                message: "server.max_body_size must be greater than zero".to_string(),
            });
        }

        if self.forwarder.timeout_seconds == Some(0) {
            return Err(ConfigError::Invalid {
                message: "forwarder.timeout_seconds must be greater than zero when set"
                    .to_string(),
            });
        }

        self.target_specs()
    }

    /// Convert the configured targets into dispatcher targets
    pub fn target_specs(&self) -> Result<Vec<TargetSpec>, ConfigError> {
        let mut seen = HashSet::new();
        let mut specs = Vec::with_capacity(self.targets.len());

        for (index, target) in self.targets.iter().enumerate() {
            let spec = target.to_spec().map_err(|source| ConfigError::InvalidTarget {
                index,
                name: target.name.clone(),
                source,
            })?;

            if !seen.insert(spec.name.clone()) {
                return Err(ConfigError::DuplicateTarget {
                    name: target.name.clone(),
                });
            }

            specs.push(spec);
        }

        Ok(specs)
    }
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Host to bind to
    pub host: String,

    /// Port to listen on
    pub port: u16,

    /// Graceful shutdown timeout in seconds
    pub shutdown_timeout_seconds: u64,

    /// Maximum request size in bytes
    pub max_body_size: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            shutdown_timeout_seconds: 30,
            max_body_size: 1024 * 1024, // 1MB
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Logging level
    pub level: String,

    /// Enable JSON structured logging
    pub json_format: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json_format: false,
        }
    }
}

/// Webhook endpoint configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RelayConfig {
    /// Path the network server posts uplinks to
    pub endpoint_path: String,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            endpoint_path: "/api/chirpstack".to_string(),
        }
    }
}

/// Outbound HTTP client configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ForwarderSettings {
    pub user_agent: String,

    /// Per-request timeout; unset means no timeout is enforced
    pub timeout_seconds: Option<u64>,
}

impl Default for ForwarderSettings {
    fn default() -> Self {
        let defaults = ForwarderConfig::default();
        Self {
            user_agent: defaults.user_agent,
            timeout_seconds: None,
        }
    }
}

impl ForwarderSettings {
    pub fn to_forwarder_config(&self) -> ForwarderConfig {
        let config = ForwarderConfig::default().with_user_agent(self.user_agent.clone());
        match self.timeout_seconds {
            Some(seconds) => config.with_timeout(Duration::from_secs(seconds)),
            None => config,
        }
    }
}

/// One downstream target as written in the configuration file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetConfig {
    pub name: String,
    pub url: String,
    pub transform: TransformKind,

    #[serde(default)]
    pub validate_schema: bool,
}

impl TargetConfig {
    fn to_spec(&self) -> Result<TargetSpec, uplink_relay_core::ValidationError> {
        TargetSpec::new(&self.name, &self.url, self.transform, self.validate_schema)
    }
}

fn default_targets() -> Vec<TargetConfig> {
    vec![
        TargetConfig {
            name: "dev-app".to_string(),
            url: "https://dev.buoy.fish/api/payloads".to_string(),
            transform: TransformKind::PassThrough,
            validate_schema: false,
        },
        TargetConfig {
            name: "mappers".to_string(),
            url: "https://mappers.helium.com/api/v1/ingest/uplink".to_string(),
            transform: TransformKind::Mappers,
            validate_schema: true,
        },
    ]
}
