//! Command line and layered configuration loading.

use clap::Parser;
use std::path::{Path, PathBuf};
use tracing::info;
use uplink_relay_api::{ConfigError, ServiceConfig};

#[cfg(test)]
#[path = "settings_tests.rs"]
mod tests;

/// Uplink-Relay - fan ChirpStack uplinks out to downstream HTTP targets
#[derive(Debug, Parser)]
#[command(name = "uplink-relay")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Relays ChirpStack uplink webhooks to downstream targets")]
pub struct Cli {
    /// Configuration file applied on top of the system and local files
    #[arg(short, long, env = "UPLINK_RELAY_CONFIG_FILE")]
    pub config: Option<PathBuf>,

    /// Port to listen on; overrides `server.port`
    #[arg(short, long, env = "PORT")]
    pub port: Option<u16>,
}

/// Where configuration is read from
///
/// Sources are applied in order, later ones overriding earlier ones:
///  1. `system` file (optional)
///  2. `local` file (optional)
///  3. `explicit` file (required when given)
///  4. environment variables `<PREFIX>__SECTION__KEY`
#[derive(Debug, Clone)]
pub struct ConfigSources {
    pub system: PathBuf,
    pub local: PathBuf,
    pub explicit: Option<PathBuf>,
    pub env_prefix: String,
}

impl Default for ConfigSources {
    fn default() -> Self {
        Self {
            system: PathBuf::from("/etc/uplink-relay/service"),
            local: PathBuf::from("config/service"),
            explicit: None,
            env_prefix: "UPLINK_RELAY".to_string(),
        }
    }
}

impl ConfigSources {
    pub fn with_explicit(mut self, path: Option<&Path>) -> Self {
        self.explicit = path.map(Path::to_path_buf);
        self
    }

    /// Build and deserialize the service configuration
    ///
    /// Every section carries serde defaults, so missing files produce the
    /// built-in configuration. A malformed file, a missing explicit file or
    /// an environment value of the wrong type is an error.
    pub fn load(&self) -> Result<ServiceConfig, ConfigError> {
        let mut builder = config::Config::builder()
            .add_source(
                config::File::with_name(&self.system.to_string_lossy())
                    .required(false)
                    .format(config::FileFormat::Yaml),
            )
            .add_source(
                config::File::with_name(&self.local.to_string_lossy())
                    .required(false)
                    .format(config::FileFormat::Yaml),
            );

        if let Some(explicit) = &self.explicit {
            info!(path = %explicit.display(), "Loading configuration from explicit path");
            builder = builder.add_source(
                config::File::from(explicit.as_path())
                    .required(true)
                    .format(config::FileFormat::Yaml),
            );
        }

        let settings = builder
            .add_source(config::Environment::with_prefix(&self.env_prefix).separator("__"))
            .build()
            .map_err(|e| ConfigError::Parsing {
                message: e.to_string(),
            })?;

        settings
            .try_deserialize()
            .map_err(|e| ConfigError::Parsing {
                message: e.to_string(),
            })
    }
}

/// Load the configuration and apply command line overrides
pub fn load(cli: &Cli) -> Result<ServiceConfig, ConfigError> {
    let mut config = ConfigSources::default()
        .with_explicit(cli.config.as_deref())
        .load()?;

    apply_overrides(&mut config, cli);
    Ok(config)
}

fn apply_overrides(config: &mut ServiceConfig, cli: &Cli) {
    if let Some(port) = cli.port {
        config.server.port = port;
    }
}
