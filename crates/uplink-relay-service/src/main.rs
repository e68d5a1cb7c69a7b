//! # Uplink-Relay Service
//!
//! Binary entry point for the Uplink-Relay HTTP service.
//!
//! This executable:
//! - Loads configuration from files, environment and command line
//! - Initializes structured logging
//! - Builds the forwarder, schema validator and dispatcher
//! - Starts the HTTP server from uplink-relay-api

mod logging;
mod settings;

use anyhow::Context;
use clap::Parser;
use settings::Cli;
use std::sync::Arc;
use tracing::{error, info, warn};
use uplink_relay_api::{start_server, DefaultHealthChecker, LoggingConfig, ServiceError};
use uplink_relay_core::{Dispatcher, HttpForwarder, UplinkSchemaValidator};

/// Exit code for any configuration failure
const EXIT_CONFIGURATION: i32 = 3;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let service_config = match settings::load(&cli) {
        Ok(config) => config,
        Err(e) => {
            // Logging is configured from the file that just failed to load.
            let _ = logging::init(&LoggingConfig::default());
            error!(
                error = %e,
                "Could not load service configuration; aborting. \
                 Fix the configuration and restart."
            );
            std::process::exit(EXIT_CONFIGURATION);
        }
    };

    logging::init(&service_config.logging).context("failed to initialize logging")?;

    info!(version = env!("CARGO_PKG_VERSION"), "Starting Uplink-Relay Service");

    let targets = match service_config.validate() {
        Ok(targets) => targets,
        Err(e) => {
            error!(error = %e, "Service configuration is invalid; aborting");
            std::process::exit(EXIT_CONFIGURATION);
        }
    };

    for target in &targets {
        info!(
            target_name = %target.name,
            url = %target.url,
            transform = %target.transform,
            validate_schema = target.validate_schema,
            "Configured target"
        );
    }

    if targets.is_empty() {
        warn!("No targets configured; uplinks will be accepted but not forwarded");
    }

    let validator =
        UplinkSchemaValidator::new().context("failed to compile the uplink schema")?;

    let forwarder = match HttpForwarder::new(service_config.forwarder.to_forwarder_config()) {
        Ok(forwarder) => forwarder,
        Err(e) => {
            error!(error = %e, "Could not build the HTTP client; aborting");
            std::process::exit(EXIT_CONFIGURATION);
        }
    };

    let dispatcher = Arc::new(Dispatcher::new(
        targets,
        Arc::new(validator),
        Arc::new(forwarder),
    ));
    let health_checker = Arc::new(DefaultHealthChecker::new(dispatcher.targets().len()));

    info!(
        host = %service_config.server.host,
        port = service_config.server.port,
        endpoint = %service_config.relay.endpoint_path,
        "Starting HTTP server"
    );

    if let Err(e) = start_server(service_config, dispatcher, health_checker).await {
        error!("Failed to start server: {}", e);

        let exit_code = match e {
            ServiceError::BindFailed { .. } => 1,
            ServiceError::ServerFailed { .. } => 2,
        };

        std::process::exit(exit_code);
    }

    Ok(())
}
