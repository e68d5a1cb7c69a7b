//! # Uplink-Relay HTTP Service
//!
//! HTTP server receiving LoRaWAN uplink webhooks from a ChirpStack network
//! server and fanning them out to the configured targets.
//!
//! This service provides:
//! - The uplink endpoint (`POST /api/chirpstack` by default)
//! - Liveness and readiness endpoints
//! - Correlation ID propagation on every response

pub mod config;
pub mod errors;
pub mod responses;

use axum::{
    extract::{DefaultBodyLimit, State},
    http::StatusCode,
    middleware,
    response::{Json, Response},
    routing::{get, post},
    Router,
};
use bytes::Bytes;
use serde_json::Value;
use std::{collections::HashMap, future::IntoFuture, sync::Arc, time::Duration};
use tokio::sync::watch;
use tower::ServiceBuilder;
use tower_http::{limit::RequestBodyLimitLayer, trace::TraceLayer};
use tracing::{error, info, instrument, warn};
use uplink_relay_core::{Dispatcher, InboundPayload, Timestamp};

pub use config::{
    ForwarderSettings, LoggingConfig, RelayConfig, ServerConfig, ServiceConfig, TargetConfig,
};
pub use errors::{ConfigError, RelayHandlerError, ServiceError};
pub use responses::{
    ErrorResponse, HealthCheckResult, HealthResponse, HealthStatus, ReadinessResponse,
};

/// Header carrying the per-request correlation ID
pub const CORRELATION_ID_HEADER: &str = "x-correlation-id";

// ============================================================================
// Application State
// ============================================================================

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// Configuration for the service
    pub config: ServiceConfig,

    /// Fan-out over the configured targets
    pub dispatcher: Arc<Dispatcher>,

    /// Health checker for system monitoring
    pub health_checker: Arc<dyn HealthChecker>,
}

impl AppState {
    /// Create new application state
    pub fn new(
        config: ServiceConfig,
        dispatcher: Arc<Dispatcher>,
        health_checker: Arc<dyn HealthChecker>,
    ) -> Self {
        Self {
            config,
            dispatcher,
            health_checker,
        }
    }
}

// ============================================================================
// HTTP Server
// ============================================================================

/// Create HTTP router with all endpoints
pub fn create_router(state: AppState) -> Router {
    let relay_routes =
        Router::new().route(&state.config.relay.endpoint_path, post(handle_uplink));

    let health_routes = Router::new()
        .route("/health", get(handle_health_check))
        .route("/health/ready", get(handle_readiness_check));

    let max_body_size = state.config.server.max_body_size;

    Router::new()
        .merge(relay_routes)
        .merge(health_routes)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(middleware::from_fn(request_logging_middleware))
                .layer(DefaultBodyLimit::disable())
                .layer(RequestBodyLimitLayer::new(max_body_size))
                .into_inner(),
        )
        .with_state(state)
}

/// Start HTTP server
///
/// Serves until SIGINT or SIGTERM, then lets in-flight requests finish for up
/// to `server.shutdown_timeout_seconds`.
pub async fn start_server(
    config: ServiceConfig,
    dispatcher: Arc<Dispatcher>,
    health_checker: Arc<dyn HealthChecker>,
) -> Result<(), ServiceError> {
    let address = format!("{}:{}", config.server.host, config.server.port);
    let shutdown_timeout = Duration::from_secs(config.server.shutdown_timeout_seconds);

    let state = AppState::new(config, dispatcher, health_checker);
    let app = create_router(state);

    let listener =
        tokio::net::TcpListener::bind(&address)
            .await
            .map_err(|e| ServiceError::BindFailed {
                address: address.clone(),
                message: e.to_string(),
            })?;

    info!("Starting HTTP server on {}", address);

    let (signalled_tx, mut signalled_rx) = watch::channel(false);
    let shutdown = async move {
        wait_for_shutdown_signal(shutdown_timeout).await;
        let _ = signalled_tx.send(true);
    };

    // New connections stop at the signal; in-flight requests are drained.
    let server = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .into_future();
    tokio::pin!(server);

    tokio::select! {
        result = &mut server => {
            result.map_err(|e| ServiceError::ServerFailed { message: e.to_string() })?;
            info!("HTTP server shutdown complete");
            return Ok(());
        }
        _ = signalled_rx.changed() => {}
    }

    match tokio::time::timeout(shutdown_timeout, server).await {
        Ok(result) => {
            result.map_err(|e| ServiceError::ServerFailed {
                message: e.to_string(),
            })?;
            info!("HTTP server shutdown complete");
        }
        Err(_) => {
            warn!(
                timeout_seconds = shutdown_timeout.as_secs(),
                "Graceful shutdown timed out; abandoning in-flight requests"
            );
        }
    }

    Ok(())
}

async fn wait_for_shutdown_signal(shutdown_timeout: Duration) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C signal handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM signal handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received SIGINT (Ctrl+C), initiating graceful shutdown with {}s timeout", shutdown_timeout.as_secs());
        },
        _ = terminate => {
            info!("Received SIGTERM, initiating graceful shutdown with {}s timeout", shutdown_timeout.as_secs());
        },
    }
}

// ============================================================================
// Uplink Handler
// ============================================================================

/// Handle an uplink webhook from the network server
///
/// The body is parsed as JSON and handed to the dispatcher. The response is
/// either the array of downstream response bodies, in target order, or a
/// single `500` error if any target failed.
#[instrument(skip(state, body), fields(bytes = body.len()))]
pub async fn handle_uplink(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<Vec<Value>>, RelayHandlerError> {
    let payload = InboundPayload::from_slice(&body)?;

    info!(
        deduplication_id = ?payload.get("deduplicationId"),
        has_object = payload.object().is_some(),
        "Received uplink"
    );

    let results = state.dispatcher.dispatch(&payload).await?;
    Ok(Json(results))
}

// ============================================================================
// Health Check Handlers
// ============================================================================

/// Basic health check endpoint
#[instrument(skip(state))]
async fn handle_health_check(
    State(state): State<AppState>,
) -> Result<Json<HealthResponse>, StatusCode> {
    let status = state.health_checker.check_basic_health().await;

    let response = HealthResponse {
        status: if status.is_healthy {
            "healthy".to_string()
        } else {
            "unhealthy".to_string()
        },
        timestamp: Timestamp::now(),
        checks: status.checks,
        version: env!("CARGO_PKG_VERSION").to_string(),
    };

    if status.is_healthy {
        Ok(Json(response))
    } else {
        Err(StatusCode::SERVICE_UNAVAILABLE)
    }
}

/// Readiness check for load balancers
#[instrument(skip(state))]
async fn handle_readiness_check(
    State(state): State<AppState>,
) -> (StatusCode, Json<ReadinessResponse>) {
    let is_ready = state.health_checker.check_readiness().await;

    let response = ReadinessResponse {
        ready: is_ready,
        timestamp: Timestamp::now(),
        targets: state
            .dispatcher
            .targets()
            .iter()
            .map(|t| t.name.to_string())
            .collect(),
    };

    let status = if is_ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (status, Json(response))
}

// ============================================================================
// Middleware
// ============================================================================

/// Request logging middleware with correlation ID tracking
///
/// Reuses the caller's `x-correlation-id` when present, otherwise generates
/// one, and echoes it on the response.
#[instrument(skip(request, next), fields(
    method = %request.method(),
    uri = %request.uri(),
    correlation_id
))]
async fn request_logging_middleware(
    request: axum::extract::Request,
    next: axum::middleware::Next,
) -> Response {
    let method = request.method().clone();
    let uri = request.uri().clone();
    let start = std::time::Instant::now();

    let correlation_id = request
        .headers()
        .get(CORRELATION_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .filter(|s| !s.is_empty())
        .map(|s| s.to_string())
        .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());

    tracing::Span::current().record("correlation_id", correlation_id.as_str());

    info!(method = %method, uri = %uri, "Request started");

    let mut response = next.run(request).await;
    let duration = start.elapsed();

    if let Ok(header_value) = correlation_id.parse() {
        response
            .headers_mut()
            .insert(CORRELATION_ID_HEADER, header_value);
    }

    let status = response.status();

    if status.is_server_error() {
        error!(
            status = %status,
            duration_ms = %duration.as_millis(),
            "Request completed with server error"
        );
    } else if status.is_client_error() {
        warn!(
            status = %status,
            duration_ms = %duration.as_millis(),
            "Request completed with client error"
        );
    } else {
        info!(
            status = %status,
            duration_ms = %duration.as_millis(),
            "Request completed successfully"
        );
    }

    response
}

// ============================================================================
// Health Checking
// ============================================================================

/// Interface for system health monitoring
#[async_trait::async_trait]
pub trait HealthChecker: Send + Sync {
    /// Basic health check (fast)
    async fn check_basic_health(&self) -> HealthStatus;

    /// Readiness check for load balancers
    async fn check_readiness(&self) -> bool;
}

/// Default health checker
///
/// The service is alive whenever it can answer. It is ready once at least
/// one target is configured.
pub struct DefaultHealthChecker {
    target_count: usize,
}

impl DefaultHealthChecker {
    pub fn new(target_count: usize) -> Self {
        Self { target_count }
    }
}

#[async_trait::async_trait]
impl HealthChecker for DefaultHealthChecker {
    async fn check_basic_health(&self) -> HealthStatus {
        let start = std::time::Instant::now();
        let mut checks = HashMap::new();

        checks.insert(
            "service".to_string(),
            HealthCheckResult {
                healthy: true,
                message: "Service is running".to_string(),
                duration_ms: start.elapsed().as_millis() as u64,
            },
        );

        checks.insert(
            "targets".to_string(),
            HealthCheckResult {
                healthy: self.target_count > 0,
                message: format!("{} target(s) configured", self.target_count),
                duration_ms: start.elapsed().as_millis() as u64,
            },
        );

        HealthStatus {
            is_healthy: true,
            checks,
        }
    }

    async fn check_readiness(&self) -> bool {
        self.target_count > 0
    }
}

#[cfg(test)]
#[path = "lib_tests.rs"]
mod tests;
