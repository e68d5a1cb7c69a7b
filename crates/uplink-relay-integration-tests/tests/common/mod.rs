//! Common test utilities for uplink-relay-api integration tests
//!
//! This module provides:
//! - A controllable mock of the HealthChecker trait
//! - wiremock-backed downstream targets
//! - Builders for the router, requests and uplink payloads

use axum::{
    body::Body,
    http::{Request, Response},
    Router,
};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use uplink_relay_api::{
    create_router, AppState, HealthCheckResult, HealthChecker, HealthStatus, ServiceConfig,
};
use uplink_relay_core::{
    Dispatcher, HttpForwarder, TargetName, TargetSpec, TransformKind, UplinkSchemaValidator, Url,
};
use wiremock::{
    matchers::{method, path},
    Mock, MockServer, ResponseTemplate,
};

// ============================================================================
// Mock Health Checker
// ============================================================================

/// Health checker whose answers are set by the test
#[derive(Clone)]
#[allow(dead_code)]
pub struct MockHealthChecker {
    healthy: Arc<Mutex<bool>>,
    ready: Arc<Mutex<bool>>,
}

impl MockHealthChecker {
    #[allow(dead_code)]
    pub fn new() -> Self {
        Self {
            healthy: Arc::new(Mutex::new(true)),
            ready: Arc::new(Mutex::new(true)),
        }
    }

    #[allow(dead_code)]
    pub fn set_healthy(&self, healthy: bool) {
        *self.healthy.lock().unwrap() = healthy;
    }

    #[allow(dead_code)]
    pub fn set_ready(&self, ready: bool) {
        *self.ready.lock().unwrap() = ready;
    }
}

#[async_trait::async_trait]
impl HealthChecker for MockHealthChecker {
    async fn check_basic_health(&self) -> HealthStatus {
        let healthy = *self.healthy.lock().unwrap();
        let mut checks = HashMap::new();
        checks.insert(
            "mock".to_string(),
            HealthCheckResult {
                healthy,
                message: "Mock check".to_string(),
                duration_ms: 0,
            },
        );

        HealthStatus {
            is_healthy: healthy,
            checks,
        }
    }

    async fn check_readiness(&self) -> bool {
        *self.ready.lock().unwrap()
    }
}

// ============================================================================
// Downstream targets
// ============================================================================

/// Route every downstream target is mounted on
pub const TARGET_PATH: &str = "/api/payloads";

/// Start a downstream target answering every POST with `status` and `body`
#[allow(dead_code)]
pub async fn start_target(status: u16, body: Value) -> MockServer {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(TARGET_PATH))
        .respond_with(ResponseTemplate::new(status).set_body_json(body))
        .mount(&server)
        .await;

    server
}

/// Target spec pointing at a wiremock server
#[allow(dead_code)]
pub fn target_for(server: &MockServer, name: &str, transform: TransformKind) -> TargetSpec {
    let url = Url::parse(&format!("{}{}", server.uri(), TARGET_PATH)).unwrap();
    let name = TargetName::new(name).unwrap();

    match transform {
        TransformKind::PassThrough => TargetSpec::pass_through(name, url),
        TransformKind::Mappers => TargetSpec::mapped(name, url),
    }
}

/// JSON bodies received by a target, in arrival order
#[allow(dead_code)]
pub async fn received_bodies(server: &MockServer) -> Vec<Value> {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .iter()
        .map(|r| serde_json::from_slice(&r.body).unwrap())
        .collect()
}

// ============================================================================
// Router builders
// ============================================================================

/// Build application state wired to the real forwarder and validator
#[allow(dead_code)]
pub fn create_app_state(
    config: ServiceConfig,
    targets: Vec<TargetSpec>,
    health_checker: Arc<dyn HealthChecker>,
) -> AppState {
    let dispatcher = Dispatcher::new(
        targets,
        Arc::new(UplinkSchemaValidator::new().unwrap()),
        Arc::new(HttpForwarder::with_defaults().unwrap()),
    );

    AppState::new(config, Arc::new(dispatcher), health_checker)
}

/// Router over `targets` with default configuration and a healthy checker
#[allow(dead_code)]
pub fn create_test_app(targets: Vec<TargetSpec>) -> Router {
    create_router(create_app_state(
        ServiceConfig::default(),
        targets,
        Arc::new(MockHealthChecker::new()),
    ))
}

// ============================================================================
// Requests and payloads
// ============================================================================

#[allow(dead_code)]
pub fn uplink_request(body: impl Into<Body>) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/api/chirpstack")
        .header("content-type", "application/json")
        .body(body.into())
        .unwrap()
}

#[allow(dead_code)]
pub fn get_request(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

#[allow(dead_code)]
pub async fn read_json(response: Response<Body>) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

/// A ChirpStack uplink event as posted by the network server
#[allow(dead_code)]
pub fn chirpstack_uplink() -> Value {
    json!({
        "deduplicationId": "3ac7e3c4-4401-4b8d-9386-a5c902f9202d",
        "time": "2024-05-01T12:00:00.000+00:00",
        "deviceInfo": {
            "tenantName": "buoys",
            "applicationName": "tracker",
            "deviceName": "buoy-17",
            "devEui": "0101010101010101"
        },
        "devAddr": "00189440",
        "adr": true,
        "dr": 3,
        "fCnt": 10,
        "fPort": 1,
        "confirmed": false,
        "data": "AQIDBA==",
        "object": {
            "accuracy": 10.6,
            "altitude": 199.4,
            "latitude": 40.7128,
            "longitude": -74.006,
            "battery": 87
        },
        "rxInfo": [{ "gatewayId": "0016c001ff10d3f6", "rssi": -57, "snr": 10.5 }],
        "txInfo": { "frequency": 868100000 }
    })
}
