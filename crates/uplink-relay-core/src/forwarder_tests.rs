//! Tests for the reqwest-backed forwarder.

use super::*;
use serde_json::json;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn target_url(server: &MockServer, route: &str) -> Url {
    Url::parse(&format!("{}{}", server.uri(), route)).unwrap()
}

mod construction {
    use super::*;

    #[test]
    fn test_default_config_has_no_timeout() {
        let config = ForwarderConfig::default();

        assert!(config.timeout.is_none());
        assert!(config.user_agent.starts_with("uplink-relay/"));
    }

    #[test]
    fn test_config_builders() {
        let config = ForwarderConfig::default()
            .with_user_agent("relay-test")
            .with_timeout(Duration::from_secs(5));

        assert_eq!(config.user_agent, "relay-test");
        assert_eq!(config.timeout, Some(Duration::from_secs(5)));
    }

    #[test]
    fn test_forward_error_accessors() {
        let url = Url::parse("https://dev.example.com/api/payloads").unwrap();
        let error = ForwardError::Status {
            url: url.clone(),
            status: 502,
            body: "bad gateway".to_string(),
        };

        assert_eq!(error.url(), Some(&url));
        assert_eq!(error.status(), Some(502));
        assert_eq!(error.body(), Some("bad gateway"));

        let config_error = ForwardError::Configuration {
            message: "tls".to_string(),
        };
        assert!(config_error.url().is_none());
        assert!(config_error.status().is_none());
    }

    #[test]
    fn test_summary_leaves_out_url_and_body() {
        let url = Url::parse("https://dev.example.com/api/payloads").unwrap();
        let errors = [
            ForwardError::Transport {
                url: url.clone(),
                message: "error sending request for url (https://dev.example.com/)".to_string(),
            },
            ForwardError::Status {
                url: url.clone(),
                status: 500,
                body: "secret stack trace".to_string(),
            },
            ForwardError::Body {
                url: url.clone(),
                message: "connection reset".to_string(),
            },
        ];

        for error in &errors {
            let summary = error.summary();
            assert!(!summary.contains("dev.example.com"), "{summary}");
            assert!(!summary.contains("secret"), "{summary}");
        }
    }
}

mod delivery {
    use super::*;

    #[tokio::test]
    async fn test_posts_json_and_returns_response_body() {
        let server = MockServer::start().await;
        let payload = json!({ "object": { "accuracy": 11 } });

        Mock::given(method("POST"))
            .and(path("/api/payloads"))
            .and(header("content-type", "application/json"))
            .and(body_json(&payload))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "id": 17 })))
            .expect(1)
            .mount(&server)
            .await;

        let forwarder = HttpForwarder::with_defaults().unwrap();
        let result = forwarder
            .forward(&target_url(&server, "/api/payloads"), &payload)
            .await;

        assert_eq!(result.unwrap(), json!({ "id": 17 }));
    }

    #[tokio::test]
    async fn test_sends_configured_user_agent() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(header("user-agent", "relay-test/1.0"))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({ "ok": true })))
            .expect(1)
            .mount(&server)
            .await;

        let forwarder =
            HttpForwarder::new(ForwarderConfig::default().with_user_agent("relay-test/1.0"))
                .unwrap();
        let result = forwarder
            .forward(&target_url(&server, "/ingest"), &json!({}))
            .await;

        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_non_json_body_is_returned_as_string() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_string("accepted"))
            .mount(&server)
            .await;

        let forwarder = HttpForwarder::with_defaults().unwrap();
        let result = forwarder
            .forward(&target_url(&server, "/ingest"), &json!({}))
            .await
            .unwrap();

        assert_eq!(result, json!("accepted"));
    }

    #[tokio::test]
    async fn test_empty_body_is_returned_as_empty_string() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(204))
            .mount(&server)
            .await;

        let forwarder = HttpForwarder::with_defaults().unwrap();
        let result = forwarder
            .forward(&target_url(&server, "/ingest"), &json!({}))
            .await
            .unwrap();

        assert_eq!(result, json!(""));
    }

    #[tokio::test]
    async fn test_non_success_status_carries_status_and_body() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(422).set_body_string("missing deviceInfo"))
            .expect(1)
            .mount(&server)
            .await;

        let url = target_url(&server, "/ingest");
        let forwarder = HttpForwarder::with_defaults().unwrap();
        let error = forwarder.forward(&url, &json!({})).await.unwrap_err();

        assert_eq!(
            error,
            ForwardError::Status {
                url,
                status: 422,
                body: "missing deviceInfo".to_string(),
            }
        );
        assert!(error.to_string().contains("422"));
    }

    #[tokio::test]
    async fn test_connection_failure_is_transport_error() {
        // Bind a server to grab a free port, then shut it down
        let server = MockServer::start().await;
        let url = target_url(&server, "/ingest");
        drop(server);

        let forwarder = HttpForwarder::with_defaults().unwrap();
        let error = forwarder.forward(&url, &json!({})).await.unwrap_err();

        assert!(matches!(error, ForwardError::Transport { .. }));
        assert_eq!(error.url(), Some(&url));
        assert!(error.status().is_none());
    }

    #[tokio::test]
    async fn test_configured_timeout_is_enforced() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({}))
                    .set_delay(Duration::from_secs(2)),
            )
            .mount(&server)
            .await;

        let forwarder = HttpForwarder::new(
            ForwarderConfig::default().with_timeout(Duration::from_millis(200)),
        )
        .unwrap();
        let error = forwarder
            .forward(&target_url(&server, "/slow"), &json!({}))
            .await
            .unwrap_err();

        assert!(matches!(error, ForwardError::Transport { .. }));
    }
}
