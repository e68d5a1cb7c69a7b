//! # Forwarder
//!
//! Sends one transformed payload to one target as a JSON POST. A single
//! attempt is made; there is no retry and no backoff.
//!
//! A 2xx response yields the downstream body unchanged. Anything else is a
//! [`ForwardError`] carrying the target URL, a message and, where the target
//! answered, its status code and body.

use async_trait::async_trait;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};
use url::Url;

#[cfg(test)]
#[path = "forwarder_tests.rs"]
mod tests;

/// Errors raised while delivering a payload to a target
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ForwardError {
    /// The request never produced a response (connection refused, DNS
    /// failure, TLS failure, client timeout)
    #[error("Failed to reach {url}: {message}")]
    Transport { url: Url, message: String },

    /// The target answered with a non-success status
    #[error("Target {url} responded with status {status}: {body}")]
    Status { url: Url, status: u16, body: String },

    /// The response arrived but its body could not be read
    #[error("Failed to read response body from {url}: {message}")]
    Body { url: Url, message: String },

    /// The HTTP client could not be constructed
    #[error("Forwarder configuration error: {message}")]
    Configuration { message: String },
}

impl ForwardError {
    /// Target URL the failure relates to, if any
    pub fn url(&self) -> Option<&Url> {
        match self {
            Self::Transport { url, .. } | Self::Status { url, .. } | Self::Body { url, .. } => {
                Some(url)
            }
            Self::Configuration { .. } => None,
        }
    }

    /// Downstream status code, when the target answered
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Short description of the failure that names neither the target URL
    /// nor anything the target sent back
    pub fn summary(&self) -> &'static str {
        match self {
            Self::Transport { .. } => "Target could not be reached",
            Self::Status { .. } => "Target rejected the payload",
            Self::Body { .. } => "Target response could not be read",
            Self::Configuration { .. } => "HTTP client is not configured correctly",
        }
    }

    /// Downstream response body, when the target answered
    pub fn body(&self) -> Option<&str> {
        match self {
            Self::Status { body, .. } => Some(body),
            _ => None,
        }
    }
}

/// Delivers a JSON payload to a target URL
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Forwarder: Send + Sync {
    /// POST `payload` to `url` and return the response body
    ///
    /// # Errors
    ///
    /// Returns [`ForwardError`] on transport failure or a non-2xx status.
    async fn forward(&self, url: &Url, payload: &Value) -> Result<Value, ForwardError>;
}

/// Configuration for the HTTP forwarder
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForwarderConfig {
    /// User agent sent with every request
    pub user_agent: String,

    /// Overall request timeout. `None` leaves the client's defaults in place.
    pub timeout: Option<Duration>,
}

impl Default for ForwarderConfig {
    fn default() -> Self {
        Self {
            user_agent: format!("uplink-relay/{}", env!("CARGO_PKG_VERSION")),
            timeout: None,
        }
    }
}

impl ForwarderConfig {
    /// Set the user agent string.
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Set the request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

/// reqwest-backed [`Forwarder`]
///
/// The underlying client pools connections and is cheap to clone.
#[derive(Debug, Clone)]
pub struct HttpForwarder {
    client: reqwest::Client,
}

impl HttpForwarder {
    /// Create a new forwarder
    ///
    /// # Errors
    ///
    /// Returns [`ForwardError::Configuration`] if the HTTP client cannot be
    /// built from the supplied settings.
    pub fn new(config: ForwarderConfig) -> Result<Self, ForwardError> {
        let mut builder = reqwest::Client::builder().user_agent(&config.user_agent);

        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }

        let client = builder.build().map_err(|e| ForwardError::Configuration {
            message: format!("failed to build HTTP client: {e}"),
        })?;

        Ok(Self { client })
    }

    /// Create a forwarder with default configuration
    pub fn with_defaults() -> Result<Self, ForwardError> {
        Self::new(ForwarderConfig::default())
    }
}

#[async_trait]
impl Forwarder for HttpForwarder {
    #[instrument(skip(self, payload), fields(url = %url))]
    async fn forward(&self, url: &Url, payload: &Value) -> Result<Value, ForwardError> {
        debug!("Forwarding payload");

        let response = self
            .client
            .post(url.clone())
            .json(payload)
            .send()
            .await
            .map_err(|e| {
                warn!(error = %e, "Request to target failed");
                ForwardError::Transport {
                    url: url.clone(),
                    message: e.to_string(),
                }
            })?;

        let status = response.status();
        let body = response.text().await.map_err(|e| ForwardError::Body {
            url: url.clone(),
            message: e.to_string(),
        })?;

        if !status.is_success() {
            warn!(
                status = status.as_u16(),
                body = %body,
                "Target rejected payload"
            );
            return Err(ForwardError::Status {
                url: url.clone(),
                status: status.as_u16(),
                body,
            });
        }

        info!(status = status.as_u16(), "Target accepted payload");
        Ok(parse_response_body(body))
    }
}

/// Interpret a response body the way the target sent it
///
/// JSON bodies are parsed; anything else, including an empty body, is kept
/// as a JSON string.
fn parse_response_body(body: String) -> Value {
    if body.trim().is_empty() {
        return Value::String(body);
    }

    serde_json::from_str(&body).unwrap_or(Value::String(body))
}
