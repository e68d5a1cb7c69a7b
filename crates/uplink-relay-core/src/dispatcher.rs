//! # Dispatcher
//!
//! Fans one inbound uplink out to every configured target.
//!
//! The dispatch is all-or-nothing:
//!
//! 1. Every target's payload is transformed. Any failure aborts the dispatch
//!    before a single request is sent.
//! 2. Targets flagged `validate_schema` have their payload validated. A
//!    failure aborts the dispatch the same way.
//! 3. All forwards are issued concurrently and awaited together.
//! 4. If any forward failed the dispatch fails and the successful results are
//!    discarded. Otherwise the response bodies are returned in target order.

use crate::{
    forwarder::{ForwardError, Forwarder},
    payload::InboundPayload,
    schema::{SchemaValidationError, SchemaValidator},
    transform::{PayloadTransformer, TransformError},
    TargetName, TargetSpec,
};
use futures::future::join_all;
use serde_json::Value;
use std::sync::Arc;
use tracing::{error, info, instrument, warn};

#[cfg(test)]
#[path = "dispatcher_tests.rs"]
mod tests;

/// Reasons a dispatch was aborted
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    /// A target's payload could not be transformed
    #[error("Transform failed for target '{target}': {source}")]
    Transform {
        target: TargetName,
        source: TransformError,
    },

    /// A target's transformed payload did not satisfy the schema
    #[error("Validation failed for target '{target}': {source}")]
    Validation {
        target: TargetName,
        source: SchemaValidationError,
    },

    /// A target could not be reached or rejected the payload
    #[error("Forwarding to target '{target}' failed: {source}")]
    Forward {
        target: TargetName,
        source: ForwardError,
    },
}

impl DispatchError {
    /// Target that caused the abort
    pub fn target(&self) -> &TargetName {
        match self {
            Self::Transform { target, .. }
            | Self::Validation { target, .. }
            | Self::Forward { target, .. } => target,
        }
    }

    /// Underlying cause without the target name or the failing stage
    ///
    /// Forward failures are reduced to [`ForwardError::summary`] so no URL or
    /// downstream body leaks out.
    pub fn cause(&self) -> String {
        match self {
            Self::Transform { source, .. } => source.to_string(),
            Self::Validation { source, .. } => source.to_string(),
            Self::Forward { source, .. } => source.summary().to_string(),
        }
    }

    /// Short failure classification for logs
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Transform { .. } => "transform",
            Self::Validation { .. } => "validation",
            Self::Forward { .. } => "forward",
        }
    }
}

/// Payload prepared for one target, ready to be forwarded
#[derive(Debug, Clone, PartialEq)]
pub struct PreparedDelivery<'a> {
    pub target: &'a TargetSpec,
    pub body: Value,
}

/// Transform → validate → forward fan-out over a fixed target list
///
/// Immutable after construction; share it behind an `Arc`.
pub struct Dispatcher {
    targets: Vec<TargetSpec>,
    transformer: PayloadTransformer,
    validator: Arc<dyn SchemaValidator>,
    forwarder: Arc<dyn Forwarder>,
}

impl Dispatcher {
    /// Create new dispatcher for the given targets
    pub fn new(
        targets: Vec<TargetSpec>,
        validator: Arc<dyn SchemaValidator>,
        forwarder: Arc<dyn Forwarder>,
    ) -> Self {
        Self {
            targets,
            transformer: PayloadTransformer::new(),
            validator,
            forwarder,
        }
    }

    /// Configured targets, in dispatch order
    pub fn targets(&self) -> &[TargetSpec] {
        &self.targets
    }

    /// Transform and validate the payload for every target
    ///
    /// Nothing is sent. The first failing target aborts preparation for all
    /// of them.
    pub fn prepare(
        &self,
        payload: &InboundPayload,
    ) -> Result<Vec<PreparedDelivery<'_>>, DispatchError> {
        let mut prepared = Vec::with_capacity(self.targets.len());

        for target in &self.targets {
            let transformed = self
                .transformer
                .transform(payload, target)
                .map_err(|source| {
                    warn!(target_name = %target.name, error = %source, "Payload transform failed");
                    DispatchError::Transform {
                        target: target.name.clone(),
                        source,
                    }
                })?;

            prepared.push(PreparedDelivery {
                target,
                body: transformed.to_value(),
            });
        }

        for delivery in prepared.iter().filter(|d| d.target.validate_schema) {
            self.validator.validate(&delivery.body).map_err(|source| {
                warn!(
                    target_name = %delivery.target.name,
                    violations = source.violations.len(),
                    error = %source,
                    "Transformed payload failed schema validation"
                );
                DispatchError::Validation {
                    target: delivery.target.name.clone(),
                    source,
                }
            })?;
        }

        Ok(prepared)
    }

    /// Deliver the payload to every target
    ///
    /// # Returns
    ///
    /// One response body per target, in target order.
    ///
    /// # Errors
    ///
    /// Returns the first [`DispatchError`] in target order. When a forward
    /// fails the other forwards still run to completion but their results
    /// are dropped.
    #[instrument(skip(self, payload), fields(targets = self.targets.len()))]
    pub async fn dispatch(&self, payload: &InboundPayload) -> Result<Vec<Value>, DispatchError> {
        let prepared = self.prepare(payload)?;

        let forwards = prepared.iter().map(|delivery| async move {
            self.forwarder
                .forward(&delivery.target.url, &delivery.body)
                .await
                .map_err(|source| DispatchError::Forward {
                    target: delivery.target.name.clone(),
                    source,
                })
        });

        let outcomes = join_all(forwards).await;

        let failures = outcomes.iter().filter(|o| o.is_err()).count();
        if failures > 0 {
            for failure in outcomes.iter().filter_map(|o| o.as_ref().err()) {
                error!(
                    target_name = %failure.target(),
                    error = %failure,
                    "Forward to target failed"
                );
            }
            warn!(
                failed = failures,
                succeeded = outcomes.len() - failures,
                "Dispatch aborted; discarding successful results"
            );
        }

        let results = outcomes.into_iter().collect::<Result<Vec<_>, _>>()?;

        info!(delivered = results.len(), "Payload delivered to all targets");
        Ok(results)
    }
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("targets", &self.targets)
            .finish_non_exhaustive()
    }
}
