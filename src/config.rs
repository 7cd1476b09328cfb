//! Bus and dispatcher configuration.

use serde::{Deserialize, Serialize};

use crate::error::{FluxError, FluxResult};

/// Subscription bus configuration.
///
/// Every field has a default, so a JSON document only needs the keys it overrides.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BusConfig {
    /// Log a warning when a post matches no listener.
    pub report_no_subscriber: bool,
    /// Post a `NoSubscriberEvent` when a post matches no listener.
    pub send_no_subscriber_event: bool,
    /// Propagate the first synchronous handler failure out of `post`.
    pub fail_fast: bool,
    /// Post a `SubscriberFailureEvent` for handler failures that are not propagated.
    pub send_failure_event: bool,
    /// Number of background workers serving async handlers.
    pub async_workers: usize,
    /// Max queued async deliveries before new ones are dropped.
    pub async_queue_capacity: usize,
}

impl Default for BusConfig {
    fn default() -> Self {
        Self {
            report_no_subscriber: true,
            send_no_subscriber_event: true,
            fail_fast: true,
            send_failure_event: true,
            async_workers: 4,
            async_queue_capacity: 1024,
        }
    }
}

impl BusConfig {
    /// Parse a configuration from JSON. Missing keys keep their defaults.
    pub fn from_json(json: &str) -> FluxResult<Self> {
        serde_json::from_str(json).map_err(|e| FluxError::Config {
            message: format!("invalid bus config: {e}"),
        })
    }
}

/// Dispatcher configuration.
///
/// Only the worker pool is tunable; the delivery policy flags are fixed by the
/// dispatcher (see [`DispatcherConfig::bus_config`]).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DispatcherConfig {
    /// Number of background workers serving async handlers.
    pub async_workers: usize,
    /// Max queued async deliveries before new ones are dropped.
    pub async_queue_capacity: usize,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        let bus = BusConfig::default();
        Self {
            async_workers: bus.async_workers,
            async_queue_capacity: bus.async_queue_capacity,
        }
    }
}

impl DispatcherConfig {
    /// Parse a configuration from JSON. Missing keys keep their defaults.
    pub fn from_json(json: &str) -> FluxResult<Self> {
        serde_json::from_str(json).map_err(|e| FluxError::Config {
            message: format!("invalid dispatcher config: {e}"),
        })
    }

    /// The bus configuration a dispatcher runs with.
    ///
    /// Missing handlers are reported, failing handlers are fatal to the call.
    #[must_use]
    pub fn bus_config(&self) -> BusConfig {
        BusConfig {
            report_no_subscriber: true,
            send_no_subscriber_event: true,
            fail_fast: true,
            send_failure_event: true,
            async_workers: self.async_workers,
            async_queue_capacity: self.async_queue_capacity,
        }
    }
}
