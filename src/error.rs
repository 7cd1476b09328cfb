//! Error types for fluxdispatch.
//!
//! All errors are strongly typed using thiserror. Handler failures keep the
//! original error as their `source`, so callers can downcast to the exact
//! error a store or listener raised.

use thiserror::Error;

/// Boxed error returned by listener handlers.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Result returned by every listener handler.
pub type HandlerResult = Result<(), BoxError>;

/// Errors raised by the async delivery path.
#[derive(Debug, Error)]
pub enum DeliveryError {
    #[error("Delivery channel disconnected: {path}")]
    Disconnected {
        path: String,
    },

    #[error("Async queue full (capacity {capacity})")]
    QueueFull {
        capacity: usize,
    },

    #[error("Delivery timed out after {duration_ms}ms")]
    Timeout {
        duration_ms: u64,
    },
}

/// Top-level error type for fluxdispatch.
#[derive(Debug, Error)]
pub enum FluxError {
    #[error("Handler '{listener}' failed on {event}: {source}")]
    Handler {
        listener: &'static str,
        event: &'static str,
        #[source]
        source: BoxError,
    },

    #[error("Handler '{listener}' panicked on {event}: {message}")]
    HandlerPanicked {
        listener: &'static str,
        event: &'static str,
        message: String,
    },

    #[error("Delivery error: {0}")]
    Delivery(#[from] DeliveryError),

    #[error("Invalid configuration: {message}")]
    Config {
        message: String,
    },

    #[error("Dispatcher has been dropped")]
    DispatcherDropped,
}

impl FluxError {
    /// Returns true if a handler returned an error or panicked.
    #[must_use]
    pub const fn is_handler_failure(&self) -> bool {
        matches!(self, Self::Handler { .. } | Self::HandlerPanicked { .. })
    }

    /// Returns true if waiting on a delivery timed out.
    #[must_use]
    pub const fn is_timeout(&self) -> bool {
        matches!(self, Self::Delivery(DeliveryError::Timeout { .. }))
    }

    /// Returns true if an async delivery was rejected by a full worker queue.
    #[must_use]
    pub const fn is_queue_full(&self) -> bool {
        matches!(self, Self::Delivery(DeliveryError::QueueFull { .. }))
    }

    /// Name of the listener whose handler failed, if any.
    #[must_use]
    pub const fn listener(&self) -> Option<&'static str> {
        match self {
            Self::Handler { listener, .. } | Self::HandlerPanicked { listener, .. } => Some(*listener),
            _ => None,
        }
    }

    /// The error raised by the handler itself.
    ///
    /// Downcast it to recover the concrete error type:
    /// `err.handler_source().and_then(|e| e.downcast_ref::<MyError>())`.
    #[must_use]
    pub fn handler_source(&self) -> Option<&(dyn std::error::Error + Send + Sync + 'static)> {
        match self {
            Self::Handler { source, .. } => Some(source.as_ref()),
            _ => None,
        }
    }
}

/// Result type alias for fluxdispatch operations.
pub type FluxResult<T> = Result<T, FluxError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Error)]
    #[error("disk full")]
    struct DiskFull;

    #[test]
    fn handler_error_keeps_source() {
        let err = FluxError::Handler {
            listener: "CounterStore",
            event: "CounterAction",
            source: Box::new(DiskFull),
        };
        assert!(err.is_handler_failure());
        assert_eq!(err.listener(), Some("CounterStore"));
        assert!(err.handler_source().and_then(|e| e.downcast_ref::<DiskFull>()).is_some());

        let msg = format!("{err}");
        assert!(msg.contains("CounterStore"));
        assert!(msg.contains("disk full"));
    }

    #[test]
    fn handler_panic_is_a_handler_failure() {
        let err = FluxError::HandlerPanicked {
            listener: "Ui",
            event: "OnChanged",
            message: "boom".to_string(),
        };
        assert!(err.is_handler_failure());
        assert!(err.handler_source().is_none());
        assert!(format!("{err}").contains("boom"));
    }

    #[test]
    fn delivery_timeout_is_not_a_handler_failure() {
        let err: FluxError = DeliveryError::Timeout { duration_ms: 250 }.into();
        assert!(err.is_timeout());
        assert!(!err.is_handler_failure());
        assert!(format!("{err}").contains("250ms"));
    }

    #[test]
    fn queue_full_is_its_own_condition() {
        let err: FluxError = DeliveryError::QueueFull { capacity: 8 }.into();
        assert!(err.is_queue_full());
        assert!(!err.is_timeout());
        assert!(format!("{err}").contains("capacity 8"));
    }

    #[test]
    fn dispatcher_dropped_has_no_listener() {
        let err = FluxError::DispatcherDropped;
        assert!(err.listener().is_none());
        assert_eq!(format!("{err}"), "Dispatcher has been dropped");
    }
}
