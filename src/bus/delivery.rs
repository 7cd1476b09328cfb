use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, RecvTimeoutError};

use crate::error::{DeliveryError, FluxError, FluxResult};

const WORKER_PATH: &str = "async_worker";

/// Receipt for one `post`.
///
/// Synchronous handlers have already run when this is returned. Async handlers
/// may still be queued; dropping the receipt leaves them running in the
/// background, while [`Delivery::wait`] blocks until they finish.
#[derive(Debug)]
pub struct Delivery {
    event_type: &'static str,
    delivered: usize,
    dropped: usize,
    pending: Vec<Receiver<FluxResult<()>>>,
}

impl Delivery {
    pub(crate) fn new(event_type: &'static str) -> Self {
        Self {
            event_type,
            delivered: 0,
            dropped: 0,
            pending: Vec::new(),
        }
    }

    pub(crate) fn record_delivered(&mut self) {
        self.delivered += 1;
    }

    pub(crate) fn record_pending(&mut self, rx: Receiver<FluxResult<()>>) {
        self.pending.push(rx);
    }

    pub(crate) fn record_dropped(&mut self) {
        self.dropped += 1;
    }

    /// Short type name of the posted message.
    #[must_use]
    pub const fn event_type(&self) -> &'static str {
        self.event_type
    }

    /// Synchronous handlers that completed successfully.
    #[must_use]
    pub const fn delivered(&self) -> usize {
        self.delivered
    }

    /// Async handlers handed to the worker pool.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    /// Async deliveries dropped because the worker queue was full or closed.
    #[must_use]
    pub const fn dropped(&self) -> usize {
        self.dropped
    }

    /// Waits for every queued async handler.
    ///
    /// Returns the first async handler failure, if any. Do not call this from an
    /// async handler of the same bus with a single worker: the worker would wait
    /// on itself.
    pub fn wait(self) -> FluxResult<()> {
        let mut first_err = None;
        for rx in self.pending {
            let outcome = rx
                .recv()
                .map_err(|_| {
                    FluxError::Delivery(DeliveryError::Disconnected {
                        path: WORKER_PATH.to_string(),
                    })
                })
                .and_then(|result| result);
            if let Err(err) = outcome {
                if first_err.is_none() {
                    first_err = Some(err);
                }
            }
        }
        first_err.map_or(Ok(()), Err)
    }

    /// Waits for every queued async handler, giving up after `timeout`.
    pub fn wait_timeout(self, timeout: Duration) -> FluxResult<()> {
        let deadline = Instant::now() + timeout;
        let mut first_err = None;
        for rx in self.pending {
            let outcome = rx
                .recv_deadline(deadline)
                .map_err(|err| match err {
                    RecvTimeoutError::Timeout => FluxError::Delivery(DeliveryError::Timeout {
                        duration_ms: u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
                    }),
                    RecvTimeoutError::Disconnected => FluxError::Delivery(DeliveryError::Disconnected {
                        path: WORKER_PATH.to_string(),
                    }),
                })
                .and_then(|result| result);
            match outcome {
                Ok(()) => {}
                Err(err) if err.is_timeout() => return Err(err),
                Err(err) => {
                    if first_err.is_none() {
                        first_err = Some(err);
                    }
                }
            }
        }
        first_err.map_or(Ok(()), Err)
    }
}
