//! Background workers for async handlers.
//!
//! A fixed set of named threads drains one bounded job queue. Submission uses
//! `try_send` and never blocks the poster; a full queue rejects the delivery
//! and the bus turns the rejection into a delivery error.
//! Handler panics are caught so a failing listener cannot take a worker down.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Weak};
use std::thread::{self, JoinHandle};

use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};
use tracing::error;

use crate::error::{DeliveryError, FluxError, FluxResult};

use super::registry::Subscription;
use super::{Bus, BusInner};

pub(crate) struct Job {
    subscription: Arc<Subscription>,
    event: Arc<dyn Any + Send + Sync>,
    reply: Sender<FluxResult<()>>,
}

const QUEUE_PATH: &str = "async_queue";

pub(crate) struct WorkerPool {
    tx: Option<Sender<Job>>,
    capacity: usize,
    workers: Vec<JoinHandle<()>>,
}

impl WorkerPool {
    pub fn start(workers: usize, queue_capacity: usize, bus: &Weak<BusInner>) -> Self {
        let workers = workers.max(1);
        let queue_capacity = queue_capacity.max(1);
        let (tx, rx) = bounded::<Job>(queue_capacity);

        let mut handles = Vec::with_capacity(workers);
        for idx in 0..workers {
            let rx: Receiver<Job> = rx.clone();
            let bus = Weak::clone(bus);
            let spawned = thread::Builder::new()
                .name(format!("fluxdispatch-async-{idx}"))
                .spawn(move || {
                    while let Ok(job) = rx.recv() {
                        run_job(job, &bus);
                    }
                });
            match spawned {
                Ok(handle) => handles.push(handle),
                Err(e) => error!(worker = idx, error = %e, "Failed to spawn async worker"),
            }
        }

        Self {
            // With no live worker every async delivery is rejected as closed.
            tx: if handles.is_empty() { None } else { Some(tx) },
            capacity: queue_capacity,
            workers: handles,
        }
    }

    /// Queue one async delivery; the receiver yields the handler outcome.
    pub fn submit(
        &self,
        subscription: Arc<Subscription>,
        event: Arc<dyn Any + Send + Sync>,
    ) -> Result<Receiver<FluxResult<()>>, DeliveryError> {
        let Some(tx) = &self.tx else {
            return Err(closed());
        };
        let (reply, rx) = bounded::<FluxResult<()>>(1);
        match tx.try_send(Job {
            subscription,
            event,
            reply,
        }) {
            Ok(()) => Ok(rx),
            Err(TrySendError::Full(_)) => Err(DeliveryError::QueueFull {
                capacity: self.capacity,
            }),
            Err(TrySendError::Disconnected(_)) => Err(closed()),
        }
    }
}

fn closed() -> DeliveryError {
    DeliveryError::Disconnected {
        path: QUEUE_PATH.to_string(),
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        // Close the queue: workers drain what is queued, then exit.
        drop(self.tx.take());

        // The last bus handle can be released by a handler running on a worker.
        let current = thread::current().id();
        for handle in self.workers.drain(..) {
            if handle.thread().id() == current {
                continue;
            }
            let _ = handle.join();
        }
    }
}

fn run_job(job: Job, bus: &Weak<BusInner>) {
    let Job {
        subscription,
        event,
        reply,
    } = job;

    // Unregistered after the job was queued.
    if !subscription.is_active() {
        let _ = reply.send(Ok(()));
        return;
    }

    let outcome = panic::catch_unwind(AssertUnwindSafe(|| subscription.invoke(event.as_ref())));
    let result = match outcome {
        Ok(Ok(())) => Ok(()),
        Ok(Err(source)) => Err(FluxError::Handler {
            listener: subscription.listener_name,
            event: subscription.event_name,
            source,
        }),
        Err(payload) => Err(FluxError::HandlerPanicked {
            listener: subscription.listener_name,
            event: subscription.event_name,
            message: panic_message(payload.as_ref()),
        }),
    };

    if let Err(err) = &result {
        if let Some(inner) = bus.upgrade() {
            Bus { inner }.report_failure(&subscription, err);
        } else {
            error!(
                listener = subscription.listener_name,
                event = subscription.event_name,
                error = %err,
                "Async handler failed after the bus was dropped"
            );
        }
    }

    // The poster may have dropped its receipt.
    let _ = reply.send(result);
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
