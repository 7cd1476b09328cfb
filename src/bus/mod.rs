//! Subscription bus: type-routed publish/subscribe.
//!
//! The bus keeps a routing table from message type to the handlers declared for
//! it, in registration order. `post` runs synchronous handlers on the calling
//! thread and hands async handlers to a background worker pool.
//!
//! ## Rules
//! - **Exact-type matching**: a handler for `E` receives only values of type `E`.
//! - **Deterministic order**: sync handlers run in registration order.
//! - **Lock-free delivery**: handlers never run under the registry lock, so a
//!   handler may post, register or unregister on the same bus.
//! - **No subscriber**: a post that matches nothing is counted, logged as a
//!   warning and (optionally) re-posted as a [`NoSubscriberEvent`]. It is never an
//!   error.
//! - **Handler failure**: with `fail_fast`, the first failing sync handler stops
//!   delivery and its error is returned from `post`. Otherwise the failure is
//!   logged and posted as a [`SubscriberFailureEvent`].
//! - **Async overload**: an async delivery rejected by a full or closed worker
//!   queue is never lost silently. It counts as a delivery failure under the
//!   same `fail_fast` rule.
//! - **Registration misuse**: registering the same listener twice delivers twice;
//!   unregistering an unknown id logs a warning and returns `false`.

mod delivery;
mod listener;
mod notice;
mod registry;
mod worker;

use std::any::{Any, TypeId};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard, Weak};

use tracing::{debug, error, warn};

use crate::action::short_type_name;
use crate::config::BusConfig;
use crate::error::{FluxError, FluxResult};

pub use delivery::Delivery;
pub use listener::{Handlers, Listener, ListenerId, ThreadMode};
pub use notice::{NoSubscriberEvent, SubscriberFailureEvent};

use listener::owner_of;
use notice::is_notice;
use registry::{Registry, Subscription};
use worker::WorkerPool;

pub(crate) struct BusInner {
    config: BusConfig,
    registry: RwLock<Registry>,
    pool: WorkerPool,
    no_subscriber: AtomicU64,
    dropped: AtomicU64,
}

/// Handle to a subscription bus. Clones share the same registry and workers.
///
/// Workers shut down when the last handle is dropped.
#[derive(Clone)]
pub struct Bus {
    inner: Arc<BusInner>,
}

/// Non-owning bus handle.
#[derive(Debug, Clone)]
pub struct WeakBus {
    inner: Weak<BusInner>,
}

impl WeakBus {
    /// The bus, if any strong handle is still alive.
    #[must_use]
    pub fn upgrade(&self) -> Option<Bus> {
        self.inner.upgrade().map(|inner| Bus { inner })
    }
}

impl Bus {
    /// Creates a bus and starts its async workers.
    #[must_use]
    pub fn new(config: BusConfig) -> Self {
        let inner = Arc::new_cyclic(|weak| BusInner {
            pool: WorkerPool::start(config.async_workers, config.async_queue_capacity, weak),
            config,
            registry: RwLock::new(Registry::default()),
            no_subscriber: AtomicU64::new(0),
            dropped: AtomicU64::new(0),
        });
        Self { inner }
    }

    /// The configuration this bus was built with.
    #[must_use]
    pub fn config(&self) -> &BusConfig {
        &self.inner.config
    }

    /// A handle that does not keep the bus alive.
    #[must_use]
    pub fn downgrade(&self) -> WeakBus {
        WeakBus {
            inner: Arc::downgrade(&self.inner),
        }
    }

    /// Registers `listener` for every message type it declares.
    ///
    /// Each call creates a new registration, even for a listener that is already
    /// registered; it then receives every message once per registration.
    pub fn register<L: Listener>(&self, listener: Arc<L>) -> ListenerId {
        let name = listener.name();
        let mut handlers = Handlers::new(listener);
        L::declare_handlers(&mut handlers);
        self.register_handlers(name, handlers)
    }

    pub(crate) fn register_handlers<L: Send + Sync + 'static>(
        &self,
        name: &'static str,
        handlers: Handlers<L>,
    ) -> ListenerId {
        if handlers.is_empty() {
            warn!(listener = name, "Listener declares no handlers");
        }
        let id = ListenerId::new();
        let owner = handlers.owner();
        let entries = handlers.into_entries();
        let count = entries.len();
        self.write_registry().insert(id, owner, name, entries);
        debug!(listener = name, %id, handlers = count, "Listener registered");
        id
    }

    /// Removes one registration. Returns false, with a warning, if `id` is unknown.
    ///
    /// A post already in flight skips the removed handlers from this point on.
    pub fn unregister(&self, id: ListenerId) -> bool {
        let removed = self.write_registry().remove(id);
        if removed {
            debug!(%id, "Listener unregistered");
        } else {
            warn!(%id, "Unregister called for a listener that was never registered");
        }
        removed
    }

    /// Removes every registration of this listener object. Returns how many were removed.
    pub fn unregister_all<L: ?Sized>(&self, listener: &Arc<L>) -> usize {
        let removed = {
            let mut registry = self.write_registry();
            let ids = registry.ids_for_owner(owner_of(listener));
            ids.into_iter().filter(|id| registry.remove(*id)).count()
        };
        if removed == 0 {
            warn!(
                listener = short_type_name::<L>(),
                "Unregister called for a listener that was never registered"
            );
        }
        removed
    }

    /// True if `id` is currently registered.
    #[must_use]
    pub fn is_registered(&self, id: ListenerId) -> bool {
        self.read_registry().contains(id)
    }

    /// True if at least one handler is registered for `E`.
    #[must_use]
    pub fn has_subscribers<E: 'static>(&self) -> bool {
        self.read_registry().has_route(TypeId::of::<E>())
    }

    /// Number of live registrations.
    #[must_use]
    pub fn listener_count(&self) -> usize {
        self.read_registry().listener_count()
    }

    /// Posts that matched no handler.
    #[must_use]
    pub fn no_subscriber_count(&self) -> u64 {
        self.inner.no_subscriber.load(Ordering::Relaxed)
    }

    /// Async deliveries rejected because the worker queue was full or closed.
    #[must_use]
    pub fn dropped_deliveries(&self) -> u64 {
        self.inner.dropped.load(Ordering::Relaxed)
    }

    /// Delivers `event` to every handler registered for its type.
    ///
    /// Sync handlers have completed when this returns; async handlers are queued.
    /// An async delivery the worker queue rejects is a failure like a sync
    /// handler error: returned with `fail_fast`, reported otherwise.
    pub fn post<E: Send + Sync + 'static>(&self, event: E) -> FluxResult<Delivery> {
        let ty = TypeId::of::<E>();
        let event_name = short_type_name::<E>();
        let subscriptions = self.read_registry().snapshot(ty);
        let event = Arc::new(event);

        let mut delivery = Delivery::new(event_name);
        let mut matched = 0usize;
        for sub in subscriptions {
            if !sub.is_active() {
                continue;
            }
            matched += 1;
            match sub.mode {
                ThreadMode::Sync => {
                    let erased: &(dyn Any + Send + Sync) = event.as_ref();
                    match sub.invoke(erased) {
                        Ok(()) => delivery.record_delivered(),
                        Err(source) => {
                            let err = FluxError::Handler {
                                listener: sub.listener_name,
                                event: event_name,
                                source,
                            };
                            if self.inner.config.fail_fast {
                                return Err(err);
                            }
                            self.report_failure(&sub, &err);
                        }
                    }
                }
                ThreadMode::Async => {
                    let shared: Arc<dyn Any + Send + Sync> = event.clone();
                    match self.inner.pool.submit(Arc::clone(&sub), shared) {
                        Ok(rx) => delivery.record_pending(rx),
                        Err(reason) => {
                            self.inner.dropped.fetch_add(1, Ordering::Relaxed);
                            delivery.record_dropped();
                            let err = FluxError::Delivery(reason);
                            if self.inner.config.fail_fast {
                                return Err(err);
                            }
                            self.report_failure(&sub, &err);
                        }
                    }
                }
            }
        }

        if matched == 0 {
            self.no_subscriber(ty, event_name)?;
        }
        Ok(delivery)
    }

    fn no_subscriber(&self, ty: TypeId, event_name: &'static str) -> FluxResult<()> {
        if is_notice(ty) {
            return Ok(());
        }
        self.inner.no_subscriber.fetch_add(1, Ordering::Relaxed);
        if self.inner.config.report_no_subscriber {
            warn!(event = event_name, "No subscribers registered for event {event_name}");
        }
        if self.inner.config.send_no_subscriber_event {
            self.post(NoSubscriberEvent { event_type: event_name })?;
        }
        Ok(())
    }

    /// Logs a failure that is not returned to the poster and re-posts it as a notice.
    pub(crate) fn report_failure(&self, sub: &Subscription, err: &FluxError) {
        error!(
            listener = sub.listener_name,
            event = sub.event_name,
            error = %err,
            "Handler failed"
        );
        if !self.inner.config.send_failure_event || is_notice(sub.event_type) {
            return;
        }
        let notice = SubscriberFailureEvent {
            listener: sub.listener_name,
            event_type: sub.event_name,
            message: err.to_string(),
        };
        if let Err(e) = self.post(notice) {
            warn!(error = %e, "Failure notice handler failed");
        }
    }

    fn read_registry(&self) -> RwLockReadGuard<'_, Registry> {
        // Handlers never run under this lock, so a poisoned registry is still consistent.
        self.inner.registry.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_registry(&self) -> RwLockWriteGuard<'_, Registry> {
        self.inner.registry.write().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for Bus {
    fn default() -> Self {
        Self::new(BusConfig::default())
    }
}

impl fmt::Debug for Bus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Bus")
            .field("config", &self.inner.config)
            .field("listeners", &self.listener_count())
            .field("no_subscriber", &self.no_subscriber_count())
            .field("dropped", &self.dropped_deliveries())
            .finish()
    }
}
