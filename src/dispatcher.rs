//! The dispatcher: single entry point for actions and change events.
//!
//! One dispatcher is built at application wiring time and handed to everything
//! that registers stores or dispatches actions. Clones share one bus.
//!
//! ```text
//! caller ── dispatch(action) ──► Bus ──► Store::on_action
//!                                 ▲            │
//!                                 │            ▼
//!                                 └── emit_change(event) ──► listeners
//! ```

use std::sync::Arc;

use tracing::debug;

use crate::action::Action;
use crate::bus::{Bus, Delivery, Handlers, Listener, ListenerId, WeakBus};
use crate::config::DispatcherConfig;
use crate::error::FluxResult;
use crate::store::{ChangeEmitter, Store, StoreHandle};
use crate::LOG_TARGET;

/// Routes actions to stores and change events to listeners.
///
/// The bus runs with a fixed policy: unmatched posts are reported and failing
/// handlers abort the call that triggered them.
#[derive(Debug, Clone)]
pub struct Dispatcher {
    bus: Bus,
}

impl Dispatcher {
    /// Creates a dispatcher with the default worker pool.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(&DispatcherConfig::default())
    }

    /// Creates a dispatcher with a custom worker pool.
    #[must_use]
    pub fn with_config(config: &DispatcherConfig) -> Self {
        Self {
            bus: Bus::new(config.bus_config()),
        }
    }

    /// The underlying bus.
    #[must_use]
    pub fn bus(&self) -> &Bus {
        &self.bus
    }

    /// Registers a plain listener (UI observers and the like).
    pub fn register<L: Listener>(&self, listener: Arc<L>) -> ListenerId {
        self.bus.register(listener)
    }

    /// Builds a store and registers it in one step, then runs its `on_register` hook.
    ///
    /// `build` receives the emitter the store uses to publish its changes.
    pub fn register_store<S, F>(&self, build: F) -> StoreHandle<S>
    where
        S: Store,
        F: FnOnce(ChangeEmitter) -> S,
    {
        let store = Arc::new(build(self.emitter()));
        let name = store.name();

        let mut handlers = Handlers::new(Arc::clone(&store));
        handlers.on::<S::Action, _>(S::ACTION_MODE, |store, action| store.on_action(action));
        S::declare_handlers(&mut handlers);
        let id = self.bus.register_handlers(name, handlers);

        store.on_register();
        debug!(store = name, %id, "Store registered");
        StoreHandle::new(id, store)
    }

    /// Removes a registration. No teardown hook runs for stores.
    pub fn unregister(&self, id: ListenerId) -> bool {
        self.bus.unregister(id)
    }

    /// Removes every registration of this listener or store object.
    pub fn unregister_all<L: ?Sized>(&self, listener: &Arc<L>) -> usize {
        self.bus.unregister_all(listener)
    }

    /// Logs and posts an action.
    ///
    /// Returns once every sync handler has run; the first failing handler's error
    /// is returned. Async handlers may still be pending. An async store whose
    /// worker queue is full does not get the action, and the call returns
    /// [`DeliveryError::QueueFull`](crate::DeliveryError::QueueFull).
    pub fn dispatch<A: Action>(&self, action: A) -> FluxResult<Delivery> {
        debug!(
            target: LOG_TARGET,
            "Dispatching action: {}-{}",
            action.type_name(),
            action.variant_name()
        );
        self.post(action)
    }

    /// Posts a change event. Safe to call from inside a handler.
    pub fn emit_change<E: Send + Sync + 'static>(&self, event: E) -> FluxResult<Delivery> {
        self.bus.post(event)
    }

    /// Emitter bound to this dispatcher's bus.
    #[must_use]
    pub fn emitter(&self) -> ChangeEmitter {
        ChangeEmitter::new(self.weak_bus())
    }

    fn weak_bus(&self) -> WeakBus {
        self.bus.downgrade()
    }

    fn post<E: Send + Sync + 'static>(&self, event: E) -> FluxResult<Delivery> {
        self.bus.post(event)
    }
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::atomic::{AtomicUsize, Ordering};

    use crate::bus::ThreadMode;
    use crate::error::HandlerResult;

    #[derive(Debug)]
    enum ProbeAction {
        Poke,
    }

    impl Action for ProbeAction {
        fn variant_name(&self) -> &'static str {
            "Poke"
        }
    }

    #[derive(Default)]
    struct ProbeStore {
        registered: AtomicUsize,
        actions: AtomicUsize,
    }

    impl Store for ProbeStore {
        type Action = ProbeAction;
        const ACTION_MODE: ThreadMode = ThreadMode::Sync;

        fn on_action(&self, _action: &ProbeAction) -> HandlerResult {
            self.actions.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        fn on_register(&self) {
            self.registered.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn register_store_registers_then_calls_hook_once() {
        let dispatcher = Dispatcher::new();
        let store = dispatcher.register_store(|_| ProbeStore::default());

        assert_eq!(store.registered.load(Ordering::SeqCst), 1);
        assert!(dispatcher.bus().is_registered(store.id()));

        dispatcher.dispatch(ProbeAction::Poke).unwrap();
        assert_eq!(store.actions.load(Ordering::SeqCst), 1);
        assert_eq!(store.registered.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn dispatcher_bus_is_fail_fast() {
        let dispatcher = Dispatcher::new();
        let cfg = dispatcher.bus().config();
        assert!(cfg.fail_fast);
        assert!(cfg.report_no_subscriber);
    }

    #[test]
    fn clones_share_one_bus() {
        let dispatcher = Dispatcher::new();
        let clone = dispatcher.clone();
        let store = clone.register_store(|_| ProbeStore::default());

        dispatcher.dispatch(ProbeAction::Poke).unwrap();
        assert_eq!(store.actions.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn emitter_outliving_dispatcher_reports_dropped() {
        struct Done;
        impl crate::action::ChangeEvent for Done {
            type Error = std::convert::Infallible;
        }

        let emitter = Dispatcher::new().emitter();
        let err = emitter.emit_change(Done).unwrap_err();
        assert!(matches!(err, crate::error::FluxError::DispatcherDropped));
    }
}
