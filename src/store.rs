//! Stores: long-lived state owners that react to actions and announce changes.
//!
//! A store is never constructed on its own. [`Dispatcher::register_store`]
//! builds it from a factory and registers it in one step, so a store that exists
//! is always reachable by `dispatch`.
//!
//! [`Dispatcher::register_store`]: crate::Dispatcher::register_store

use std::fmt;
use std::ops::Deref;
use std::sync::Arc;

use crate::action::{short_type_name, Action, ChangeEvent};
use crate::bus::{Delivery, Handlers, ListenerId, ThreadMode, WeakBus};
use crate::error::{FluxError, FluxResult, HandlerResult};

/// A unit of domain state driven by one action type.
///
/// The store owns its state and its synchronization: with [`ThreadMode::Async`]
/// (the default) `on_action` runs on a background worker, possibly while other
/// threads read the store.
pub trait Store: Send + Sync + 'static {
    /// The action enum this store reacts to.
    type Action: Action;

    /// Where `on_action` runs.
    const ACTION_MODE: ThreadMode = ThreadMode::Async;

    /// Reacts to one dispatched action.
    ///
    /// Expected to emit a change event whenever visible state changed.
    fn on_action(&self, action: &Self::Action) -> HandlerResult;

    /// Runs once, right after the store was registered.
    ///
    /// Registration happens first, so an async action dispatched concurrently
    /// from another thread may reach `on_action` before this hook has finished.
    fn on_register(&self);

    /// Extra subscriptions, e.g. change events of other stores.
    fn declare_handlers(handlers: &mut Handlers<Self>)
    where
        Self: Sized,
    {
        let _ = handlers;
    }

    /// Name used in logs and handler errors.
    fn name(&self) -> &'static str {
        short_type_name::<Self>()
    }
}

/// Publishes change events through the dispatcher a store was registered with.
///
/// Holds only a weak reference, so a store keeping its emitter does not keep the
/// bus alive.
#[derive(Debug, Clone)]
pub struct ChangeEmitter {
    bus: WeakBus,
}

impl ChangeEmitter {
    pub(crate) fn new(bus: WeakBus) -> Self {
        Self { bus }
    }

    /// Posts `event` to every listener registered for its type.
    pub fn emit_change<E: ChangeEvent>(&self, event: E) -> FluxResult<Delivery> {
        let bus = self.bus.upgrade().ok_or(FluxError::DispatcherDropped)?;
        bus.post(event)
    }
}

/// A registered store.
pub struct StoreHandle<S> {
    id: ListenerId,
    store: Arc<S>,
}

impl<S> StoreHandle<S> {
    pub(crate) fn new(id: ListenerId, store: Arc<S>) -> Self {
        Self { id, store }
    }

    /// The registration id, for [`Dispatcher::unregister`](crate::Dispatcher::unregister).
    #[must_use]
    pub const fn id(&self) -> ListenerId {
        self.id
    }

    /// Shared pointer to the store.
    #[must_use]
    pub fn store(&self) -> &Arc<S> {
        &self.store
    }
}

impl<S> Clone for StoreHandle<S> {
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            store: Arc::clone(&self.store),
        }
    }
}

impl<S> Deref for StoreHandle<S> {
    type Target = S;

    fn deref(&self) -> &S {
        &self.store
    }
}

impl<S> fmt::Debug for StoreHandle<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StoreHandle")
            .field("store", &short_type_name::<S>())
            .field("id", &self.id)
            .finish()
    }
}
