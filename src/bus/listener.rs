//! Listener declarations.
//!
//! A listener states, once per type, which message types it handles and on which
//! thread. Each declaration becomes one entry in the bus routing table.

use std::any::{Any, TypeId};
use std::fmt;
use std::sync::Arc;

use tracing::error;
use uuid::Uuid;

use crate::action::short_type_name;
use crate::error::HandlerResult;

/// Where a handler runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ThreadMode {
    /// On the posting thread, before `post` returns.
    #[default]
    Sync,
    /// On a background worker; `post` returns without waiting.
    Async,
}

/// Registration handle returned by `register`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(Uuid);

impl ListenerId {
    pub(crate) fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for ListenerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// An object that can be registered on a bus.
///
/// ```rust
/// use std::sync::atomic::{AtomicUsize, Ordering};
/// use fluxdispatch::{Handlers, Listener, ThreadMode};
///
/// struct Changed;
///
/// #[derive(Default)]
/// struct Badge {
///     refreshes: AtomicUsize,
/// }
///
/// impl Listener for Badge {
///     fn declare_handlers(handlers: &mut Handlers<Self>) {
///         handlers.on::<Changed, _>(ThreadMode::Sync, |badge, _| {
///             badge.refreshes.fetch_add(1, Ordering::SeqCst);
///             Ok(())
///         });
///     }
/// }
/// ```
pub trait Listener: Send + Sync + 'static {
    /// Declares the handlers of this listener type.
    fn declare_handlers(handlers: &mut Handlers<Self>)
    where
        Self: Sized;

    /// Name used in logs and handler errors.
    fn name(&self) -> &'static str {
        short_type_name::<Self>()
    }
}

pub(crate) type ErasedHandler = Arc<dyn Fn(&(dyn Any + Send + Sync)) -> HandlerResult + Send + Sync>;

pub(crate) struct HandlerEntry {
    pub event_type: TypeId,
    pub event_name: &'static str,
    pub mode: ThreadMode,
    pub handler: ErasedHandler,
}

/// Handler declarations collected for one listener instance.
pub struct Handlers<L> {
    listener: Arc<L>,
    entries: Vec<HandlerEntry>,
}

impl<L: Send + Sync + 'static> Handlers<L> {
    pub(crate) fn new(listener: Arc<L>) -> Self {
        Self {
            listener,
            entries: Vec::new(),
        }
    }

    /// Handle every posted `E` with `handler`, on the thread chosen by `mode`.
    ///
    /// Declaring the same type twice registers two handlers; both run.
    pub fn on<E, F>(&mut self, mode: ThreadMode, handler: F) -> &mut Self
    where
        E: Send + Sync + 'static,
        F: Fn(&L, &E) -> HandlerResult + Send + Sync + 'static,
    {
        let listener = Arc::clone(&self.listener);
        let erased: ErasedHandler = Arc::new(move |event: &(dyn Any + Send + Sync)| {
            // The routing table only hands a handler values of its own type.
            match event.downcast_ref::<E>() {
                Some(event) => handler(listener.as_ref(), event),
                None => {
                    let expected = short_type_name::<E>();
                    error!(expected, "Handler received a message of another type");
                    Err(format!("{expected} handler received a message of another type").into())
                }
            }
        });
        self.entries.push(HandlerEntry {
            event_type: TypeId::of::<E>(),
            event_name: short_type_name::<E>(),
            mode,
            handler: erased,
        });
        self
    }

    /// The listener these handlers are bound to.
    #[must_use]
    pub fn listener(&self) -> &Arc<L> {
        &self.listener
    }

    /// Number of declared handlers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True if nothing was declared.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub(crate) fn owner(&self) -> usize {
        owner_of(&self.listener)
    }

    pub(crate) fn into_entries(self) -> Vec<HandlerEntry> {
        self.entries
    }
}

/// Identity of a listener allocation, used for object-based unregistration.
pub(crate) fn owner_of<L: ?Sized>(listener: &Arc<L>) -> usize {
    Arc::as_ptr(listener).cast::<()>() as usize
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Probe;

    impl Listener for Probe {
        fn declare_handlers(handlers: &mut Handlers<Self>) {
            handlers
                .on::<u32, _>(ThreadMode::Sync, |_, _| Ok(()))
                .on::<String, _>(ThreadMode::Async, |_, _| Ok(()));
        }
    }

    #[test]
    fn declarations_become_entries() {
        let mut handlers = Handlers::new(Arc::new(Probe));
        Probe::declare_handlers(&mut handlers);
        assert_eq!(handlers.len(), 2);

        let entries = handlers.into_entries();
        assert_eq!(entries[0].event_type, TypeId::of::<u32>());
        assert_eq!(entries[0].mode, ThreadMode::Sync);
        assert_eq!(entries[1].event_name, "String");
        assert_eq!(entries[1].mode, ThreadMode::Async);
    }

    #[test]
    fn erased_handler_rejects_foreign_types() {
        let mut handlers = Handlers::new(Arc::new(Probe));
        handlers.on::<u32, _>(ThreadMode::Sync, |_, v| if *v == 7 { Err("seven".into()) } else { Ok(()) });
        let entry = handlers.into_entries().remove(0);

        let seven: &(dyn Any + Send + Sync) = &7u32;
        let one: &(dyn Any + Send + Sync) = &1u32;
        let text: &(dyn Any + Send + Sync) = &"not a u32";
        assert_eq!((entry.handler)(seven).unwrap_err().to_string(), "seven");
        assert!((entry.handler)(one).is_ok());
        let err = (entry.handler)(text).unwrap_err();
        assert!(err.to_string().contains("u32 handler received a message of another type"));
    }

    #[test]
    fn handlers_expose_their_listener() {
        let probe = Arc::new(Probe);
        let handlers = Handlers::new(Arc::clone(&probe));
        assert!(Arc::ptr_eq(handlers.listener(), &probe));
        assert!(handlers.is_empty());
    }

    #[test]
    fn owner_is_per_allocation() {
        let a = Arc::new(Probe);
        let b = Arc::new(Probe);
        assert_eq!(owner_of(&a), owner_of(&Arc::clone(&a)));
        assert_ne!(owner_of(&a), owner_of(&b));
    }

    #[test]
    fn default_name_is_short() {
        assert_eq!(Probe.name(), "Probe");
    }
}
