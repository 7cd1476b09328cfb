//! Routing table: message type → subscriptions in registration order.

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::error::HandlerResult;

use super::listener::{ErasedHandler, HandlerEntry, ListenerId, ThreadMode};

/// One handler of one registered listener.
pub(crate) struct Subscription {
    pub listener_id: ListenerId,
    pub listener_name: &'static str,
    pub event_type: TypeId,
    pub event_name: &'static str,
    pub mode: ThreadMode,
    handler: ErasedHandler,
    active: AtomicBool,
}

impl Subscription {
    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }

    fn deactivate(&self) {
        self.active.store(false, Ordering::Release);
    }

    pub fn invoke(&self, event: &(dyn Any + Send + Sync)) -> HandlerResult {
        (self.handler)(event)
    }
}

#[derive(Debug)]
struct ListenerRecord {
    owner: usize,
    event_types: Vec<TypeId>,
}

#[derive(Default)]
pub(crate) struct Registry {
    routes: HashMap<TypeId, Vec<Arc<Subscription>>>,
    listeners: HashMap<ListenerId, ListenerRecord>,
}

impl Registry {
    pub fn insert(&mut self, id: ListenerId, owner: usize, listener_name: &'static str, entries: Vec<HandlerEntry>) {
        let mut event_types = Vec::with_capacity(entries.len());
        for entry in entries {
            if !event_types.contains(&entry.event_type) {
                event_types.push(entry.event_type);
            }
            self.routes.entry(entry.event_type).or_default().push(Arc::new(Subscription {
                listener_id: id,
                listener_name,
                event_type: entry.event_type,
                event_name: entry.event_name,
                mode: entry.mode,
                handler: entry.handler,
                active: AtomicBool::new(true),
            }));
        }
        self.listeners.insert(id, ListenerRecord { owner, event_types });
    }

    /// Remove every subscription of `id`. Returns false if `id` is unknown.
    pub fn remove(&mut self, id: ListenerId) -> bool {
        let Some(record) = self.listeners.remove(&id) else {
            return false;
        };
        for ty in record.event_types {
            if let Some(subs) = self.routes.get_mut(&ty) {
                subs.retain(|sub| {
                    if sub.listener_id == id {
                        sub.deactivate();
                        false
                    } else {
                        true
                    }
                });
                if subs.is_empty() {
                    self.routes.remove(&ty);
                }
            }
        }
        true
    }

    pub fn ids_for_owner(&self, owner: usize) -> Vec<ListenerId> {
        self.listeners
            .iter()
            .filter(|(_, record)| record.owner == owner)
            .map(|(id, _)| *id)
            .collect()
    }

    /// Subscriptions for `ty`, in registration order.
    pub fn snapshot(&self, ty: TypeId) -> Vec<Arc<Subscription>> {
        self.routes.get(&ty).cloned().unwrap_or_default()
    }

    pub fn has_route(&self, ty: TypeId) -> bool {
        self.routes.contains_key(&ty)
    }

    pub fn contains(&self, id: ListenerId) -> bool {
        self.listeners.contains_key(&id)
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }
}
