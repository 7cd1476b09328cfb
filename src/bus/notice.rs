//! Notifications the bus posts about its own deliveries.

use std::any::TypeId;

/// Posted when a message matched no listener.
///
/// Only sent when `BusConfig::send_no_subscriber_event` is set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NoSubscriberEvent {
    /// Short type name of the unmatched message.
    pub event_type: &'static str,
}

/// Posted when a handler failure could not be returned to the poster.
///
/// This covers async handlers, and sync handlers when fail-fast is off.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubscriberFailureEvent {
    /// Name of the failing listener.
    pub listener: &'static str,
    /// Short type name of the message being handled.
    pub event_type: &'static str,
    /// Rendered error or panic message.
    pub message: String,
}

pub(crate) fn is_notice(ty: TypeId) -> bool {
    ty == TypeId::of::<NoSubscriberEvent>() || ty == TypeId::of::<SubscriberFailureEvent>()
}
