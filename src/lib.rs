//! # fluxdispatch - action dispatch and change notification
//!
//! fluxdispatch is the in-process core of a unidirectional data flow: actions flow
//! into stores through one [`Dispatcher`], and stores announce their changes back
//! through the same bus to whoever listens.
//!
//! ## Core Concepts
//!
//! - **Action**: an immutable message saying "something happened"; one enum per family
//! - **Store**: long-lived state that reacts to actions and emits change events
//! - **Listener**: any registered object declaring typed handlers
//! - **Bus**: the type-routed publish/subscribe broker behind the dispatcher
//! - **ThreadMode**: per handler, run on the posting thread or on a background worker
//!
//! ## Usage
//!
//! ```rust
//! use std::sync::atomic::{AtomicI64, Ordering};
//! use fluxdispatch::{
//!     Action, ChangeEmitter, ChangeEvent, Dispatcher, HandlerResult, Store, ThreadMode,
//! };
//!
//! #[derive(Debug)]
//! enum CounterAction {
//!     Increment,
//! }
//!
//! impl Action for CounterAction {
//!     fn variant_name(&self) -> &'static str {
//!         "Increment"
//!     }
//! }
//!
//! struct OnCounterChanged(i64);
//!
//! impl ChangeEvent for OnCounterChanged {
//!     type Error = std::convert::Infallible;
//! }
//!
//! struct CounterStore {
//!     emitter: ChangeEmitter,
//!     count: AtomicI64,
//! }
//!
//! impl Store for CounterStore {
//!     type Action = CounterAction;
//!     const ACTION_MODE: ThreadMode = ThreadMode::Sync;
//!
//!     fn on_action(&self, action: &CounterAction) -> HandlerResult {
//!         match action {
//!             CounterAction::Increment => {
//!                 let now = self.count.fetch_add(1, Ordering::SeqCst) + 1;
//!                 self.emitter.emit_change(OnCounterChanged(now))?;
//!             }
//!         }
//!         Ok(())
//!     }
//!
//!     fn on_register(&self) {
//!         self.count.store(0, Ordering::SeqCst);
//!     }
//! }
//!
//! let dispatcher = Dispatcher::new();
//! let counter = dispatcher.register_store(|emitter| CounterStore {
//!     emitter,
//!     count: AtomicI64::new(-1),
//! });
//!
//! dispatcher.dispatch(CounterAction::Increment)?;
//! assert_eq!(counter.count.load(Ordering::SeqCst), 1);
//! # Ok::<(), fluxdispatch::FluxError>(())
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod action;
pub mod bus;
pub mod config;
pub mod dispatcher;
#[allow(missing_docs)]
pub mod error;
pub mod store;

/// `tracing` target for dispatch diagnostics.
pub const LOG_TARGET: &str = "fluxdispatch::api";

// Re-export primary types at crate root for convenience
pub use action::{short_type_name, Action, ChangeEvent};
pub use bus::{
    Bus, Delivery, Handlers, Listener, ListenerId, NoSubscriberEvent, SubscriberFailureEvent, ThreadMode,
    WeakBus,
};
pub use config::{BusConfig, DispatcherConfig};
pub use dispatcher::Dispatcher;
pub use error::{BoxError, DeliveryError, FluxError, FluxResult, HandlerResult};
pub use store::{ChangeEmitter, Store, StoreHandle};
