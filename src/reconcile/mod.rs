//! Event-driven reconciliation of distributed client caches

mod channel;
mod event;
mod reconciler;

pub use channel::{Delivery, EventBus, Subscription};
pub use event::{topic, Event, EventPayload};
pub use reconciler::{ReconcileError, ReconcileResult, Reconciler, Refresh};
