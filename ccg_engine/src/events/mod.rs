//! Post-commit notifications.
//!
//! The reconciler publishes an event after each committed state change. Subscribers (fulfilment, notification
//! e-mails, alerting) register hooks via [`EventHooks`] and run on their own tasks, so a slow or failing hook can never
//! hold up a webhook acknowledgement or roll back a payment.
mod channel;
mod event_types;
mod hooks;

pub use channel::{Handler, HookSender, HookWorker};
pub use event_types::*;
pub use hooks::{EventHandlers, EventHooks, EventProducers};
