//! The payment state machine.
//!
//! A payment starts `Pending` and moves to exactly one of the terminal states, `Paid` or `Failed`. Gateway events are
//! mapped onto that machine as follows:
//!
//! | Event \ Payment         | Pending      | Paid           | Failed         |
//! |-------------------------|--------------|----------------|----------------|
//! | confirmed / resolved    | MarkPaid     | AlreadyApplied | Regression     |
//! | failed                  | MarkFailed   | Regression     | AlreadyApplied |
//! | pending                 | StillPending | Regression     | Regression     |
//! | created / delayed       | Informational| Informational  | Informational  |
//! | anything else           | Ignore       | Ignore         | Ignore         |
//!
//! `Regression` never changes state. It is recorded as an anomaly so that someone can look at it.
//!
//! Events for a charge id the ledger does not know are anomalies, except for `created` and unrecognised types, which
//! are ignored.
use crate::{db_types::PaymentStatus, traits::GatewayEventKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// Payment `Pending → Paid`, order `Pending → Paid`, buyer's cart emptied.
    MarkPaid,
    /// Payment `Pending → Failed`. The order is left for follow-up.
    MarkFailed,
    /// A repeated "still pending" report. Nothing changes.
    StillPending,
    /// The event would take a terminal payment back to the state it already has.
    AlreadyApplied,
    /// The event would move a terminal payment somewhere else.
    Regression,
    /// Logged, never applied.
    Informational,
    /// Not an event type the reconciler knows.
    Ignore,
}

impl Transition {
    pub fn changes_state(&self) -> bool {
        matches!(self, Transition::MarkPaid | Transition::MarkFailed)
    }
}

/// Decides what an event means for a payment in state `current`.
pub fn plan(current: PaymentStatus, event: &GatewayEventKind) -> Transition {
    use GatewayEventKind::*;
    match (event, current) {
        (Confirmed | Resolved, PaymentStatus::Pending) => Transition::MarkPaid,
        (Confirmed | Resolved, PaymentStatus::Paid) => Transition::AlreadyApplied,
        (Confirmed | Resolved, PaymentStatus::Failed) => Transition::Regression,
        (Failed, PaymentStatus::Pending) => Transition::MarkFailed,
        (Failed, PaymentStatus::Failed) => Transition::AlreadyApplied,
        (Failed, PaymentStatus::Paid) => Transition::Regression,
        (Pending, PaymentStatus::Pending) => Transition::StillPending,
        (Pending, PaymentStatus::Paid | PaymentStatus::Failed) => Transition::Regression,
        (Created | Delayed, _) => Transition::Informational,
        (Unrecognized(_), _) => Transition::Ignore,
    }
}
