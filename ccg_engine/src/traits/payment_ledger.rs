use chrono::Duration;

use crate::{
    db_types::{Order, OrderId, Payment, ProcessedEvent, ReconciliationAnomaly},
    traits::{GatewayEvent, LedgerError, ReconcileOutcome},
};

/// Durable storage for payments and the reconciliation state machine.
#[allow(async_fn_in_trait)]
pub trait PaymentLedger: Clone {
    /// The URL of the database
    fn url(&self) -> &str;

    /// Reserves the order for a new payment attempt, in a single atomic transaction.
    ///
    /// * The order must exist and belong to `buyer_id`, otherwise [`LedgerError::OrderNotFound`].
    /// * The order status must be `Pending`, otherwise [`LedgerError::OrderNotPending`].
    /// * No other `Pending` payment may exist for the order, otherwise [`LedgerError::ActivePaymentExists`]. A claim
    ///   that never received a gateway reference and is older than `stale_after` is considered abandoned and is
    ///   replaced.
    ///
    /// On success a `Pending` payment for the full order total is stored, with no reference yet.
    async fn claim_order_for_payment(
        &self,
        order_id: OrderId,
        buyer_id: i64,
        stale_after: Duration,
    ) -> Result<Payment, LedgerError>;

    /// Attaches the gateway charge id to a claimed payment. References are globally unique.
    async fn attach_payment_reference(&self, payment_id: i64, reference: &str) -> Result<Payment, LedgerError>;

    /// Deletes a claim that never received a reference, e.g. because the gateway call failed. Returns true if a claim
    /// was removed.
    async fn release_payment_claim(&self, payment_id: i64) -> Result<bool, LedgerError>;

    /// Fetches the payment with the given gateway reference, along with its order.
    async fn fetch_payment_by_reference(&self, reference: &str) -> Result<Option<(Payment, Order)>, LedgerError>;

    /// Fetches every payment whose reference is in `references`.
    async fn fetch_payments_by_references(&self, references: &[String]) -> Result<Vec<Payment>, LedgerError>;

    async fn fetch_payments_for_order(&self, order_id: OrderId) -> Result<Vec<Payment>, LedgerError>;

    /// Applies a verified gateway event, in a single atomic transaction.
    ///
    /// * The event id is recorded first. If it was already recorded, the call returns
    ///   [`ReconcileOutcome::Duplicate`] and changes nothing.
    /// * An unknown charge reference is recorded as an anomaly and otherwise ignored.
    /// * Otherwise the transition given by [`crate::transitions::plan`] is applied. A payment that is confirmed moves
    ///   to `Paid`, its order moves to `Paid` and the buyer's cart is emptied.
    ///
    /// If any write fails, nothing is committed (including the event marker), so a redelivery is processed afresh.
    async fn apply_gateway_event(&self, event: &GatewayEvent) -> Result<ReconcileOutcome, LedgerError>;

    async fn fetch_processed_event(&self, event_id: &str) -> Result<Option<ProcessedEvent>, LedgerError>;

    /// Anomalies recorded by the reconciler, newest first.
    async fn fetch_anomalies(&self) -> Result<Vec<ReconciliationAnomaly>, LedgerError>;
}
