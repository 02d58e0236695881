use std::fmt::Debug;

use log::*;

use crate::{
    db_types::{Order, Payment, ProcessedEvent, ReconciliationAnomaly},
    events::{AnomalyEvent, EventProducers, OrderPaidEvent, PaymentFailedEvent},
    traits::{GatewayEvent, LedgerError, PaymentLedger, ReconcileOutcome, RemoteCharge},
};

/// `ReconciliationApi` applies verified gateway events to the ledger.
///
/// Each event is applied in a single transaction by the backend (see [`PaymentLedger::apply_gateway_event`]). Only
/// after that transaction has committed are subscribers notified, and only then should the caller acknowledge the
/// event to the provider. If this method returns an error, nothing was applied and the event must not be
/// acknowledged, so that the provider delivers it again.
pub struct ReconciliationApi<B> {
    db: B,
    producers: EventProducers,
}

impl<B> Debug for ReconciliationApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ReconciliationApi")
    }
}

impl<B> ReconciliationApi<B> {
    pub fn new(db: B, producers: EventProducers) -> Self {
        Self { db, producers }
    }
}

impl<B> ReconciliationApi<B>
where B: PaymentLedger
{
    pub async fn apply_event(&self, event: &GatewayEvent) -> Result<ReconcileOutcome, LedgerError> {
        trace!("🔄️ Applying event {} ({}) for charge {}", event.event_id, event.kind, event.charge_id);
        let outcome = self.db.apply_gateway_event(event).await.map_err(|e| {
            error!("🔄️ Event {} could not be applied and was rolled back. {e}", event.event_id);
            e
        })?;
        match &outcome {
            ReconcileOutcome::Duplicate => {
                debug!("🔄️ Event {} is a replay. Nothing to do.", event.event_id);
            },
            ReconcileOutcome::Paid { payment, order } => {
                info!("🔄️ Charge {} is paid (payment #{})", event.charge_id, payment.id);
                if let Some(order) = order {
                    self.call_order_paid_hook(order, payment);
                }
            },
            ReconcileOutcome::Failed { payment } => {
                info!("🔄️ Charge {} failed (payment #{})", event.charge_id, payment.id);
                for emitter in &self.producers.payment_failed_producer {
                    emitter.publish(PaymentFailedEvent::new(payment.clone()));
                }
            },
            ReconcileOutcome::NoChange { payment } => {
                debug!("🔄️ Event {} leaves payment #{} {}", event.kind, payment.id, payment.status);
            },
            ReconcileOutcome::Ignored => {
                debug!("🔄️ Event {} has type {}, which is ignored", event.event_id, event.kind);
            },
            ReconcileOutcome::Anomaly(anomaly) => {
                warn!("🔄️ Reconciliation anomaly #{} ({}): {}", anomaly.id, anomaly.kind, anomaly.detail);
                for emitter in &self.producers.anomaly_producer {
                    emitter.publish(AnomalyEvent::new(anomaly.clone()));
                }
            },
        }
        Ok(outcome)
    }

    /// Applies a polled charge status through the same state machine as webhook events. Polling the same status twice
    /// is treated as a replay.
    pub async fn apply_remote_status(&self, charge: &RemoteCharge) -> Result<ReconcileOutcome, LedgerError> {
        let event = GatewayEvent::from_remote(charge);
        self.apply_event(&event).await
    }

    pub async fn processed_event(&self, event_id: &str) -> Result<Option<ProcessedEvent>, LedgerError> {
        self.db.fetch_processed_event(event_id).await
    }

    pub async fn anomalies(&self) -> Result<Vec<ReconciliationAnomaly>, LedgerError> {
        self.db.fetch_anomalies().await
    }

    fn call_order_paid_hook(&self, order: &Order, payment: &Payment) {
        for emitter in &self.producers.order_paid_producer {
            debug!("🔄️ Notifying order paid hook subscribers");
            emitter.publish(OrderPaidEvent::new(order.clone(), payment.clone()));
        }
    }
}
