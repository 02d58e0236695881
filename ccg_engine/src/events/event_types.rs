use serde::{Deserialize, Serialize};

use crate::db_types::{Order, Payment, ReconciliationAnomaly};

/// A payment was confirmed and its order moved to `Paid`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderPaidEvent {
    pub order: Order,
    pub payment: Payment,
}

impl OrderPaidEvent {
    pub fn new(order: Order, payment: Payment) -> Self {
        Self { order, payment }
    }
}

/// A payment reached `Failed`. The order stays `Pending` and may be paid again.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentFailedEvent {
    pub payment: Payment,
}

impl PaymentFailedEvent {
    pub fn new(payment: Payment) -> Self {
        Self { payment }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnomalyEvent {
    pub anomaly: ReconciliationAnomaly,
}

impl AnomalyEvent {
    pub fn new(anomaly: ReconciliationAnomaly) -> Self {
        Self { anomaly }
    }
}
