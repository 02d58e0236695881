use ccg_engine::{
    db_types::{Order, OrderId, ReconciliationAnomaly},
    traits::ReconcileOutcome,
};
use serde::{Deserialize, Serialize};

fn one() -> i64 {
    1
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AddItemRequest {
    pub product_id: i64,
    #[serde(default = "one")]
    pub quantity: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SetQuantityRequest {
    pub product_id: i64,
    pub quantity: i64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CheckoutRequest {
    #[serde(default)]
    pub shipping_address: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderResponse {
    pub order: Order,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreatePaymentRequest {
    pub order_id: OrderId,
}

/// The body returned to the provider once a webhook has been durably applied.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookAck {
    pub received: bool,
    /// The event type, e.g. `charge:confirmed`
    pub event: String,
    pub event_id: String,
    pub outcome: String,
}

impl WebhookAck {
    pub fn new<S: Into<String>>(event_type: S, event_id: S, outcome: &str) -> Self {
        Self { received: true, event: event_type.into(), event_id: event_id.into(), outcome: outcome.to_string() }
    }
}

/// The result of pulling a charge's status from the provider and applying it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReconcileResult {
    pub charge_id: String,
    pub remote_status: String,
    pub outcome: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub anomaly: Option<ReconciliationAnomaly>,
}

impl ReconcileResult {
    pub fn new(charge_id: String, remote_status: String, outcome: &ReconcileOutcome) -> Self {
        let anomaly = match outcome {
            ReconcileOutcome::Anomaly(a) => Some(a.clone()),
            _ => None,
        };
        Self { charge_id, remote_status, outcome: outcome.label().to_string(), anomaly }
    }
}
