use std::{collections::BTreeMap, fmt::Display};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::db_types::{Cents, Order, OrderId, Payment, ReconciliationAnomaly};

//--------------------------------------    ChargeRequest     ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChargeRequest {
    pub order_id: OrderId,
    pub amount: Cents,
    pub currency: String,
    pub description: String,
    /// Contact details for the payer, forwarded to the provider for receipts.
    pub payer_contact: Option<String>,
}

//--------------------------------------     ChargeHandle     ---------------------------------------------------------
/// What the buyer needs to complete a charge on the provider's hosted page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChargeHandle {
    pub charge_id: String,
    pub hosted_url: String,
    pub code: String,
    pub expires_at: Option<DateTime<Utc>>,
    /// Deposit address per network, e.g. `bitcoin -> bc1q…`
    pub addresses: BTreeMap<String, String>,
}

//--------------------------------------     RemoteStatus     ---------------------------------------------------------
/// The provider's view of a charge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RemoteStatus {
    New,
    Pending,
    Completed,
    Expired,
    Unresolved,
    Resolved,
    Canceled,
    Unknown(String),
}

impl Display for RemoteStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RemoteStatus::New => write!(f, "NEW"),
            RemoteStatus::Pending => write!(f, "PENDING"),
            RemoteStatus::Completed => write!(f, "COMPLETED"),
            RemoteStatus::Expired => write!(f, "EXPIRED"),
            RemoteStatus::Unresolved => write!(f, "UNRESOLVED"),
            RemoteStatus::Resolved => write!(f, "RESOLVED"),
            RemoteStatus::Canceled => write!(f, "CANCELED"),
            RemoteStatus::Unknown(s) => write!(f, "{s}"),
        }
    }
}

//--------------------------------------     RemoteCharge     ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteCharge {
    pub charge_id: String,
    pub status: RemoteStatus,
    pub confirmed_at: Option<DateTime<Utc>>,
    pub expires_at: Option<DateTime<Utc>>,
    /// On-chain payments detected by the provider, as it reports them.
    pub payments: Vec<Value>,
}

//--------------------------------------    ChargeSummary     ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChargeSummary {
    pub charge_id: String,
    /// The charge exactly as the provider listed it
    pub raw: Value,
}

//--------------------------------------   GatewayEventKind   ---------------------------------------------------------
/// One variant per event type the reconciler understands, plus a catch-all.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum GatewayEventKind {
    Created,
    Pending,
    Confirmed,
    Failed,
    Delayed,
    Resolved,
    Unrecognized(String),
}

impl Display for GatewayEventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GatewayEventKind::Created => write!(f, "charge:created"),
            GatewayEventKind::Pending => write!(f, "charge:pending"),
            GatewayEventKind::Confirmed => write!(f, "charge:confirmed"),
            GatewayEventKind::Failed => write!(f, "charge:failed"),
            GatewayEventKind::Delayed => write!(f, "charge:delayed"),
            GatewayEventKind::Resolved => write!(f, "charge:resolved"),
            GatewayEventKind::Unrecognized(s) => write!(f, "{s}"),
        }
    }
}

impl From<&RemoteStatus> for GatewayEventKind {
    fn from(status: &RemoteStatus) -> Self {
        match status {
            RemoteStatus::New => Self::Created,
            RemoteStatus::Pending => Self::Pending,
            RemoteStatus::Completed => Self::Confirmed,
            RemoteStatus::Resolved => Self::Resolved,
            RemoteStatus::Expired | RemoteStatus::Canceled => Self::Failed,
            RemoteStatus::Unresolved => Self::Delayed,
            RemoteStatus::Unknown(s) => Self::Unrecognized(s.clone()),
        }
    }
}

//--------------------------------------     GatewayEvent     ---------------------------------------------------------
/// A verified, provider-agnostic notification about a charge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GatewayEvent {
    /// Unique per delivery source. Replays carry the same id.
    pub event_id: String,
    pub kind: GatewayEventKind,
    /// The charge id, matched against [`Payment::reference`].
    pub charge_id: String,
}

impl GatewayEvent {
    pub fn new<S: Into<String>>(event_id: S, kind: GatewayEventKind, charge_id: S) -> Self {
        Self { event_id: event_id.into(), kind, charge_id: charge_id.into() }
    }

    /// Builds a synthetic event from a polled charge status. Polling the same status twice gives the same id, so the
    /// second poll is treated as a replay.
    pub fn from_remote(charge: &RemoteCharge) -> Self {
        let event_id = format!("poll:{}:{}", charge.charge_id, charge.status);
        Self { event_id, kind: GatewayEventKind::from(&charge.status), charge_id: charge.charge_id.clone() }
    }
}

//--------------------------------------   ReconcileOutcome   ---------------------------------------------------------
/// The result of applying a [`GatewayEvent`] to the ledger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// The event id had already been processed. Nothing was changed.
    Duplicate,
    /// The payment reached `Paid`. `order` is the updated order, or `None` if the order could not be moved.
    Paid { payment: Payment, order: Option<Order> },
    /// The payment reached `Failed`.
    Failed { payment: Payment },
    /// The event was valid but required no state change.
    NoChange { payment: Payment },
    /// The event type is not one the reconciler acts on.
    Ignored,
    /// The event was recorded for review instead of being applied.
    Anomaly(ReconciliationAnomaly),
}

impl ReconcileOutcome {
    /// Short label stored alongside the processed-event marker.
    pub fn label(&self) -> &'static str {
        match self {
            ReconcileOutcome::Duplicate => "Duplicate",
            ReconcileOutcome::Paid { .. } => "Paid",
            ReconcileOutcome::Failed { .. } => "Failed",
            ReconcileOutcome::NoChange { .. } => "NoChange",
            ReconcileOutcome::Ignored => "Ignored",
            ReconcileOutcome::Anomaly(_) => "Anomaly",
        }
    }
}
