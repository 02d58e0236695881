use std::{collections::BTreeMap, fmt::Display, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

//--------------------------------------        Money         ---------------------------------------------------------
/// An amount as Coinbase represents it: a decimal string plus a currency code.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Money {
    pub amount: String,
    pub currency: String,
}

impl Money {
    pub fn new<A: Display, C: Into<String>>(amount: A, currency: C) -> Self {
        Self { amount: amount.to_string(), currency: currency.into() }
    }
}

//--------------------------------------      NewCharge       ---------------------------------------------------------
/// The body of a `POST /charges` request.
#[derive(Debug, Clone, Serialize)]
pub struct NewCharge {
    pub name: String,
    pub description: String,
    pub pricing_type: String,
    pub local_price: Money,
    pub metadata: BTreeMap<String, String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub redirect_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cancel_url: Option<String>,
}

impl NewCharge {
    /// A fixed-price charge. The amount the buyer must settle is fixed in `local_price`.
    pub fn fixed_price<S: Into<String>>(name: S, description: S, local_price: Money) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            pricing_type: "fixed_price".to_string(),
            local_price,
            metadata: BTreeMap::new(),
            redirect_url: None,
            cancel_url: None,
        }
    }

    pub fn with_metadata<K: Into<String>, V: Into<String>>(mut self, key: K, value: V) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    pub fn with_redirects(mut self, redirect_url: Option<String>, cancel_url: Option<String>) -> Self {
        self.redirect_url = redirect_url;
        self.cancel_url = cancel_url;
        self
    }
}

//--------------------------------------    TimelineEntry     ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimelineEntry {
    pub time: DateTime<Utc>,
    pub status: ChargeStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
}

//--------------------------------------     ChargeStatus     ---------------------------------------------------------
/// The status of a charge as recorded in its timeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ChargeStatus {
    New,
    Pending,
    Completed,
    Expired,
    Unresolved,
    Resolved,
    Canceled,
    Other(String),
}

impl FromStr for ChargeStatus {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::from(s.to_string()))
    }
}

impl From<String> for ChargeStatus {
    fn from(value: String) -> Self {
        match value.to_ascii_uppercase().as_str() {
            "NEW" => Self::New,
            "PENDING" => Self::Pending,
            "COMPLETED" => Self::Completed,
            "EXPIRED" => Self::Expired,
            "UNRESOLVED" => Self::Unresolved,
            "RESOLVED" => Self::Resolved,
            "CANCELED" | "CANCELLED" => Self::Canceled,
            _ => Self::Other(value),
        }
    }
}

impl From<ChargeStatus> for String {
    fn from(value: ChargeStatus) -> Self {
        value.to_string()
    }
}

impl Display for ChargeStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::New => write!(f, "NEW"),
            Self::Pending => write!(f, "PENDING"),
            Self::Completed => write!(f, "COMPLETED"),
            Self::Expired => write!(f, "EXPIRED"),
            Self::Unresolved => write!(f, "UNRESOLVED"),
            Self::Resolved => write!(f, "RESOLVED"),
            Self::Canceled => write!(f, "CANCELED"),
            Self::Other(s) => write!(f, "{s}"),
        }
    }
}

//--------------------------------------        Charge        ---------------------------------------------------------
/// A Coinbase Commerce charge. Only the fields the gateway relies on are typed; `payments` is kept verbatim.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Charge {
    pub id: String,
    pub code: String,
    pub name: Option<String>,
    pub description: Option<String>,
    pub hosted_url: String,
    pub created_at: Option<DateTime<Utc>>,
    pub expires_at: Option<DateTime<Utc>>,
    pub confirmed_at: Option<DateTime<Utc>>,
    pub pricing: BTreeMap<String, Money>,
    pub addresses: BTreeMap<String, String>,
    pub metadata: BTreeMap<String, Value>,
    pub timeline: Vec<TimelineEntry>,
    pub payments: Vec<Value>,
}

impl Charge {
    /// The most recent timeline status, or `NEW` for a charge without any timeline yet.
    pub fn status(&self) -> ChargeStatus {
        self.timeline.last().map(|t| t.status.clone()).unwrap_or(ChargeStatus::New)
    }

    /// The `order_id` stored in the charge metadata. Accepts either a JSON number or a numeric string.
    pub fn order_id(&self) -> Option<i64> {
        match self.metadata.get("order_id")? {
            Value::Number(n) => n.as_i64(),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }
}
