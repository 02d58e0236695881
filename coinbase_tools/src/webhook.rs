//! Webhook signature verification for Coinbase Commerce.
//!
//! Coinbase signs every delivery with HMAC-SHA256 over the raw request body, keyed with the shared webhook secret, and
//! sends the hex digest in the `X-CC-Webhook-Signature` header.
//!
//! The digest must be computed over the exact bytes received. Parsing and re-serializing the JSON first changes
//! whitespace and key order, and the signature will no longer match.
use std::fmt::Display;

use ccg_common::Secret;
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use log::*;
use serde::Deserialize;
use sha2::Sha256;

use crate::{data_objects::Charge, error::WebhookError};

pub const SIGNATURE_HEADER: &str = "X-CC-Webhook-Signature";

type HmacSha256 = Hmac<Sha256>;

//--------------------------------------      EventType       ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventType {
    ChargeCreated,
    ChargePending,
    ChargeConfirmed,
    ChargeFailed,
    ChargeDelayed,
    ChargeResolved,
    Unrecognized(String),
}

impl From<&str> for EventType {
    fn from(value: &str) -> Self {
        match value {
            "charge:created" => Self::ChargeCreated,
            "charge:pending" => Self::ChargePending,
            "charge:confirmed" => Self::ChargeConfirmed,
            "charge:failed" => Self::ChargeFailed,
            "charge:delayed" => Self::ChargeDelayed,
            "charge:resolved" => Self::ChargeResolved,
            other => Self::Unrecognized(other.to_string()),
        }
    }
}

impl Display for EventType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ChargeCreated => write!(f, "charge:created"),
            Self::ChargePending => write!(f, "charge:pending"),
            Self::ChargeConfirmed => write!(f, "charge:confirmed"),
            Self::ChargeFailed => write!(f, "charge:failed"),
            Self::ChargeDelayed => write!(f, "charge:delayed"),
            Self::ChargeResolved => write!(f, "charge:resolved"),
            Self::Unrecognized(s) => write!(f, "{s}"),
        }
    }
}

//--------------------------------------     WebhookEvent     ---------------------------------------------------------
/// A verified webhook event.
#[derive(Debug, Clone)]
pub struct WebhookEvent {
    /// The provider's event id. Replays of the same delivery carry the same id.
    pub id: String,
    pub event_type: EventType,
    pub created_at: Option<DateTime<Utc>>,
    pub charge: Charge,
}

#[derive(Deserialize)]
struct Envelope {
    event: RawEvent,
}

#[derive(Deserialize)]
struct RawEvent {
    id: String,
    #[serde(rename = "type")]
    event_type: String,
    #[serde(default)]
    created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    data: Charge,
}

//--------------------------------------   WebhookVerifier    ---------------------------------------------------------
#[derive(Clone, Debug)]
pub struct WebhookVerifier {
    secret: Secret<String>,
}

impl WebhookVerifier {
    pub fn new(secret: Secret<String>) -> Self {
        Self { secret }
    }

    /// Checks the signature of `body` and returns the parsed event.
    ///
    /// Fails closed: an unconfigured secret, a missing or malformed header, and a mismatched digest are all errors.
    /// The payload is only parsed once the signature has been accepted.
    pub fn verify(&self, body: &[u8], signature: Option<&str>) -> Result<WebhookEvent, WebhookError> {
        if self.secret.is_empty() {
            warn!("🔐️ Webhook received, but no webhook secret is configured. Rejecting.");
            return Err(WebhookError::NotConfigured);
        }
        let signature = signature.map(str::trim).filter(|s| !s.is_empty()).ok_or_else(|| {
            warn!("🔐️ Webhook received without a signature. Rejecting.");
            WebhookError::MissingSignature
        })?;
        let expected = hex::decode(signature).map_err(|e| {
            warn!("🔐️ Webhook signature is not valid hex. {e}");
            WebhookError::MalformedSignature
        })?;
        let mut mac = HmacSha256::new_from_slice(self.secret.reveal().as_bytes())
            .map_err(|_| WebhookError::NotConfigured)?;
        mac.update(body);
        // verify_slice compares in constant time
        mac.verify_slice(&expected).map_err(|_| {
            warn!("🔐️ Invalid webhook signature. Rejecting {} byte payload.", body.len());
            WebhookError::InvalidSignature
        })?;
        trace!("🔐️ Webhook signature check ✅️");
        let envelope: Envelope =
            serde_json::from_slice(body).map_err(|e| WebhookError::InvalidPayload(e.to_string()))?;
        let RawEvent { id, event_type, created_at, data } = envelope.event;
        Ok(WebhookEvent { id, event_type: EventType::from(event_type.as_str()), created_at, charge: data })
    }
}

/// Computes the hex signature Coinbase would send for `body`.
pub fn sign_payload(secret: &str, body: &[u8]) -> String {
    // HMAC accepts keys of any length, so this cannot fail
    let mut mac = match HmacSha256::new_from_slice(secret.as_bytes()) {
        Ok(mac) => mac,
        Err(_) => return String::default(),
    };
    mac.update(body);
    hex::encode(mac.finalize().into_bytes())
}
