//! Binds the Coinbase Commerce client to the engine's [`PaymentGateway`] abstraction.
use ccg_engine::traits::{
    ChargeHandle,
    ChargeRequest,
    ChargeSummary,
    GatewayError,
    GatewayEvent,
    GatewayEventKind,
    PaymentGateway,
    RemoteCharge,
    RemoteStatus,
};
use coinbase_tools::{
    Charge,
    ChargeStatus,
    CoinbaseApi,
    CoinbaseApiError,
    CoinbaseConfig,
    EventType,
    Money,
    NewCharge,
    WebhookEvent,
};
use log::*;

#[derive(Clone)]
pub struct CoinbaseGateway {
    api: Option<CoinbaseApi>,
}

impl CoinbaseGateway {
    /// A gateway without credentials is still usable. It reports itself as unconfigured and every call fails with
    /// [`GatewayError::Unavailable`].
    pub fn new(config: CoinbaseConfig) -> Self {
        let api = match CoinbaseApi::new(config) {
            Ok(api) => Some(api),
            Err(CoinbaseApiError::NotConfigured) => {
                warn!("🔄️ Coinbase Commerce is not configured. Crypto payments are disabled.");
                None
            },
            Err(e) => {
                error!("🔄️ Could not create the Coinbase Commerce client. Crypto payments are disabled. {e}");
                None
            },
        };
        Self { api }
    }

    fn api(&self) -> Result<&CoinbaseApi, GatewayError> {
        self.api.as_ref().ok_or_else(|| GatewayError::Unavailable(CoinbaseApiError::NotConfigured.to_string()))
    }
}

impl PaymentGateway for CoinbaseGateway {
    fn is_configured(&self) -> bool {
        self.api.is_some()
    }

    async fn create_charge(&self, request: ChargeRequest) -> Result<ChargeHandle, GatewayError> {
        let api = self.api()?;
        let config = api.config();
        let mut new_charge = NewCharge::fixed_price(
            format!("Order {}", request.order_id),
            request.description,
            Money::new(request.amount, request.currency),
        )
        .with_metadata("order_id", request.order_id.value().to_string())
        .with_redirects(config.redirect_url.clone(), config.cancel_url.clone());
        if let Some(contact) = request.payer_contact {
            new_charge = new_charge.with_metadata("customer_email", contact);
        }
        let charge = api.create_charge(&new_charge).await.map_err(gateway_error)?;
        trace!("🔄️ Coinbase charge {} created for order {}", charge.id, request.order_id);
        Ok(ChargeHandle {
            charge_id: charge.id,
            hosted_url: charge.hosted_url,
            code: charge.code,
            expires_at: charge.expires_at,
            addresses: charge.addresses,
        })
    }

    async fn query_charge(&self, charge_id: &str) -> Result<RemoteCharge, GatewayError> {
        let charge = self.api()?.get_charge(charge_id).await.map_err(gateway_error)?;
        Ok(remote_charge(charge))
    }

    async fn list_charges(&self) -> Result<Vec<ChargeSummary>, GatewayError> {
        let charges = self.api()?.list_charges().await.map_err(gateway_error)?;
        let summaries = charges
            .into_iter()
            .filter_map(|raw| {
                let charge_id = raw.get("id").and_then(|v| v.as_str()).map(String::from);
                if charge_id.is_none() {
                    warn!("🔄️ Skipping a listed charge without an id");
                }
                charge_id.map(|charge_id| ChargeSummary { charge_id, raw })
            })
            .collect();
        Ok(summaries)
    }
}

fn gateway_error(e: CoinbaseApiError) -> GatewayError {
    if e.is_configuration_problem() {
        GatewayError::Unavailable(e.to_string())
    } else if e.is_transient() {
        GatewayError::Transient(e.to_string())
    } else if matches!(e, CoinbaseApiError::JsonError(_)) {
        GatewayError::InvalidResponse(e.to_string())
    } else {
        GatewayError::Rejected(e.to_string())
    }
}

pub fn remote_status(status: ChargeStatus) -> RemoteStatus {
    match status {
        ChargeStatus::New => RemoteStatus::New,
        ChargeStatus::Pending => RemoteStatus::Pending,
        ChargeStatus::Completed => RemoteStatus::Completed,
        ChargeStatus::Expired => RemoteStatus::Expired,
        ChargeStatus::Unresolved => RemoteStatus::Unresolved,
        ChargeStatus::Resolved => RemoteStatus::Resolved,
        ChargeStatus::Canceled => RemoteStatus::Canceled,
        ChargeStatus::Other(s) => RemoteStatus::Unknown(s),
    }
}

pub fn remote_charge(charge: Charge) -> RemoteCharge {
    RemoteCharge {
        status: remote_status(charge.status()),
        charge_id: charge.id,
        confirmed_at: charge.confirmed_at,
        expires_at: charge.expires_at,
        payments: charge.payments,
    }
}

/// Converts a verified webhook event into the provider-agnostic form the reconciler works with. Events that do not
/// name a charge return `None`.
pub fn gateway_event(event: &WebhookEvent) -> Option<GatewayEvent> {
    if event.charge.id.trim().is_empty() {
        return None;
    }
    let kind = match &event.event_type {
        EventType::ChargeCreated => GatewayEventKind::Created,
        EventType::ChargePending => GatewayEventKind::Pending,
        EventType::ChargeConfirmed => GatewayEventKind::Confirmed,
        EventType::ChargeFailed => GatewayEventKind::Failed,
        EventType::ChargeDelayed => GatewayEventKind::Delayed,
        EventType::ChargeResolved => GatewayEventKind::Resolved,
        EventType::Unrecognized(s) => GatewayEventKind::Unrecognized(s.clone()),
    };
    Some(GatewayEvent::new(event.id.clone(), kind, event.charge.id.clone()))
}
