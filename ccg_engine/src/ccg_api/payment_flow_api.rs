use std::fmt::Debug;

use chrono::Duration;
use log::*;

use crate::{
    ccg_api::{
        errors::PaymentFlowError,
        payment_objects::{ChargeListing, PaymentIntent, PaymentStatusReport},
    },
    db_types::{OrderId, OrderStatusType},
    traits::{CheckoutManagement, ChargeRequest, PaymentGateway, PaymentLedger, RemoteCharge},
};

pub const DEFAULT_SHOP_NAME: &str = "Shop";
pub const DEFAULT_CLAIM_TIMEOUT_SECS: i64 = 120;

/// `PaymentFlowApi` takes a pending order and obtains a hosted payment for it from the payment gateway.
///
/// The gateway is never called while a database transaction is open. Instead, the order is first *claimed*: a
/// `Pending` payment row without a reference is committed, which the ledger guarantees can exist at most once per
/// order. Only then is the charge created. If the gateway call fails the claim is released so the buyer can retry; if
/// it succeeds the charge id is attached to the claim.
pub struct PaymentFlowApi<B, G> {
    db: B,
    gateway: G,
    shop_name: String,
    claim_timeout: Duration,
}

impl<B, G> Debug for PaymentFlowApi<B, G> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "PaymentFlowApi ({})", self.shop_name)
    }
}

impl<B, G> PaymentFlowApi<B, G> {
    pub fn new(db: B, gateway: G) -> Self {
        Self {
            db,
            gateway,
            shop_name: DEFAULT_SHOP_NAME.to_string(),
            claim_timeout: Duration::seconds(DEFAULT_CLAIM_TIMEOUT_SECS),
        }
    }

    pub fn with_shop_name(mut self, shop_name: &str) -> Self {
        self.shop_name = shop_name.to_string();
        self
    }

    /// Claims older than this that never received a charge id are considered abandoned and may be replaced.
    pub fn with_claim_timeout(mut self, timeout: Duration) -> Self {
        self.claim_timeout = timeout;
        self
    }
}

impl<B, G> PaymentFlowApi<B, G>
where
    B: PaymentLedger + CheckoutManagement,
    G: PaymentGateway,
{
    /// Creates a hosted crypto payment for one of the buyer's orders.
    ///
    /// Fails with
    /// * [`PaymentFlowError::NotFound`] if the order does not exist or belongs to someone else,
    /// * [`PaymentFlowError::OrderAlreadyProcessed`] if the order is no longer `Pending`,
    /// * [`PaymentFlowError::GatewayUnavailable`] if no gateway credentials are configured,
    /// * [`PaymentFlowError::PaymentInProgress`] if another payment for the order is already active.
    pub async fn create_payment(
        &self,
        order_id: OrderId,
        buyer_id: i64,
        payer_contact: Option<String>,
    ) -> Result<PaymentIntent, PaymentFlowError> {
        let order = self
            .db
            .fetch_order(order_id)
            .await?
            .filter(|o| o.buyer_id == buyer_id)
            .ok_or_else(|| PaymentFlowError::NotFound(format!("Order {order_id}")))?;
        if order.status != OrderStatusType::Pending {
            return Err(PaymentFlowError::OrderAlreadyProcessed(order.id, order.status));
        }
        if !self.gateway.is_configured() {
            warn!("🔄️ Buyer #{buyer_id} asked to pay order {order_id}, but the payment gateway is not configured");
            return Err(PaymentFlowError::GatewayUnavailable("No payment gateway credentials are configured".into()));
        }
        let claim = self.db.claim_order_for_payment(order_id, buyer_id, self.claim_timeout).await?;
        trace!("🔄️ Payment claim #{} committed for order {order_id}", claim.id);
        let request = ChargeRequest {
            order_id,
            amount: claim.amount,
            currency: order.currency.clone(),
            description: format!("{} order {order_id}", self.shop_name),
            payer_contact,
        };
        let charge = match self.gateway.create_charge(request).await {
            Ok(charge) => charge,
            Err(e) => {
                warn!("🔄️ Could not create a charge for order {order_id}. {e}");
                match self.db.release_payment_claim(claim.id).await {
                    Ok(true) => trace!("🔄️ Released payment claim #{}", claim.id),
                    Ok(false) => warn!("🔄️ Payment claim #{} had already been released", claim.id),
                    Err(e) => error!("🔄️ Could not release payment claim #{}. It will expire on its own. {e}", claim.id),
                }
                return Err(e.into());
            },
        };
        let payment = self.db.attach_payment_reference(claim.id, &charge.charge_id).await.map_err(|e| {
            error!(
                "🔄️ Charge {} was created for order {order_id}, but could not be recorded against payment #{}. {e}",
                charge.charge_id, claim.id
            );
            PaymentFlowError::from(e)
        })?;
        info!("🔄️ Charge {} ({}) created for order {order_id}. Amount: {}", charge.charge_id, charge.code, payment.amount);
        Ok(PaymentIntent::new(&order, &payment, charge))
    }

    /// Merges the gateway's live view of a charge with the local payment row. Only the owner of the order or an
    /// administrator may see it.
    pub async fn payment_status(
        &self,
        charge_id: &str,
        buyer_id: i64,
        is_admin: bool,
    ) -> Result<PaymentStatusReport, PaymentFlowError> {
        let (payment, order) = self
            .db
            .fetch_payment_by_reference(charge_id)
            .await?
            .filter(|(_, order)| is_admin || order.buyer_id == buyer_id)
            .ok_or_else(|| PaymentFlowError::NotFound(format!("Charge {charge_id}")))?;
        let remote = self.gateway.query_charge(charge_id).await?;
        trace!("🔄️ Charge {charge_id} is {} remotely and {} locally", remote.status, payment.status);
        Ok(PaymentStatusReport::new(remote, &payment, &order))
    }

    /// Fetches the gateway's current view of a charge, without touching the ledger.
    pub async fn query_remote(&self, charge_id: &str) -> Result<RemoteCharge, PaymentFlowError> {
        let remote = self.gateway.query_charge(charge_id).await?;
        Ok(remote)
    }

    /// Lists the charges on the gateway account, each paired with the local payment that references it.
    pub async fn list_charges(&self) -> Result<Vec<ChargeListing>, PaymentFlowError> {
        let charges = self.gateway.list_charges().await?;
        let references = charges.iter().map(|c| c.charge_id.clone()).collect::<Vec<String>>();
        let mut payments = self.db.fetch_payments_by_references(&references).await?;
        let listing = charges
            .into_iter()
            .map(|c| {
                let payment = payments
                    .iter()
                    .position(|p| p.reference.as_deref() == Some(c.charge_id.as_str()))
                    .map(|i| payments.swap_remove(i));
                ChargeListing { charge_id: c.charge_id, charge: c.raw, payment }
            })
            .collect::<Vec<_>>();
        debug!("🔄️ {} charges listed", listing.len());
        Ok(listing)
    }
}
