use std::fmt::Debug;

use log::*;

use crate::{
    ccg_api::errors::CheckoutError,
    db_types::{Order, OrderId},
    traits::CheckoutManagement,
};

/// `CheckoutApi` turns a buyer's cart into an order and serves the order history.
pub struct CheckoutApi<B> {
    db: B,
    currency: String,
}

impl<B> Debug for CheckoutApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "CheckoutApi ({})", self.currency)
    }
}

impl<B> CheckoutApi<B> {
    /// All orders created through this API are denominated in `currency`.
    pub fn new(db: B, currency: &str) -> Self {
        Self { db, currency: currency.to_string() }
    }
}

impl<B> CheckoutApi<B>
where B: CheckoutManagement
{
    /// Checks out the buyer's cart. See [`CheckoutManagement::checkout_cart`] for the guarantees.
    pub async fn checkout(&self, buyer_id: i64, shipping_address: Option<String>) -> Result<Order, CheckoutError> {
        let shipping_address = shipping_address.map(|s| s.trim().to_string()).filter(|s| !s.is_empty());
        let order = self.db.checkout_cart(buyer_id, &self.currency, shipping_address).await.map_err(|e| {
            debug!("🧾️ Checkout for buyer #{buyer_id} failed. {e}");
            CheckoutError::from(e)
        })?;
        info!("🧾️ Buyer #{buyer_id} checked out order {} for {} {}", order.id, order.total, order.currency);
        Ok(order)
    }

    pub async fn orders_for_buyer(&self, buyer_id: i64) -> Result<Vec<Order>, CheckoutError> {
        let orders = self.db.fetch_orders_for_buyer(buyer_id).await?;
        Ok(orders)
    }

    /// Fetches an order on behalf of a caller. Orders that belong to someone else are reported as not found, unless
    /// the caller is an administrator.
    pub async fn order_for_buyer(&self, order_id: OrderId, buyer_id: i64, is_admin: bool) -> Result<Order, CheckoutError> {
        match self.db.fetch_order(order_id).await? {
            Some(order) if is_admin || order.buyer_id == buyer_id => Ok(order),
            _ => Err(CheckoutError::OrderNotFound(order_id)),
        }
    }

    pub async fn all_orders(&self) -> Result<Vec<Order>, CheckoutError> {
        let orders = self.db.fetch_all_orders().await?;
        Ok(orders)
    }
}
