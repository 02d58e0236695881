//! `SqliteDatabase` is a concrete implementation of a checkout engine backend.
//!
//! Unsurprisingly, it uses SQLite as the backend and implements all the traits defined in the [`crate::traits`]
//! module.
use std::fmt::Debug;

use chrono::Duration;
use log::*;
use sqlx::{SqliteConnection, SqlitePool};

use super::db::{carts, db_url, events, new_pool, orders, payments, products};
use crate::{
    ccg_api::transitions::{plan, Transition},
    db_types::{
        AnomalyKind,
        Cart,
        CartItem,
        Cents,
        NewOrder,
        Order,
        OrderId,
        OrderStatusType,
        Payment,
        ProcessedEvent,
        Product,
        ReconciliationAnomaly,
    },
    traits::{
        CartManagement,
        CheckoutManagement,
        GatewayEvent,
        GatewayEventKind,
        LedgerError,
        PaymentLedger,
        ProductCatalog,
        ReconcileOutcome,
        MAX_LINE_QUANTITY,
    },
};

#[derive(Clone)]
pub struct SqliteDatabase {
    url: String,
    pool: SqlitePool,
}

impl Debug for SqliteDatabase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "SqliteDatabase ({:?})", self.pool)
    }
}

impl ProductCatalog for SqliteDatabase {
    async fn fetch_product(&self, product_id: i64) -> Result<Option<Product>, LedgerError> {
        let mut conn = self.pool.acquire().await?;
        let product = products::fetch_product(product_id, &mut conn).await?;
        Ok(product)
    }
}

impl CartManagement for SqliteDatabase {
    async fn ensure_cart(&self, buyer_id: i64) -> Result<Cart, LedgerError> {
        let mut conn = self.pool.acquire().await?;
        let cart = carts::ensure_cart(buyer_id, &mut conn).await?;
        Ok(cart)
    }

    async fn add_item(&self, buyer_id: i64, product_id: i64, quantity: i64) -> Result<CartItem, LedgerError> {
        let mut tx = self.pool.begin().await?;
        let cart = carts::ensure_cart(buyer_id, &mut tx).await?;
        let Some(item) = carts::upsert_item(cart.id, product_id, quantity, MAX_LINE_QUANTITY, &mut tx).await? else {
            let available = products::fetch_product(product_id, &mut tx).await?.is_some_and(|p| p.active);
            return Err(if available {
                LedgerError::QuantityLimitExceeded(product_id, MAX_LINE_QUANTITY)
            } else {
                LedgerError::ProductNotFound(product_id)
            });
        };
        tx.commit().await?;
        debug!("🗃️ Cart #{} for buyer #{buyer_id} now has {} × product {product_id}", cart.id, item.quantity);
        Ok(item)
    }

    async fn set_item_quantity(&self, buyer_id: i64, product_id: i64, quantity: i64) -> Result<u64, LedgerError> {
        let mut conn = self.pool.acquire().await?;
        let n = carts::set_item_quantity(buyer_id, product_id, quantity, &mut conn).await?;
        Ok(n)
    }

    async fn remove_item(&self, buyer_id: i64, product_id: i64) -> Result<u64, LedgerError> {
        let mut conn = self.pool.acquire().await?;
        let n = carts::remove_item(buyer_id, product_id, &mut conn).await?;
        Ok(n)
    }

    async fn clear_cart(&self, buyer_id: i64) -> Result<u64, LedgerError> {
        let mut conn = self.pool.acquire().await?;
        let n = carts::clear_cart(buyer_id, &mut conn).await?;
        Ok(n)
    }

    async fn fetch_cart_items(&self, buyer_id: i64) -> Result<Vec<CartItem>, LedgerError> {
        let mut conn = self.pool.acquire().await?;
        let items = carts::fetch_items_for_buyer(buyer_id, &mut conn).await?;
        Ok(items)
    }
}

impl CheckoutManagement for SqliteDatabase {
    async fn checkout_cart(
        &self,
        buyer_id: i64,
        currency: &str,
        shipping_address: Option<String>,
    ) -> Result<Order, LedgerError> {
        let mut tx = self.pool.begin().await?;
        let cart_id = carts::lock_cart(buyer_id, &mut tx).await?.ok_or(LedgerError::EmptyCart)?;
        let items = carts::fetch_items_for_cart(cart_id, &mut tx).await?;
        if items.is_empty() {
            return Err(LedgerError::EmptyCart);
        }
        let total = Cents::checked_sum(items.iter().map(|i| i.subtotal))
            .ok_or_else(|| LedgerError::AmountOverflow(format!("the total of cart #{cart_id}")))?;
        trace!("🗃️ Checking out cart #{cart_id} with {} lines, total {total}", items.len());
        let new_order = NewOrder::new(buyer_id, total, currency).with_shipping_address(shipping_address);
        let order = orders::insert_order(new_order, &mut tx).await?;
        tx.commit().await?;
        Ok(order)
    }

    async fn fetch_order(&self, order_id: OrderId) -> Result<Option<Order>, LedgerError> {
        let mut conn = self.pool.acquire().await?;
        let order = orders::fetch_order(order_id, &mut conn).await?;
        Ok(order)
    }

    async fn fetch_orders_for_buyer(&self, buyer_id: i64) -> Result<Vec<Order>, LedgerError> {
        let mut conn = self.pool.acquire().await?;
        let orders = orders::fetch_orders_for_buyer(buyer_id, &mut conn).await?;
        Ok(orders)
    }

    async fn fetch_all_orders(&self) -> Result<Vec<Order>, LedgerError> {
        let mut conn = self.pool.acquire().await?;
        let orders = orders::fetch_all_orders(&mut conn).await?;
        Ok(orders)
    }
}

impl PaymentLedger for SqliteDatabase {
    fn url(&self) -> &str {
        self.url.as_str()
    }

    async fn claim_order_for_payment(
        &self,
        order_id: OrderId,
        buyer_id: i64,
        stale_after: Duration,
    ) -> Result<Payment, LedgerError> {
        let mut tx = self.pool.begin().await?;
        let order = orders::lock_order_for_buyer(order_id, buyer_id, &mut tx)
            .await?
            .ok_or(LedgerError::OrderNotFound(order_id))?;
        if order.status != OrderStatusType::Pending {
            return Err(LedgerError::OrderNotPending(order_id, order.status));
        }
        payments::delete_stale_claims(order_id, stale_after, &mut tx).await?;
        let payment = payments::insert_claim(order_id, order.total, &mut tx).await?;
        tx.commit().await?;
        debug!("🗃️ Order {order_id} claimed for payment #{}", payment.id);
        Ok(payment)
    }

    async fn attach_payment_reference(&self, payment_id: i64, reference: &str) -> Result<Payment, LedgerError> {
        let mut conn = self.pool.acquire().await?;
        let payment = payments::attach_reference(payment_id, reference, &mut conn)
            .await?
            .ok_or_else(|| LedgerError::PaymentNotFound(format!("unreferenced payment #{payment_id}")))?;
        Ok(payment)
    }

    async fn release_payment_claim(&self, payment_id: i64) -> Result<bool, LedgerError> {
        let mut conn = self.pool.acquire().await?;
        let n = payments::delete_claim(payment_id, &mut conn).await?;
        Ok(n > 0)
    }

    async fn fetch_payment_by_reference(&self, reference: &str) -> Result<Option<(Payment, Order)>, LedgerError> {
        let mut conn = self.pool.acquire().await?;
        let Some(payment) = payments::fetch_by_reference(reference, &mut conn).await? else {
            return Ok(None);
        };
        let order = orders::fetch_order(payment.order_id, &mut conn).await?.ok_or_else(|| {
            error!("🗃️ Payment #{} refers to order {} which does not exist", payment.id, payment.order_id);
            LedgerError::OrderNotFound(payment.order_id)
        })?;
        Ok(Some((payment, order)))
    }

    async fn fetch_payments_by_references(&self, references: &[String]) -> Result<Vec<Payment>, LedgerError> {
        let mut conn = self.pool.acquire().await?;
        let payments = payments::fetch_by_references(references, &mut conn).await?;
        Ok(payments)
    }

    async fn fetch_payments_for_order(&self, order_id: OrderId) -> Result<Vec<Payment>, LedgerError> {
        let mut conn = self.pool.acquire().await?;
        let payments = payments::fetch_for_order(order_id, &mut conn).await?;
        Ok(payments)
    }

    async fn apply_gateway_event(&self, event: &GatewayEvent) -> Result<ReconcileOutcome, LedgerError> {
        let mut tx = self.pool.begin().await?;
        if !events::try_mark_processed(event, &mut tx).await? {
            debug!("🗃️ Event {} has already been processed. Skipping.", event.event_id);
            tx.rollback().await?;
            return Ok(ReconcileOutcome::Duplicate);
        }
        let outcome = reconcile(event, &mut tx).await?;
        events::set_outcome(&event.event_id, outcome.label(), &mut tx).await?;
        tx.commit().await?;
        debug!("🗃️ Event {} ({}) committed with outcome {}", event.event_id, event.kind, outcome.label());
        Ok(outcome)
    }

    async fn fetch_processed_event(&self, event_id: &str) -> Result<Option<ProcessedEvent>, LedgerError> {
        let mut conn = self.pool.acquire().await?;
        let event = events::fetch_processed_event(event_id, &mut conn).await?;
        Ok(event)
    }

    async fn fetch_anomalies(&self) -> Result<Vec<ReconciliationAnomaly>, LedgerError> {
        let mut conn = self.pool.acquire().await?;
        let anomalies = events::fetch_anomalies(&mut conn).await?;
        Ok(anomalies)
    }
}

/// Applies the state machine for a single event. Must run inside the transaction that recorded the event id.
async fn reconcile(event: &GatewayEvent, conn: &mut SqliteConnection) -> Result<ReconcileOutcome, LedgerError> {
    let payment = match payments::fetch_by_reference(&event.charge_id, conn).await? {
        Some(p) => p,
        // A created event can overtake the commit that records the charge id, so it is not a sign of trouble
        None if matches!(event.kind, GatewayEventKind::Unrecognized(_) | GatewayEventKind::Created) => {
            trace!("🗃️ Event {} ({}) for unknown charge '{}' ignored", event.event_id, event.kind, event.charge_id);
            return Ok(ReconcileOutcome::Ignored);
        },
        None => {
            warn!("🗃️ Event {} ({}) refers to unknown charge '{}'", event.event_id, event.kind, event.charge_id);
            let detail = format!("No payment has reference '{}'", event.charge_id);
            let anomaly = events::insert_anomaly(event, AnomalyKind::UnknownReference, &detail, conn).await?;
            return Ok(ReconcileOutcome::Anomaly(anomaly));
        },
    };
    let outcome = match plan(payment.status, &event.kind) {
        Transition::MarkPaid => {
            let Some(paid) = payments::mark_paid(payment.id, conn).await? else {
                return Ok(ReconcileOutcome::NoChange { payment });
            };
            let order =
                orders::transition_order_status(paid.order_id, OrderStatusType::Pending, OrderStatusType::Paid, conn)
                    .await?;
            match &order {
                Some(order) => {
                    let n = carts::clear_cart(order.buyer_id, conn).await?;
                    trace!("🗃️ Cleared {n} cart lines for buyer #{}", order.buyer_id);
                },
                None => {
                    let detail = format!("Payment #{} was confirmed, but order {} is no longer Pending", paid.id, paid.order_id);
                    warn!("🗃️ {detail}");
                    events::insert_anomaly(event, AnomalyKind::OrderNotPending, &detail, conn).await?;
                },
            }
            info!("🗃️ Payment #{} for order {} is Paid", paid.id, paid.order_id);
            ReconcileOutcome::Paid { payment: paid, order }
        },
        Transition::MarkFailed => match payments::mark_failed(payment.id, conn).await? {
            Some(failed) => {
                info!("🗃️ Payment #{} for order {} has Failed", failed.id, failed.order_id);
                ReconcileOutcome::Failed { payment: failed }
            },
            None => ReconcileOutcome::NoChange { payment },
        },
        Transition::Regression => {
            let detail = format!(
                "Event {} would move payment #{} out of terminal state {}",
                event.kind, payment.id, payment.status
            );
            warn!("🗃️ {detail}");
            let anomaly = events::insert_anomaly(event, AnomalyKind::RegressionAttempt, &detail, conn).await?;
            ReconcileOutcome::Anomaly(anomaly)
        },
        Transition::StillPending | Transition::AlreadyApplied | Transition::Informational => {
            trace!("🗃️ Event {} requires no change to payment #{}", event.kind, payment.id);
            ReconcileOutcome::NoChange { payment }
        },
        Transition::Ignore => ReconcileOutcome::Ignored,
    };
    Ok(outcome)
}

impl SqliteDatabase {
    /// Creates a new database API object
    pub async fn new(max_connections: u32) -> Result<Self, sqlx::Error> {
        let url = db_url();
        SqliteDatabase::new_with_url(url.as_str(), max_connections).await
    }

    pub async fn new_with_url(url: &str, max_connections: u32) -> Result<Self, sqlx::Error> {
        trace!("Creating new database connection pool with url {url}");
        let pool = new_pool(url, max_connections).await?;
        let url = url.to_string();
        Ok(Self { url, pool })
    }

    /// Brings the schema up to date.
    pub async fn migrate(&self) -> Result<(), LedgerError> {
        sqlx::migrate!("./src/sqlite/migrations")
            .run(&self.pool)
            .await
            .map_err(|e| LedgerError::DatabaseError(format!("Migration failed. {e}")))?;
        info!("🗃️ Database migrations complete");
        Ok(())
    }

    /// Returns a reference to the database connection pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub async fn close(&mut self) {
        self.pool.close().await;
    }
}
