use crate::{
    db_types::{Order, OrderId},
    traits::LedgerError,
};

#[allow(async_fn_in_trait)]
pub trait CheckoutManagement: Clone {
    /// Converts the buyer's cart into an order, in a single atomic transaction.
    ///
    /// * The cart and its lines are read.
    /// * The total is the exact sum of the line subtotals.
    /// * A new order is inserted with status `Pending`.
    ///
    /// The cart is left untouched. It is cleared only once a payment for the order succeeds.
    ///
    /// Fails with [`LedgerError::EmptyCart`] if the buyer has no cart, or the cart has no lines. If anything fails,
    /// nothing is written.
    async fn checkout_cart(
        &self,
        buyer_id: i64,
        currency: &str,
        shipping_address: Option<String>,
    ) -> Result<Order, LedgerError>;

    async fn fetch_order(&self, order_id: OrderId) -> Result<Option<Order>, LedgerError>;

    /// Orders placed by the buyer, newest first.
    async fn fetch_orders_for_buyer(&self, buyer_id: i64) -> Result<Vec<Order>, LedgerError>;

    /// Every order in the system, newest first.
    async fn fetch_all_orders(&self) -> Result<Vec<Order>, LedgerError>;
}
