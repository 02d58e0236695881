use std::fmt::Debug;

use log::*;

use crate::{
    ccg_api::{errors::CartApiError, payment_objects::CartSnapshot},
    traits::{CartManagement, MAX_LINE_QUANTITY},
};

/// `CartApi` manages the single open cart each buyer has.
///
/// Every mutation returns a fresh [`CartSnapshot`] so that callers never have to re-read the cart to show it.
pub struct CartApi<B> {
    db: B,
}

impl<B> Debug for CartApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "CartApi")
    }
}

impl<B> CartApi<B> {
    pub fn new(db: B) -> Self {
        Self { db }
    }
}

impl<B> CartApi<B>
where B: CartManagement
{
    /// Returns the buyer's cart id, creating the cart if it does not exist yet.
    pub async fn ensure_cart(&self, buyer_id: i64) -> Result<i64, CartApiError> {
        let cart = self.db.ensure_cart(buyer_id).await?;
        Ok(cart.id)
    }

    /// Adds `quantity` units of the product. Adding a product that is already in the cart increments the existing
    /// line; the unit price captured when the line was first added is kept.
    pub async fn add_item(&self, buyer_id: i64, product_id: i64, quantity: i64) -> Result<CartSnapshot, CartApiError> {
        if quantity <= 0 {
            return Err(CartApiError::Validation(format!("Quantity must be at least 1, got {quantity}")));
        }
        check_limit(quantity)?;
        match self.db.fetch_product(product_id).await? {
            Some(product) if product.active => {},
            _ => return Err(CartApiError::ProductNotFound(product_id)),
        }
        let item = self.db.add_item(buyer_id, product_id, quantity).await?;
        debug!("🛒️ Buyer #{buyer_id} added {quantity} × product {product_id}. Line quantity is now {}", item.quantity);
        self.snapshot(buyer_id).await
    }

    /// Sets the quantity of a line. A quantity of zero removes the line. Setting the quantity of a product that is not
    /// in the cart is a no-op.
    pub async fn set_item_quantity(
        &self,
        buyer_id: i64,
        product_id: i64,
        quantity: i64,
    ) -> Result<CartSnapshot, CartApiError> {
        match quantity {
            q if q < 0 => {
                return Err(CartApiError::Validation(format!("Quantity cannot be negative, got {q}")));
            },
            0 => {
                self.db.remove_item(buyer_id, product_id).await?;
            },
            q => {
                check_limit(q)?;
                let n = self.db.set_item_quantity(buyer_id, product_id, q).await?;
                if n == 0 {
                    trace!("🛒️ Product {product_id} is not in buyer #{buyer_id}'s cart. Nothing to update.");
                }
            },
        }
        self.snapshot(buyer_id).await
    }

    /// Removes the line for the product. Removing an absent line succeeds.
    pub async fn remove_item(&self, buyer_id: i64, product_id: i64) -> Result<CartSnapshot, CartApiError> {
        let n = self.db.remove_item(buyer_id, product_id).await?;
        trace!("🛒️ Removed {n} line(s) for product {product_id} from buyer #{buyer_id}'s cart");
        self.snapshot(buyer_id).await
    }

    pub async fn clear(&self, buyer_id: i64) -> Result<CartSnapshot, CartApiError> {
        let n = self.db.clear_cart(buyer_id).await?;
        debug!("🛒️ Cleared {n} line(s) from buyer #{buyer_id}'s cart");
        self.snapshot(buyer_id).await
    }

    pub async fn snapshot(&self, buyer_id: i64) -> Result<CartSnapshot, CartApiError> {
        let items = self.db.fetch_cart_items(buyer_id).await?;
        CartSnapshot::new(buyer_id, items)
    }
}

fn check_limit(quantity: i64) -> Result<(), CartApiError> {
    if quantity > MAX_LINE_QUANTITY {
        return Err(CartApiError::Validation(format!(
            "Quantity cannot be more than {MAX_LINE_QUANTITY}, got {quantity}"
        )));
    }
    Ok(())
}
