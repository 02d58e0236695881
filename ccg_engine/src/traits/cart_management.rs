use crate::{
    db_types::{Cart, CartItem},
    traits::{LedgerError, ProductCatalog},
};

/// The most units of one product a cart line may hold. Together with the catalog's price ceiling this keeps every
/// subtotal well inside `i64`.
pub const MAX_LINE_QUANTITY: i64 = 10_000;

/// Storage for buyers' carts.
///
/// Every method is scoped to a single buyer. No method ever reads or writes another buyer's cart.
#[allow(async_fn_in_trait)]
pub trait CartManagement: ProductCatalog + Clone {
    /// Returns the buyer's cart, creating it if it does not exist yet.
    ///
    /// Concurrent calls for the same buyer must never produce two carts.
    async fn ensure_cart(&self, buyer_id: i64) -> Result<Cart, LedgerError>;

    /// Adds `quantity` units of the product to the buyer's cart.
    ///
    /// The current catalog price is captured on the line when it is first created. If the line already exists, the
    /// quantity is incremented atomically and the captured price is kept.
    ///
    /// Fails with [`LedgerError::ProductNotFound`] if the product does not exist or is inactive, and with
    /// [`LedgerError::QuantityLimitExceeded`] if the line would end up holding more than [`MAX_LINE_QUANTITY`] units.
    /// In the latter case the line is left unchanged.
    async fn add_item(&self, buyer_id: i64, product_id: i64, quantity: i64) -> Result<CartItem, LedgerError>;

    /// Overwrites the quantity of an existing line. Returns the number of lines changed (0 or 1).
    async fn set_item_quantity(&self, buyer_id: i64, product_id: i64, quantity: i64) -> Result<u64, LedgerError>;

    /// Removes a line. Removing a line that does not exist is not an error.
    async fn remove_item(&self, buyer_id: i64, product_id: i64) -> Result<u64, LedgerError>;

    /// Removes every line from the buyer's cart. The cart itself is kept.
    async fn clear_cart(&self, buyer_id: i64) -> Result<u64, LedgerError>;

    /// Fetches the lines in the buyer's cart, with product names, ordered by when they were added.
    async fn fetch_cart_items(&self, buyer_id: i64) -> Result<Vec<CartItem>, LedgerError>;
}
