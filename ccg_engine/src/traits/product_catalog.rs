use crate::{db_types::Product, traits::LedgerError};

/// Read access to the product catalog. Catalog maintenance happens elsewhere.
#[allow(async_fn_in_trait)]
pub trait ProductCatalog {
    /// Fetches a product by id, whether or not it is active.
    async fn fetch_product(&self, product_id: i64) -> Result<Option<Product>, LedgerError>;
}
