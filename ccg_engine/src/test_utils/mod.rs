//! Helpers for tests that need a real, throwaway ledger. Enabled with the `test_utils` feature.
pub mod prepare_env;

use crate::{
    db_types::{Cents, Product},
    sqlite::db::products,
    SqliteDatabase,
};

/// Adds a product to the catalog view. The catalog is owned by another system in production.
pub async fn seed_product(db: &SqliteDatabase, name: &str, price: &str, active: bool) -> Product {
    let price = price.parse::<Cents>().expect("Invalid price");
    let mut conn = db.pool().acquire().await.expect("Error acquiring connection");
    products::insert_product(name, price, active, &mut conn).await.expect("Error inserting product")
}

/// Changes a catalog price, as the external catalog might at any time.
pub async fn reprice_product(db: &SqliteDatabase, product_id: i64, price: &str) {
    let price = price.parse::<Cents>().expect("Invalid price");
    let mut conn = db.pool().acquire().await.expect("Error acquiring connection");
    products::set_product_price(product_id, price, &mut conn).await.expect("Error updating product price");
}
