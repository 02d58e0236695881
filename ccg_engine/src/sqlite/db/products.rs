use sqlx::SqliteConnection;

use crate::db_types::{Cents, Product};

pub async fn fetch_product(product_id: i64, conn: &mut SqliteConnection) -> Result<Option<Product>, sqlx::Error> {
    let product = sqlx::query_as("SELECT id, name, price, active FROM products WHERE id = $1")
        .bind(product_id)
        .fetch_optional(conn)
        .await?;
    Ok(product)
}

/// Inserts a catalog entry. The catalog is owned elsewhere; this exists for seeding and tests.
pub async fn insert_product(
    name: &str,
    price: Cents,
    active: bool,
    conn: &mut SqliteConnection,
) -> Result<Product, sqlx::Error> {
    let product =
        sqlx::query_as("INSERT INTO products (name, price, active) VALUES ($1, $2, $3) RETURNING id, name, price, active")
            .bind(name)
            .bind(price)
            .bind(active)
            .fetch_one(conn)
            .await?;
    Ok(product)
}

pub async fn set_product_price(product_id: i64, price: Cents, conn: &mut SqliteConnection) -> Result<u64, sqlx::Error> {
    let result =
        sqlx::query("UPDATE products SET price = $1, updated_at = CURRENT_TIMESTAMP WHERE id = $2")
            .bind(price)
            .bind(product_id)
            .execute(conn)
            .await?;
    Ok(result.rows_affected())
}
