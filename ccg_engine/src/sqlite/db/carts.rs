use log::trace;
use sqlx::SqliteConnection;

use crate::db_types::{Cart, CartItem};

const ITEM_COLUMNS: &str = "id, cart_id, product_id, quantity, unit_price, quantity * unit_price AS subtotal";

/// Returns the buyer's cart, creating it if necessary. This is a single upsert statement, so concurrent callers for
/// the same buyer always end up with the same cart.
pub async fn ensure_cart(buyer_id: i64, conn: &mut SqliteConnection) -> Result<Cart, sqlx::Error> {
    let cart = sqlx::query_as(
        r#"
            INSERT INTO carts (buyer_id) VALUES ($1)
            ON CONFLICT (buyer_id) DO UPDATE SET updated_at = CURRENT_TIMESTAMP
            RETURNING *;
        "#,
    )
    .bind(buyer_id)
    .fetch_one(conn)
    .await?;
    Ok(cart)
}

/// Touches the buyer's cart and returns its id, or `None` if the buyer has no cart.
///
/// Being a write, this takes the database write lock, so it is a suitable first statement for a transaction that
/// needs a stable view of the cart.
pub async fn lock_cart(buyer_id: i64, conn: &mut SqliteConnection) -> Result<Option<i64>, sqlx::Error> {
    let id = sqlx::query_scalar("UPDATE carts SET updated_at = CURRENT_TIMESTAMP WHERE buyer_id = $1 RETURNING id")
        .bind(buyer_id)
        .fetch_optional(conn)
        .await?;
    Ok(id)
}

/// Adds `quantity` of the product to the cart, capturing the current catalog price for new lines.
///
/// If the line exists, its quantity is incremented in place and its captured price is kept, unless the new quantity
/// would exceed `max_quantity`. Returns `None` if the product does not exist, is inactive, or the limit was hit.
pub async fn upsert_item(
    cart_id: i64,
    product_id: i64,
    quantity: i64,
    max_quantity: i64,
    conn: &mut SqliteConnection,
) -> Result<Option<CartItem>, sqlx::Error> {
    let sql = format!(
        r#"
            INSERT INTO cart_items (cart_id, product_id, quantity, unit_price)
            SELECT $1, id, $2, price FROM products WHERE id = $3 AND active = 1
            ON CONFLICT (cart_id, product_id) DO UPDATE SET
                quantity = quantity + excluded.quantity,
                updated_at = CURRENT_TIMESTAMP
            WHERE cart_items.quantity + excluded.quantity <= $4
            RETURNING {ITEM_COLUMNS};
        "#
    );
    let item = sqlx::query_as(&sql)
        .bind(cart_id)
        .bind(quantity)
        .bind(product_id)
        .bind(max_quantity)
        .fetch_optional(conn)
        .await?;
    trace!("🛒️ Upserted product {product_id} into cart {cart_id}");
    Ok(item)
}

pub async fn set_item_quantity(
    buyer_id: i64,
    product_id: i64,
    quantity: i64,
    conn: &mut SqliteConnection,
) -> Result<u64, sqlx::Error> {
    let result = sqlx::query(
        r#"
            UPDATE cart_items SET quantity = $1, updated_at = CURRENT_TIMESTAMP
            WHERE product_id = $2 AND cart_id = (SELECT id FROM carts WHERE buyer_id = $3)
        "#,
    )
    .bind(quantity)
    .bind(product_id)
    .bind(buyer_id)
    .execute(conn)
    .await?;
    Ok(result.rows_affected())
}

pub async fn remove_item(buyer_id: i64, product_id: i64, conn: &mut SqliteConnection) -> Result<u64, sqlx::Error> {
    let result = sqlx::query(
        "DELETE FROM cart_items WHERE product_id = $1 AND cart_id = (SELECT id FROM carts WHERE buyer_id = $2)",
    )
    .bind(product_id)
    .bind(buyer_id)
    .execute(conn)
    .await?;
    Ok(result.rows_affected())
}

pub async fn clear_cart(buyer_id: i64, conn: &mut SqliteConnection) -> Result<u64, sqlx::Error> {
    let result = sqlx::query("DELETE FROM cart_items WHERE cart_id = (SELECT id FROM carts WHERE buyer_id = $1)")
        .bind(buyer_id)
        .execute(conn)
        .await?;
    Ok(result.rows_affected())
}

pub async fn fetch_items_for_buyer(buyer_id: i64, conn: &mut SqliteConnection) -> Result<Vec<CartItem>, sqlx::Error> {
    let items = sqlx::query_as(
        r#"
            SELECT ci.id, ci.cart_id, ci.product_id, p.name AS product_name, ci.quantity, ci.unit_price,
                   ci.quantity * ci.unit_price AS subtotal
            FROM cart_items ci
            JOIN carts c ON c.id = ci.cart_id
            LEFT JOIN products p ON p.id = ci.product_id
            WHERE c.buyer_id = $1
            ORDER BY ci.id
        "#,
    )
    .bind(buyer_id)
    .fetch_all(conn)
    .await?;
    Ok(items)
}

pub async fn fetch_items_for_cart(cart_id: i64, conn: &mut SqliteConnection) -> Result<Vec<CartItem>, sqlx::Error> {
    let sql = format!("SELECT {ITEM_COLUMNS} FROM cart_items WHERE cart_id = $1 ORDER BY id");
    let items = sqlx::query_as(&sql).bind(cart_id).fetch_all(conn).await?;
    Ok(items)
}
