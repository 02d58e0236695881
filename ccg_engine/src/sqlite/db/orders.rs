use log::debug;
use sqlx::SqliteConnection;

use crate::db_types::{NewOrder, Order, OrderId, OrderStatusType};

/// Inserts a new order with status `Pending`. This is not atomic on its own. Embed the call in a transaction and pass
/// `&mut *tx` as the connection if it must succeed or fail together with other writes.
pub async fn insert_order(order: NewOrder, conn: &mut SqliteConnection) -> Result<Order, sqlx::Error> {
    let order: Order = sqlx::query_as(
        r#"
            INSERT INTO orders (buyer_id, total, currency, status, shipping_address)
            VALUES ($1, $2, $3, 'Pending', $4)
            RETURNING *;
        "#,
    )
    .bind(order.buyer_id)
    .bind(order.total)
    .bind(order.currency)
    .bind(order.shipping_address)
    .fetch_one(conn)
    .await?;
    debug!("🧾️ Order {} inserted for buyer #{} with total {}", order.id, order.buyer_id, order.total);
    Ok(order)
}

pub async fn fetch_order(order_id: OrderId, conn: &mut SqliteConnection) -> Result<Option<Order>, sqlx::Error> {
    let order = sqlx::query_as("SELECT * FROM orders WHERE id = $1").bind(order_id).fetch_optional(conn).await?;
    Ok(order)
}

pub async fn fetch_orders_for_buyer(buyer_id: i64, conn: &mut SqliteConnection) -> Result<Vec<Order>, sqlx::Error> {
    let orders = sqlx::query_as("SELECT * FROM orders WHERE buyer_id = $1 ORDER BY created_at DESC, id DESC")
        .bind(buyer_id)
        .fetch_all(conn)
        .await?;
    Ok(orders)
}

pub async fn fetch_all_orders(conn: &mut SqliteConnection) -> Result<Vec<Order>, sqlx::Error> {
    let orders = sqlx::query_as("SELECT * FROM orders ORDER BY created_at DESC, id DESC").fetch_all(conn).await?;
    Ok(orders)
}

/// Touches the order row and returns it, if it belongs to `buyer_id`.
///
/// Being a write, this takes the database write lock. Used as the first statement of a transaction that must hold the
/// order steady while it checks and creates a payment.
pub async fn lock_order_for_buyer(
    order_id: OrderId,
    buyer_id: i64,
    conn: &mut SqliteConnection,
) -> Result<Option<Order>, sqlx::Error> {
    let order = sqlx::query_as("UPDATE orders SET updated_at = updated_at WHERE id = $1 AND buyer_id = $2 RETURNING *")
        .bind(order_id)
        .bind(buyer_id)
        .fetch_optional(conn)
        .await?;
    Ok(order)
}

/// Moves the order from `from` to `to`. Returns `None` if the order was not in state `from`, in which case nothing
/// changed.
pub async fn transition_order_status(
    order_id: OrderId,
    from: OrderStatusType,
    to: OrderStatusType,
    conn: &mut SqliteConnection,
) -> Result<Option<Order>, sqlx::Error> {
    let order = sqlx::query_as(
        r#"
            UPDATE orders SET status = $1, updated_at = CURRENT_TIMESTAMP
            WHERE id = $2 AND status = $3
            RETURNING *;
        "#,
    )
    .bind(to)
    .bind(order_id)
    .bind(from)
    .fetch_optional(conn)
    .await?;
    Ok(order)
}
