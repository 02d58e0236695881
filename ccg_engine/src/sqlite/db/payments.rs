use chrono::Duration;
use log::*;
use sqlx::{QueryBuilder, SqliteConnection};

use crate::{
    db_types::{Cents, OrderId, Payment, PaymentStatus},
    sqlite::db::is_unique_violation,
    traits::LedgerError,
};

/// Inserts a `Pending` crypto payment with no reference.
///
/// Fails with [`LedgerError::ActivePaymentExists`] if the order already has a `Pending` payment.
pub async fn insert_claim(order_id: OrderId, amount: Cents, conn: &mut SqliteConnection) -> Result<Payment, LedgerError> {
    let payment = sqlx::query_as(
        r#"
            INSERT INTO payments (order_id, amount, method, status)
            VALUES ($1, $2, 'Crypto', 'Pending')
            RETURNING *;
        "#,
    )
    .bind(order_id)
    .bind(amount)
    .fetch_one(conn)
    .await
    .map_err(|e| {
        if is_unique_violation(&e) {
            LedgerError::ActivePaymentExists(order_id)
        } else {
            LedgerError::from(e)
        }
    })?;
    Ok(payment)
}

/// Deletes claims for the order that never received a gateway reference and are older than `stale_after`.
pub async fn delete_stale_claims(
    order_id: OrderId,
    stale_after: Duration,
    conn: &mut SqliteConnection,
) -> Result<u64, sqlx::Error> {
    let result = sqlx::query(
        r#"
            DELETE FROM payments
            WHERE order_id = $1 AND status = 'Pending' AND reference IS NULL
              AND unixepoch(created_at) <= unixepoch('now') - $2
        "#,
    )
    .bind(order_id)
    .bind(stale_after.num_seconds())
    .execute(conn)
    .await?;
    if result.rows_affected() > 0 {
        warn!("🗃️ Removed {} abandoned payment claim(s) for order {order_id}", result.rows_affected());
    }
    Ok(result.rows_affected())
}

pub async fn attach_reference(
    payment_id: i64,
    reference: &str,
    conn: &mut SqliteConnection,
) -> Result<Option<Payment>, LedgerError> {
    let payment = sqlx::query_as(
        r#"
            UPDATE payments SET reference = $1, updated_at = CURRENT_TIMESTAMP
            WHERE id = $2 AND reference IS NULL
            RETURNING *;
        "#,
    )
    .bind(reference)
    .bind(payment_id)
    .fetch_optional(conn)
    .await
    .map_err(|e| {
        if is_unique_violation(&e) {
            LedgerError::PaymentAlreadyExists(reference.to_string())
        } else {
            LedgerError::from(e)
        }
    })?;
    Ok(payment)
}

pub async fn delete_claim(payment_id: i64, conn: &mut SqliteConnection) -> Result<u64, sqlx::Error> {
    let result = sqlx::query("DELETE FROM payments WHERE id = $1 AND reference IS NULL AND status = 'Pending'")
        .bind(payment_id)
        .execute(conn)
        .await?;
    Ok(result.rows_affected())
}

pub async fn fetch_by_reference(reference: &str, conn: &mut SqliteConnection) -> Result<Option<Payment>, sqlx::Error> {
    let payment =
        sqlx::query_as("SELECT * FROM payments WHERE reference = $1").bind(reference).fetch_optional(conn).await?;
    Ok(payment)
}

pub async fn fetch_by_references(
    references: &[String],
    conn: &mut SqliteConnection,
) -> Result<Vec<Payment>, sqlx::Error> {
    if references.is_empty() {
        return Ok(Vec::new());
    }
    let mut builder = QueryBuilder::new("SELECT * FROM payments WHERE reference IN (");
    let mut list = builder.separated(", ");
    for reference in references {
        list.push_bind(reference.clone());
    }
    list.push_unseparated(") ORDER BY id");
    let payments = builder.build_query_as::<Payment>().fetch_all(conn).await?;
    Ok(payments)
}

pub async fn fetch_for_order(order_id: OrderId, conn: &mut SqliteConnection) -> Result<Vec<Payment>, sqlx::Error> {
    let payments = sqlx::query_as("SELECT * FROM payments WHERE order_id = $1 ORDER BY id")
        .bind(order_id)
        .fetch_all(conn)
        .await?;
    Ok(payments)
}

/// `Pending → Paid`, stamping `paid_at`. Returns `None` if the payment was no longer `Pending`.
pub async fn mark_paid(payment_id: i64, conn: &mut SqliteConnection) -> Result<Option<Payment>, sqlx::Error> {
    let payment = sqlx::query_as(
        r#"
            UPDATE payments SET status = $1, paid_at = CURRENT_TIMESTAMP, updated_at = CURRENT_TIMESTAMP
            WHERE id = $2 AND status = $3
            RETURNING *;
        "#,
    )
    .bind(PaymentStatus::Paid)
    .bind(payment_id)
    .bind(PaymentStatus::Pending)
    .fetch_optional(conn)
    .await?;
    Ok(payment)
}

/// `Pending → Failed`. Returns `None` if the payment was no longer `Pending`.
pub async fn mark_failed(payment_id: i64, conn: &mut SqliteConnection) -> Result<Option<Payment>, sqlx::Error> {
    let payment = sqlx::query_as(
        r#"
            UPDATE payments SET status = $1, updated_at = CURRENT_TIMESTAMP
            WHERE id = $2 AND status = $3
            RETURNING *;
        "#,
    )
    .bind(PaymentStatus::Failed)
    .bind(payment_id)
    .bind(PaymentStatus::Pending)
    .fetch_optional(conn)
    .await?;
    Ok(payment)
}
