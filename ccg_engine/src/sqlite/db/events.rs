use sqlx::SqliteConnection;

use crate::{
    db_types::{AnomalyKind, ProcessedEvent, ReconciliationAnomaly},
    traits::GatewayEvent,
};

/// Records the event id as processed. Returns `false` if it was already recorded.
///
/// This is the first write of every reconciliation transaction. Concurrent deliveries of the same event serialise on
/// it, and all but one of them see `false`.
pub async fn try_mark_processed(event: &GatewayEvent, conn: &mut SqliteConnection) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        r#"
            INSERT INTO processed_events (event_id, event_type, reference)
            VALUES ($1, $2, $3)
            ON CONFLICT (event_id) DO NOTHING
        "#,
    )
    .bind(&event.event_id)
    .bind(event.kind.to_string())
    .bind(&event.charge_id)
    .execute(conn)
    .await?;
    Ok(result.rows_affected() == 1)
}

pub async fn set_outcome(event_id: &str, outcome: &str, conn: &mut SqliteConnection) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE processed_events SET outcome = $1 WHERE event_id = $2")
        .bind(outcome)
        .bind(event_id)
        .execute(conn)
        .await?;
    Ok(())
}

pub async fn fetch_processed_event(
    event_id: &str,
    conn: &mut SqliteConnection,
) -> Result<Option<ProcessedEvent>, sqlx::Error> {
    let event = sqlx::query_as("SELECT * FROM processed_events WHERE event_id = $1")
        .bind(event_id)
        .fetch_optional(conn)
        .await?;
    Ok(event)
}

pub async fn insert_anomaly(
    event: &GatewayEvent,
    kind: AnomalyKind,
    detail: &str,
    conn: &mut SqliteConnection,
) -> Result<ReconciliationAnomaly, sqlx::Error> {
    let anomaly = sqlx::query_as(
        r#"
            INSERT INTO reconciliation_anomalies (event_id, event_type, reference, kind, detail)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *;
        "#,
    )
    .bind(&event.event_id)
    .bind(event.kind.to_string())
    .bind(&event.charge_id)
    .bind(kind)
    .bind(detail)
    .fetch_one(conn)
    .await?;
    Ok(anomaly)
}

pub async fn fetch_anomalies(conn: &mut SqliteConnection) -> Result<Vec<ReconciliationAnomaly>, sqlx::Error> {
    let anomalies =
        sqlx::query_as("SELECT * FROM reconciliation_anomalies ORDER BY id DESC").fetch_all(conn).await?;
    Ok(anomalies)
}
