use actix_web::{http::StatusCode, test::TestRequest};
use ccg_engine::{
    db_types::{OrderStatusType, PaymentStatus},
    test_utils::prepare_env::tear_down,
    traits::{CartManagement, CheckoutManagement, PaymentLedger},
};
use coinbase_tools::{sign_payload, SIGNATURE_HEADER};

use super::helpers::{
    idle_gateway,
    new_database,
    payment_with_reference,
    pending_order,
    product,
    send,
    test_app,
    WEBHOOK_SECRET,
};

fn event_body(event_id: &str, event_type: &str, charge_id: &str) -> String {
    format!(
        r#"{{"id":"delivery-{event_id}","scheduled_for":"2024-03-01T10:30:00Z","event":{{"id":"{event_id}","resource":"event","type":"{event_type}","api_version":"2018-03-22","created_at":"2024-03-01T10:30:00Z","data":{{"id":"{charge_id}","code":"66BEOV2A","hosted_url":"https://commerce.coinbase.com/charges/66BEOV2A","timeline":[{{"time":"2024-03-01T10:30:00Z","status":"COMPLETED"}}]}}}}}}"#
    )
}

fn signed(body: &str) -> TestRequest {
    let signature = sign_payload(WEBHOOK_SECRET, body.as_bytes());
    TestRequest::post()
        .uri("/webhooks/coinbase")
        .insert_header(("Content-Type", "application/json"))
        .insert_header((SIGNATURE_HEADER, signature))
        .set_payload(body.to_string())
}

#[actix_web::test]
async fn unsigned_webhooks_are_rejected() {
    let db = new_database().await;
    let app = test_app(db.clone(), idle_gateway()).await;
    let body = event_body("evt-1", "charge:confirmed", "chg-1");

    let req = TestRequest::post().uri("/webhooks/coinbase").set_payload(body.clone());
    let (status, json) = send(&app, req).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["reason"], "invalid_signature");

    let signature = sign_payload("some-other-secret", body.as_bytes());
    let req = TestRequest::post().uri("/webhooks/coinbase").insert_header((SIGNATURE_HEADER, signature)).set_payload(body);
    let (status, json) = send(&app, req).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["reason"], "invalid_signature");
    // Nothing was recorded
    assert!(db.fetch_processed_event("evt-1").await.unwrap().is_none());
    tear_down(db).await;
}

#[actix_web::test]
async fn confirmed_charge_pays_the_order() {
    let db = new_database().await;
    let mug = product(&db, "Mug", "12.50").await;
    let order = pending_order(&db, 4, &[(&mug, 2)]).await;
    payment_with_reference(&db, &order, "chg-700").await;
    let app = test_app(db.clone(), idle_gateway()).await;
    let body = event_body("evt-700", "charge:confirmed", "chg-700");

    let (status, json) = send(&app, signed(&body)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["received"], true);
    assert_eq!(json["event"], "charge:confirmed");
    assert_eq!(json["event_id"], "evt-700");
    assert_eq!(json["outcome"], "Paid");
    let order = db.fetch_order(order.id).await.unwrap().unwrap();
    assert_eq!(order.status, OrderStatusType::Paid);
    let (payment, _) = db.fetch_payment_by_reference("chg-700").await.unwrap().unwrap();
    assert_eq!(payment.status, PaymentStatus::Paid);
    assert!(payment.paid_at.is_some());
    assert!(db.fetch_cart_items(4).await.unwrap().is_empty());

    // Replays are acknowledged but change nothing
    let (status, json) = send(&app, signed(&body)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["outcome"], "Duplicate");
    let processed = db.fetch_processed_event("evt-700").await.unwrap().unwrap();
    assert_eq!(processed.outcome, "Paid");
    tear_down(db).await;
}

#[actix_web::test]
async fn failed_charge_is_terminal() {
    let db = new_database().await;
    let mug = product(&db, "Mug", "12.50").await;
    let order = pending_order(&db, 4, &[(&mug, 1)]).await;
    payment_with_reference(&db, &order, "chg-710").await;
    let app = test_app(db.clone(), idle_gateway()).await;

    let (status, json) = send(&app, signed(&event_body("evt-711", "charge:failed", "chg-710"))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["outcome"], "Failed");
    let order = db.fetch_order(order.id).await.unwrap().unwrap();
    assert_eq!(order.status, OrderStatusType::Pending);
    assert_eq!(db.fetch_cart_items(4).await.unwrap().len(), 1);

    // A late confirmation must not resurrect the payment
    let (status, json) = send(&app, signed(&event_body("evt-712", "charge:confirmed", "chg-710"))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["outcome"], "Anomaly");
    let (payment, _) = db.fetch_payment_by_reference("chg-710").await.unwrap().unwrap();
    assert_eq!(payment.status, PaymentStatus::Failed);
    tear_down(db).await;
}

#[actix_web::test]
async fn pending_charge_changes_nothing() {
    let db = new_database().await;
    let mug = product(&db, "Mug", "12.50").await;
    let order = pending_order(&db, 4, &[(&mug, 1)]).await;
    payment_with_reference(&db, &order, "chg-720").await;
    let app = test_app(db.clone(), idle_gateway()).await;
    let (status, json) = send(&app, signed(&event_body("evt-720", "charge:pending", "chg-720"))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["outcome"], "NoChange");
    tear_down(db).await;
}

#[actix_web::test]
async fn unknown_charge_is_an_anomaly() {
    let db = new_database().await;
    let app = test_app(db.clone(), idle_gateway()).await;
    let (status, json) = send(&app, signed(&event_body("evt-730", "charge:confirmed", "chg-unknown"))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["outcome"], "Anomaly");
    let anomalies = db.fetch_anomalies().await.unwrap();
    assert_eq!(anomalies.len(), 1);
    assert_eq!(anomalies[0].event_id, "evt-730");
    assert_eq!(anomalies[0].reference.as_deref(), Some("chg-unknown"));
    tear_down(db).await;
}

#[actix_web::test]
async fn events_without_a_charge_are_ignored() {
    let db = new_database().await;
    let app = test_app(db.clone(), idle_gateway()).await;
    let body = r#"{"event":{"id":"evt-740","type":"invoice:created","data":{}}}"#;
    let (status, json) = send(&app, signed(body)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["outcome"], "Ignored");
    tear_down(db).await;
}

#[actix_web::test]
async fn signed_garbage_is_a_bad_request() {
    let db = new_database().await;
    let app = test_app(db.clone(), idle_gateway()).await;
    let (status, json) = send(&app, signed("this is not json")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["reason"], "invalid_request");
    tear_down(db).await;
}

#[actix_web::test]
async fn ledger_failure_is_not_acknowledged() {
    let db = new_database().await;
    let app = test_app(db.clone(), idle_gateway()).await;
    // The pool is shared, so this closes it for the app as well
    let mut closed = db.clone();
    closed.close().await;
    let (status, json) = send(&app, signed(&event_body("evt-750", "charge:confirmed", "chg-750"))).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(json["error"], "Internal server error");
    assert_eq!(json["reason"], "internal_error");
    tear_down(db).await;
}

#[actix_web::test]
async fn failure_inside_the_ledger_transaction_is_retried_cleanly() {
    let db = new_database().await;
    let mug = product(&db, "Mug", "12.50").await;
    let order = pending_order(&db, 4, &[(&mug, 1)]).await;
    payment_with_reference(&db, &order, "chg-760").await;
    let app = test_app(db.clone(), idle_gateway()).await;
    sqlx::query(
        "CREATE TRIGGER fail_order_update BEFORE UPDATE ON orders BEGIN SELECT RAISE(ABORT, 'simulated failure'); END;",
    )
    .execute(db.pool())
    .await
    .unwrap();
    let body = event_body("evt-760", "charge:confirmed", "chg-760");

    let (status, json) = send(&app, signed(&body)).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(json["reason"], "internal_error");
    assert!(!json.to_string().contains("simulated failure"));
    assert!(db.fetch_processed_event("evt-760").await.unwrap().is_none());
    let (payment, _) = db.fetch_payment_by_reference("chg-760").await.unwrap().unwrap();
    assert_eq!(payment.status, PaymentStatus::Pending);

    sqlx::query("DROP TRIGGER fail_order_update").execute(db.pool()).await.unwrap();
    let (status, json) = send(&app, signed(&body)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["outcome"], "Paid");
    let order = db.fetch_order(order.id).await.unwrap().unwrap();
    assert_eq!(order.status, OrderStatusType::Paid);
    tear_down(db).await;
}
