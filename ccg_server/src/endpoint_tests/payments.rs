use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
};

use actix_web::{http::StatusCode, test::TestRequest};
use ccg_engine::{
    db_types::{OrderId, OrderStatusType},
    test_utils::prepare_env::tear_down,
    traits::{
        ChargeSummary,
        CheckoutManagement,
        GatewayError,
        GatewayEvent,
        GatewayEventKind,
        PaymentLedger,
        RemoteCharge,
        RemoteStatus,
    },
};
use serde_json::json;

use super::{
    helpers::{
        admin_token,
        buyer_token,
        charge_handle,
        idle_gateway,
        new_database,
        payment_with_reference,
        pending_order,
        product,
        send,
        test_app,
        with_token,
    },
    mocks::MockGateway,
};

fn remote(charge_id: &str, status: RemoteStatus) -> RemoteCharge {
    RemoteCharge { charge_id: charge_id.to_string(), status, confirmed_at: None, expires_at: None, payments: vec![] }
}

fn create_request(order_id: OrderId) -> TestRequest {
    TestRequest::post().uri("/api/payments/crypto/create").set_json(json!({ "order_id": order_id }))
}

#[actix_web::test]
async fn create_payment() {
    let db = new_database().await;
    let mug = product(&db, "Mug", "12.50").await;
    let order = pending_order(&db, 4, &[(&mug, 2)]).await;
    let mut gateway = MockGateway::new();
    gateway.expect_is_configured().return_const(true);
    gateway.expect_create_charge().times(1).returning(|req| {
        assert_eq!(req.amount.to_string(), "25.00");
        assert_eq!(req.currency, "USD");
        assert!(req.description.starts_with("Test Shop"));
        assert_eq!(req.payer_contact.as_deref(), Some("buyer4@example.com"));
        Ok(charge_handle("chg-100"))
    });
    let app = test_app(db.clone(), gateway).await;
    let (status, body) = send(&app, with_token(create_request(order.id), &buyer_token(4))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["order_id"], order.id.value());
    assert_eq!(body["charge_id"], "chg-100");
    assert_eq!(body["code"], "CHG-100");
    assert_eq!(body["payment_url"], "https://commerce.coinbase.com/charges/chg-100");
    assert_eq!(body["amount"], "25.00");
    assert_eq!(body["addresses"]["bitcoin"], "bc1qexampleaddress");
    assert_eq!(body["accepted_currencies"].as_array().unwrap().len(), 6);

    // A second attempt must not reach the gateway
    let (status, body) = send(&app, with_token(create_request(order.id), &buyer_token(4))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["reason"], "order_already_processed");
    tear_down(db).await;
}

#[actix_web::test]
async fn create_payment_for_someone_elses_order() {
    let db = new_database().await;
    let mug = product(&db, "Mug", "12.50").await;
    let order = pending_order(&db, 4, &[(&mug, 1)]).await;
    let app = test_app(db.clone(), idle_gateway()).await;
    let (status, body) = send(&app, with_token(create_request(order.id), &buyer_token(5))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["reason"], "not_found");
    let (status, _) = send(&app, with_token(create_request(OrderId(9999)), &buyer_token(4))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    tear_down(db).await;
}

#[actix_web::test]
async fn create_payment_for_paid_order() {
    let db = new_database().await;
    let mug = product(&db, "Mug", "12.50").await;
    let order = pending_order(&db, 4, &[(&mug, 1)]).await;
    payment_with_reference(&db, &order, "chg-050").await;
    let confirmed = GatewayEvent::new("evt-050", GatewayEventKind::Confirmed, "chg-050");
    db.apply_gateway_event(&confirmed).await.unwrap();
    let app = test_app(db.clone(), idle_gateway()).await;
    let (status, body) = send(&app, with_token(create_request(order.id), &buyer_token(4))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["reason"], "order_already_processed");
    tear_down(db).await;
}

#[actix_web::test]
async fn create_payment_without_gateway_credentials() {
    let db = new_database().await;
    let mug = product(&db, "Mug", "12.50").await;
    let order = pending_order(&db, 4, &[(&mug, 1)]).await;
    let mut gateway = MockGateway::new();
    gateway.expect_is_configured().return_const(false);
    gateway.expect_create_charge().never();
    let app = test_app(db.clone(), gateway).await;
    let (status, body) = send(&app, with_token(create_request(order.id), &buyer_token(4))).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["reason"], "gateway_unavailable");
    tear_down(db).await;
}

#[actix_web::test]
async fn failed_charge_can_be_retried() {
    let db = new_database().await;
    let mug = product(&db, "Mug", "12.50").await;
    let order = pending_order(&db, 4, &[(&mug, 1)]).await;
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);
    let mut gateway = MockGateway::new();
    gateway.expect_is_configured().return_const(true);
    gateway.expect_create_charge().times(2).returning(move |_| {
        if counter.fetch_add(1, Ordering::SeqCst) == 0 {
            Err(GatewayError::Transient("Request timed out".into()))
        } else {
            Ok(charge_handle("chg-200"))
        }
    });
    let app = test_app(db.clone(), gateway).await;
    let (status, body) = send(&app, with_token(create_request(order.id), &buyer_token(4))).await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body["reason"], "gateway_transient");
    // The claim was released, so a retry goes through
    let (status, body) = send(&app, with_token(create_request(order.id), &buyer_token(4))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["charge_id"], "chg-200");
    assert_eq!(calls.load(Ordering::SeqCst), 2);
    tear_down(db).await;
}

#[actix_web::test]
async fn rejected_charge() {
    let db = new_database().await;
    let mug = product(&db, "Mug", "12.50").await;
    let order = pending_order(&db, 4, &[(&mug, 1)]).await;
    let mut gateway = MockGateway::new();
    gateway.expect_is_configured().return_const(true);
    gateway.expect_create_charge().times(1).returning(|_| Err(GatewayError::Rejected("Invalid pricing".into())));
    let app = test_app(db.clone(), gateway).await;
    let (status, body) = send(&app, with_token(create_request(order.id), &buyer_token(4))).await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body["reason"], "gateway_rejected");
    assert!(!body.to_string().contains("Invalid pricing"));
    tear_down(db).await;
}

#[actix_web::test]
async fn every_gateway_route_reaches_its_handler() {
    let db = new_database().await;
    let mug = product(&db, "Mug", "12.50").await;
    let unpaid = pending_order(&db, 4, &[(&mug, 1)]).await;
    let charged = pending_order(&db, 4, &[(&mug, 2)]).await;
    payment_with_reference(&db, &charged, "chg-900").await;
    let mut gateway = MockGateway::new();
    gateway.expect_is_configured().return_const(true);
    gateway.expect_create_charge().times(1).returning(|_| Err(GatewayError::Transient("down".into())));
    gateway.expect_query_charge().times(2).returning(|_| Err(GatewayError::Transient("down".into())));
    gateway.expect_list_charges().times(1).returning(|| Err(GatewayError::Transient("down".into())));
    let app = test_app(db.clone(), gateway).await;

    let requests = [
        with_token(create_request(unpaid.id), &buyer_token(4)),
        with_token(TestRequest::get().uri("/api/payments/crypto/status/chg-900"), &buyer_token(4)),
        with_token(TestRequest::get().uri("/api/payments/crypto/list"), &admin_token(1)),
        with_token(TestRequest::post().uri("/api/payments/crypto/reconcile/chg-900"), &admin_token(1)),
    ];
    for req in requests {
        let (status, body) = send(&app, req).await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert_eq!(body["reason"], "gateway_transient");
    }
    tear_down(db).await;
}

#[actix_web::test]
async fn payment_status() {
    let db = new_database().await;
    let mug = product(&db, "Mug", "12.50").await;
    let order = pending_order(&db, 4, &[(&mug, 1)]).await;
    payment_with_reference(&db, &order, "chg-300").await;
    let mut gateway = MockGateway::new();
    gateway.expect_is_configured().return_const(true);
    gateway.expect_query_charge().times(2).returning(|id| Ok(remote(id, RemoteStatus::Pending)));
    let app = test_app(db.clone(), gateway).await;
    let uri = "/api/payments/crypto/status/chg-300";

    let (status, body) = send(&app, with_token(TestRequest::get().uri(uri), &buyer_token(4))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["charge_id"], "chg-300");
    assert_eq!(body["remote_status"], "PENDING");
    assert_eq!(body["local_status"], "Pending");
    assert_eq!(body["order_status"], "Pending");
    assert_eq!(body["amount"], "12.50");

    let (status, _) = send(&app, with_token(TestRequest::get().uri(uri), &buyer_token(5))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(&app, with_token(TestRequest::get().uri(uri), &admin_token(1))).await;
    assert_eq!(status, StatusCode::OK);
    tear_down(db).await;
}

#[actix_web::test]
async fn list_charges() {
    let db = new_database().await;
    let mug = product(&db, "Mug", "12.50").await;
    let order = pending_order(&db, 4, &[(&mug, 1)]).await;
    let payment = payment_with_reference(&db, &order, "chg-400").await;
    let mut gateway = MockGateway::new();
    gateway.expect_is_configured().return_const(true);
    gateway.expect_list_charges().returning(|| {
        Ok(vec![
            ChargeSummary { charge_id: "chg-400".into(), raw: json!({"id": "chg-400", "code": "ABC"}) },
            ChargeSummary { charge_id: "chg-401".into(), raw: json!({"id": "chg-401"}) },
        ])
    });
    let app = test_app(db.clone(), gateway).await;
    let uri = "/api/payments/crypto/list";

    let (status, _) = send(&app, with_token(TestRequest::get().uri(uri), &buyer_token(4))).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = send(&app, with_token(TestRequest::get().uri(uri), &admin_token(1))).await;
    assert_eq!(status, StatusCode::OK);
    let listing = body.as_array().unwrap();
    assert_eq!(listing.len(), 2);
    assert_eq!(listing[0]["charge_id"], "chg-400");
    assert_eq!(listing[0]["charge"]["code"], "ABC");
    assert_eq!(listing[0]["payment"]["id"], payment.id);
    assert!(listing[1]["payment"].is_null());
    tear_down(db).await;
}

#[actix_web::test]
async fn reconcile_charge() {
    let db = new_database().await;
    let mug = product(&db, "Mug", "12.50").await;
    let order = pending_order(&db, 4, &[(&mug, 1)]).await;
    payment_with_reference(&db, &order, "chg-500").await;
    let mut gateway = MockGateway::new();
    gateway.expect_is_configured().return_const(true);
    gateway.expect_query_charge().returning(|id| Ok(remote(id, RemoteStatus::Completed)));
    let app = test_app(db.clone(), gateway).await;
    let uri = "/api/payments/crypto/reconcile/chg-500";

    let (status, _) = send(&app, with_token(TestRequest::post().uri(uri), &buyer_token(4))).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = send(&app, with_token(TestRequest::post().uri(uri), &admin_token(1))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["charge_id"], "chg-500");
    assert_eq!(body["remote_status"], "COMPLETED");
    assert_eq!(body["outcome"], "Paid");
    assert!(body.get("anomaly").is_none());
    let order = db.fetch_order(order.id).await.unwrap().unwrap();
    assert_eq!(order.status, OrderStatusType::Paid);

    let (status, body) = send(&app, with_token(TestRequest::post().uri(uri), &admin_token(1))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["outcome"], "Duplicate");
    tear_down(db).await;
}

#[actix_web::test]
async fn reconcile_unknown_charge_records_anomaly() {
    let db = new_database().await;
    let mut gateway = MockGateway::new();
    gateway.expect_is_configured().return_const(true);
    gateway.expect_query_charge().returning(|id| Ok(remote(id, RemoteStatus::Completed)));
    let app = test_app(db.clone(), gateway).await;
    let req = TestRequest::post().uri("/api/payments/crypto/reconcile/chg-stray");
    let (status, body) = send(&app, with_token(req, &admin_token(1))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["outcome"], "Anomaly");
    assert_eq!(body["anomaly"]["kind"], "UnknownReference");
    assert_eq!(body["anomaly"]["reference"], "chg-stray");

    let req = TestRequest::get().uri("/api/payments/anomalies");
    let (status, _) = send(&app, with_token(req, &buyer_token(4))).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let req = TestRequest::get().uri("/api/payments/anomalies");
    let (status, body) = send(&app, with_token(req, &admin_token(1))).await;
    assert_eq!(status, StatusCode::OK);
    let anomalies = body.as_array().unwrap();
    assert_eq!(anomalies.len(), 1);
    assert_eq!(anomalies[0]["event_id"], "poll:chg-stray:COMPLETED");
    tear_down(db).await;
}

#[actix_web::test]
async fn reconcile_when_provider_is_down() {
    let db = new_database().await;
    let mut gateway = MockGateway::new();
    gateway.expect_is_configured().return_const(true);
    gateway.expect_query_charge().returning(|_| Err(GatewayError::Transient("connection refused".into())));
    let app = test_app(db.clone(), gateway).await;
    let req = TestRequest::post().uri("/api/payments/crypto/reconcile/chg-600");
    let (status, body) = send(&app, with_token(req, &admin_token(1))).await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body["reason"], "gateway_transient");
    tear_down(db).await;
}
