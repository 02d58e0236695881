use actix_web::{http::StatusCode, test::TestRequest};
use ccg_engine::test_utils::prepare_env::tear_down;
use serde_json::json;

use super::helpers::{
    admin_token,
    buyer_token,
    idle_gateway,
    new_database,
    pending_order,
    product,
    send,
    test_app,
    with_token,
};

#[actix_web::test]
async fn checkout_empty_cart() {
    let db = new_database().await;
    let app = test_app(db.clone(), idle_gateway()).await;
    let req = TestRequest::post().uri("/api/orders/checkout").set_json(json!({}));
    let (status, body) = send(&app, with_token(req, &buyer_token(1))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["reason"], "empty_cart");
    tear_down(db).await;
}

#[actix_web::test]
async fn checkout_creates_pending_order() {
    let db = new_database().await;
    let mug = product(&db, "Mug", "12.50").await;
    let tea = product(&db, "Tea", "4.25").await;
    let app = test_app(db.clone(), idle_gateway()).await;
    let token = buyer_token(5);
    for (id, quantity) in [(mug.id, 2), (tea.id, 3)] {
        let req = TestRequest::post().uri("/api/cart/items").set_json(json!({"product_id": id, "quantity": quantity}));
        send(&app, with_token(req, &token)).await;
    }
    let req = TestRequest::post().uri("/api/orders/checkout").set_json(json!({"shipping_address": "  1 Main St  "}));
    let (status, body) = send(&app, with_token(req, &token)).await;
    assert_eq!(status, StatusCode::CREATED);
    let order = &body["order"];
    assert_eq!(order["buyer_id"], 5);
    assert_eq!(order["status"], "Pending");
    assert_eq!(order["total"], "37.75");
    assert_eq!(order["currency"], "USD");
    assert_eq!(order["shipping_address"], "1 Main St");
    // The cart is only emptied once the order has been paid
    let (_, cart) = send(&app, with_token(TestRequest::get().uri("/api/cart"), &token)).await;
    assert_eq!(cart["items"].as_array().unwrap().len(), 2);
    tear_down(db).await;
}

#[actix_web::test]
async fn checkout_without_body() {
    let db = new_database().await;
    let mug = product(&db, "Mug", "12.50").await;
    let app = test_app(db.clone(), idle_gateway()).await;
    let token = buyer_token(5);
    let req = TestRequest::post().uri("/api/cart/items").set_json(json!({"product_id": mug.id}));
    send(&app, with_token(req, &token)).await;
    let (status, body) = send(&app, with_token(TestRequest::post().uri("/api/orders/checkout"), &token)).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["order"]["total"], "12.50");
    assert!(body["order"]["shipping_address"].is_null());
    tear_down(db).await;
}

#[actix_web::test]
async fn my_orders_newest_first() {
    let db = new_database().await;
    let mug = product(&db, "Mug", "12.50").await;
    let first = pending_order(&db, 2, &[(&mug, 1)]).await;
    let second = pending_order(&db, 2, &[(&mug, 1)]).await;
    pending_order(&db, 3, &[(&mug, 1)]).await;
    let app = test_app(db.clone(), idle_gateway()).await;
    let (status, body) = send(&app, with_token(TestRequest::get().uri("/api/orders/mine"), &buyer_token(2))).await;
    assert_eq!(status, StatusCode::OK);
    let orders = body.as_array().unwrap();
    assert_eq!(orders.len(), 2);
    assert_eq!(orders[0]["id"], second.id.value());
    assert_eq!(orders[1]["id"], first.id.value());

    let (_, body) = send(&app, with_token(TestRequest::get().uri("/api/orders/mine"), &buyer_token(4))).await;
    assert_eq!(body, json!([]));
    tear_down(db).await;
}

#[actix_web::test]
async fn order_by_id_is_private() {
    let db = new_database().await;
    let mug = product(&db, "Mug", "12.50").await;
    let order = pending_order(&db, 2, &[(&mug, 2)]).await;
    let app = test_app(db.clone(), idle_gateway()).await;
    let uri = format!("/api/orders/{}", order.id.value());

    let (status, body) = send(&app, with_token(TestRequest::get().uri(&uri), &buyer_token(2))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["id"], order.id.value());
    assert_eq!(body["total"], "25.00");

    let (status, body) = send(&app, with_token(TestRequest::get().uri(&uri), &buyer_token(3))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["reason"], "not_found");

    let (status, body) = send(&app, with_token(TestRequest::get().uri(&uri), &admin_token(1))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["buyer_id"], 2);

    let (status, _) = send(&app, with_token(TestRequest::get().uri("/api/orders/9999"), &buyer_token(2))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, body) = send(&app, with_token(TestRequest::get().uri("/api/orders/abc"), &buyer_token(2))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["reason"], "invalid_request");
    tear_down(db).await;
}

#[actix_web::test]
async fn all_orders_is_admin_only() {
    let db = new_database().await;
    let mug = product(&db, "Mug", "12.50").await;
    pending_order(&db, 2, &[(&mug, 1)]).await;
    pending_order(&db, 3, &[(&mug, 1)]).await;
    let app = test_app(db.clone(), idle_gateway()).await;

    let (status, body) = send(&app, with_token(TestRequest::get().uri("/api/orders"), &buyer_token(2))).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["reason"], "forbidden");

    let (status, body) = send(&app, with_token(TestRequest::get().uri("/api/orders"), &admin_token(1))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 2);
    tear_down(db).await;
}
