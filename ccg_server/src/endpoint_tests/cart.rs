use actix_web::{http::StatusCode, test::TestRequest};
use ccg_engine::test_utils::prepare_env::tear_down;
use serde_json::json;

use super::helpers::{admin_token, buyer_token, idle_gateway, new_database, product, send, test_app, with_token};

#[actix_web::test]
async fn health_needs_no_token() {
    let db = new_database().await;
    let app = test_app(db.clone(), idle_gateway()).await;
    let (status, body) = send(&app, TestRequest::get().uri("/health")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!("👍️\n"));
    tear_down(db).await;
}

#[actix_web::test]
async fn cart_without_token() {
    let db = new_database().await;
    let app = test_app(db.clone(), idle_gateway()).await;
    let (status, body) = send(&app, TestRequest::get().uri("/api/cart")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["reason"], "unauthorized");
    tear_down(db).await;
}

#[actix_web::test]
async fn cart_with_invalid_token() {
    let db = new_database().await;
    let app = test_app(db.clone(), idle_gateway()).await;
    let mut token = buyer_token(1);
    token.replace_range(token.len() - 10..token.len() - 5, "00000");
    let (status, body) = send(&app, with_token(TestRequest::get().uri("/api/cart"), &token)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["reason"], "unauthorized");
    let req = TestRequest::get().uri("/api/cart").insert_header(("Authorization", "Basic dXNlcjpwYXNz"));
    let (status, _) = send(&app, req).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    tear_down(db).await;
}

#[actix_web::test]
async fn cart_requires_buyer_role() {
    let db = new_database().await;
    let app = test_app(db.clone(), idle_gateway()).await;
    let (status, body) = send(&app, with_token(TestRequest::get().uri("/api/cart"), &admin_token(99))).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["reason"], "forbidden");
    tear_down(db).await;
}

#[actix_web::test]
async fn empty_cart() {
    let db = new_database().await;
    let app = test_app(db.clone(), idle_gateway()).await;
    let (status, body) = send(&app, with_token(TestRequest::get().uri("/api/cart"), &buyer_token(1))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["buyer_id"], 1);
    assert_eq!(body["items"], json!([]));
    assert_eq!(body["total"], "0.00");
    tear_down(db).await;
}

#[actix_web::test]
async fn adding_items_accumulates() {
    let db = new_database().await;
    let mug = product(&db, "Mug", "12.50").await;
    let app = test_app(db.clone(), idle_gateway()).await;
    let token = buyer_token(7);
    let req = TestRequest::post().uri("/api/cart/items").set_json(json!({"product_id": mug.id, "quantity": 2}));
    let (status, body) = send(&app, with_token(req, &token)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["items"][0]["quantity"], 2);
    // quantity defaults to 1
    let req = TestRequest::post().uri("/api/cart/items").set_json(json!({"product_id": mug.id}));
    let (status, body) = send(&app, with_token(req, &token)).await;
    assert_eq!(status, StatusCode::OK);
    let items = body["items"].as_array().unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0]["quantity"], 3);
    assert_eq!(items[0]["unit_price"], "12.50");
    assert_eq!(items[0]["subtotal"], "37.50");
    assert_eq!(items[0]["product_name"], "Mug");
    assert_eq!(body["total"], "37.50");
    // Another buyer's cart is untouched
    let (_, body) = send(&app, with_token(TestRequest::get().uri("/api/cart"), &buyer_token(8))).await;
    assert_eq!(body["items"], json!([]));
    tear_down(db).await;
}

#[actix_web::test]
async fn add_invalid_items() {
    let db = new_database().await;
    let mug = product(&db, "Mug", "12.50").await;
    let app = test_app(db.clone(), idle_gateway()).await;
    let token = buyer_token(7);
    let req = TestRequest::post().uri("/api/cart/items").set_json(json!({"product_id": 9999, "quantity": 1}));
    let (status, body) = send(&app, with_token(req, &token)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["reason"], "not_found");

    let req = TestRequest::post().uri("/api/cart/items").set_json(json!({"product_id": mug.id, "quantity": 0}));
    let (status, body) = send(&app, with_token(req, &token)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["reason"], "invalid_request");

    let req = TestRequest::post()
        .uri("/api/cart/items")
        .set_json(json!({"product_id": mug.id, "quantity": 500_000_000_000_000_i64}));
    let (status, body) = send(&app, with_token(req, &token)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["reason"], "invalid_request");
    let (_, cart) = send(&app, with_token(TestRequest::get().uri("/api/cart"), &token)).await;
    assert_eq!(cart["total"], "0.00");

    let req = TestRequest::post()
        .uri("/api/cart/items")
        .insert_header(("Content-Type", "application/json"))
        .set_payload("{\"product_id\": ");
    let (status, body) = send(&app, with_token(req, &token)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["reason"], "invalid_request");
    tear_down(db).await;
}

#[actix_web::test]
async fn set_quantity_and_remove() {
    let db = new_database().await;
    let mug = product(&db, "Mug", "12.50").await;
    let tea = product(&db, "Tea", "4.25").await;
    let app = test_app(db.clone(), idle_gateway()).await;
    let token = buyer_token(3);
    for id in [mug.id, tea.id] {
        let req = TestRequest::post().uri("/api/cart/items").set_json(json!({"product_id": id, "quantity": 1}));
        send(&app, with_token(req, &token)).await;
    }
    let req = TestRequest::patch().uri("/api/cart/items").set_json(json!({"product_id": tea.id, "quantity": 4}));
    let (status, body) = send(&app, with_token(req, &token)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], "29.50");

    let req = TestRequest::patch().uri("/api/cart/items").set_json(json!({"product_id": tea.id, "quantity": -1}));
    let (status, _) = send(&app, with_token(req, &token)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let req = TestRequest::patch().uri("/api/cart/items").set_json(json!({"product_id": tea.id, "quantity": 0}));
    let (_, body) = send(&app, with_token(req, &token)).await;
    assert_eq!(body["items"].as_array().unwrap().len(), 1);
    assert_eq!(body["total"], "12.50");

    let uri = format!("/api/cart/items/{}", mug.id);
    let (status, body) = send(&app, with_token(TestRequest::delete().uri(&uri), &token)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["items"], json!([]));
    // Removing it again is not an error
    let (status, _) = send(&app, with_token(TestRequest::delete().uri(&uri), &token)).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = send(&app, with_token(TestRequest::delete().uri("/api/cart/items/mug"), &token)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    tear_down(db).await;
}

#[actix_web::test]
async fn clear_cart() {
    let db = new_database().await;
    let mug = product(&db, "Mug", "12.50").await;
    let app = test_app(db.clone(), idle_gateway()).await;
    let token = buyer_token(3);
    let req = TestRequest::post().uri("/api/cart/items").set_json(json!({"product_id": mug.id, "quantity": 5}));
    send(&app, with_token(req, &token)).await;
    let (status, body) = send(&app, with_token(TestRequest::delete().uri("/api/cart"), &token)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["items"], json!([]));
    assert_eq!(body["total"], "0.00");
    tear_down(db).await;
}
