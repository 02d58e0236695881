use std::{collections::BTreeMap, sync::Arc};

use actix_http::Request;
use actix_web::{
    body::MessageBody,
    dev::{Service, ServiceResponse},
    http::{header::AUTHORIZATION, StatusCode},
    test,
    web,
    App,
    Error,
};
use ccg_common::Secret;
use ccg_engine::{
    db_types::{Order, Payment, Product},
    events::EventProducers,
    test_utils::{prepare_env::prepare_test_env, prepare_env::random_db_path, seed_product},
    traits::{CartManagement, ChargeHandle, CheckoutManagement, PaymentLedger},
    CartApi,
    CheckoutApi,
    PaymentFlowApi,
    ReconciliationApi,
    SqliteDatabase,
};
use chrono::Duration;
use coinbase_tools::WebhookVerifier;
use serde_json::Value;

use super::mocks::MockGateway;
use crate::{
    auth::{Role, TokenIssuer, TokenValidator},
    config::AuthConfig,
    middleware::JwtMiddlewareFactory,
    routes::{health, CoinbaseWebhookRoute},
    server::{api_scope, json_config, path_config},
};

// DO NOT re-use these anywhere
pub const JWT_SECRET: &str = "endpoint-test-jwt-secret";
pub const WEBHOOK_SECRET: &str = "endpoint-test-webhook-secret";

pub fn buyer_token(buyer_id: i64) -> String {
    TokenIssuer::new(&AuthConfig::new(JWT_SECRET))
        .issue_token(buyer_id, Some(format!("buyer{buyer_id}@example.com")), vec![Role::Buyer], None)
        .expect("Failed to sign token")
}

pub fn admin_token(id: i64) -> String {
    TokenIssuer::new(&AuthConfig::new(JWT_SECRET))
        .issue_token(id, None, vec![Role::Admin], None)
        .expect("Failed to sign token")
}

pub async fn new_database() -> SqliteDatabase {
    let url = random_db_path();
    prepare_test_env(&url).await;
    SqliteDatabase::new_with_url(&url, 5).await.expect("Error creating connection to database")
}

/// A gateway that is configured but must not be called.
pub fn idle_gateway() -> MockGateway {
    let mut gateway = MockGateway::new();
    gateway.expect_is_configured().return_const(true);
    gateway.expect_create_charge().never();
    gateway
}

pub async fn test_app(
    db: SqliteDatabase,
    gateway: MockGateway,
) -> impl Service<Request, Response = ServiceResponse<impl MessageBody>, Error = Error> {
    let validator = Arc::new(TokenValidator::new(&AuthConfig::new(JWT_SECRET)));
    let app = App::new()
        .app_data(json_config())
        .app_data(path_config())
        .app_data(web::Data::new(CartApi::new(db.clone())))
        .app_data(web::Data::new(CheckoutApi::new(db.clone(), "USD")))
        .app_data(web::Data::new(PaymentFlowApi::new(db.clone(), gateway).with_shop_name("Test Shop")))
        .app_data(web::Data::new(ReconciliationApi::new(db.clone(), EventProducers::default())))
        .app_data(web::Data::new(WebhookVerifier::new(Secret::new(WEBHOOK_SECRET.to_string()))))
        .service(health)
        .service(api_scope::<SqliteDatabase, MockGateway>().wrap(JwtMiddlewareFactory::new(validator)))
        .service(web::scope("/webhooks").service(CoinbaseWebhookRoute::<SqliteDatabase>::new()));
    test::init_service(app).await
}

pub fn with_token(req: test::TestRequest, token: &str) -> test::TestRequest {
    req.insert_header((AUTHORIZATION, format!("Bearer {token}")))
}

/// Sends the request and returns the status with the body parsed as JSON. Bodies that are not JSON are returned as a
/// string value.
pub async fn send<S, B>(app: &S, req: test::TestRequest) -> (StatusCode, Value)
where
    S: Service<Request, Response = ServiceResponse<B>, Error = Error>,
    B: MessageBody,
{
    let res = test::call_service(app, req.to_request()).await;
    let status = res.status();
    let body = test::read_body(res).await;
    let json = if body.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&body).unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&body).into_owned()))
    };
    (status, json)
}

pub async fn product(db: &SqliteDatabase, name: &str, price: &str) -> Product {
    seed_product(db, name, price, true).await
}

/// Fills the buyer's cart and checks out, directly against the ledger.
pub async fn pending_order(db: &SqliteDatabase, buyer_id: i64, items: &[(&Product, i64)]) -> Order {
    for (product, quantity) in items {
        db.add_item(buyer_id, product.id, *quantity).await.expect("Error adding item");
    }
    db.checkout_cart(buyer_id, "USD", None).await.expect("Error checking out")
}

/// Records a payment attempt with the given charge id, as a successful create call would.
pub async fn payment_with_reference(db: &SqliteDatabase, order: &Order, charge_id: &str) -> Payment {
    let claim =
        db.claim_order_for_payment(order.id, order.buyer_id, Duration::seconds(120)).await.expect("Error claiming");
    db.attach_payment_reference(claim.id, charge_id).await.expect("Error attaching reference")
}

pub fn charge_handle(charge_id: &str) -> ChargeHandle {
    let mut addresses = BTreeMap::new();
    addresses.insert("bitcoin".to_string(), "bc1qexampleaddress".to_string());
    ChargeHandle {
        charge_id: charge_id.to_string(),
        hosted_url: format!("https://commerce.coinbase.com/charges/{charge_id}"),
        code: charge_id.to_uppercase(),
        expires_at: None,
        addresses,
    }
}
