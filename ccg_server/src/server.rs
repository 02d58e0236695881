use std::{future::Future, pin::Pin, sync::Arc, time::Duration};

use actix_web::{
    dev::{Server, Service},
    http::KeepAlive,
    middleware::Logger,
    web,
    App,
    HttpServer,
    Scope,
};
use ccg_engine::{
    events::{AnomalyEvent, EventHandlers, EventHooks, EventProducers, OrderPaidEvent, PaymentFailedEvent},
    traits::{CartManagement, CheckoutManagement, PaymentGateway, PaymentLedger},
    CartApi,
    CheckoutApi,
    PaymentFlowApi,
    ReconciliationApi,
    SqliteDatabase,
};
use coinbase_tools::WebhookVerifier;
use futures::{future::ok, FutureExt};
use log::*;

use crate::{
    auth::TokenValidator,
    config::ServerConfig,
    errors::{AuthError, ServerError},
    helpers::{get_remote_ip, peer_is_whitelisted},
    integrations::coinbase::CoinbaseGateway,
    middleware::JwtMiddlewareFactory,
    routes::{
        health,
        AddCartItemRoute,
        AllOrdersRoute,
        AnomaliesRoute,
        CheckoutRoute,
        ClearCartRoute,
        CoinbaseWebhookRoute,
        CreateCryptoPaymentRoute,
        CryptoPaymentStatusRoute,
        ListCryptoChargesRoute,
        MyCartRoute,
        MyOrdersRoute,
        OrderByIdRoute,
        ReconcileCryptoChargeRoute,
        RemoveCartItemRoute,
        SetCartItemQuantityRoute,
    },
};

const EVENT_BUFFER_SIZE: usize = 128;

type HookFuture = Pin<Box<dyn Future<Output = ()> + Send>>;

pub async fn run_server(config: ServerConfig) -> Result<(), ServerError> {
    config.validate()?;
    let db = SqliteDatabase::new_with_url(&config.database_url, 25)
        .await
        .map_err(|e| ServerError::InitializeError(e.to_string()))?;
    db.migrate().await.map_err(|e| ServerError::InitializeError(e.to_string()))?;
    let handlers = EventHandlers::new(EVENT_BUFFER_SIZE, notification_hooks());
    let producers = handlers.producers();
    handlers.start_handlers().await;
    let srv = create_server_instance(config, db, producers)?;
    srv.await.map_err(|e| ServerError::Unspecified(e.to_string()))
}

pub fn create_server_instance(
    config: ServerConfig,
    db: SqliteDatabase,
    producers: EventProducers,
) -> Result<Server, ServerError> {
    let host = config.host.clone();
    let port = config.port;
    let gateway = CoinbaseGateway::new(config.coinbase.clone());
    let validator = Arc::new(TokenValidator::new(&config.auth));
    let srv = HttpServer::new(move || {
        let cart_api = CartApi::new(db.clone());
        let checkout_api = CheckoutApi::new(db.clone(), &config.currency);
        let payment_api = PaymentFlowApi::new(db.clone(), gateway.clone())
            .with_shop_name(&config.shop_name)
            .with_claim_timeout(config.payment_claim_timeout);
        let reconciliation_api = ReconciliationApi::new(db.clone(), producers.clone());
        let verifier = WebhookVerifier::new(config.coinbase.webhook_secret.clone());
        let app = App::new()
            .wrap(Logger::new("%t (%D ms) %s %a %{Host}i %U").log_target("ccg::access_log"))
            .app_data(json_config())
            .app_data(path_config())
            .app_data(web::Data::new(cart_api))
            .app_data(web::Data::new(checkout_api))
            .app_data(web::Data::new(payment_api))
            .app_data(web::Data::new(reconciliation_api))
            .app_data(web::Data::new(verifier));
        // Routes that require a buyer or admin identity
        let api_scope = api_scope::<SqliteDatabase, CoinbaseGateway>()
            .wrap(JwtMiddlewareFactory::new(Arc::clone(&validator)));
        let use_x_forwarded_for = config.use_x_forwarded_for;
        let use_forwarded = config.use_forwarded;
        let whitelist = config.webhook_whitelist.clone();
        let webhook_scope = web::scope("/webhooks")
            .wrap_fn(move |req, srv| {
                let peer_ip = get_remote_ip(req.request(), use_x_forwarded_for, use_forwarded);
                if peer_is_whitelisted(peer_ip, whitelist.as_deref()) {
                    srv.call(req).boxed_local()
                } else {
                    ok(req.error_response(ServerError::AuthenticationError(AuthError::ForbiddenPeer))).boxed_local()
                }
            })
            .service(CoinbaseWebhookRoute::<SqliteDatabase>::new());
        app.service(health).service(api_scope).service(webhook_scope)
    })
    .keep_alive(KeepAlive::Timeout(Duration::from_secs(600)))
    .bind((host.as_str(), port))?
    .run();
    Ok(srv)
}

/// The authenticated API. Generic over the backend and the gateway so that either can be substituted.
///
/// `/orders/mine` must be registered before `/orders/{order_id}`.
pub fn api_scope<B, G>() -> Scope
where
    B: CartManagement + CheckoutManagement + PaymentLedger + 'static,
    G: PaymentGateway + 'static,
{
    web::scope("/api")
        .service(MyCartRoute::<B>::new())
        .service(ClearCartRoute::<B>::new())
        .service(AddCartItemRoute::<B>::new())
        .service(SetCartItemQuantityRoute::<B>::new())
        .service(RemoveCartItemRoute::<B>::new())
        .service(CheckoutRoute::<B>::new())
        .service(MyOrdersRoute::<B>::new())
        .service(OrderByIdRoute::<B>::new())
        .service(AllOrdersRoute::<B>::new())
        .service(CreateCryptoPaymentRoute::<B, G>::new())
        .service(CryptoPaymentStatusRoute::<B, G>::new())
        .service(ListCryptoChargesRoute::<B, G>::new())
        .service(ReconcileCryptoChargeRoute::<B, G>::new())
        .service(AnomaliesRoute::<B>::new())
}

/// Malformed JSON bodies are reported in the same shape as every other client error.
pub fn json_config() -> web::JsonConfig {
    web::JsonConfig::default().error_handler(|err, _| {
        debug!("💻️ Could not read request body. {err}");
        ServerError::InvalidRequestBody(err.to_string()).into()
    })
}

pub fn path_config() -> web::PathConfig {
    web::PathConfig::default().error_handler(|err, _| ServerError::InvalidRequestPath(err.to_string()).into())
}

/// Stand-ins for buyer and operator notifications. They only log, and run off the request path.
pub fn notification_hooks() -> EventHooks {
    let mut hooks = EventHooks::default();
    hooks
        .on_order_paid(|ev: OrderPaidEvent| {
            Box::pin(async move {
                info!(
                    "📬️ Order {} for buyer #{} is paid ({} {}). Payment #{}, charge {}.",
                    ev.order.id,
                    ev.order.buyer_id,
                    ev.order.total,
                    ev.order.currency,
                    ev.payment.id,
                    ev.payment.reference.as_deref().unwrap_or("-")
                );
            }) as HookFuture
        })
        .on_payment_failed(|ev: PaymentFailedEvent| {
            Box::pin(async move {
                info!(
                    "📬️ Payment #{} for order {} failed. The buyer may try again.",
                    ev.payment.id, ev.payment.order_id
                );
            }) as HookFuture
        })
        .on_anomaly(|ev: AnomalyEvent| {
            Box::pin(async move {
                warn!(
                    "📬️ Reconciliation anomaly #{} needs review. {} for event {}: {}",
                    ev.anomaly.id, ev.anomaly.kind, ev.anomaly.event_id, ev.anomaly.detail
                );
            }) as HookFuture
        });
    hooks
}
