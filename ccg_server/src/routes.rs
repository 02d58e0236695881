//! Request handler definitions
//!
//! Define each route and its handler here. Handlers that are more than a few lines long should delegate to the engine
//! APIs, which hold the actual behaviour.
//!
//! A note about performance:
//! Since each worker thread processes its requests sequentially, handlers which block the current thread will cause the
//! current worker to stop processing new requests. Every database and gateway call is therefore async.
use actix_web::{get, web, HttpRequest, HttpResponse, Responder};
use ccg_engine::{
    db_types::OrderId,
    traits::{CartManagement, CheckoutManagement, PaymentGateway, PaymentLedger, ReconcileOutcome},
    CartApi,
    CheckoutApi,
    PaymentFlowApi,
    ReconciliationApi,
};
use coinbase_tools::{WebhookError, WebhookVerifier, SIGNATURE_HEADER};
use log::*;

use crate::{
    auth::{JwtClaims, Role},
    data_objects::{
        AddItemRequest,
        CheckoutRequest,
        CreatePaymentRequest,
        OrderResponse,
        ReconcileResult,
        SetQuantityRequest,
        WebhookAck,
    },
    errors::ServerError,
    integrations::coinbase::gateway_event,
};

// Web-actix cannot handle generics in handlers, so it's implemented manually using the `route!` macro
#[macro_export]
macro_rules! route {
    ($name:ident => $method:ident $path:literal impl [$($bounds:path),+] and [$($gbounds:path),+] where requires [$($roles:expr),*]) => {
        paste::paste! { pub struct [<$name:camel Route>]<A, G>(core::marker::PhantomData<fn() -> (A, G)>);}
        paste::paste! { impl<A, G> [<$name:camel Route>]<A, G> {
            #[allow(clippy::new_without_default)]
            pub fn new() -> Self {
                Self(core::marker::PhantomData::<fn() -> (A, G)>)
            }
        }}
        paste::paste! { impl<A, G> actix_web::dev::HttpServiceFactory for [<$name:camel Route>]<A, G>
        where
            A: $($bounds +)+ 'static,
            G: $($gbounds +)+ 'static,
        {
            fn register(self, config: &mut actix_web::dev::AppService) {
                let res = actix_web::Resource::new($path)
                    .name(stringify!($name))
                    .guard(actix_web::guard::$method())
                    .to($name::<A, G>)
                    .wrap($crate::middleware::AclMiddlewareFactory::new(&[$($roles),*]));
                actix_web::dev::HttpServiceFactory::register(res, config);
            }
        }}
    };

    ($name:ident => $method:ident $path:literal impl $($bounds:path),+ where requires [$($roles:expr),*])  => {
        paste::paste! { pub struct [<$name:camel Route>]<A>(core::marker::PhantomData<fn() -> A>);}
        paste::paste! { impl<A> [<$name:camel Route>]<A> {
            #[allow(clippy::new_without_default)]
            pub fn new() -> Self {
                Self(core::marker::PhantomData::<fn() -> A>)
            }
        }}
        paste::paste! { impl<A> actix_web::dev::HttpServiceFactory for [<$name:camel Route>]<A>
        where
            A: $($bounds +)+ 'static,
        {
            fn register(self, config: &mut actix_web::dev::AppService) {
                let res = actix_web::Resource::new($path)
                    .name(stringify!($name))
                    .guard(actix_web::guard::$method())
                    .to($name::<A>)
                    .wrap($crate::middleware::AclMiddlewareFactory::new(&[$($roles),*]));
                actix_web::dev::HttpServiceFactory::register(res, config);
            }
        }}
    };

    ($name:ident => $method:ident $path:literal impl $($bounds:path),+) => {
        paste::paste! { pub struct [<$name:camel Route>]<A>(core::marker::PhantomData<fn() -> A>);}
        paste::paste! { impl<A> [<$name:camel Route>]<A> {
            #[allow(clippy::new_without_default)]
            pub fn new() -> Self {
                Self(core::marker::PhantomData::<fn() -> A>)
            }
        }}
        paste::paste! { impl<A> actix_web::dev::HttpServiceFactory for [<$name:camel Route>]<A>
        where
            A: $($bounds +)+ 'static,
        {
            fn register(self, config: &mut actix_web::dev::AppService) {
                let res = actix_web::Resource::new($path)
                    .name(stringify!($name))
                    .guard(actix_web::guard::$method())
                    .to($name::<A>);
                actix_web::dev::HttpServiceFactory::register(res, config);
            }
        }}
    };
}

// ----------------------------------------------   Health  ----------------------------------------------------
#[get("/health")]
pub async fn health() -> impl Responder {
    trace!("💻️ Received health check request");
    HttpResponse::Ok().body("👍️\n")
}

//----------------------------------------------   Cart  ----------------------------------------------------
route!(my_cart => Get "/cart" impl CartManagement where requires [Role::Buyer]);
/// Returns the buyer's cart. A buyer who has never added anything gets an empty cart.
pub async fn my_cart<B: CartManagement>(
    claims: JwtClaims,
    api: web::Data<CartApi<B>>,
) -> Result<HttpResponse, ServerError> {
    debug!("💻️ GET cart for buyer #{}", claims.buyer_id());
    let cart = api.snapshot(claims.buyer_id()).await?;
    Ok(HttpResponse::Ok().json(cart))
}

route!(add_cart_item => Post "/cart/items" impl CartManagement where requires [Role::Buyer]);
/// Adds a product to the buyer's cart. Adding a product that is already in the cart increases its quantity.
///
/// The product's current price is captured on the line when it is first added.
pub async fn add_cart_item<B: CartManagement>(
    claims: JwtClaims,
    body: web::Json<AddItemRequest>,
    api: web::Data<CartApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let AddItemRequest { product_id, quantity } = body.into_inner();
    debug!("💻️ POST add {quantity} x product {product_id} to cart for buyer #{}", claims.buyer_id());
    let cart = api.add_item(claims.buyer_id(), product_id, quantity).await?;
    Ok(HttpResponse::Ok().json(cart))
}

route!(set_cart_item_quantity => Patch "/cart/items" impl CartManagement where requires [Role::Buyer]);
/// Overwrites the quantity of a line in the cart. A quantity of zero removes the line.
pub async fn set_cart_item_quantity<B: CartManagement>(
    claims: JwtClaims,
    body: web::Json<SetQuantityRequest>,
    api: web::Data<CartApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let SetQuantityRequest { product_id, quantity } = body.into_inner();
    debug!("💻️ PATCH product {product_id} quantity to {quantity} for buyer #{}", claims.buyer_id());
    let cart = api.set_item_quantity(claims.buyer_id(), product_id, quantity).await?;
    Ok(HttpResponse::Ok().json(cart))
}

route!(remove_cart_item => Delete "/cart/items/{product_id}" impl CartManagement where requires [Role::Buyer]);
pub async fn remove_cart_item<B: CartManagement>(
    claims: JwtClaims,
    path: web::Path<i64>,
    api: web::Data<CartApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let product_id = path.into_inner();
    debug!("💻️ DELETE product {product_id} from cart for buyer #{}", claims.buyer_id());
    let cart = api.remove_item(claims.buyer_id(), product_id).await?;
    Ok(HttpResponse::Ok().json(cart))
}

route!(clear_cart => Delete "/cart" impl CartManagement where requires [Role::Buyer]);
pub async fn clear_cart<B: CartManagement>(
    claims: JwtClaims,
    api: web::Data<CartApi<B>>,
) -> Result<HttpResponse, ServerError> {
    debug!("💻️ DELETE cart for buyer #{}", claims.buyer_id());
    let cart = api.clear(claims.buyer_id()).await?;
    Ok(HttpResponse::Ok().json(cart))
}

//----------------------------------------------   Orders  ----------------------------------------------------
route!(checkout => Post "/orders/checkout" impl CheckoutManagement where requires [Role::Buyer]);
/// Converts the buyer's cart into a `Pending` order.
///
/// The body is optional. If supplied it may carry a `shipping_address`. The cart is not emptied here. That only
/// happens once a payment for the order has been confirmed.
pub async fn checkout<B: CheckoutManagement>(
    claims: JwtClaims,
    body: Option<web::Json<CheckoutRequest>>,
    api: web::Data<CheckoutApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let CheckoutRequest { shipping_address } = body.map(|b| b.into_inner()).unwrap_or_default();
    debug!("💻️ POST checkout for buyer #{}", claims.buyer_id());
    let order = api.checkout(claims.buyer_id(), shipping_address).await?;
    Ok(HttpResponse::Created().json(OrderResponse { order }))
}

route!(my_orders => Get "/orders/mine" impl CheckoutManagement where requires [Role::Buyer]);
pub async fn my_orders<B: CheckoutManagement>(
    claims: JwtClaims,
    api: web::Data<CheckoutApi<B>>,
) -> Result<HttpResponse, ServerError> {
    debug!("💻️ GET my_orders for buyer #{}", claims.buyer_id());
    let orders = api.orders_for_buyer(claims.buyer_id()).await?;
    Ok(HttpResponse::Ok().json(orders))
}

route!(order_by_id => Get "/orders/{order_id}" impl CheckoutManagement where requires []);
/// Fetches a single order. Buyers only see their own orders; any other id is reported as not found, whether it exists
/// or not. Admins can fetch any order.
pub async fn order_by_id<B: CheckoutManagement>(
    claims: JwtClaims,
    path: web::Path<i64>,
    api: web::Data<CheckoutApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let order_id = OrderId::from(path.into_inner());
    debug!("💻️ GET order {order_id} for buyer #{}", claims.buyer_id());
    let order = api.order_for_buyer(order_id, claims.buyer_id(), claims.is_admin()).await?;
    Ok(HttpResponse::Ok().json(order))
}

route!(all_orders => Get "/orders" impl CheckoutManagement where requires [Role::Admin]);
pub async fn all_orders<B: CheckoutManagement>(api: web::Data<CheckoutApi<B>>) -> Result<HttpResponse, ServerError> {
    debug!("💻️ GET all orders");
    let orders = api.all_orders().await?;
    Ok(HttpResponse::Ok().json(orders))
}

//----------------------------------------------   Payments  ----------------------------------------------------
route!(create_crypto_payment => Post "/payments/crypto/create" impl [PaymentLedger, CheckoutManagement] and [PaymentGateway] where requires [Role::Buyer]);
/// Creates a hosted crypto charge for one of the buyer's pending orders.
///
/// At most one payment attempt can be in flight per order. A second attempt, whether concurrent or after the first
/// succeeded, is rejected with `order_already_processed`.
pub async fn create_crypto_payment<B, G>(
    claims: JwtClaims,
    body: web::Json<CreatePaymentRequest>,
    api: web::Data<PaymentFlowApi<B, G>>,
) -> Result<HttpResponse, ServerError>
where
    B: PaymentLedger + CheckoutManagement,
    G: PaymentGateway,
{
    let order_id = body.order_id;
    debug!("💻️ POST create crypto payment for order {order_id} by buyer #{}", claims.buyer_id());
    let intent = api.create_payment(order_id, claims.buyer_id(), claims.email.clone()).await?;
    Ok(HttpResponse::Ok().json(intent))
}

route!(crypto_payment_status => Get "/payments/crypto/status/{charge_id}" impl [PaymentLedger, CheckoutManagement] and [PaymentGateway] where requires []);
pub async fn crypto_payment_status<B, G>(
    claims: JwtClaims,
    path: web::Path<String>,
    api: web::Data<PaymentFlowApi<B, G>>,
) -> Result<HttpResponse, ServerError>
where
    B: PaymentLedger + CheckoutManagement,
    G: PaymentGateway,
{
    let charge_id = path.into_inner();
    debug!("💻️ GET status of charge {charge_id} for buyer #{}", claims.buyer_id());
    let report = api.payment_status(&charge_id, claims.buyer_id(), claims.is_admin()).await?;
    Ok(HttpResponse::Ok().json(report))
}

route!(list_crypto_charges => Get "/payments/crypto/list" impl [PaymentLedger, CheckoutManagement] and [PaymentGateway] where requires [Role::Admin]);
pub async fn list_crypto_charges<B, G>(api: web::Data<PaymentFlowApi<B, G>>) -> Result<HttpResponse, ServerError>
where
    B: PaymentLedger + CheckoutManagement,
    G: PaymentGateway,
{
    debug!("💻️ GET crypto charge listing");
    let charges = api.list_charges().await?;
    Ok(HttpResponse::Ok().json(charges))
}

route!(reconcile_crypto_charge => Post "/payments/crypto/reconcile/{charge_id}" impl [PaymentLedger, CheckoutManagement] and [PaymentGateway] where requires [Role::Admin]);
/// Pulls the provider's current status for a charge and applies it through the same state machine as webhooks. Use
/// this when webhook deliveries have been lost.
pub async fn reconcile_crypto_charge<B, G>(
    path: web::Path<String>,
    api: web::Data<PaymentFlowApi<B, G>>,
    reconciler: web::Data<ReconciliationApi<B>>,
) -> Result<HttpResponse, ServerError>
where
    B: PaymentLedger + CheckoutManagement,
    G: PaymentGateway,
{
    let charge_id = path.into_inner();
    info!("💻️ POST reconcile charge {charge_id}");
    let remote = api.query_remote(&charge_id).await?;
    let outcome = reconciler.apply_remote_status(&remote).await?;
    Ok(HttpResponse::Ok().json(ReconcileResult::new(charge_id, remote.status.to_string(), &outcome)))
}

route!(anomalies => Get "/payments/anomalies" impl PaymentLedger where requires [Role::Admin]);
pub async fn anomalies<B: PaymentLedger>(api: web::Data<ReconciliationApi<B>>) -> Result<HttpResponse, ServerError> {
    debug!("💻️ GET reconciliation anomalies");
    let anomalies = api.anomalies().await?;
    Ok(HttpResponse::Ok().json(anomalies))
}

//----------------------------------------------   Webhooks  ----------------------------------------------------
route!(coinbase_webhook => Post "/coinbase" impl PaymentLedger);
/// Receives Coinbase Commerce event notifications.
///
/// The signature is checked against the raw body before anything is parsed. The delivery is only acknowledged with a
/// 200 once the event has been committed to the ledger. If that fails a 500 is returned so that the provider retries.
pub async fn coinbase_webhook<B: PaymentLedger>(
    req: HttpRequest,
    body: web::Bytes,
    verifier: web::Data<WebhookVerifier>,
    api: web::Data<ReconciliationApi<B>>,
) -> Result<HttpResponse, ServerError> {
    trace!("💻️ Received Coinbase webhook ({} bytes)", body.len());
    let signature = req.headers().get(SIGNATURE_HEADER).and_then(|v| v.to_str().ok());
    let event = verifier.verify(&body, signature).map_err(|e| {
        warn!("📨️ Rejected a Coinbase webhook from {:?}. {e}", req.peer_addr());
        match e {
            WebhookError::InvalidPayload(s) => ServerError::InvalidRequestBody(s),
            e => ServerError::InvalidWebhookSignature(e),
        }
    })?;
    info!("📨️ Coinbase event {} ({}) for charge {}", event.id, event.event_type, event.charge.id);
    let outcome = match gateway_event(&event) {
        Some(gateway_event) => api.apply_event(&gateway_event).await?,
        None => {
            debug!("📨️ Event {} does not reference a charge. Ignoring it.", event.id);
            ReconcileOutcome::Ignored
        },
    };
    Ok(HttpResponse::Ok().json(WebhookAck::new(event.event_type.to_string(), event.id, outcome.label())))
}

