//! Request handler definitions
//!
//! Define each route and it handler here.
//! Handlers that are more than a line or two MUST go into a separate module. Keep this module neat and tidy 🙏
//!
//! A note about performance:
//! Since each worker thread processes its requests sequentially, handlers which block the current thread will cause the
//! current worker to stop processing new requests. Every handler here awaits the engine, which does its I/O
//! asynchronously, so workers are free to interleave requests.
use actix_web::{get, web, HttpResponse, Responder};
use log::*;
use medic_dispatch_engine::{
    db_types::{OrderId, Role},
    order_objects::{OrderPage, Pagination},
    CatalogService,
    DispatchApi,
    NotificationApi,
    OrderQueryApi,
    OrderStore,
    ProviderDirectory,
    SubscriptionStore,
};

use crate::{
    auth::AccessClaims,
    data_objects::{
        AdminOrderQuery,
        AdvanceStatusRequest,
        BlockRequest,
        JsonResponse,
        NearbyParams,
        OnlineRequest,
        PageParams,
        PlaceOrderRequest,
        RateOrderRequest,
        SubscribeRequest,
    },
    errors::ServerError,
};

const DEFAULT_NEARBY_LIMIT: usize = 5;
const MAX_NEARBY_LIMIT: usize = 50;

// Web-actix cannot handle generics in handlers, so it's implemented manually using the `route!` macro
#[macro_export]
macro_rules! route {
    ($name:ident => $method:ident $path:literal requires [$($roles:expr),*]) => {
        paste::paste! { pub struct [<$name:camel Route>];}
        paste::paste! {
                impl [<$name:camel Route>] {
                #[allow(clippy::new_without_default)]
                pub fn new() -> Self { Self }
            }
        }
        paste::paste! {
            impl actix_web::dev::HttpServiceFactory for [<$name:camel Route>] {
                fn register(self, config: &mut actix_web::dev::AppService) {
                    let res = actix_web::Resource::new($path)
                        .name(stringify!($name))
                        .guard(actix_web::guard::$method())
                        .to($name)
                        .wrap($crate::middleware::AclMiddlewareFactory::new(&[$($roles),+]));
                    actix_web::dev::HttpServiceFactory::register(res, config);
                }
            }
        }
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
                    .wrap($crate::middleware::AclMiddlewareFactory::new(&[$($roles),+]));
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

//----------------------------------------------   Check Token  ----------------------------------------------------
route!(check_token => Get "/check_token" requires [Role::Client, Role::Medic, Role::Admin]);
pub async fn check_token(claims: AccessClaims) -> Result<HttpResponse, ServerError> {
    debug!("💻️ GET check_token for {} #{}", claims.role, claims.sub);
    Ok(HttpResponse::Ok().json(claims))
}

//----------------------------------------------   Client orders  ----------------------------------------------------
route!(place_order => Post "/orders" impl OrderStore, ProviderDirectory, CatalogService where requires [Role::Client]);
/// The client places an order for a catalog service. The price is always taken from the catalog; the client only
/// supplies the service id, any discount, and where the medic should go.
pub async fn place_order<B>(
    claims: AccessClaims,
    body: web::Json<PlaceOrderRequest>,
    api: web::Data<DispatchApi<B>>,
) -> Result<HttpResponse, ServerError>
where
    B: OrderStore + ProviderDirectory + CatalogService,
{
    let PlaceOrderRequest { service_id, discount, location } = body.into_inner();
    debug!("💻️ POST place_order for client #{} (service #{service_id})", claims.sub);
    let order = api.place_order_for_service(claims.sub, service_id, discount, location).await?;
    Ok(HttpResponse::Created().json(order))
}

route!(my_orders => Get "/orders" impl OrderStore where requires [Role::Client]);
pub async fn my_orders<B: OrderStore>(
    claims: AccessClaims,
    page: web::Query<PageParams>,
    api: web::Data<OrderQueryApi<B>>,
) -> Result<HttpResponse, ServerError> {
    debug!("💻️ GET my_orders for client #{}", claims.sub);
    let pagination = Pagination::from(page.into_inner());
    let orders = api.list_by_client(claims.sub, pagination).await?;
    Ok(HttpResponse::Ok().json(OrderPage::new(pagination, orders)))
}

route!(cancel_order => Post "/orders/{order_id}/cancel" impl OrderStore, ProviderDirectory where requires [Role::Client]);
pub async fn cancel_order<B: OrderStore + ProviderDirectory>(
    claims: AccessClaims,
    path: web::Path<String>,
    api: web::Data<DispatchApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let order_id = OrderId::from(path.into_inner());
    debug!("💻️ POST cancel_order {order_id} by client #{}", claims.sub);
    let order = api.cancel_by_client(&order_id, claims.sub).await?;
    Ok(HttpResponse::Ok().json(order))
}

route!(rate_order => Post "/orders/{order_id}/rate" impl OrderStore, ProviderDirectory where requires [Role::Client]);
pub async fn rate_order<B: OrderStore + ProviderDirectory>(
    claims: AccessClaims,
    path: web::Path<String>,
    body: web::Json<RateOrderRequest>,
    api: web::Data<DispatchApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let order_id = OrderId::from(path.into_inner());
    debug!("💻️ POST rate_order {order_id} by client #{}", claims.sub);
    let outcome = api.rate_order(&order_id, claims.sub, body.stars).await?;
    Ok(HttpResponse::Ok().json(outcome.order))
}

route!(provider_location => Get "/orders/{order_id}/provider-location" impl OrderStore, ProviderDirectory where requires [Role::Client]);
/// Returns the medic's last known position, or `null` if there isn't one yet. The position is also re-sent to the
/// order's realtime subscribers.
pub async fn provider_location<B: OrderStore + ProviderDirectory>(
    claims: AccessClaims,
    path: web::Path<String>,
    api: web::Data<DispatchApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let order_id = OrderId::from(path.into_inner());
    trace!("💻️ GET provider_location {order_id} by client #{}", claims.sub);
    let position = api.poll_provider_location(&order_id, claims.sub).await?;
    Ok(HttpResponse::Ok().json(position))
}

//----------------------------------------------   Medic orders  ----------------------------------------------------
route!(available_orders => Get "/medic/orders/available" impl OrderStore, ProviderDirectory where requires [Role::Medic]);
pub async fn available_orders<B: OrderStore + ProviderDirectory>(
    claims: AccessClaims,
    api: web::Data<OrderQueryApi<B>>,
) -> Result<HttpResponse, ServerError> {
    debug!("💻️ GET available_orders for medic #{}", claims.sub);
    let orders = api.list_available_for_provider(claims.sub).await?;
    Ok(HttpResponse::Ok().json(orders))
}

route!(medic_orders => Get "/medic/orders" impl OrderStore where requires [Role::Medic]);
pub async fn medic_orders<B: OrderStore>(
    claims: AccessClaims,
    page: web::Query<PageParams>,
    api: web::Data<OrderQueryApi<B>>,
) -> Result<HttpResponse, ServerError> {
    debug!("💻️ GET medic_orders for medic #{}", claims.sub);
    let pagination = Pagination::from(page.into_inner());
    let orders = api.list_by_provider(claims.sub, pagination).await?;
    Ok(HttpResponse::Ok().json(OrderPage::new(pagination, orders)))
}

route!(accept_order => Post "/medic/orders/{order_id}/accept" impl OrderStore, ProviderDirectory where requires [Role::Medic]);
pub async fn accept_order<B: OrderStore + ProviderDirectory>(
    claims: AccessClaims,
    path: web::Path<String>,
    api: web::Data<DispatchApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let order_id = OrderId::from(path.into_inner());
    debug!("💻️ POST accept_order {order_id} by medic #{}", claims.sub);
    let order = api.accept_order(&order_id, claims.sub).await?;
    Ok(HttpResponse::Ok().json(order))
}

route!(advance_status => Post "/medic/orders/{order_id}/status" impl OrderStore, ProviderDirectory where requires [Role::Medic]);
pub async fn advance_status<B: OrderStore + ProviderDirectory>(
    claims: AccessClaims,
    path: web::Path<String>,
    body: web::Json<AdvanceStatusRequest>,
    api: web::Data<DispatchApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let order_id = OrderId::from(path.into_inner());
    debug!("💻️ POST advance_status {order_id} to {} by medic #{}", body.status, claims.sub);
    let order = api.advance_status(&order_id, claims.sub, body.status).await?;
    Ok(HttpResponse::Ok().json(order))
}

route!(report_location => Post "/medic/orders/{order_id}/location" impl OrderStore, ProviderDirectory where requires [Role::Medic]);
pub async fn report_location<B: OrderStore + ProviderDirectory>(
    claims: AccessClaims,
    path: web::Path<String>,
    body: web::Json<medic_dispatch_engine::db_types::GeoPoint>,
    api: web::Data<DispatchApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let order_id = OrderId::from(path.into_inner());
    trace!("💻️ POST report_location {order_id} by medic #{}", claims.sub);
    let position = api.report_provider_location(&order_id, claims.sub, body.into_inner()).await?;
    Ok(HttpResponse::Ok().json(position))
}

route!(set_online => Post "/medic/online" impl OrderStore, ProviderDirectory where requires [Role::Medic]);
pub async fn set_online<B: OrderStore + ProviderDirectory>(
    claims: AccessClaims,
    body: web::Json<OnlineRequest>,
    api: web::Data<DispatchApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let OnlineRequest { online, location } = body.into_inner();
    debug!("💻️ POST set_online({online}) for medic #{}", claims.sub);
    let medic = api.set_provider_online(claims.sub, online, location).await?;
    Ok(HttpResponse::Ok().json(medic))
}

//----------------------------------------------   Admin  ----------------------------------------------------
route!(admin_orders => Get "/admin/orders" impl OrderStore where requires [Role::Admin]);
pub async fn admin_orders<B: OrderStore>(
    query: web::Query<AdminOrderQuery>,
    api: web::Data<OrderQueryApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let (filter, pagination) = query.into_inner().into_parts()?;
    debug!("💻️ GET admin_orders for [{filter}]");
    let orders = api.list_all_admin(filter, pagination).await?;
    Ok(HttpResponse::Ok().json(OrderPage::new(pagination, orders)))
}

route!(admin_cancel_order => Post "/admin/orders/{order_id}/cancel" impl OrderStore, ProviderDirectory where requires [Role::Admin]);
pub async fn admin_cancel_order<B: OrderStore + ProviderDirectory>(
    claims: AccessClaims,
    path: web::Path<String>,
    api: web::Data<DispatchApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let order_id = OrderId::from(path.into_inner());
    info!("💻️ POST admin_cancel_order {order_id} by admin #{}", claims.sub);
    let order = api.cancel_by_operator(&order_id).await?;
    Ok(HttpResponse::Ok().json(order))
}

route!(nearby_medics => Get "/admin/orders/{order_id}/nearby-medics" impl OrderStore, ProviderDirectory where requires [Role::Admin]);
pub async fn nearby_medics<B: OrderStore + ProviderDirectory>(
    path: web::Path<String>,
    params: web::Query<NearbyParams>,
    api: web::Data<OrderQueryApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let order_id = OrderId::from(path.into_inner());
    let limit = params.limit.unwrap_or(DEFAULT_NEARBY_LIMIT).clamp(1, MAX_NEARBY_LIMIT);
    debug!("💻️ GET nearby_medics for {order_id} (limit {limit})");
    let medics = api.nearby_providers(&order_id, limit).await?;
    Ok(HttpResponse::Ok().json(medics))
}

route!(approve_medic => Post "/admin/medics/{medic_id}/approve" impl OrderStore, ProviderDirectory where requires [Role::Admin]);
pub async fn approve_medic<B: OrderStore + ProviderDirectory>(
    path: web::Path<i64>,
    api: web::Data<DispatchApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let medic_id = path.into_inner();
    info!("💻️ POST approve_medic #{medic_id}");
    let medic = api.approve_provider(medic_id).await?;
    Ok(HttpResponse::Ok().json(medic))
}

route!(block_medic => Post "/admin/medics/{medic_id}/block" impl OrderStore, ProviderDirectory where requires [Role::Admin]);
pub async fn block_medic<B: OrderStore + ProviderDirectory>(
    path: web::Path<i64>,
    body: Option<web::Json<BlockRequest>>,
    api: web::Data<DispatchApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let medic_id = path.into_inner();
    let blocked = body.map_or(true, |b| b.blocked);
    info!("💻️ POST block_medic #{medic_id} ({blocked})");
    let medic = api.block_provider(medic_id, blocked).await?;
    Ok(HttpResponse::Ok().json(medic))
}

//----------------------------------------------   Subscriptions  ----------------------------------------------------
route!(subscribe => Post "/subscriptions" impl SubscriptionStore where requires [Role::Client, Role::Medic]);
pub async fn subscribe<B: SubscriptionStore>(
    claims: AccessClaims,
    body: web::Json<SubscribeRequest>,
    api: web::Data<NotificationApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let subscriber = claims.subscriber()?;
    let SubscribeRequest { channel, endpoint } = body.into_inner();
    debug!("💻️ POST subscribe {subscriber} to {channel}");
    let subscription = api.subscribe(subscriber, channel, &endpoint).await?;
    Ok(HttpResponse::Created().json(subscription))
}

route!(unsubscribe => Delete "/subscriptions/{id}" impl SubscriptionStore where requires [Role::Client, Role::Medic]);
pub async fn unsubscribe<B: SubscriptionStore>(
    claims: AccessClaims,
    path: web::Path<i64>,
    api: web::Data<NotificationApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let subscriber = claims.subscriber()?;
    let id = path.into_inner();
    debug!("💻️ DELETE subscription #{id} for {subscriber}");
    api.unsubscribe(subscriber, id).await?;
    Ok(HttpResponse::Ok().json(JsonResponse::success(format!("Subscription #{id} removed"))))
}
