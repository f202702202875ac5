use std::{sync::Arc, time::Duration};

use actix_web::{dev::Server, http::KeepAlive, middleware::Logger, web, App, HttpServer};
use log::*;
use medic_dispatch_engine::{
    events::{EventHandlers, EventProducers},
    notifications::{
        channels::{MobilePushChannel, TelegramChannel, WebPushChannel},
        NotificationChannel,
        NotificationRouter,
    },
    realtime::RealtimeBus,
    DispatchApi,
    NotificationApi,
    OrderQueryApi,
    SqliteDatabase,
};

use crate::{
    auth::TokenIssuer,
    config::{ChannelConfig, ServerConfig},
    errors::ServerError,
    middleware::AuthMiddlewareFactory,
    routes::{
        health,
        AcceptOrderRoute,
        AdminCancelOrderRoute,
        AdminOrdersRoute,
        AdvanceStatusRoute,
        ApproveMedicRoute,
        AvailableOrdersRoute,
        BlockMedicRoute,
        CancelOrderRoute,
        CheckTokenRoute,
        MedicOrdersRoute,
        MyOrdersRoute,
        NearbyMedicsRoute,
        PlaceOrderRoute,
        ProviderLocationRoute,
        RateOrderRoute,
        ReportLocationRoute,
        SetOnlineRoute,
        SubscribeRoute,
        UnsubscribeRoute,
    },
    socket::realtime_socket,
};

pub async fn run_server(config: ServerConfig) -> Result<(), ServerError> {
    let db = SqliteDatabase::new_with_url(&config.database_url, 25)
        .await
        .map_err(|e| ServerError::InitializeError(e.to_string()))?;
    db.migrate().await.map_err(|e| ServerError::InitializeError(e.to_string()))?;
    let issuer = TokenIssuer::new(&config.auth);
    let bus = RealtimeBus::new(Arc::new(issuer.clone()), config.realtime_buffer_size);
    let router = build_notification_router(&config.channels, db.clone(), config.notification_timeout);
    info!("🚀️ Notification channels: {:?}", router.channel_kinds());
    let handlers = EventHandlers::new(config.event_buffer_size, router.hooks());
    let producers = handlers.producers();
    handlers.start_handlers().await;
    let srv = create_server_instance(config, db, producers, bus, issuer)?;
    srv.await.map_err(ServerError::from)
}

/// Builds the notification router with every channel that is configured. A channel that cannot be set up is left out,
/// with an error in the log, rather than stopping the server.
pub fn build_notification_router(
    config: &ChannelConfig,
    db: SqliteDatabase,
    send_timeout: Duration,
) -> NotificationRouter<SqliteDatabase> {
    let mut channels: Vec<Result<Arc<dyn NotificationChannel>, _>> = Vec::new();
    if config.web_push_enabled {
        channels.push(WebPushChannel::new(config.web_push_ttl_secs).map(|c| Arc::new(c) as Arc<dyn NotificationChannel>));
    }
    if let Some(token) = &config.telegram_bot_token {
        channels.push(
            TelegramChannel::new(&config.telegram_api_url, token.clone())
                .map(|c| Arc::new(c) as Arc<dyn NotificationChannel>),
        );
    }
    if let Some(url) = &config.mobile_push_url {
        channels.push(MobilePushChannel::new(url).map(|c| Arc::new(c) as Arc<dyn NotificationChannel>));
    }
    channels.into_iter().fold(NotificationRouter::new(db, send_timeout), |router, channel| match channel {
        Ok(channel) => router.with_channel(channel),
        Err(e) => {
            error!("🚀️ Notification channel disabled. {e}");
            router
        },
    })
}

pub fn create_server_instance(
    config: ServerConfig,
    db: SqliteDatabase,
    producers: EventProducers,
    bus: RealtimeBus,
    issuer: TokenIssuer,
) -> Result<Server, ServerError> {
    let search_radius = config.provider_search_radius_km;
    let srv = HttpServer::new(move || {
        let dispatch_api = DispatchApi::new(db.clone(), producers.clone()).with_realtime(bus.clone());
        let query_api = OrderQueryApi::new(db.clone()).with_search_radius(search_radius);
        let notification_api = NotificationApi::new(db.clone());
        let app = App::new()
            .wrap(Logger::new("%t (%D ms) %s %a %{Host}i %U").log_target("mdp::access_log"))
            .app_data(web::Data::new(dispatch_api))
            .app_data(web::Data::new(query_api))
            .app_data(web::Data::new(notification_api))
            .app_data(web::Data::new(bus.clone()));
        // Routes that require authentication
        let api_scope = web::scope("/api")
            .wrap(AuthMiddlewareFactory::new(issuer.clone()))
            .service(CheckTokenRoute::new())
            .service(PlaceOrderRoute::<SqliteDatabase>::new())
            .service(MyOrdersRoute::<SqliteDatabase>::new())
            .service(CancelOrderRoute::<SqliteDatabase>::new())
            .service(RateOrderRoute::<SqliteDatabase>::new())
            .service(ProviderLocationRoute::<SqliteDatabase>::new())
            .service(AvailableOrdersRoute::<SqliteDatabase>::new())
            .service(MedicOrdersRoute::<SqliteDatabase>::new())
            .service(AcceptOrderRoute::<SqliteDatabase>::new())
            .service(AdvanceStatusRoute::<SqliteDatabase>::new())
            .service(ReportLocationRoute::<SqliteDatabase>::new())
            .service(SetOnlineRoute::<SqliteDatabase>::new())
            .service(AdminOrdersRoute::<SqliteDatabase>::new())
            .service(AdminCancelOrderRoute::<SqliteDatabase>::new())
            .service(NearbyMedicsRoute::<SqliteDatabase>::new())
            .service(ApproveMedicRoute::<SqliteDatabase>::new())
            .service(BlockMedicRoute::<SqliteDatabase>::new())
            .service(SubscribeRoute::<SqliteDatabase>::new())
            .service(UnsubscribeRoute::<SqliteDatabase>::new());
        app.service(health).service(realtime_socket).service(api_scope)
    })
    .keep_alive(KeepAlive::Timeout(Duration::from_secs(600)))
    .bind((config.host.as_str(), config.port))?
    .run();
    info!("🚀️ Listening on {}:{}", config.host, config.port);
    Ok(srv)
}
