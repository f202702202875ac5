use std::sync::Arc;

use actix_web::{http::StatusCode, test, test::TestRequest, web, App};
use medic_dispatch_engine::{
    db_types::Role,
    realtime::{Identity, RealtimeBus, RealtimeError},
};

use super::mocks::MockAuthenticator;
use crate::socket::realtime_socket;

async fn handshake(authenticator: MockAuthenticator, uri: &str) -> StatusCode {
    let bus = RealtimeBus::new(Arc::new(authenticator), 8);
    let app = App::new().app_data(web::Data::new(bus)).service(realtime_socket);
    let service = test::init_service(app).await;
    let req = TestRequest::get()
        .uri(uri)
        .insert_header(("Connection", "Upgrade"))
        .insert_header(("Upgrade", "websocket"))
        .insert_header(("Sec-WebSocket-Version", "13"))
        .insert_header(("Sec-WebSocket-Key", "dGhlIHNhbXBsZSBub25jZQ=="))
        .to_request();
    test::call_service(&service, req).await.status()
}

#[actix_web::test]
async fn sockets_need_a_token() {
    let _ = env_logger::try_init().ok();
    let mut authenticator = MockAuthenticator::new();
    authenticator.expect_authenticate().never();
    assert_eq!(handshake(authenticator, "/ws").await, StatusCode::UNAUTHORIZED);
}

#[actix_web::test]
async fn rejected_tokens_close_the_handshake() {
    let _ = env_logger::try_init().ok();
    let mut authenticator = MockAuthenticator::new();
    authenticator
        .expect_authenticate()
        .withf(|credential| credential == "stale")
        .times(1)
        .returning(|_| Err(RealtimeError::Unauthenticated("expired".into())));
    assert_eq!(handshake(authenticator, "/ws?token=stale").await, StatusCode::UNAUTHORIZED);
}

#[actix_web::test]
async fn valid_tokens_upgrade_the_connection() {
    let _ = env_logger::try_init().ok();
    let mut authenticator = MockAuthenticator::new();
    authenticator
        .expect_authenticate()
        .withf(|credential| credential == "fresh")
        .times(1)
        .returning(|_| Ok(Identity { user_id: 7, role: Role::Medic }));
    assert_eq!(handshake(authenticator, "/ws?token=fresh").await, StatusCode::SWITCHING_PROTOCOLS);
}
