use actix_web::{http::StatusCode, test::TestRequest, web, web::ServiceConfig};
use chrono::Utc;
use medic_dispatch_engine::{db_types::Role, OrderQueryApi};

use super::{
    helpers::{get, json, send, test_issuer, token_for},
    mocks::MockStore,
};
use crate::{
    auth::AccessClaims,
    middleware::ACCESS_TOKEN_HEADER,
    routes::{CheckTokenRoute, MyOrdersRoute},
};

fn configure_without_calls(cfg: &mut ServiceConfig) {
    let mut store = MockStore::new();
    store.expect_search_orders().never();
    cfg.app_data(web::Data::new(OrderQueryApi::new(store)))
        .service(CheckTokenRoute::new())
        .service(MyOrdersRoute::<MockStore>::new());
}

#[actix_web::test]
async fn requests_without_a_token_are_rejected() {
    let _ = env_logger::try_init().ok();
    let (status, body) = send(get("/orders", ""), configure_without_calls).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(json(&body)["error"], "Authentication Error. No access token was provided.");
}

#[actix_web::test]
async fn check_token_echoes_the_claims() {
    let _ = env_logger::try_init().ok();
    let token = token_for(Role::Medic, 7);
    let (status, body) = send(get("/check_token", &token), configure_without_calls).await;
    assert_eq!(status, StatusCode::OK);
    let claims: AccessClaims = serde_json::from_str(&body).unwrap();
    assert_eq!(claims.sub, 7);
    assert_eq!(claims.role, Role::Medic);
}

#[actix_web::test]
async fn the_token_header_is_accepted() {
    let _ = env_logger::try_init().ok();
    let token = token_for(Role::Admin, 1);
    let req = TestRequest::get().uri("/check_token").insert_header((ACCESS_TOKEN_HEADER, token));
    let (status, _) = send(req, configure_without_calls).await;
    assert_eq!(status, StatusCode::OK);
}

#[actix_web::test]
async fn tampered_tokens_are_rejected() {
    let _ = env_logger::try_init().ok();
    let mut token = token_for(Role::Client, 42);
    let n = token.len();
    let replacement = if token.ends_with("AAAA") { "BBBB" } else { "AAAA" };
    token.replace_range(n - 4..n, replacement);
    let (status, body) = send(get("/orders", &token), configure_without_calls).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(json(&body)["error"].as_str().unwrap().starts_with("Authentication Error."), "{body}");
}

#[actix_web::test]
async fn expired_tokens_are_rejected() {
    let _ = env_logger::try_init().ok();
    let claims = AccessClaims { sub: 42, role: Role::Client, exp: Utc::now().timestamp() - 60 };
    let token = test_issuer().sign(&claims).unwrap();
    let (status, body) = send(get("/orders", &token), configure_without_calls).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(json(&body)["error"], "Authentication Error. Access token has expired.");
}

#[actix_web::test]
async fn medics_cannot_use_client_routes() {
    let _ = env_logger::try_init().ok();
    let token = token_for(Role::Medic, 7);
    let (status, body) = send(get("/orders", &token), configure_without_calls).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(
        json(&body)["error"],
        "Authentication Error. Insufficient Permissions. medics may not use this endpoint"
    );
}
