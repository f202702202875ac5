use std::time::Duration;

use actix_web::{body, http::StatusCode, test, test::TestRequest, web, web::ServiceConfig, App};
use log::debug;
use medic_dispatch_engine::db_types::Role;

use crate::{auth::TokenIssuer, config::AuthConfig, middleware::AuthMiddlewareFactory};

// A fixed key for issuing test tokens. DO NOT re-use it anywhere.
pub fn test_issuer() -> TokenIssuer {
    TokenIssuer::new(&AuthConfig::new("endpoint tests only, never in production", Duration::from_secs(3600)))
}

pub fn token_for(role: Role, user_id: i64) -> String {
    test_issuer().issue_token(user_id, role).expect("Could not issue test token")
}

/// Sends `req` through the auth middleware to the routes registered by `configure` and returns the status and body.
/// Errors raised by the middleware are rendered the same way the server would render them.
pub async fn send<F>(req: TestRequest, configure: F) -> (StatusCode, String)
where F: FnOnce(&mut ServiceConfig) {
    let app = App::new().service(web::scope("").wrap(AuthMiddlewareFactory::new(test_issuer())).configure(configure));
    let service = test::init_service(app).await;
    debug!("Making request");
    match test::try_call_service(&service, req.to_request()).await {
        Ok(res) => {
            let status = res.status();
            let bytes = test::read_body(res).await;
            (status, String::from_utf8_lossy(&bytes).into_owned())
        },
        Err(e) => {
            let res = e.error_response();
            let status = res.status();
            let bytes = body::to_bytes(res.into_body()).await.unwrap_or_default();
            (status, String::from_utf8_lossy(&bytes).into_owned())
        },
    }
}

pub fn get(path: &str, token: &str) -> TestRequest {
    with_token(TestRequest::get().uri(path), token)
}

pub fn post(path: &str, token: &str, body: serde_json::Value) -> TestRequest {
    with_token(TestRequest::post().uri(path).set_json(body), token)
}

pub fn with_token(req: TestRequest, token: &str) -> TestRequest {
    if token.is_empty() {
        req
    } else {
        req.insert_header(("Authorization", format!("Bearer {token}")))
    }
}

pub fn json(body: &str) -> serde_json::Value {
    serde_json::from_str(body).unwrap_or_else(|e| panic!("Response was not JSON ({e}): {body}"))
}

