//! Access token middleware.
//!
//! Looks for an access token in the `Authorization: Bearer` header, or failing that, the `mdp_access_token` header.
//! A valid token's claims are stored in the request extensions, where [`AccessClaims`] and the ACL middleware pick them
//! up. Requests without a valid token are rejected with a 401.
use std::{
    future::{ready, Ready},
    rc::Rc,
};

use actix_web::{
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    Error,
    HttpMessage,
};
use futures::future::LocalBoxFuture;
use log::*;

use crate::{
    auth::TokenIssuer,
    errors::{AuthError, ServerError},
};

pub const ACCESS_TOKEN_HEADER: &str = "mdp_access_token";

pub struct AuthMiddlewareFactory {
    issuer: TokenIssuer,
}

impl AuthMiddlewareFactory {
    pub fn new(issuer: TokenIssuer) -> Self {
        AuthMiddlewareFactory { issuer }
    }
}

impl<S, B> Transform<S, ServiceRequest> for AuthMiddlewareFactory
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Error = Error;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;
    type InitError = ();
    type Response = ServiceResponse<B>;
    type Transform = AuthMiddlewareService<S>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(AuthMiddlewareService { issuer: self.issuer.clone(), service: Rc::new(service) }))
    }
}

pub struct AuthMiddlewareService<S> {
    issuer: TokenIssuer,
    service: Rc<S>,
}

fn extract_token(req: &ServiceRequest) -> Option<String> {
    let bearer = req
        .headers()
        .get("Authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(|v| v.trim().to_string());
    bearer.or_else(|| req.headers().get(ACCESS_TOKEN_HEADER).and_then(|v| v.to_str().ok()).map(|v| v.trim().to_string()))
}

impl<S, B> Service<ServiceRequest> for AuthMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;
    type Response = ServiceResponse<B>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let service = Rc::clone(&self.service);
        let verified = match extract_token(&req) {
            Some(token) if !token.is_empty() => self.issuer.verify(&token),
            _ => Err(AuthError::MissingToken),
        };
        Box::pin(async move {
            match verified {
                Ok(claims) => {
                    trace!("🔐️ {} #{} authenticated for {}", claims.role, claims.sub, req.path());
                    req.extensions_mut().insert(claims);
                    service.call(req).await
                },
                Err(e) => {
                    debug!("🔐️ Rejecting unauthenticated request to {}. {e}", req.path());
                    Err(ServerError::AuthenticationError(e).into())
                },
            }
        })
    }
}
