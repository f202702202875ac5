//! Access tokens.
//!
//! Tokens are issued by the identity service that sits in front of this server; here they are only verified. A token
//! is `base64url(claims json) "." base64url(HMAC-SHA256(claims json))`, signed with `MDP_AUTH_SECRET`. The claims
//! carry the user id, their role and a unix expiry time.
use std::{
    future::{ready, Ready},
    time::Duration,
};

use actix_web::{dev::Payload, FromRequest, HttpMessage, HttpRequest};
use chrono::Utc;
use hmac::{Hmac, Mac};
use log::*;
use mdp_common::Secret;
use medic_dispatch_engine::{
    db_types::{Role, Subscriber},
    realtime::{ConnectionAuthenticator, Identity, RealtimeError},
};
use serde::{Deserialize, Serialize};
use sha2::Sha256;

use crate::{
    config::AuthConfig,
    errors::{AuthError, ServerError},
};

type HmacSha256 = Hmac<Sha256>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessClaims {
    /// The client or medic id, depending on `role`.
    pub sub: i64,
    pub role: Role,
    /// Expiry, as a unix timestamp.
    pub exp: i64,
}

impl AccessClaims {
    /// The notification subscriber this user acts as. Admins have no notification endpoints.
    pub fn subscriber(&self) -> Result<Subscriber, AuthError> {
        match self.role {
            Role::Client => Ok(Subscriber::client(self.sub)),
            Role::Medic => Ok(Subscriber::medic(self.sub)),
            Role::Admin => Err(AuthError::InsufficientPermissions("Admins cannot hold notification subscriptions".into())),
        }
    }
}

/// Handlers behind the authentication middleware take the verified claims as an argument.
impl FromRequest for AccessClaims {
    type Error = ServerError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        let claims = req.extensions().get::<AccessClaims>().cloned().ok_or_else(|| {
            warn!("💻️ No access claims in the request extensions. Is the route behind the auth middleware?");
            ServerError::AuthenticationError(AuthError::MissingToken)
        });
        ready(claims)
    }
}

#[derive(Clone, Debug)]
pub struct TokenIssuer {
    key: Secret<String>,
    ttl: Duration,
}

impl TokenIssuer {
    pub fn new(config: &AuthConfig) -> Self {
        Self { key: config.secret.clone(), ttl: config.token_ttl }
    }

    fn mac(&self) -> Result<HmacSha256, AuthError> {
        HmacSha256::new_from_slice(self.key.reveal().as_bytes())
            .map_err(|e| AuthError::ValidationError(format!("Unusable signing key. {e}")))
    }

    /// Issues a token for `user_id` that is valid for the configured lifetime.
    pub fn issue_token(&self, user_id: i64, role: Role) -> Result<String, AuthError> {
        let exp = Utc::now().timestamp() + i64::try_from(self.ttl.as_secs()).unwrap_or(i64::MAX / 2);
        self.sign(&AccessClaims { sub: user_id, role, exp })
    }

    /// Signs the given claims as they are, expiry included.
    pub fn sign(&self, claims: &AccessClaims) -> Result<String, AuthError> {
        let payload = serde_json::to_vec(claims).map_err(|e| AuthError::PoorlyFormattedToken(e.to_string()))?;
        let mut mac = self.mac()?;
        mac.update(&payload);
        let signature = mac.finalize().into_bytes();
        Ok(format!(
            "{}.{}",
            base64::encode_config(&payload, base64::URL_SAFE_NO_PAD),
            base64::encode_config(signature, base64::URL_SAFE_NO_PAD)
        ))
    }

    pub fn verify(&self, token: &str) -> Result<AccessClaims, AuthError> {
        let (payload, signature) = token
            .trim()
            .split_once('.')
            .ok_or_else(|| AuthError::PoorlyFormattedToken("Expected <claims>.<signature>".into()))?;
        let payload = base64::decode_config(payload, base64::URL_SAFE_NO_PAD)
            .map_err(|e| AuthError::PoorlyFormattedToken(e.to_string()))?;
        let signature = base64::decode_config(signature, base64::URL_SAFE_NO_PAD)
            .map_err(|e| AuthError::PoorlyFormattedToken(e.to_string()))?;
        let mut mac = self.mac()?;
        mac.update(&payload);
        mac.verify_slice(&signature).map_err(|_| AuthError::ValidationError("signature mismatch".into()))?;
        let claims: AccessClaims =
            serde_json::from_slice(&payload).map_err(|e| AuthError::PoorlyFormattedToken(e.to_string()))?;
        if claims.exp <= Utc::now().timestamp() {
            return Err(AuthError::Expired);
        }
        trace!("💻️ Access token verified for {} #{}", claims.role, claims.sub);
        Ok(claims)
    }
}

impl ConnectionAuthenticator for TokenIssuer {
    fn authenticate(&self, credential: &str) -> Result<Identity, RealtimeError> {
        let claims = self.verify(credential).map_err(|e| RealtimeError::Unauthenticated(e.to_string()))?;
        Ok(Identity { user_id: claims.sub, role: claims.role })
    }
}
