use actix_web::{
    error::ResponseError,
    http::{header::ContentType, StatusCode},
    HttpResponse,
};
use medic_dispatch_engine::{DispatchError, StoreError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Could not initialize server. {0}")]
    InitializeError(String),
    #[error("An error occurred on the backend of the server. {0}")]
    BackendError(String),
    #[error("Could not read request body: {0}")]
    InvalidRequestBody(String),
    #[error("Could not read request path: {0}")]
    InvalidRequestPath(String),
    #[error("An I/O error happened in the server. {0}")]
    IOError(#[from] std::io::Error),
    #[error("Invalid server configuration. {0}")]
    ConfigurationError(String),
    #[error("Authentication Error. {0}")]
    AuthenticationError(#[from] AuthError),
    #[error("{0}")]
    Dispatch(#[from] DispatchError),
}

impl ResponseError for ServerError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidRequestBody(_) => StatusCode::BAD_REQUEST,
            Self::InvalidRequestPath(_) => StatusCode::BAD_REQUEST,
            Self::AuthenticationError(e) => match e {
                AuthError::MissingToken => StatusCode::UNAUTHORIZED,
                AuthError::PoorlyFormattedToken(_) => StatusCode::UNAUTHORIZED,
                AuthError::ValidationError(_) => StatusCode::UNAUTHORIZED,
                AuthError::Expired => StatusCode::UNAUTHORIZED,
                AuthError::InsufficientPermissions(_) => StatusCode::FORBIDDEN,
            },
            Self::Dispatch(e) => match e {
                DispatchError::Validation(_) => StatusCode::BAD_REQUEST,
                DispatchError::NotFound(_) => StatusCode::NOT_FOUND,
                DispatchError::Forbidden(_) => StatusCode::FORBIDDEN,
                DispatchError::InvalidTransition(_) => StatusCode::UNPROCESSABLE_ENTITY,
                DispatchError::Conflict(_) => StatusCode::CONFLICT,
                DispatchError::OrderNotAvailable(_) => StatusCode::CONFLICT,
                DispatchError::AlreadyRated(_) => StatusCode::CONFLICT,
                DispatchError::DatabaseError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            Self::InitializeError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::BackendError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::IOError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::ConfigurationError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code())
            .insert_header(ContentType::json())
            .body(serde_json::json!({ "error": self.to_string() }).to_string())
    }
}

impl From<StoreError> for ServerError {
    fn from(e: StoreError) -> Self {
        Self::Dispatch(DispatchError::from(e))
    }
}

#[derive(Debug, Clone, Error)]
pub enum AuthError {
    #[error("No access token was provided.")]
    MissingToken,
    #[error("Access token is not in the correct format. {0}")]
    PoorlyFormattedToken(String),
    #[error("Access token signature is invalid. {0}")]
    ValidationError(String),
    #[error("Access token has expired.")]
    Expired,
    #[error("Insufficient Permissions. {0}")]
    InsufficientPermissions(String),
}

#[cfg(test)]
mod test {
    use medic_dispatch_engine::db_types::OrderId;

    use super::*;

    #[test]
    fn dispatch_errors_map_to_status_codes() {
        let id = OrderId::from("abc");
        let cases = [
            (DispatchError::Validation("bad".into()), 400),
            (DispatchError::NotFound("Order #abc".into()), 404),
            (DispatchError::Forbidden("no".into()), 403),
            (DispatchError::Conflict("raced".into()), 409),
            (DispatchError::OrderNotAvailable(id.clone()), 409),
            (DispatchError::AlreadyRated(id), 409),
            (DispatchError::DatabaseError("disk".into()), 500),
        ];
        for (e, status) in cases {
            assert_eq!(ServerError::from(e).status_code().as_u16(), status);
        }
        assert_eq!(ServerError::from(AuthError::Expired).status_code(), StatusCode::UNAUTHORIZED);
    }
}
