mod acl;
mod auth;

pub use acl::{AclMiddlewareFactory, AclMiddlewareService};
pub use auth::{AuthMiddlewareFactory, AuthMiddlewareService, ACCESS_TOKEN_HEADER};
