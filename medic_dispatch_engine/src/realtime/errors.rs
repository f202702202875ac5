use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RealtimeError {
    #[error("Connection rejected: {0}")]
    Unauthenticated(String),
    #[error("The connection has been closed")]
    ConnectionClosed,
}
