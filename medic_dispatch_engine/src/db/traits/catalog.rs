use async_trait::async_trait;

use crate::{db::errors::StoreError, db_types::ServiceSnapshot};

#[async_trait]
pub trait CatalogService: Send + Sync {
    /// Fails with [`StoreError::ServiceNotFound`] if the service is missing or has been deactivated.
    async fn fetch_active_service(&self, service_id: i64) -> Result<ServiceSnapshot, StoreError>;
}
