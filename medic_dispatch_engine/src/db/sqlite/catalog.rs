use sqlx::SqliteConnection;

use crate::{db::errors::StoreError, db_types::ServiceSnapshot};

pub async fn fetch_active_service(service_id: i64, conn: &mut SqliteConnection) -> Result<ServiceSnapshot, StoreError> {
    sqlx::query_as::<_, ServiceSnapshot>("SELECT id, title, price FROM services WHERE id = $1 AND is_active = 1")
        .bind(service_id)
        .fetch_optional(conn)
        .await?
        .ok_or(StoreError::ServiceNotFound(service_id))
}
