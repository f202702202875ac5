use chrono::Utc;
use log::{debug, trace};
use mdp_common::Money;
use sqlx::SqliteConnection;

use crate::{
    db::errors::StoreError,
    db_types::{ChannelKind, GeoPoint, Medic, NotificationSubscription, VerificationStatus},
};

const MEDIC_COLUMNS: &str =
    "id, is_online, verification_status, is_blocked, latitude, longitude, location_updated_at, rating, review_count, \
     balance, updated_at";

pub async fn fetch_medic(medic_id: i64, conn: &mut SqliteConnection) -> Result<Option<Medic>, StoreError> {
    let medic = sqlx::query_as::<_, Medic>(&format!("SELECT {MEDIC_COLUMNS} FROM medics WHERE id = $1"))
        .bind(medic_id)
        .fetch_optional(conn)
        .await?;
    Ok(medic)
}

pub async fn online_medics(conn: &mut SqliteConnection) -> Result<Vec<Medic>, StoreError> {
    let medics = sqlx::query_as::<_, Medic>(&format!(
        "SELECT {MEDIC_COLUMNS} FROM medics WHERE is_online = 1 AND is_blocked = 0 AND verification_status = \
         'APPROVED' ORDER BY id"
    ))
    .fetch_all(conn)
    .await?;
    trace!("🗃️ {} medics are online", medics.len());
    Ok(medics)
}

pub async fn online_provider_endpoints(
    channel: ChannelKind,
    conn: &mut SqliteConnection,
) -> Result<Vec<NotificationSubscription>, StoreError> {
    let subscriptions = sqlx::query_as::<_, NotificationSubscription>(
        r#"
            SELECT s.id, s.subscriber_type, s.subscriber_id, s.channel, s.endpoint, s.created_at
            FROM notification_subscriptions s JOIN medics m ON m.id = s.subscriber_id
            WHERE s.subscriber_type = 'medic'
              AND s.channel = $1
              AND m.is_online = 1
              AND m.is_blocked = 0
              AND m.verification_status = 'APPROVED'
            ORDER BY s.id
        "#,
    )
    .bind(channel)
    .fetch_all(conn)
    .await?;
    Ok(subscriptions)
}

pub async fn set_online(
    medic_id: i64,
    online: bool,
    location: Option<GeoPoint>,
    conn: &mut SqliteConnection,
) -> Result<Medic, StoreError> {
    let medic = sqlx::query_as::<_, Medic>(&format!(
        r#"
            UPDATE medics SET
                is_online = $1,
                latitude = COALESCE($2, latitude),
                longitude = COALESCE($3, longitude),
                location_updated_at = CASE WHEN $2 IS NULL THEN location_updated_at ELSE $4 END,
                updated_at = $4
            WHERE id = $5
            RETURNING {MEDIC_COLUMNS}
        "#
    ))
    .bind(online)
    .bind(location.map(|p| p.latitude))
    .bind(location.map(|p| p.longitude))
    .bind(Utc::now())
    .bind(medic_id)
    .fetch_optional(conn)
    .await?
    .ok_or(StoreError::ProviderNotFound(medic_id))?;
    debug!("🗃️ Medic #{medic_id} is now {}", if online { "online" } else { "offline" });
    Ok(medic)
}

pub async fn update_location(
    medic_id: i64,
    location: GeoPoint,
    conn: &mut SqliteConnection,
) -> Result<Medic, StoreError> {
    let medic = sqlx::query_as::<_, Medic>(&format!(
        "UPDATE medics SET latitude = $1, longitude = $2, location_updated_at = $3, updated_at = $3 WHERE id = $4 \
         RETURNING {MEDIC_COLUMNS}"
    ))
    .bind(location.latitude)
    .bind(location.longitude)
    .bind(Utc::now())
    .bind(medic_id)
    .fetch_optional(conn)
    .await?
    .ok_or(StoreError::ProviderNotFound(medic_id))?;
    trace!("🗃️ Medic #{medic_id} is at {location}");
    Ok(medic)
}

pub async fn set_verification_status(
    medic_id: i64,
    status: VerificationStatus,
    conn: &mut SqliteConnection,
) -> Result<Medic, StoreError> {
    let medic = sqlx::query_as::<_, Medic>(&format!(
        "UPDATE medics SET verification_status = $1, updated_at = $2 WHERE id = $3 RETURNING {MEDIC_COLUMNS}"
    ))
    .bind(status)
    .bind(Utc::now())
    .bind(medic_id)
    .fetch_optional(conn)
    .await?
    .ok_or(StoreError::ProviderNotFound(medic_id))?;
    debug!("🗃️ Medic #{medic_id} verification status is now {status}");
    Ok(medic)
}

/// Blocking a medic also takes them offline.
pub async fn set_blocked(medic_id: i64, blocked: bool, conn: &mut SqliteConnection) -> Result<Medic, StoreError> {
    let medic = sqlx::query_as::<_, Medic>(&format!(
        r#"
            UPDATE medics SET
                is_blocked = $1,
                is_online = CASE WHEN $2 THEN 0 ELSE is_online END,
                updated_at = $3
            WHERE id = $4
            RETURNING {MEDIC_COLUMNS}
        "#
    ))
    .bind(blocked)
    .bind(blocked)
    .bind(Utc::now())
    .bind(medic_id)
    .fetch_optional(conn)
    .await?
    .ok_or(StoreError::ProviderNotFound(medic_id))?;
    debug!("🗃️ Medic #{medic_id} blocked: {blocked}");
    Ok(medic)
}

/// Adds `amount` to the medic's balance and returns the new balance. Negative amounts are rejected.
pub async fn credit_balance(medic_id: i64, amount: Money, conn: &mut SqliteConnection) -> Result<Money, StoreError> {
    if amount.is_negative() {
        return Err(StoreError::QueryError(format!("Cannot credit a negative amount ({amount}) to medic #{medic_id}")));
    }
    let balance: Option<Money> =
        sqlx::query_scalar("UPDATE medics SET balance = balance + $1, updated_at = $2 WHERE id = $3 RETURNING balance")
            .bind(amount)
            .bind(Utc::now())
            .bind(medic_id)
            .fetch_optional(conn)
            .await?;
    let balance = balance.ok_or(StoreError::ProviderNotFound(medic_id))?;
    debug!("🗃️ Credited {amount} to medic #{medic_id}. New balance: {balance}");
    Ok(balance)
}

pub async fn set_rating(
    medic_id: i64,
    rating: f64,
    review_count: i64,
    conn: &mut SqliteConnection,
) -> Result<Medic, StoreError> {
    let medic = sqlx::query_as::<_, Medic>(&format!(
        "UPDATE medics SET rating = $1, review_count = $2, updated_at = $3 WHERE id = $4 RETURNING {MEDIC_COLUMNS}"
    ))
    .bind(rating)
    .bind(review_count)
    .bind(Utc::now())
    .bind(medic_id)
    .fetch_optional(conn)
    .await?
    .ok_or(StoreError::ProviderNotFound(medic_id))?;
    Ok(medic)
}
