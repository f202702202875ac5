use chrono::Utc;
use log::debug;
use sqlx::SqliteConnection;

use crate::{
    db::errors::StoreError,
    db_types::{ChannelKind, NewSubscription, NotificationSubscription, Subscriber},
};

const SUBSCRIPTION_COLUMNS: &str = "id, subscriber_type, subscriber_id, channel, endpoint, created_at";

/// Idempotent: registering an endpoint that already exists returns the existing row.
pub async fn insert_subscription(
    subscription: NewSubscription,
    conn: &mut SqliteConnection,
) -> Result<NotificationSubscription, StoreError> {
    let NewSubscription { subscriber, channel, endpoint } = subscription;
    sqlx::query(
        r#"
            INSERT INTO notification_subscriptions (subscriber_type, subscriber_id, channel, endpoint, created_at)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (subscriber_type, subscriber_id, channel, endpoint) DO NOTHING
        "#,
    )
    .bind(subscriber.kind)
    .bind(subscriber.id)
    .bind(channel)
    .bind(&endpoint)
    .bind(Utc::now())
    .execute(&mut *conn)
    .await?;
    let row = sqlx::query_as::<_, NotificationSubscription>(&format!(
        "SELECT {SUBSCRIPTION_COLUMNS} FROM notification_subscriptions WHERE subscriber_type = $1 AND subscriber_id = \
         $2 AND channel = $3 AND endpoint = $4"
    ))
    .bind(subscriber.kind)
    .bind(subscriber.id)
    .bind(channel)
    .bind(&endpoint)
    .fetch_one(conn)
    .await?;
    debug!("🗃️ {subscriber} is subscribed to {channel} notifications (subscription #{})", row.id);
    Ok(row)
}

pub async fn fetch_subscription(
    id: i64,
    conn: &mut SqliteConnection,
) -> Result<Option<NotificationSubscription>, StoreError> {
    let row = sqlx::query_as::<_, NotificationSubscription>(&format!(
        "SELECT {SUBSCRIPTION_COLUMNS} FROM notification_subscriptions WHERE id = $1"
    ))
    .bind(id)
    .fetch_optional(conn)
    .await?;
    Ok(row)
}

pub async fn subscriptions_for(
    subscriber: Subscriber,
    channel: ChannelKind,
    conn: &mut SqliteConnection,
) -> Result<Vec<NotificationSubscription>, StoreError> {
    let rows = sqlx::query_as::<_, NotificationSubscription>(&format!(
        "SELECT {SUBSCRIPTION_COLUMNS} FROM notification_subscriptions WHERE subscriber_type = $1 AND subscriber_id = \
         $2 AND channel = $3 ORDER BY id"
    ))
    .bind(subscriber.kind)
    .bind(subscriber.id)
    .bind(channel)
    .fetch_all(conn)
    .await?;
    Ok(rows)
}

pub async fn delete_subscription(id: i64, conn: &mut SqliteConnection) -> Result<(), StoreError> {
    let result = sqlx::query("DELETE FROM notification_subscriptions WHERE id = $1").bind(id).execute(conn).await?;
    if result.rows_affected() == 0 {
        return Err(StoreError::SubscriptionNotFound(id));
    }
    debug!("🗃️ Subscription #{id} removed");
    Ok(())
}
