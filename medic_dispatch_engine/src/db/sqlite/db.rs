use std::fmt::Debug;

use async_trait::async_trait;
use log::*;
use mdp_common::Money;
use sqlx::SqlitePool;

use super::{catalog, medics, new_pool, orders, subscriptions};
use crate::{
    db::{
        errors::StoreError,
        traits::{CatalogService, OrderStore, ProviderDirectory, RatingOutcome, SubscriptionStore, TransitionRequest},
    },
    db_types::{
        ChannelKind,
        GeoPoint,
        Medic,
        NewOrder,
        NewSubscription,
        NotificationSubscription,
        Order,
        OrderId,
        OrderWithLocation,
        ServiceSnapshot,
        Subscriber,
        VerificationStatus,
    },
    order_objects::{OrderQueryFilter, Pagination},
    settlement::recompute_rating,
};

#[derive(Clone)]
pub struct SqliteDatabase {
    url: String,
    pool: SqlitePool,
}

impl Debug for SqliteDatabase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "SqliteDatabase ({})", self.url)
    }
}

impl SqliteDatabase {
    pub async fn new_with_url(url: &str, max_connections: u32) -> Result<Self, StoreError> {
        let pool = new_pool(url, max_connections).await?;
        Ok(Self { url: url.to_string(), pool })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }

    /// Brings the schema up to date. Safe to call on every start-up.
    pub async fn migrate(&self) -> Result<(), StoreError> {
        sqlx::migrate!("./src/db/sqlite/migrations").run(&self.pool).await?;
        info!("🗃️ Database migrations complete");
        Ok(())
    }
}

#[async_trait]
impl OrderStore for SqliteDatabase {
    async fn create_order(&self, order: NewOrder) -> Result<OrderWithLocation, StoreError> {
        let order_id = order.id.clone();
        let mut tx = self.pool.begin().await?;
        orders::insert_order(order, &mut tx).await?;
        let saved = orders::fetch_order(&order_id, &mut tx)
            .await?
            .ok_or_else(|| StoreError::QueryError(format!("Order {order_id} vanished straight after insert")))?;
        tx.commit().await?;
        debug!("🗃️ Order {order_id} has been saved in the DB");
        Ok(saved)
    }

    async fn fetch_order(&self, order_id: &OrderId) -> Result<Option<OrderWithLocation>, StoreError> {
        let mut conn = self.pool.acquire().await?;
        orders::fetch_order(order_id, &mut conn).await
    }

    async fn conditional_transition(&self, request: TransitionRequest) -> Result<Order, StoreError> {
        let mut tx = self.pool.begin().await?;
        let order = orders::conditional_transition(request, &mut tx).await?;
        tx.commit().await?;
        Ok(order)
    }

    async fn credit_balance(&self, medic_id: i64, amount: Money) -> Result<Money, StoreError> {
        let mut conn = self.pool.acquire().await?;
        medics::credit_balance(medic_id, amount, &mut conn).await
    }

    async fn record_rating(&self, order_id: &OrderId, stars: u8) -> Result<RatingOutcome, StoreError> {
        let mut tx = self.pool.begin().await?;
        let order = orders::set_client_rating(order_id, stars, &mut tx).await?;
        let medic_id = order
            .medic_id
            .ok_or_else(|| StoreError::QueryError(format!("Order {order_id} has no medic to rate")))?;
        let medic = medics::fetch_medic(medic_id, &mut tx).await?.ok_or(StoreError::ProviderNotFound(medic_id))?;
        let (rating, review_count) = recompute_rating(medic.rating, medic.review_count, stars);
        let medic = medics::set_rating(medic_id, rating, review_count, &mut tx).await?;
        tx.commit().await?;
        debug!("🗃️ Order {order_id} rated {stars}. Medic #{medic_id} now has {rating:.2} from {review_count} reviews");
        Ok(RatingOutcome { order, medic })
    }

    async fn search_orders(
        &self,
        filter: OrderQueryFilter,
        pagination: Pagination,
    ) -> Result<Vec<OrderWithLocation>, StoreError> {
        let mut conn = self.pool.acquire().await?;
        orders::search_orders(filter, pagination, &mut conn).await
    }
}

#[async_trait]
impl ProviderDirectory for SqliteDatabase {
    async fn fetch_medic(&self, medic_id: i64) -> Result<Option<Medic>, StoreError> {
        let mut conn = self.pool.acquire().await?;
        medics::fetch_medic(medic_id, &mut conn).await
    }

    async fn online_medics(&self) -> Result<Vec<Medic>, StoreError> {
        let mut conn = self.pool.acquire().await?;
        medics::online_medics(&mut conn).await
    }

    async fn online_provider_endpoints(
        &self,
        channel: ChannelKind,
    ) -> Result<Vec<NotificationSubscription>, StoreError> {
        let mut conn = self.pool.acquire().await?;
        medics::online_provider_endpoints(channel, &mut conn).await
    }

    async fn set_online(&self, medic_id: i64, online: bool, location: Option<GeoPoint>) -> Result<Medic, StoreError> {
        let mut conn = self.pool.acquire().await?;
        medics::set_online(medic_id, online, location, &mut conn).await
    }

    async fn update_location(&self, medic_id: i64, location: GeoPoint) -> Result<Medic, StoreError> {
        let mut conn = self.pool.acquire().await?;
        medics::update_location(medic_id, location, &mut conn).await
    }

    async fn set_verification_status(&self, medic_id: i64, status: VerificationStatus) -> Result<Medic, StoreError> {
        let mut conn = self.pool.acquire().await?;
        medics::set_verification_status(medic_id, status, &mut conn).await
    }

    async fn set_blocked(&self, medic_id: i64, blocked: bool) -> Result<Medic, StoreError> {
        let mut conn = self.pool.acquire().await?;
        medics::set_blocked(medic_id, blocked, &mut conn).await
    }
}

#[async_trait]
impl CatalogService for SqliteDatabase {
    async fn fetch_active_service(&self, service_id: i64) -> Result<ServiceSnapshot, StoreError> {
        let mut conn = self.pool.acquire().await?;
        catalog::fetch_active_service(service_id, &mut conn).await
    }
}

#[async_trait]
impl SubscriptionStore for SqliteDatabase {
    async fn add_subscription(&self, subscription: NewSubscription) -> Result<NotificationSubscription, StoreError> {
        let mut conn = self.pool.acquire().await?;
        subscriptions::insert_subscription(subscription, &mut conn).await
    }

    async fn fetch_subscription(&self, id: i64) -> Result<Option<NotificationSubscription>, StoreError> {
        let mut conn = self.pool.acquire().await?;
        subscriptions::fetch_subscription(id, &mut conn).await
    }

    async fn subscriptions_for(
        &self,
        subscriber: Subscriber,
        channel: ChannelKind,
    ) -> Result<Vec<NotificationSubscription>, StoreError> {
        let mut conn = self.pool.acquire().await?;
        subscriptions::subscriptions_for(subscriber, channel, &mut conn).await
    }

    async fn remove_subscription(&self, id: i64) -> Result<(), StoreError> {
        let mut conn = self.pool.acquire().await?;
        subscriptions::delete_subscription(id, &mut conn).await
    }
}
