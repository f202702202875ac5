use async_trait::async_trait;
use mdp_common::Money;
use medic_dispatch_engine::{
    db_types::{NewOrder, Order, OrderId, OrderWithLocation},
    order_objects::{OrderQueryFilter, Pagination},
    realtime::{ConnectionAuthenticator, Identity, RealtimeError},
    OrderStore,
    RatingOutcome,
    StoreError,
    TransitionRequest,
};
use mockall::mock;

mock! {
    pub Store {}
    #[async_trait]
    impl OrderStore for Store {
        async fn create_order(&self, order: NewOrder) -> Result<OrderWithLocation, StoreError>;
        async fn fetch_order(&self, order_id: &OrderId) -> Result<Option<OrderWithLocation>, StoreError>;
        async fn conditional_transition(&self, request: TransitionRequest) -> Result<Order, StoreError>;
        async fn credit_balance(&self, medic_id: i64, amount: Money) -> Result<Money, StoreError>;
        async fn record_rating(&self, order_id: &OrderId, stars: u8) -> Result<RatingOutcome, StoreError>;
        async fn search_orders(&self, filter: OrderQueryFilter, pagination: Pagination) -> Result<Vec<OrderWithLocation>, StoreError>;
    }
}

mock! {
    pub Authenticator {}
    impl ConnectionAuthenticator for Authenticator {
        fn authenticate(&self, credential: &str) -> Result<Identity, RealtimeError>;
    }
}

