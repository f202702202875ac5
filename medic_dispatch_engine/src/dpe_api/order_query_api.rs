use std::fmt::Debug;

use log::*;

use crate::{
    db::traits::{OrderStore, ProviderDirectory},
    db_types::{MedicSummary, OrderId, OrderStatusType, OrderWithLocation},
    dpe_api::{
        errors::DispatchError,
        order_objects::{NearbyMedic, OrderQueryFilter, Pagination},
    },
    geo::{find_orders_for_provider, find_providers_for_order, DEFAULT_SEARCH_RADIUS_KM},
};

/// Read-only views over orders. Nothing here has side effects.
pub struct OrderQueryApi<B> {
    db: B,
    search_radius_km: f64,
}

impl<B> Debug for OrderQueryApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "OrderQueryApi ({}km)", self.search_radius_km)
    }
}

impl<B> OrderQueryApi<B> {
    pub fn new(db: B) -> Self {
        Self { db, search_radius_km: DEFAULT_SEARCH_RADIUS_KM }
    }

    pub fn with_search_radius(mut self, km: f64) -> Self {
        self.search_radius_km = km;
        self
    }
}

impl<B> OrderQueryApi<B>
where B: OrderStore
{
    pub async fn fetch_order(&self, order_id: &OrderId) -> Result<OrderWithLocation, DispatchError> {
        self.db.fetch_order(order_id).await?.ok_or_else(|| DispatchError::NotFound(format!("Order {order_id}")))
    }

    pub async fn list_by_client(
        &self,
        client_id: i64,
        pagination: Pagination,
    ) -> Result<Vec<OrderWithLocation>, DispatchError> {
        let filter = OrderQueryFilter::default().with_client_id(client_id);
        Ok(self.db.search_orders(filter, pagination).await?)
    }

    pub async fn list_by_provider(
        &self,
        medic_id: i64,
        pagination: Pagination,
    ) -> Result<Vec<OrderWithLocation>, DispatchError> {
        let filter = OrderQueryFilter::default().with_medic_id(medic_id);
        Ok(self.db.search_orders(filter, pagination).await?)
    }

    pub async fn list_all_admin(
        &self,
        filter: OrderQueryFilter,
        pagination: Pagination,
    ) -> Result<Vec<OrderWithLocation>, DispatchError> {
        trace!("🔄️🔍️ Admin order search. {filter}");
        Ok(self.db.search_orders(filter, pagination).await?)
    }
}

impl<B> OrderQueryApi<B>
where B: OrderStore + ProviderDirectory
{
    /// Unassigned orders near the medic, nearest first. A medic with no known location sees every unassigned
    /// order, oldest first.
    pub async fn list_available_for_provider(&self, medic_id: i64) -> Result<Vec<OrderWithLocation>, DispatchError> {
        let medic = self
            .db
            .fetch_medic(medic_id)
            .await?
            .ok_or_else(|| DispatchError::NotFound(format!("Medic #{medic_id}")))?;
        if !medic.is_dispatchable() {
            return Err(DispatchError::Forbidden(format!("Medic #{medic_id} cannot take orders")));
        }
        let filter = OrderQueryFilter::default().with_status(OrderStatusType::Created);
        let candidates = self.db.search_orders(filter, Pagination::unbounded()).await?;
        let total = candidates.len();
        let orders = find_orders_for_provider(candidates, medic.location(), self.search_radius_km);
        debug!("🔄️🧭️ {} of {total} open orders are available to medic #{medic_id}", orders.len());
        Ok(orders)
    }

    /// Online medics closest to the order's address.
    pub async fn nearby_providers(&self, order_id: &OrderId, limit: usize) -> Result<Vec<NearbyMedic>, DispatchError> {
        let order = self.fetch_order(order_id).await?;
        let location = order
            .location
            .as_ref()
            .ok_or_else(|| DispatchError::Validation(format!("Order {order_id} has no location")))?
            .point();
        let medics = self.db.online_medics().await?;
        let nearby = find_providers_for_order(medics, location, limit)
            .into_iter()
            .map(|(medic, distance_km)| NearbyMedic { medic: MedicSummary::from(&medic), distance_km })
            .collect();
        Ok(nearby)
    }
}
