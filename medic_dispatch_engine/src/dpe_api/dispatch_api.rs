use std::fmt::Debug;

use chrono::Utc;
use log::*;
use mdp_common::Money;

use crate::{
    db::{
        errors::StoreError,
        traits::{CatalogService, OrderStore, ProviderDirectory, RatingOutcome, TransitionRequest},
    },
    db_types::{
        GeoPoint,
        Medic,
        NewOrder,
        Order,
        OrderId,
        OrderLocation,
        OrderStatusType,
        OrderWithLocation,
        ServiceSnapshot,
        VerificationStatus,
    },
    dpe_api::{errors::DispatchError, order_objects::ProviderPosition},
    events::{EventProducers, OrderPlacedEvent, OrderStatusChangedEvent},
    realtime::{LocationSource, RealtimeBus},
    settlement::platform_fee,
    state_machine::{validate_transition, TransitionActor},
};

/// `DispatchApi` is the coordinator for every write in an order's life: placing it, accepting it, moving it along,
/// cancelling it and rating it.
///
/// Every status change is validated against the state machine and then applied as a conditional write, so it only
/// lands if nobody else moved the order first. Changes to one order are pushed to realtime subscribers in commit
/// order, before the next change to that order can commit. They are then published to the event hooks (which drive
/// the notification fan-out). Neither of those can fail the operation.
pub struct DispatchApi<B> {
    db: B,
    producers: EventProducers,
    realtime: Option<RealtimeBus>,
}

impl<B> Debug for DispatchApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "DispatchApi")
    }
}

impl<B> DispatchApi<B> {
    pub fn new(db: B, producers: EventProducers) -> Self {
        Self { db, producers, realtime: None }
    }

    pub fn with_realtime(mut self, realtime: RealtimeBus) -> Self {
        self.realtime = Some(realtime);
        self
    }

    pub fn db(&self) -> &B {
        &self.db
    }

    fn after_transition(&self, order: &Order, previous: OrderStatusType, actor: TransitionActor) {
        self.producers.publish_status_changed(OrderStatusChangedEvent::new(order.clone(), previous, actor));
    }
}

impl<B: OrderStore> DispatchApi<B> {
    /// Applies the conditional write and, while no other change to the same order can commit, pushes the committed
    /// status to realtime subscribers.
    async fn commit_transition(&self, request: TransitionRequest) -> Result<Order, StoreError> {
        let Some(bus) = &self.realtime else {
            return self.db.conditional_transition(request).await;
        };
        let _sequenced = bus.sequence_order(&request.order_id).await;
        let order = self.db.conditional_transition(request).await?;
        bus.emit_order_status(&order.id, order.status, order.updated_at);
        Ok(order)
    }
}

fn validate_location(location: &OrderLocation) -> Result<(), DispatchError> {
    if !location.point().is_valid() {
        return Err(DispatchError::Validation(format!("{} is not a valid coordinate", location.point())));
    }
    if location.contact_phone.trim().is_empty() {
        return Err(DispatchError::Validation("A contact phone number is required".into()));
    }
    Ok(())
}

fn validate_point(point: GeoPoint) -> Result<(), DispatchError> {
    if point.is_valid() {
        Ok(())
    } else {
        Err(DispatchError::Validation(format!("{point} is not a valid coordinate")))
    }
}

fn ensure_dispatchable(medic: &Medic) -> Result<(), DispatchError> {
    if medic.verification_status != VerificationStatus::Approved {
        return Err(DispatchError::Forbidden(format!("Medic #{} has not been approved", medic.id)));
    }
    if medic.is_blocked {
        return Err(DispatchError::Forbidden(format!("Medic #{} is blocked", medic.id)));
    }
    Ok(())
}

impl<B> DispatchApi<B>
where B: OrderStore + ProviderDirectory
{
    async fn order(&self, order_id: &OrderId) -> Result<OrderWithLocation, DispatchError> {
        self.db.fetch_order(order_id).await?.ok_or_else(|| DispatchError::NotFound(format!("Order {order_id}")))
    }

    async fn medic(&self, medic_id: i64) -> Result<Medic, DispatchError> {
        self.db.fetch_medic(medic_id).await?.ok_or_else(|| DispatchError::NotFound(format!("Medic #{medic_id}")))
    }

    /// Places a new order in `CREATED`, priced from the given catalog snapshot.
    ///
    /// The platform fee is 10% of the discounted price. Once stored, the order is announced to connected medics and
    /// to every online medic's notification endpoints.
    pub async fn place_order(
        &self,
        client_id: i64,
        service: ServiceSnapshot,
        discount: Money,
        location: OrderLocation,
    ) -> Result<OrderWithLocation, DispatchError> {
        validate_location(&location)?;
        let fee = platform_fee(service.price, discount)?;
        let new_order = NewOrder {
            id: OrderId::random(),
            client_id,
            service,
            discount,
            platform_fee: fee,
            location,
            created_at: Utc::now(),
        };
        let order = self.db.create_order(new_order).await?;
        info!(
            "🔄️📦️ Client #{client_id} placed order {} for {} ({} less {} discount, {} fee)",
            order.order.id, order.order.service_title, order.order.price, order.order.discount, order.order.platform_fee
        );
        if let Some(bus) = &self.realtime {
            bus.emit_new_order(&order);
        }
        self.producers.publish_order_placed(OrderPlacedEvent::new(order.clone()));
        Ok(order)
    }

    /// A medic claims an order. The first medic to do so wins; everyone else gets
    /// [`DispatchError::OrderNotAvailable`].
    pub async fn accept_order(&self, order_id: &OrderId, medic_id: i64) -> Result<Order, DispatchError> {
        let medic = self.medic(medic_id).await?;
        ensure_dispatchable(&medic)?;
        let current = self.order(order_id).await?.order;
        if validate_transition(current.status, OrderStatusType::Assigned, TransitionActor::AcceptingMedic).is_err() {
            debug!("🔄️🤝️ Medic #{medic_id} tried to accept {order_id}, but it is already {}", current.status);
            return Err(DispatchError::OrderNotAvailable(order_id.clone()));
        }
        let request = TransitionRequest::new(order_id.clone(), OrderStatusType::Created, OrderStatusType::Assigned)
            .with_medic(medic_id);
        let order = match self.commit_transition(request).await {
            Ok(order) => order,
            Err(e) => {
                let e = DispatchError::from(e);
                if e.is_conflict() {
                    debug!("🔄️🤝️ Medic #{medic_id} lost the race for {order_id}");
                    return Err(DispatchError::OrderNotAvailable(order_id.clone()));
                }
                return Err(e);
            },
        };
        info!("🔄️🤝️ Medic #{medic_id} accepted order {order_id}");
        self.after_transition(&order, OrderStatusType::Created, TransitionActor::AcceptingMedic);
        Ok(order)
    }

    /// The bound medic moves the order one step along its progression.
    ///
    /// Completing the order credits the medic's earnings in the same write as the status change. If the credit
    /// cannot be applied, the order stays where it was.
    pub async fn advance_status(
        &self,
        order_id: &OrderId,
        medic_id: i64,
        requested: OrderStatusType,
    ) -> Result<Order, DispatchError> {
        let current = self.order(order_id).await?.order;
        if current.medic_id != Some(medic_id) {
            return Err(DispatchError::Forbidden(format!("Medic #{medic_id} is not assigned to order {order_id}")));
        }
        validate_transition(current.status, requested, TransitionActor::AssignedMedic)?;
        let mut request = TransitionRequest::new(order_id.clone(), current.status, requested);
        if requested == OrderStatusType::Done {
            request = request.with_credit(medic_id, current.medic_earnings());
        }
        let order = self.commit_transition(request).await?;
        info!("🔄️🚑️ Order {order_id} is now {requested}");
        if requested == OrderStatusType::Done {
            info!("🔄️💰️ Medic #{medic_id} credited {} for order {order_id}", current.medic_earnings());
        }
        self.after_transition(&order, current.status, TransitionActor::AssignedMedic);
        Ok(order)
    }

    /// The client cancels their own order. Only possible before the medic has confirmed it.
    pub async fn cancel_by_client(&self, order_id: &OrderId, client_id: i64) -> Result<Order, DispatchError> {
        let current = self.order(order_id).await?.order;
        if current.client_id != client_id {
            return Err(DispatchError::Forbidden(format!("Order {order_id} does not belong to client #{client_id}")));
        }
        self.cancel(current, TransitionActor::Client).await
    }

    /// An operator cancels any order that has not finished yet.
    pub async fn cancel_by_operator(&self, order_id: &OrderId) -> Result<Order, DispatchError> {
        let current = self.order(order_id).await?.order;
        self.cancel(current, TransitionActor::Operator).await
    }

    async fn cancel(&self, current: Order, actor: TransitionActor) -> Result<Order, DispatchError> {
        validate_transition(current.status, OrderStatusType::Canceled, actor)?;
        let request = TransitionRequest::new(current.id.clone(), current.status, OrderStatusType::Canceled);
        let order = self.commit_transition(request).await?;
        info!("🔄️❌️ Order {} was cancelled by the {actor} while {}", order.id, current.status);
        self.after_transition(&order, current.status, actor);
        Ok(order)
    }

    /// The client rates a completed order, once. The medic's running average is updated in the same write.
    pub async fn rate_order(
        &self,
        order_id: &OrderId,
        client_id: i64,
        stars: u8,
    ) -> Result<RatingOutcome, DispatchError> {
        if !(1..=5).contains(&stars) {
            return Err(DispatchError::Validation(format!("A rating must be between 1 and 5 stars, not {stars}")));
        }
        let current = self.order(order_id).await?.order;
        if current.client_id != client_id {
            return Err(DispatchError::Forbidden(format!("Order {order_id} does not belong to client #{client_id}")));
        }
        if current.client_rating.is_some() {
            return Err(DispatchError::AlreadyRated(order_id.clone()));
        }
        if current.status != OrderStatusType::Done {
            return Err(DispatchError::Validation(format!(
                "Only completed orders can be rated. Order {order_id} is {}",
                current.status
            )));
        }
        if current.medic_id.is_none() {
            return Err(DispatchError::Validation(format!("Order {order_id} has no medic to rate")));
        }
        let outcome = self.db.record_rating(order_id, stars).await?;
        info!(
            "🔄️⭐️ Order {order_id} rated {stars}. Medic #{} now has {:?} from {} reviews",
            outcome.medic.id, outcome.medic.rating, outcome.medic.review_count
        );
        Ok(outcome)
    }

    /// The bound medic reports where they are. The position is remembered and pushed to the order's subscribers.
    pub async fn report_provider_location(
        &self,
        order_id: &OrderId,
        medic_id: i64,
        location: GeoPoint,
    ) -> Result<ProviderPosition, DispatchError> {
        validate_point(location)?;
        let current = self.order(order_id).await?.order;
        if current.medic_id != Some(medic_id) {
            return Err(DispatchError::Forbidden(format!("Medic #{medic_id} is not assigned to order {order_id}")));
        }
        if current.status.is_terminal() {
            return Err(DispatchError::Validation(format!("Order {order_id} is already {}", current.status)));
        }
        let medic = self.db.update_location(medic_id, location).await?;
        if let Some(bus) = &self.realtime {
            bus.emit_provider_location(order_id, medic_id, location, LocationSource::Live);
        }
        Ok(ProviderPosition {
            order_id: order_id.clone(),
            medic_id,
            latitude: location.latitude,
            longitude: location.longitude,
            source: LocationSource::Live,
            updated_at: medic.location_updated_at.unwrap_or(medic.updated_at),
        })
    }

    /// The client asks where their medic is. The last known position is returned and re-sent to the order's
    /// subscribers, for clients whose live feed has lapsed.
    pub async fn poll_provider_location(
        &self,
        order_id: &OrderId,
        client_id: i64,
    ) -> Result<Option<ProviderPosition>, DispatchError> {
        let current = self.order(order_id).await?.order;
        if current.client_id != client_id {
            return Err(DispatchError::Forbidden(format!("Order {order_id} does not belong to client #{client_id}")));
        }
        let Some(medic_id) = current.medic_id else {
            return Ok(None);
        };
        let medic = self.medic(medic_id).await?;
        let (Some(location), Some(located_at)) = (medic.location(), medic.location_updated_at) else {
            return Ok(None);
        };
        if let Some(bus) = &self.realtime {
            bus.emit_provider_location(order_id, medic_id, location, LocationSource::PolledFallback);
        }
        Ok(Some(ProviderPosition {
            order_id: order_id.clone(),
            medic_id,
            latitude: location.latitude,
            longitude: location.longitude,
            source: LocationSource::PolledFallback,
            updated_at: located_at,
        }))
    }

    /// Medics go online to be offered orders, and offline to stop. Only approved, unblocked medics can go online.
    pub async fn set_provider_online(
        &self,
        medic_id: i64,
        online: bool,
        location: Option<GeoPoint>,
    ) -> Result<Medic, DispatchError> {
        if let Some(point) = location {
            validate_point(point)?;
        }
        let medic = self.medic(medic_id).await?;
        if online {
            ensure_dispatchable(&medic)?;
        }
        let medic = self.db.set_online(medic_id, online, location).await?;
        info!("🔄️🟢️ Medic #{medic_id} is {}", if medic.is_online { "online" } else { "offline" });
        Ok(medic)
    }

    pub async fn approve_provider(&self, medic_id: i64) -> Result<Medic, DispatchError> {
        let medic = self.db.set_verification_status(medic_id, VerificationStatus::Approved).await?;
        info!("🔄️🪪️ Medic #{medic_id} has been approved");
        Ok(medic)
    }

    /// Blocked medics are taken offline and can no longer accept orders.
    pub async fn block_provider(&self, medic_id: i64, blocked: bool) -> Result<Medic, DispatchError> {
        let medic = self.db.set_blocked(medic_id, blocked).await?;
        info!("🔄️🪪️ Medic #{medic_id} has been {}", if blocked { "blocked" } else { "unblocked" });
        Ok(medic)
    }
}

impl<B> DispatchApi<B>
where B: OrderStore + ProviderDirectory + CatalogService
{
    /// Places an order for an active catalog service. The price is always taken from the catalog.
    pub async fn place_order_for_service(
        &self,
        client_id: i64,
        service_id: i64,
        discount: Money,
        location: OrderLocation,
    ) -> Result<OrderWithLocation, DispatchError> {
        let service = self.db.fetch_active_service(service_id).await?;
        self.place_order(client_id, service, discount, location).await
    }
}
