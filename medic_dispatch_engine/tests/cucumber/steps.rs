use std::str::FromStr;

use cucumber::{given, then, when};
use log::*;
use medic_dispatch_engine::{
    db_types::{GeoPoint, OrderLocation, OrderStatusType},
    test_utils::seed::{seed_medic, seed_service, MedicSeed},
    DispatchError,
    OrderStore,
    ProviderDirectory,
};
use mdp_common::Money;

use crate::cucumber::{world::DispatchSystem, DispatchWorld};

const TASHKENT: GeoPoint = GeoPoint { latitude: 41.2995, longitude: 69.2401 };

fn location_at(point: GeoPoint) -> OrderLocation {
    OrderLocation {
        latitude: point.latitude,
        longitude: point.longitude,
        address_details: "Apartment 12, 3rd floor".into(),
        contact_phone: "+998 90 123 45 67".into(),
    }
}

fn error_kind(e: &DispatchError) -> &'static str {
    match e {
        DispatchError::Validation(_) => "Validation",
        DispatchError::NotFound(_) => "NotFound",
        DispatchError::Forbidden(_) => "Forbidden",
        DispatchError::InvalidTransition(_) => "InvalidTransition",
        DispatchError::Conflict(_) => "Conflict",
        DispatchError::OrderNotAvailable(_) => "OrderNotAvailable",
        DispatchError::AlreadyRated(_) => "AlreadyRated",
        DispatchError::DatabaseError(_) => "DatabaseError",
    }
}

#[given("a fresh install")]
async fn fresh_install(world: &mut DispatchWorld) {
    world.system = Some(DispatchSystem::new().await);
}

#[given(expr = "an approved medic with id {int}")]
async fn approved_medic(world: &mut DispatchWorld, id: i64) {
    seed_medic(&world.system().db, MedicSeed::approved(id)).await;
}

#[given(expr = "an approved medic with id {int} at latitude {float} and longitude {float}")]
async fn approved_medic_at(world: &mut DispatchWorld, id: i64, latitude: f64, longitude: f64) {
    seed_medic(&world.system().db, MedicSeed::approved(id).at(GeoPoint::new(latitude, longitude))).await;
}

#[given(expr = "a service {string} with id {int} priced at {int}")]
async fn service(world: &mut DispatchWorld, title: String, id: i64, price: i64) {
    seed_service(&world.system().db, id, &title, price, true).await;
}

async fn place(world: &mut DispatchWorld, name: String, client_id: i64, service_id: i64, discount: i64, at: GeoPoint) {
    let order = world
        .system()
        .api
        .place_order_for_service(client_id, service_id, Money::from(discount), location_at(at))
        .await
        .expect("Error placing order");
    debug!("🚀️ Placed order {name} as {}", order.order.id);
    world.orders.insert(name, order.order.id);
}

#[when(expr = "client {int} orders service {int} with a discount of {int} as {string}")]
async fn order_with_discount(world: &mut DispatchWorld, client_id: i64, service_id: i64, discount: i64, name: String) {
    place(world, name, client_id, service_id, discount, TASHKENT).await;
}

#[when(expr = "client {int} orders service {int} as {string}")]
async fn order_service(world: &mut DispatchWorld, client_id: i64, service_id: i64, name: String) {
    place(world, name, client_id, service_id, 0, TASHKENT).await;
}

#[when(expr = "client {int} orders service {int} at latitude {float} and longitude {float} as {string}")]
async fn order_at(world: &mut DispatchWorld, client_id: i64, service_id: i64, lat: f64, lon: f64, name: String) {
    place(world, name, client_id, service_id, 0, GeoPoint::new(lat, lon)).await;
}

#[when(expr = "medic {int} accepts order {string}")]
async fn accept(world: &mut DispatchWorld, medic_id: i64, name: String) {
    let order_id = world.order_id(&name);
    let result = world.system().api.accept_order(&order_id, medic_id).await;
    world.record(result);
}

#[when(expr = "medic {int} moves order {string} to {word}")]
async fn advance(world: &mut DispatchWorld, medic_id: i64, name: String, status: String) {
    let order_id = world.order_id(&name);
    let status = OrderStatusType::from_str(&status).expect("Unknown status");
    let result = world.system().api.advance_status(&order_id, medic_id, status).await;
    world.record(result);
}

#[when(expr = "medic {int} completes order {string}")]
async fn complete(world: &mut DispatchWorld, medic_id: i64, name: String) {
    let order_id = world.order_id(&name);
    let api = &world.system().api;
    for status in [
        OrderStatusType::Accepted,
        OrderStatusType::OnTheWay,
        OrderStatusType::Arrived,
        OrderStatusType::ServiceStarted,
        OrderStatusType::Done,
    ] {
        api.advance_status(&order_id, medic_id, status).await.expect("Error advancing order");
    }
    world.last_error = None;
}

#[when(expr = "client {int} cancels order {string}")]
async fn client_cancel(world: &mut DispatchWorld, client_id: i64, name: String) {
    let order_id = world.order_id(&name);
    let result = world.system().api.cancel_by_client(&order_id, client_id).await;
    world.record(result);
}

#[when(expr = "client {int} rates order {string} with {int} stars")]
async fn rate(world: &mut DispatchWorld, client_id: i64, name: String, stars: u8) {
    let order_id = world.order_id(&name);
    let result = world.system().api.rate_order(&order_id, client_id, stars).await;
    world.record(result);
}

#[then("the request succeeds")]
async fn request_succeeds(world: &mut DispatchWorld) {
    if let Some(e) = &world.last_error {
        panic!("Expected the request to succeed, but it failed with {e}");
    }
}

#[then(expr = "the request fails with {word}")]
async fn request_fails(world: &mut DispatchWorld, kind: String) {
    let e = world.last_error.as_ref().expect("Expected the request to fail, but it succeeded");
    assert_eq!(error_kind(e), kind, "Unexpected error: {e}");
}

#[then(expr = "order {string} has status {word}")]
async fn order_status(world: &mut DispatchWorld, name: String, status: String) {
    let order_id = world.order_id(&name);
    let order = world.system().db.fetch_order(&order_id).await.unwrap().expect("Order not found");
    assert_eq!(order.order.status.as_str(), status);
}

#[then(expr = "order {string} has a platform fee of {int}")]
async fn order_fee(world: &mut DispatchWorld, name: String, fee: i64) {
    let order_id = world.order_id(&name);
    let order = world.system().db.fetch_order(&order_id).await.unwrap().expect("Order not found");
    assert_eq!(order.order.platform_fee, Money::from(fee));
}

#[then(expr = "order {string} has a rating of {int}")]
async fn order_rating(world: &mut DispatchWorld, name: String, stars: i64) {
    let order_id = world.order_id(&name);
    let order = world.system().db.fetch_order(&order_id).await.unwrap().expect("Order not found");
    assert_eq!(order.order.client_rating, Some(stars));
}

#[then(expr = "medic {int} has a balance of {int}")]
async fn medic_balance(world: &mut DispatchWorld, medic_id: i64, balance: i64) {
    let medic = world.system().db.fetch_medic(medic_id).await.unwrap().expect("Medic not found");
    assert_eq!(medic.balance, Money::from(balance));
}

#[then(expr = "medic {int} has a rating of {word} from {int} review(s)")]
async fn medic_rating(world: &mut DispatchWorld, medic_id: i64, rating: String, reviews: i64) {
    let medic = world.system().db.fetch_medic(medic_id).await.unwrap().expect("Medic not found");
    let actual = medic.rating.map(|r| format!("{r:.2}")).unwrap_or_else(|| "none".into());
    assert_eq!(actual, rating);
    assert_eq!(medic.review_count, reviews);
}

#[then(expr = "medic {int} is offered the orders {string}")]
async fn offered_orders(world: &mut DispatchWorld, medic_id: i64, names: String) {
    let expected = names
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|name| world.order_id(name))
        .collect::<Vec<_>>();
    let offered = world.system().queries.list_available_for_provider(medic_id).await.expect("Error listing orders");
    let offered = offered.into_iter().map(|o| o.order.id).collect::<Vec<_>>();
    assert_eq!(offered, expected);
}
