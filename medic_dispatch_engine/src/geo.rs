//! Proximity matching between medics and orders.
//!
//! These are pure functions over slices; callers fetch the candidates from the store first.
use std::cmp::Ordering;

use log::trace;

use crate::db_types::{GeoPoint, Medic, OrderWithLocation};

pub const EARTH_RADIUS_KM: f64 = 6371.0;
pub const DEFAULT_SEARCH_RADIUS_KM: f64 = 10.0;

/// Great-circle distance between two points using the haversine formula.
pub fn distance_km(a: GeoPoint, b: GeoPoint) -> f64 {
    let (lat_a, lat_b) = (a.latitude.to_radians(), b.latitude.to_radians());
    let d_lat = lat_b - lat_a;
    let d_lon = (b.longitude - a.longitude).to_radians();
    let h = (d_lat / 2.0).sin().powi(2) + lat_a.cos() * lat_b.cos() * (d_lon / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_KM * h.sqrt().min(1.0).asin()
}

/// Orders a medic should see, nearest first.
///
/// When the medic's location is unknown, every candidate is returned oldest-first and no distance filter applies.
/// Otherwise only orders with a location within `max_km` are kept. Ties in distance are broken by creation time.
pub fn find_orders_for_provider(
    orders: Vec<OrderWithLocation>,
    provider_location: Option<GeoPoint>,
    max_km: f64,
) -> Vec<OrderWithLocation> {
    let Some(here) = provider_location else {
        let mut orders = orders;
        orders.sort_by(|a, b| a.order.created_at.cmp(&b.order.created_at));
        return orders;
    };
    let total = orders.len();
    let mut nearby = orders
        .into_iter()
        .filter_map(|o| {
            let distance = distance_km(here, o.location.as_ref()?.point());
            (distance <= max_km).then_some((distance, o))
        })
        .collect::<Vec<_>>();
    nearby.sort_by(|(da, a), (db, b)| {
        da.partial_cmp(db).unwrap_or(Ordering::Equal).then_with(|| a.order.created_at.cmp(&b.order.created_at))
    });
    trace!("🧭️ {} of {total} orders are within {max_km}km of {here}", nearby.len());
    nearby.into_iter().map(|(_, o)| o).collect()
}

/// Online medics with a known location, nearest to `order_location` first, at most `limit` of them.
pub fn find_providers_for_order(medics: Vec<Medic>, order_location: GeoPoint, limit: usize) -> Vec<(Medic, f64)> {
    let mut candidates = medics
        .into_iter()
        .filter(|m| m.is_online)
        .filter_map(|m| {
            let distance = distance_km(order_location, m.location()?);
            Some((m, distance))
        })
        .collect::<Vec<_>>();
    candidates.sort_by(|(_, a), (_, b)| a.partial_cmp(b).unwrap_or(Ordering::Equal));
    candidates.truncate(limit);
    candidates
}
