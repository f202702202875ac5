//! Rows that belong to collaborators outside the engine (registration, catalog management), inserted directly.
use chrono::Utc;
use mdp_common::Money;

use crate::{
    db_types::{GeoPoint, VerificationStatus},
    SqliteDatabase,
};

#[derive(Debug, Clone)]
pub struct MedicSeed {
    pub id: i64,
    pub is_online: bool,
    pub verification_status: VerificationStatus,
    pub is_blocked: bool,
    pub location: Option<GeoPoint>,
}

impl MedicSeed {
    /// An approved, online medic with no known location.
    pub fn approved(id: i64) -> Self {
        Self { id, is_online: true, verification_status: VerificationStatus::Approved, is_blocked: false, location: None }
    }

    pub fn pending(id: i64) -> Self {
        Self { verification_status: VerificationStatus::Pending, ..Self::approved(id) }
    }

    pub fn offline(mut self) -> Self {
        self.is_online = false;
        self
    }

    pub fn blocked(mut self) -> Self {
        self.is_blocked = true;
        self
    }

    pub fn at(mut self, location: GeoPoint) -> Self {
        self.location = Some(location);
        self
    }
}

pub async fn seed_medic(db: &SqliteDatabase, medic: MedicSeed) {
    sqlx::query(
        r#"
            INSERT INTO medics
                (id, is_online, verification_status, is_blocked, latitude, longitude, location_updated_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        "#,
    )
    .bind(medic.id)
    .bind(medic.is_online)
    .bind(medic.verification_status)
    .bind(medic.is_blocked)
    .bind(medic.location.map(|p| p.latitude))
    .bind(medic.location.map(|p| p.longitude))
    .bind(medic.location.map(|_| Utc::now()))
    .bind(Utc::now())
    .execute(db.pool())
    .await
    .expect("Error seeding medic");
}

pub async fn seed_service(db: &SqliteDatabase, id: i64, title: &str, price: i64, is_active: bool) {
    sqlx::query("INSERT INTO services (id, title, price, is_active) VALUES ($1, $2, $3, $4)")
        .bind(id)
        .bind(title)
        .bind(Money::from(price))
        .bind(is_active)
        .execute(db.pool())
        .await
        .expect("Error seeding service");
}
