use async_trait::async_trait;

use crate::{
    db::errors::StoreError,
    db_types::{ChannelKind, GeoPoint, Medic, NotificationSubscription, VerificationStatus},
};

/// Read and write access to medics.
///
/// Registration and credential checks live elsewhere; this is only the slice of a medic's record that dispatch
/// depends on.
#[async_trait]
pub trait ProviderDirectory: Send + Sync {
    async fn fetch_medic(&self, medic_id: i64) -> Result<Option<Medic>, StoreError>;

    /// Medics who are online, approved and not blocked.
    async fn online_medics(&self) -> Result<Vec<Medic>, StoreError>;

    /// Every `channel` endpoint registered by a medic who is online, approved and not blocked, at the time of the
    /// call.
    async fn online_provider_endpoints(&self, channel: ChannelKind) -> Result<Vec<NotificationSubscription>, StoreError>;

    async fn set_online(&self, medic_id: i64, online: bool, location: Option<GeoPoint>) -> Result<Medic, StoreError>;

    async fn update_location(&self, medic_id: i64, location: GeoPoint) -> Result<Medic, StoreError>;

    async fn set_verification_status(&self, medic_id: i64, status: VerificationStatus) -> Result<Medic, StoreError>;

    async fn set_blocked(&self, medic_id: i64, blocked: bool) -> Result<Medic, StoreError>;
}
