use std::{
    collections::{hash_map::DefaultHasher, HashMap, HashSet},
    fmt::Debug,
    hash::{Hash, Hasher},
    sync::{Arc, Mutex, MutexGuard},
};

use chrono::{DateTime, Utc};
use log::*;
use tokio::sync::{
    mpsc::{self, error::TrySendError},
    Mutex as AsyncMutex,
    MutexGuard as AsyncMutexGuard,
};

use crate::{
    db_types::{GeoPoint, OrderId, OrderStatusType, OrderWithLocation, Role},
    realtime::{LocationSource, NewOrderSummary, RealtimeError, RealtimeEvent, Topic},
};

/// Who is on the other end of a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Identity {
    pub user_id: i64,
    pub role: Role,
}

/// Checks the credential presented when a connection is opened.
pub trait ConnectionAuthenticator: Send + Sync {
    fn authenticate(&self, credential: &str) -> Result<Identity, RealtimeError>;
}

type ConnectionId = u64;

struct ConnectionEntry {
    identity: Identity,
    sender: mpsc::Sender<RealtimeEvent>,
    topics: HashSet<Topic>,
}

#[derive(Default)]
struct BusState {
    next_id: ConnectionId,
    connections: HashMap<ConnectionId, ConnectionEntry>,
    topics: HashMap<Topic, HashSet<ConnectionId>>,
    /// Commit time of the last status event sent on each order topic that still has members.
    last_status: HashMap<OrderId, DateTime<Utc>>,
}

impl BusState {
    fn join(&mut self, id: ConnectionId, topic: Topic) -> bool {
        let Some(entry) = self.connections.get_mut(&id) else {
            return false;
        };
        entry.topics.insert(topic.clone());
        self.topics.entry(topic).or_default().insert(id);
        true
    }

    fn leave(&mut self, id: ConnectionId, topic: &Topic) {
        if let Some(entry) = self.connections.get_mut(&id) {
            entry.topics.remove(topic);
        }
        self.remove_member(id, topic);
    }

    fn disconnect(&mut self, id: ConnectionId) {
        if let Some(entry) = self.connections.remove(&id) {
            trace!("📡️ {} #{} leaves {} topics", entry.identity.role, entry.identity.user_id, entry.topics.len());
            for topic in &entry.topics {
                self.remove_member(id, topic);
            }
        }
    }

    fn remove_member(&mut self, id: ConnectionId, topic: &Topic) {
        let Some(members) = self.topics.get_mut(topic) else {
            return;
        };
        members.remove(&id);
        if members.is_empty() {
            self.topics.remove(topic);
            if let Topic::Order(order_id) = topic {
                self.last_status.remove(order_id);
            }
        }
    }

    /// Records `updated_at` as the newest status event for the order. Returns false if a newer (or the same) commit
    /// has already been sent.
    fn advance_status_clock(&mut self, order_id: &OrderId, updated_at: DateTime<Utc>) -> bool {
        match self.last_status.get(order_id) {
            Some(last) if *last >= updated_at => false,
            _ => {
                self.last_status.insert(order_id.clone(), updated_at);
                true
            },
        }
    }

    /// Pushes `event` onto the queue of every member of `topic`. Returns how many connections accepted it.
    fn broadcast(&mut self, topic: &Topic, event: &RealtimeEvent) -> usize {
        let Some(members) = self.topics.get(topic) else {
            return 0;
        };
        let mut delivered = 0;
        let mut closed = Vec::new();
        for id in members {
            let Some(entry) = self.connections.get(id) else { continue };
            match entry.sender.try_send(event.clone()) {
                Ok(()) => delivered += 1,
                Err(TrySendError::Full(_)) => {
                    warn!("📡️ Connection {id} is not keeping up. Dropping a {topic} event for it");
                },
                Err(TrySendError::Closed(_)) => closed.push(*id),
            }
        }
        for id in closed {
            trace!("📡️ Connection {id} has gone away. Cleaning up");
            self.disconnect(id);
        }
        delivered
    }
}

/// The realtime publish/subscribe hub.
///
/// Cheap to clone; all clones share the same connections and topics.
#[derive(Clone)]
pub struct RealtimeBus {
    state: Arc<Mutex<BusState>>,
    authenticator: Arc<dyn ConnectionAuthenticator>,
    buffer_size: usize,
    order_locks: Arc<[AsyncMutex<()>]>,
}

const ORDER_LOCK_STRIPES: usize = 64;

impl Debug for RealtimeBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "RealtimeBus ({} connections)", self.connection_count())
    }
}

fn lock(state: &Mutex<BusState>) -> MutexGuard<'_, BusState> {
    // mutations never panic midway, so a poisoned lock still holds consistent state
    state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl RealtimeBus {
    pub fn new(authenticator: Arc<dyn ConnectionAuthenticator>, buffer_size: usize) -> Self {
        let order_locks = (0..ORDER_LOCK_STRIPES).map(|_| AsyncMutex::new(())).collect();
        Self {
            state: Arc::new(Mutex::new(BusState::default())),
            authenticator,
            buffer_size: buffer_size.max(1),
            order_locks,
        }
    }

    /// Serialises status changes to one order. Hold the guard across the store commit and the matching
    /// [`emit_order_status`](Self::emit_order_status) so subscribers see changes in the order they were committed.
    ///
    /// Orders share a fixed set of locks, so unrelated orders may occasionally wait on each other.
    pub async fn sequence_order(&self, order_id: &OrderId) -> AsyncMutexGuard<'_, ()> {
        let mut hasher = DefaultHasher::new();
        order_id.hash(&mut hasher);
        let stripe = (hasher.finish() % self.order_locks.len() as u64) as usize;
        self.order_locks[stripe].lock().await
    }

    /// Opens a connection for the holder of `credential`. Medic connections are placed on the providers feed.
    pub fn connect(&self, credential: &str) -> Result<RealtimeConnection, RealtimeError> {
        let identity = self.authenticator.authenticate(credential).map_err(|e| {
            debug!("📡️ Rejected realtime connection: {e}");
            e
        })?;
        let (sender, receiver) = mpsc::channel(self.buffer_size);
        let mut state = lock(&self.state);
        let id = state.next_id;
        state.next_id += 1;
        state.connections.insert(id, ConnectionEntry { identity, sender, topics: HashSet::new() });
        if identity.role == Role::Medic {
            state.join(id, Topic::ProvidersFeed);
        }
        drop(state);
        debug!("📡️ Connection {id} opened for {} #{}", identity.role, identity.user_id);
        let handle = ConnectionHandle { id, identity, state: Arc::clone(&self.state) };
        Ok(RealtimeConnection { handle, events: receiver })
    }

    pub fn connection_count(&self) -> usize {
        lock(&self.state).connections.len()
    }

    pub fn subscriber_count(&self, topic: &Topic) -> usize {
        lock(&self.state).topics.get(topic).map_or(0, |m| m.len())
    }

    /// Sends a status change, stamped with the time it was committed, to the order's subscribers.
    ///
    /// A change committed no later than one already sent on the topic is stale and is dropped.
    pub fn emit_order_status(&self, order_id: &OrderId, status: OrderStatusType, updated_at: DateTime<Utc>) -> usize {
        let topic = Topic::Order(order_id.clone());
        let mut state = lock(&self.state);
        if !state.topics.contains_key(&topic) {
            return 0;
        }
        if !state.advance_status_clock(order_id, updated_at) {
            debug!("📡️ Dropping a stale {status} event for {order_id}, committed at {updated_at}");
            return 0;
        }
        let event = RealtimeEvent::OrderStatusChanged { order_id: order_id.clone(), status, updated_at };
        let delivered = state.broadcast(&topic, &event);
        drop(state);
        trace!("📡️ {order_id} is now {status}. Sent to {delivered} connections");
        delivered
    }

    pub fn emit_new_order(&self, order: &OrderWithLocation) -> usize {
        let event = RealtimeEvent::NewOrder(NewOrderSummary::from(order));
        let delivered = lock(&self.state).broadcast(&Topic::ProvidersFeed, &event);
        trace!("📡️ New order {} announced to {delivered} medics", order.order.id);
        delivered
    }

    pub fn emit_provider_location(
        &self,
        order_id: &OrderId,
        medic_id: i64,
        location: GeoPoint,
        source: LocationSource,
    ) -> usize {
        let event = RealtimeEvent::ProviderLocation {
            order_id: order_id.clone(),
            medic_id,
            latitude: location.latitude,
            longitude: location.longitude,
            source,
            timestamp: Utc::now(),
        };
        lock(&self.state).broadcast(&Topic::Order(order_id.clone()), &event)
    }
}

/// An open connection: a handle to manage topic membership, and the stream of events for it.
pub struct RealtimeConnection {
    handle: ConnectionHandle,
    events: mpsc::Receiver<RealtimeEvent>,
}

impl RealtimeConnection {
    pub fn identity(&self) -> Identity {
        self.handle.identity
    }

    pub fn handle(&self) -> &ConnectionHandle {
        &self.handle
    }

    pub async fn recv(&mut self) -> Option<RealtimeEvent> {
        self.events.recv().await
    }

    pub fn into_parts(self) -> (ConnectionHandle, mpsc::Receiver<RealtimeEvent>) {
        (self.handle, self.events)
    }
}

/// Dropping the handle closes the connection and releases all of its topics immediately.
pub struct ConnectionHandle {
    id: ConnectionId,
    identity: Identity,
    state: Arc<Mutex<BusState>>,
}

impl ConnectionHandle {
    pub fn identity(&self) -> Identity {
        self.identity
    }

    pub fn subscribe(&self, order_id: OrderId) -> Result<(), RealtimeError> {
        let topic = Topic::Order(order_id);
        trace!("📡️ Connection {} joins {topic}", self.id);
        if lock(&self.state).join(self.id, topic) {
            Ok(())
        } else {
            Err(RealtimeError::ConnectionClosed)
        }
    }

    pub fn unsubscribe(&self, order_id: OrderId) {
        let topic = Topic::Order(order_id);
        trace!("📡️ Connection {} leaves {topic}", self.id);
        lock(&self.state).leave(self.id, &topic);
    }

    pub fn topics(&self) -> Vec<Topic> {
        lock(&self.state).connections.get(&self.id).map(|e| e.topics.iter().cloned().collect()).unwrap_or_default()
    }
}

impl Drop for ConnectionHandle {
    fn drop(&mut self) {
        lock(&self.state).disconnect(self.id);
        debug!("📡️ Connection {} closed", self.id);
    }
}

#[cfg(test)]
mod test {
    use chrono::Duration;

    use super::*;

    struct StaticTokens;

    impl ConnectionAuthenticator for StaticTokens {
        fn authenticate(&self, credential: &str) -> Result<Identity, RealtimeError> {
            match credential {
                "client-1" => Ok(Identity { user_id: 1, role: Role::Client }),
                "medic-7" => Ok(Identity { user_id: 7, role: Role::Medic }),
                "medic-8" => Ok(Identity { user_id: 8, role: Role::Medic }),
                _ => Err(RealtimeError::Unauthenticated("unknown token".into())),
            }
        }
    }

    fn bus() -> RealtimeBus {
        RealtimeBus::new(Arc::new(StaticTokens), 4)
    }

    #[test]
    fn unauthenticated_connections_are_rejected() {
        let bus = bus();
        let err = bus.connect("forged").err().unwrap();
        assert!(matches!(err, RealtimeError::Unauthenticated(_)));
        assert_eq!(bus.connection_count(), 0);
    }

    #[tokio::test]
    async fn order_topic_delivery() {
        let bus = bus();
        let order_id = OrderId::from("o1");
        let mut client = bus.connect("client-1").unwrap();
        let mut other = bus.connect("medic-8").unwrap();
        client.handle().subscribe(order_id.clone()).unwrap();

        let t0 = Utc::now();
        assert_eq!(bus.emit_order_status(&order_id, OrderStatusType::Assigned, t0), 1);
        assert_eq!(bus.emit_order_status(&order_id, OrderStatusType::Accepted, t0 + Duration::seconds(1)), 1);
        let statuses = [client.recv().await.unwrap(), client.recv().await.unwrap()]
            .into_iter()
            .map(|e| match e {
                RealtimeEvent::OrderStatusChanged { status, .. } => status,
                e => panic!("Unexpected event {e:?}"),
            })
            .collect::<Vec<_>>();
        assert_eq!(statuses, vec![OrderStatusType::Assigned, OrderStatusType::Accepted]);
        assert!(other.events.try_recv().is_err());

        client.handle().unsubscribe(order_id.clone());
        assert_eq!(bus.emit_order_status(&order_id, OrderStatusType::OnTheWay, t0 + Duration::seconds(2)), 0);
    }

    #[tokio::test]
    async fn medics_join_the_providers_feed() {
        let bus = bus();
        let medic = bus.connect("medic-7").unwrap();
        let _client = bus.connect("client-1").unwrap();
        assert_eq!(medic.handle().topics(), vec![Topic::ProvidersFeed]);
        assert_eq!(bus.subscriber_count(&Topic::ProvidersFeed), 1);
    }

    #[test]
    fn disconnect_releases_topics_synchronously() {
        let bus = bus();
        let order_id = OrderId::from("o1");
        let medic = bus.connect("medic-7").unwrap();
        medic.handle().subscribe(order_id.clone()).unwrap();
        assert_eq!(bus.subscriber_count(&Topic::Order(order_id.clone())), 1);
        drop(medic);
        assert_eq!(bus.connection_count(), 0);
        assert_eq!(bus.subscriber_count(&Topic::Order(order_id.clone())), 0);
        assert_eq!(bus.subscriber_count(&Topic::ProvidersFeed), 0);
        // Nothing survives a reconnect
        let medic = bus.connect("medic-7").unwrap();
        assert_eq!(medic.handle().topics(), vec![Topic::ProvidersFeed]);
    }

    #[test]
    fn slow_consumers_do_not_block_emitters() {
        let bus = bus();
        let order_id = OrderId::from("o1");
        let client = bus.connect("client-1").unwrap();
        client.handle().subscribe(order_id.clone()).unwrap();
        let delivered = (0..10)
            .map(|_| bus.emit_provider_location(&order_id, 7, GeoPoint::new(41.3, 69.2), LocationSource::Live))
            .sum::<usize>();
        assert_eq!(delivered, 4);
    }

    #[test]
    fn dropped_receivers_are_cleaned_up() {
        let bus = bus();
        let order_id = OrderId::from("o1");
        let (handle, events) = bus.connect("client-1").unwrap().into_parts();
        handle.subscribe(order_id.clone()).unwrap();
        drop(events);
        assert_eq!(bus.emit_order_status(&order_id, OrderStatusType::Canceled, Utc::now()), 0);
        assert_eq!(bus.connection_count(), 0);
        assert!(matches!(handle.subscribe(order_id), Err(RealtimeError::ConnectionClosed)));
    }

    #[tokio::test]
    async fn stale_status_events_are_dropped() {
        let bus = bus();
        let order_id = OrderId::from("o1");
        let mut client = bus.connect("client-1").unwrap();
        client.handle().subscribe(order_id.clone()).unwrap();
        let assigned_at = Utc::now();
        let accepted_at = assigned_at + Duration::milliseconds(5);

        assert_eq!(bus.emit_order_status(&order_id, OrderStatusType::Accepted, accepted_at), 1);
        assert_eq!(bus.emit_order_status(&order_id, OrderStatusType::Assigned, assigned_at), 0);
        assert_eq!(bus.emit_order_status(&order_id, OrderStatusType::Accepted, accepted_at), 0);
        match client.recv().await.unwrap() {
            RealtimeEvent::OrderStatusChanged { status, updated_at, .. } => {
                assert_eq!(status, OrderStatusType::Accepted);
                assert_eq!(updated_at, accepted_at);
            },
            e => panic!("Unexpected event {e:?}"),
        }
        assert!(client.events.try_recv().is_err());

        // Everyone left, so the topic starts afresh
        client.handle().unsubscribe(order_id.clone());
        client.handle().subscribe(order_id.clone()).unwrap();
        assert_eq!(bus.emit_order_status(&order_id, OrderStatusType::Assigned, assigned_at), 1);
    }

    #[tokio::test]
    async fn changes_to_one_order_are_sequenced() {
        let bus = bus();
        let order_id = OrderId::from("o1");
        let guard = bus.sequence_order(&order_id).await;
        let waiting = tokio::time::timeout(std::time::Duration::from_millis(50), bus.sequence_order(&order_id)).await;
        assert!(waiting.is_err());
        drop(guard);
        let _guard = bus.sequence_order(&order_id).await;
    }
}
