use async_trait::async_trait;
use std::time::Duration;

use crate::model::{ChatId, MatchSet, RequestId, StoredTripRequest, Trip, TripId, TripRequest};
use crate::{CacheError, StoreResult};

/// Durable storage of trips, trip requests and known chats.
///
/// Every method is one unit of work: it either commits completely or leaves no trace.
#[async_trait]
pub trait TripStore: Send + Sync {
    /// Persists a trip and registers its chat. A `None` username keeps the one on record.
    async fn insert_trip(&self, trip: &Trip, username: Option<&str>) -> StoreResult<TripId>;

    /// Persists a trip request and registers its chat. The returned id is never reused.
    async fn insert_trip_request(&self, request: &TripRequest, username: Option<&str>) -> StoreResult<RequestId>;

    /// Trips on the same route departing within the store's search window of the
    /// desired time, ordered by departure. An empty set is a valid answer.
    async fn search_trips(&self, request: &TripRequest) -> StoreResult<MatchSet>;

    async fn find_trip_request(&self, id: RequestId) -> StoreResult<Option<StoredTripRequest>>;

    async fn register_chat(&self, chat_id: ChatId, username: Option<&str>) -> StoreResult<()>;

    async fn chat_exists(&self, chat_id: ChatId) -> StoreResult<bool>;
}

/// Expiring cache of search results keyed by request id. Never the source of truth.
#[async_trait]
pub trait SearchCache: Send + Sync {
    async fn set(&self, id: RequestId, matches: &MatchSet, ttl: Duration) -> Result<(), CacheError>;

    /// `Ok(None)` is a miss: never cached, expired, or evicted.
    async fn get(&self, id: RequestId) -> Result<Option<MatchSet>, CacheError>;
}
