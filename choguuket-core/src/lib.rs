pub mod model;
pub mod decode;
pub mod repository;
pub mod messaging;

pub use decode::{DecodeError, Payload, Validated, ValidationError};
pub use model::{route_key, ChatId, MatchSet, RequestId, StoredTrip, StoredTripRequest, Trip, TripId, TripRequest};

use std::time::Duration;

/// Failure of a unit of work against the persistent store. The enclosing transaction has
/// been rolled back by the time this reaches the caller.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("store backend error: {0}")]
    Backend(String),
    #[error("store operation timed out after {0:?}")]
    Timeout(Duration),
    #[error("stored data is corrupt: {0}")]
    Corrupt(String),
}

/// A Bot API call (send, answer, poll) failed.
#[derive(Debug, thiserror::Error)]
pub enum DeliveryError {
    #[error("transport error: {0}")]
    Transport(String),
    #[error("request timed out")]
    Timeout,
    #[error("rejected by chat API [{code}]: {description}")]
    Rejected { code: i64, description: String },
}

#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error("cache backend error: {0}")]
    Backend(String),
    #[error("cached value could not be decoded: {0}")]
    Codec(#[from] serde_json::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;
