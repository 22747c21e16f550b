use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChatId(pub i64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TripId(pub i64);

/// Store-assigned identity of a trip request. Cache key and notification correlation key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequestId(pub i64);

impl fmt::Display for ChatId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for TripId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Comparison key for an origin or destination: surrounding whitespace dropped, Unicode
/// lowercase. Both stores match routes on this key, so "Бишкек" and " БИШКЕК " are one place.
pub fn route_key(location: &str) -> String {
    location.trim().to_lowercase()
}

/// A ride offer as submitted by the "create trip" web app.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Trip {
    pub origin: String,
    pub destination: String,
    pub departure_time: DateTime<Utc>,
    pub seats: u32,
    pub chat_id: ChatId,
}

/// A ride search as submitted by the "search trip" web app.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TripRequest {
    pub origin: String,
    pub destination: String,
    pub desired_time: DateTime<Utc>,
    pub chat_id: ChatId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredTrip {
    pub id: TripId,
    pub trip: Trip,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredTripRequest {
    pub id: RequestId,
    pub request: TripRequest,
}

/// Trips matching a request at the time of the search, ordered by departure.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MatchSet(Vec<StoredTrip>);

impl MatchSet {
    pub fn new(trips: Vec<StoredTrip>) -> Self {
        Self(trips)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn trips(&self) -> &[StoredTrip] {
        &self.0
    }

    /// Slice of at most `size` trips starting at `offset`; empty when out of range.
    pub fn page(&self, offset: usize, size: usize) -> &[StoredTrip] {
        let start = offset.min(self.0.len());
        let end = start.saturating_add(size).min(self.0.len());
        &self.0[start..end]
    }
}

impl FromIterator<StoredTrip> for MatchSet {
    fn from_iter<I: IntoIterator<Item = StoredTrip>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}
