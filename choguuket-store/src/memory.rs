//! In-process [`TripStore`] for local development and tests.
//!
//! One mutex guards the whole state, so every operation is trivially atomic. Matching mirrors
//! the Postgres query in `trip_repo`: routes compare by [`route_key`], departure falls within
//! the window, results are ordered by departure then id.

use async_trait::async_trait;
use choguuket_core::repository::TripStore;
use choguuket_core::{
    route_key, ChatId, MatchSet, RequestId, StoreResult, StoredTrip, StoredTripRequest, Trip, TripId, TripRequest,
};
use parking_lot::Mutex;
use std::collections::{BTreeMap, HashMap};

#[derive(Default)]
struct State {
    chats: HashMap<ChatId, Option<String>>,
    trips: Vec<StoredTrip>,
    requests: BTreeMap<RequestId, TripRequest>,
    last_trip_id: i64,
    last_request_id: i64,
}

impl State {
    fn touch_chat(&mut self, chat_id: ChatId, username: Option<&str>) {
        let entry = self.chats.entry(chat_id).or_insert(None);
        if let Some(name) = username {
            *entry = Some(name.to_owned());
        }
    }
}

pub struct MemoryTripStore {
    state: Mutex<State>,
    search_window: chrono::Duration,
}

impl MemoryTripStore {
    pub fn new(search_window: chrono::Duration) -> Self {
        Self {
            state: Mutex::new(State::default()),
            search_window,
        }
    }

    pub fn trip_count(&self) -> usize {
        self.state.lock().trips.len()
    }

    pub fn request_count(&self) -> usize {
        self.state.lock().requests.len()
    }

    /// Username on record for a known chat.
    pub fn username(&self, chat_id: ChatId) -> Option<String> {
        self.state.lock().chats.get(&chat_id).cloned().flatten()
    }
}

fn trimmed(location: &str) -> String {
    location.trim().to_owned()
}

pub fn route_matches(trip: &Trip, request: &TripRequest, window: chrono::Duration) -> bool {
    route_key(&trip.origin) == route_key(&request.origin)
        && route_key(&trip.destination) == route_key(&request.destination)
        && trip.departure_time >= request.desired_time - window
        && trip.departure_time <= request.desired_time + window
}

#[async_trait]
impl TripStore for MemoryTripStore {
    async fn insert_trip(&self, trip: &Trip, username: Option<&str>) -> StoreResult<TripId> {
        let mut state = self.state.lock();
        state.touch_chat(trip.chat_id, username);
        state.last_trip_id += 1;
        let id = TripId(state.last_trip_id);
        state.trips.push(StoredTrip {
            id,
            trip: Trip {
                origin: trimmed(&trip.origin),
                destination: trimmed(&trip.destination),
                ..trip.clone()
            },
        });
        Ok(id)
    }

    async fn insert_trip_request(&self, request: &TripRequest, username: Option<&str>) -> StoreResult<RequestId> {
        let mut state = self.state.lock();
        state.touch_chat(request.chat_id, username);
        state.last_request_id += 1;
        let id = RequestId(state.last_request_id);
        state.requests.insert(
            id,
            TripRequest {
                origin: trimmed(&request.origin),
                destination: trimmed(&request.destination),
                ..request.clone()
            },
        );
        Ok(id)
    }

    async fn search_trips(&self, request: &TripRequest) -> StoreResult<MatchSet> {
        let state = self.state.lock();
        let mut found: Vec<StoredTrip> = state
            .trips
            .iter()
            .filter(|stored| route_matches(&stored.trip, request, self.search_window))
            .cloned()
            .collect();
        found.sort_by_key(|stored| (stored.trip.departure_time, stored.id));
        Ok(MatchSet::new(found))
    }

    async fn find_trip_request(&self, id: RequestId) -> StoreResult<Option<StoredTripRequest>> {
        let state = self.state.lock();
        Ok(state
            .requests
            .get(&id)
            .map(|request| StoredTripRequest { id, request: request.clone() }))
    }

    async fn register_chat(&self, chat_id: ChatId, username: Option<&str>) -> StoreResult<()> {
        self.state.lock().touch_chat(chat_id, username);
        Ok(())
    }

    async fn chat_exists(&self, chat_id: ChatId) -> StoreResult<bool> {
        Ok(self.state.lock().chats.contains_key(&chat_id))
    }
}
