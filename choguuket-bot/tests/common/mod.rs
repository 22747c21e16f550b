#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use choguuket_bot::state::{AppContext, Settings};
use choguuket_core::messaging::{ChatRef, Messenger, SendOptions};
use choguuket_core::repository::TripStore;
use choguuket_core::{
    ChatId, DeliveryError, MatchSet, RequestId, StoreError, StoreResult, StoredTripRequest, Trip, TripId,
    TripRequest,
};
use choguuket_store::{MemorySearchCache, MemoryTripStore};
use parking_lot::Mutex;
use serde_json::json;

pub const CACHE_TTL: Duration = Duration::from_secs(60);

#[derive(Debug, Clone)]
pub struct Sent {
    pub chat_id: ChatId,
    pub text: String,
    pub options: SendOptions,
}

/// Messenger that records everything and can be switched into failing mode.
#[derive(Default)]
pub struct RecordingMessenger {
    sent: Mutex<Vec<Sent>>,
    answered: Mutex<Vec<String>>,
    failing: AtomicBool,
}

impl RecordingMessenger {
    pub fn sent(&self) -> Vec<Sent> {
        self.sent.lock().clone()
    }

    pub fn sent_to(&self, chat_id: ChatId) -> Vec<Sent> {
        self.sent().into_iter().filter(|m| m.chat_id == chat_id).collect()
    }

    pub fn answered(&self) -> Vec<String> {
        self.answered.lock().clone()
    }

    pub fn fail(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }
}

#[async_trait]
impl Messenger for RecordingMessenger {
    async fn send_message(&self, chat_id: ChatId, text: &str, options: &SendOptions) -> Result<(), DeliveryError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(DeliveryError::Rejected {
                code: 403,
                description: "Forbidden: bot was blocked by the user".into(),
            });
        }
        self.sent.lock().push(Sent {
            chat_id,
            text: text.to_owned(),
            options: options.clone(),
        });
        Ok(())
    }

    async fn answer_callback(&self, callback_id: &str, _text: Option<&str>) -> Result<(), DeliveryError> {
        self.answered.lock().push(callback_id.to_owned());
        Ok(())
    }
}

/// Store whose every operation fails, as if Postgres were unreachable.
pub struct BrokenStore;

fn unreachable_store<T>() -> StoreResult<T> {
    Err(StoreError::Backend("connection refused".into()))
}

#[async_trait]
impl TripStore for BrokenStore {
    async fn insert_trip(&self, _trip: &Trip, _username: Option<&str>) -> StoreResult<TripId> {
        unreachable_store()
    }

    async fn insert_trip_request(&self, _request: &TripRequest, _username: Option<&str>) -> StoreResult<RequestId> {
        unreachable_store()
    }

    async fn search_trips(&self, _request: &TripRequest) -> StoreResult<MatchSet> {
        unreachable_store()
    }

    async fn find_trip_request(&self, _id: RequestId) -> StoreResult<Option<StoredTripRequest>> {
        unreachable_store()
    }

    async fn register_chat(&self, _chat_id: ChatId, _username: Option<&str>) -> StoreResult<()> {
        unreachable_store()
    }

    async fn chat_exists(&self, _chat_id: ChatId) -> StoreResult<bool> {
        unreachable_store()
    }
}

pub fn settings() -> Settings {
    Settings {
        cache_ttl: CACHE_TTL,
        page_size: 2,
        trip_summary_delay: Duration::ZERO,
        search_delay: Duration::ZERO,
        create_trip_webapp_url: "https://example.org/create".into(),
        search_trip_webapp_url: "https://example.org/search".into(),
        utc_offset_minutes: 360,
    }
}

pub struct Harness {
    pub ctx: Arc<AppContext>,
    pub store: Arc<MemoryTripStore>,
    pub cache: Arc<MemorySearchCache>,
    pub messenger: Arc<RecordingMessenger>,
}

pub fn harness() -> Harness {
    let store = Arc::new(MemoryTripStore::new(chrono::Duration::hours(2)));
    let cache = Arc::new(MemorySearchCache::new(100));
    let messenger = Arc::new(RecordingMessenger::default());
    let ctx = Arc::new(AppContext::new(store.clone(), cache.clone(), messenger.clone(), settings()));
    Harness {
        ctx,
        store,
        cache,
        messenger,
    }
}

pub fn broken_harness() -> (Arc<AppContext>, Arc<RecordingMessenger>) {
    let messenger = Arc::new(RecordingMessenger::default());
    let ctx = Arc::new(AppContext::new(
        Arc::new(BrokenStore),
        Arc::new(MemorySearchCache::new(10)),
        messenger.clone(),
        settings(),
    ));
    (ctx, messenger)
}

pub fn chat(id: i64) -> ChatRef {
    ChatRef {
        id: ChatId(id),
        username: Some(format!("user{}", id)),
    }
}

/// A departure time comfortably inside the accepted window, on a whole minute.
pub fn tomorrow_at(hour: u32) -> DateTime<Utc> {
    let day = (Utc::now() + chrono::Duration::days(1)).date_naive();
    day.and_hms_opt(hour, 0, 0)
        .map(|naive| naive.and_utc())
        .unwrap()
}

pub fn trip_json(chat_id: i64, origin: &str, destination: &str, departure: DateTime<Utc>, seats: u32) -> String {
    json!({
        "origin": origin,
        "destination": destination,
        "departureTime": departure.to_rfc3339(),
        "seats": seats,
        "chatId": chat_id,
    })
    .to_string()
}

pub fn request_json(chat_id: i64, origin: &str, destination: &str, desired: DateTime<Utc>) -> String {
    json!({
        "origin": origin,
        "destination": destination,
        "desiredTime": desired.to_rfc3339(),
        "chatId": chat_id,
    })
    .to_string()
}
