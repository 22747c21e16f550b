use std::sync::Arc;
use std::time::Duration;

use choguuket_core::messaging::{Messenger, SendOptions};
use choguuket_core::repository::{SearchCache, TripStore};
use choguuket_core::{ChatId, DeliveryError, MatchSet, RequestId};
use choguuket_shared::Masked;
use choguuket_store::app_config::Config;
use tracing::{debug, warn};

use crate::bridge::NotificationBridge;
use crate::render::{self, MoreCallback, Renderer};

/// Tunables shared by the intake loop and the notification bridge.
#[derive(Debug, Clone)]
pub struct Settings {
    pub cache_ttl: Duration,
    pub page_size: usize,
    pub trip_summary_delay: Duration,
    pub search_delay: Duration,
    pub create_trip_webapp_url: String,
    pub search_trip_webapp_url: String,
    pub utc_offset_minutes: i32,
}

impl Settings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            cache_ttl: config.cache.ttl(),
            page_size: config.intake.page_size.max(1),
            trip_summary_delay: config.intake.trip_summary_delay(),
            search_delay: config.intake.search_delay(),
            create_trip_webapp_url: config.telegram.create_trip_webapp_url.clone(),
            search_trip_webapp_url: config.telegram.search_trip_webapp_url.clone(),
            utc_offset_minutes: config.intake.utc_offset_minutes,
        }
    }
}

/// Everything the pipeline talks to, built once at startup.
pub struct AppContext {
    pub store: Arc<dyn TripStore>,
    pub cache: Arc<dyn SearchCache>,
    pub messenger: Arc<dyn Messenger>,
    pub settings: Settings,
    pub renderer: Renderer,
}

impl AppContext {
    pub fn new(
        store: Arc<dyn TripStore>,
        cache: Arc<dyn SearchCache>,
        messenger: Arc<dyn Messenger>,
        settings: Settings,
    ) -> Self {
        let renderer = Renderer::new(settings.utc_offset_minutes);
        Self {
            store,
            cache,
            messenger,
            settings,
            renderer,
        }
    }

    pub async fn send_text(&self, chat_id: ChatId, text: &str) -> Result<(), DeliveryError> {
        self.messenger
            .send_message(chat_id, text, &SendOptions::markdown())
            .await
    }

    /// Stores `matches` for later paging. Failure only costs the pager, so it is logged.
    pub async fn remember_matches(&self, request_id: RequestId, matches: &MatchSet) {
        match self.cache.set(request_id, matches, self.settings.cache_ttl).await {
            Ok(()) => debug!("Cached {} matches for request {}", matches.len(), request_id),
            Err(e) => warn!("Failed to cache matches for request {}: {}", request_id, e),
        }
    }

    /// Sends the page of `matches` starting at `offset`, with a "more" button if anything
    /// is left after it.
    pub async fn send_match_page(
        &self,
        chat_id: ChatId,
        request_id: RequestId,
        matches: &MatchSet,
        offset: usize,
    ) -> Result<(), DeliveryError> {
        let page_size = self.settings.page_size;
        let text = self.renderer.match_page(matches, offset, page_size);
        let mut options = SendOptions::markdown();
        let next = offset.saturating_add(page_size);
        if next < matches.len() {
            let more = MoreCallback { request_id, offset: next };
            options = options.with_inline_button(render::MORE_BUTTON, more.encode());
        }
        self.messenger.send_message(chat_id, &text, &options).await
    }
}

/// Axum state for the notification endpoints.
#[derive(Clone)]
pub struct AppState {
    pub bridge: Arc<NotificationBridge>,
    pub auth_token: Option<Masked<String>>,
}
