//! Out-of-band entry points used by other services: push a notification about a stored
//! trip request to its chat, and ask whether a chat has ever talked to the bot.

use std::sync::Arc;

use choguuket_core::{ChatId, DeliveryError, RequestId, StoreError};
use tracing::{info, warn};

use crate::render;
use crate::state::AppContext;

#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    #[error("trip request {0} does not exist")]
    NotFound(RequestId),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Delivery(#[from] DeliveryError),
}

/// What a notification did for the chat behind a trip request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotifyOutcome {
    /// The announcement and the first page of matches were sent.
    Delivered { matches: usize },
    /// The fresh search came back empty, so nothing was sent.
    NoMatches,
}

pub struct NotificationBridge {
    ctx: Arc<AppContext>,
}

impl NotificationBridge {
    pub fn new(ctx: Arc<AppContext>) -> Self {
        Self { ctx }
    }

    /// Tells the owner of `request_id` that new trips are available.
    ///
    /// The request is searched again instead of trusting whatever was cached, so the
    /// message reflects trips created since the original search. The fresh results
    /// replace the cache entry so the "more" button pages through the same set.
    /// An empty search sends nothing and reports [`NotifyOutcome::NoMatches`].
    pub async fn notify_user(&self, request_id: RequestId, message: Option<&str>) -> Result<NotifyOutcome, NotifyError> {
        let stored = self
            .ctx
            .store
            .find_trip_request(request_id)
            .await?
            .ok_or(NotifyError::NotFound(request_id))?;
        let chat_id = stored.request.chat_id;

        let matches = self.ctx.store.search_trips(&stored.request).await?;
        if matches.is_empty() {
            // The caller's trip is outside this request's route or window.
            warn!("Notification for request {} found no matching trips", request_id);
            return Ok(NotifyOutcome::NoMatches);
        }

        let announcement = message.unwrap_or(render::NEW_TRIP_FOUND);
        self.ctx.send_text(chat_id, &render::escape_markdown(announcement)).await?;
        self.ctx.remember_matches(request_id, &matches).await;
        self.ctx.send_match_page(chat_id, request_id, &matches, 0).await?;
        info!("Notified chat {} about {} trips for request {}", chat_id, matches.len(), request_id);
        Ok(NotifyOutcome::Delivered { matches: matches.len() })
    }

    pub async fn check_user_exists(&self, chat_id: ChatId) -> Result<bool, StoreError> {
        self.ctx.store.chat_exists(chat_id).await
    }
}
