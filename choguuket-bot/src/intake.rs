use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use choguuket_core::messaging::{ChatEvent, ChatRef, SendOptions};
use choguuket_core::{Payload, Trip, TripRequest};
use tracing::{debug, info, warn};

use crate::render::{self, MoreCallback};
use crate::state::AppContext;

/// Handles one chat event end to end. The first failing step ends the conversation for
/// that event; nothing is retried.
#[derive(Clone)]
pub struct Intake {
    ctx: Arc<AppContext>,
}

impl Intake {
    pub fn new(ctx: Arc<AppContext>) -> Self {
        Self { ctx }
    }

    pub async fn handle(&self, event: ChatEvent) -> anyhow::Result<()> {
        match event {
            ChatEvent::WebAppData { chat, data } => self.handle_web_app_data(chat, &data).await,
            ChatEvent::Command { chat, command, .. } if command == "start" => self.handle_start(chat).await,
            ChatEvent::Command { chat, command, .. } => {
                debug!("Ignoring command /{} from chat {}", command, chat.id);
                Ok(())
            }
            ChatEvent::Callback { id, chat, data } => self.handle_callback(&id, chat, &data).await,
            ChatEvent::Other => Ok(()),
        }
    }

    async fn handle_start(&self, chat: ChatRef) -> anyhow::Result<()> {
        self.ctx
            .store
            .register_chat(chat.id, chat.username.as_deref())
            .await
            .with_context(|| format!("registering chat {}", chat.id))?;

        let settings = &self.ctx.settings;
        let keyboard = SendOptions::default()
            .with_web_app_button(render::CREATE_TRIP_BUTTON, settings.create_trip_webapp_url.as_str())
            .with_web_app_button(render::SEARCH_TRIP_BUTTON, settings.search_trip_webapp_url.as_str());
        self.ctx
            .messenger
            .send_message(chat.id, render::GREETING, &keyboard)
            .await
            .context("sending greeting")?;
        info!("Chat {} started the bot", chat.id);
        Ok(())
    }

    async fn handle_web_app_data(&self, chat: ChatRef, data: &str) -> anyhow::Result<()> {
        match Payload::decode(data) {
            Payload::Trip(trip) => self.handle_trip(chat, trip).await,
            Payload::TripRequest(request) => self.handle_trip_request(chat, request).await,
            Payload::Unrecognized { trip, request } => {
                warn!(chat_id = %chat.id, trip_error = %trip, request_error = %request, "Unrecognized web app payload");
                Ok(())
            }
        }
    }

    async fn handle_trip(&self, chat: ChatRef, mut trip: Trip) -> anyhow::Result<()> {
        if trip.chat_id != chat.id {
            warn!("Trip payload names chat {} but came from chat {}", trip.chat_id, chat.id);
            trip.chat_id = chat.id;
        }

        let trip_id = self
            .ctx
            .store
            .insert_trip(&trip, chat.username.as_deref())
            .await
            .context("storing trip")?;
        info!("Stored trip {} for chat {}", trip_id, chat.id);

        self.ctx.send_text(chat.id, render::TRIP_CREATED).await.context("acknowledging trip")?;
        pause(self.ctx.settings.trip_summary_delay).await;
        let summary = self.ctx.renderer.trip(&trip);
        self.ctx.send_text(chat.id, &summary).await.context("sending trip summary")?;
        Ok(())
    }

    async fn handle_trip_request(&self, chat: ChatRef, mut request: TripRequest) -> anyhow::Result<()> {
        if request.chat_id != chat.id {
            warn!("Trip request payload names chat {} but came from chat {}", request.chat_id, chat.id);
            request.chat_id = chat.id;
        }

        let request_id = self
            .ctx
            .store
            .insert_trip_request(&request, chat.username.as_deref())
            .await
            .context("storing trip request")?;
        info!("Stored trip request {} for chat {}", request_id, chat.id);

        let searching = self.ctx.renderer.searching(&request);
        self.ctx.send_text(chat.id, &searching).await.context("acknowledging trip request")?;
        pause(self.ctx.settings.search_delay).await;

        let matches = self
            .ctx
            .store
            .search_trips(&request)
            .await
            .with_context(|| format!("searching trips for request {}", request_id))?;
        if matches.is_empty() {
            debug!("No trips yet for request {}", request_id);
            self.ctx.send_text(chat.id, render::NO_TRIPS_YET).await.context("sending empty result")?;
            return Ok(());
        }

        self.ctx.remember_matches(request_id, &matches).await;
        self.ctx
            .send_match_page(chat.id, request_id, &matches, 0)
            .await
            .context("sending search results")?;
        Ok(())
    }

    async fn handle_callback(&self, callback_id: &str, chat: ChatRef, data: &str) -> anyhow::Result<()> {
        // Stops the button's loading spinner; the page itself is a separate message.
        if let Err(e) = self.ctx.messenger.answer_callback(callback_id, None).await {
            warn!("Failed to answer callback {}: {}", callback_id, e);
        }

        let Some(more) = MoreCallback::parse(data) else {
            debug!("Ignoring callback data {:?} from chat {}", data, chat.id);
            return Ok(());
        };

        let cached = match self.ctx.cache.get(more.request_id).await {
            Ok(cached) => cached,
            Err(e) => {
                warn!("Cache lookup for request {} failed: {}", more.request_id, e);
                None
            }
        };
        match cached {
            Some(matches) if more.offset < matches.len() => self
                .ctx
                .send_match_page(chat.id, more.request_id, &matches, more.offset)
                .await
                .context("sending next results page"),
            _ => self
                .ctx
                .send_text(chat.id, render::RESULTS_EXPIRED)
                .await
                .context("sending expiry notice"),
        }
    }
}

async fn pause(delay: Duration) {
    if !delay.is_zero() {
        tokio::time::sleep(delay).await;
    }
}
