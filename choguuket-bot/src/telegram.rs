//! Telegram Bot API transport: `sendMessage`/`answerCallbackQuery` for [`Messenger`] and
//! `getUpdates` long polling for [`UpdateSource`].

use std::time::Duration;

use async_trait::async_trait;
use choguuket_core::messaging::{ChatEvent, ChatRef, Messenger, ParseMode, SendOptions, UpdateSource};
use choguuket_core::{ChatId, DeliveryError};
use choguuket_store::app_config::TelegramConfig;
use serde::de::{DeserializeOwned, IgnoredAny};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{debug, info};

const ALLOWED_UPDATES: [&str; 2] = ["message", "callback_query"];

#[derive(Debug, Deserialize)]
struct ApiResponse<T> {
    ok: bool,
    result: Option<T>,
    error_code: Option<i64>,
    description: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct Update {
    pub update_id: i64,
    pub message: Option<Message>,
    pub callback_query: Option<CallbackQuery>,
}

#[derive(Debug, Deserialize)]
pub struct Message {
    pub chat: Chat,
    pub text: Option<String>,
    pub web_app_data: Option<WebAppData>,
}

#[derive(Debug, Deserialize)]
pub struct Chat {
    pub id: i64,
    pub username: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct WebAppData {
    pub data: String,
}

#[derive(Debug, Deserialize)]
pub struct CallbackQuery {
    pub id: String,
    pub message: Option<Message>,
    pub data: Option<String>,
}

#[derive(Debug, Serialize)]
struct GetUpdates {
    #[serde(skip_serializing_if = "Option::is_none")]
    offset: Option<i64>,
    timeout: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    limit: Option<u32>,
    allowed_updates: [&'static str; 2],
}

impl Chat {
    fn to_ref(&self) -> ChatRef {
        ChatRef {
            id: ChatId(self.id),
            username: self.username.clone(),
        }
    }
}

/// Reduces a raw update to the events the bot reacts to.
pub fn into_event(update: Update) -> ChatEvent {
    if let Some(query) = update.callback_query {
        return match (query.message, query.data) {
            (Some(message), Some(data)) => ChatEvent::Callback {
                id: query.id,
                chat: message.chat.to_ref(),
                data,
            },
            _ => ChatEvent::Other,
        };
    }

    let Some(message) = update.message else {
        return ChatEvent::Other;
    };
    let chat = message.chat.to_ref();
    if let Some(web_app) = message.web_app_data {
        return ChatEvent::WebAppData { chat, data: web_app.data };
    }
    match message.text.as_deref().and_then(|text| text.strip_prefix('/')) {
        Some(command_line) => {
            let (head, args) = command_line.split_once(char::is_whitespace).unwrap_or((command_line, ""));
            // "/start@SomeBot" in group chats
            let command = head.split('@').next().unwrap_or(head);
            ChatEvent::Command {
                chat,
                command: command.to_string(),
                args: args.trim().to_string(),
            }
        }
        None => ChatEvent::Other,
    }
}

fn transport(err: reqwest::Error) -> DeliveryError {
    if err.is_timeout() {
        DeliveryError::Timeout
    } else {
        DeliveryError::Transport(err.to_string())
    }
}

fn reply_markup(options: &SendOptions) -> Option<Value> {
    if !options.inline_keyboard.is_empty() {
        let rows: Vec<Value> = options
            .inline_keyboard
            .iter()
            .map(|row| {
                row.iter()
                    .map(|b| json!({ "text": b.text, "callback_data": b.callback_data }))
                    .collect()
            })
            .collect();
        return Some(json!({ "inline_keyboard": rows }));
    }
    if !options.web_app_keyboard.is_empty() {
        let rows: Vec<Value> = options
            .web_app_keyboard
            .iter()
            .map(|b| json!([{ "text": b.text, "web_app": { "url": b.url } }]))
            .collect();
        return Some(json!({ "keyboard": rows, "resize_keyboard": true }));
    }
    None
}

#[derive(Debug, Clone)]
pub struct TelegramClient {
    http: reqwest::Client,
    base_url: String,
    request_timeout: Duration,
}

impl TelegramClient {
    pub fn new(api_url: &str, token: &str, request_timeout: Duration) -> Result<Self, DeliveryError> {
        let http = reqwest::Client::builder()
            .connect_timeout(request_timeout)
            .build()
            .map_err(transport)?;
        Ok(Self {
            http,
            base_url: format!("{}/bot{}", api_url.trim_end_matches('/'), token),
            request_timeout,
        })
    }

    pub fn from_config(config: &TelegramConfig) -> Result<Self, DeliveryError> {
        Self::new(&config.api_url, config.token.expose(), config.request_timeout())
    }

    async fn call<P, R>(&self, method: &str, params: &P, timeout: Duration) -> Result<R, DeliveryError>
    where
        P: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let response = self
            .http
            .post(format!("{}/{}", self.base_url, method))
            .timeout(timeout)
            .json(params)
            .send()
            .await
            .map_err(transport)?;
        let status = response.status();
        // Error replies carry the same envelope with a 4xx/5xx status.
        let body: ApiResponse<R> = response.json().await.map_err(transport)?;
        if !body.ok {
            return Err(DeliveryError::Rejected {
                code: body.error_code.unwrap_or_else(|| i64::from(status.as_u16())),
                description: body.description.unwrap_or_default(),
            });
        }
        body.result
            .ok_or_else(|| DeliveryError::Transport(format!("{} returned no result", method)))
    }

    /// One `getUpdates` call. `poll_timeout` is how long Telegram may hold the request open.
    pub async fn get_updates(
        &self,
        offset: Option<i64>,
        poll_timeout: Duration,
        limit: Option<u32>,
    ) -> Result<Vec<Update>, DeliveryError> {
        let params = GetUpdates {
            offset,
            timeout: poll_timeout.as_secs(),
            limit,
            allowed_updates: ALLOWED_UPDATES,
        };
        self.call("getUpdates", &params, self.request_timeout + poll_timeout).await
    }
}

#[async_trait]
impl Messenger for TelegramClient {
    async fn send_message(&self, chat_id: ChatId, text: &str, options: &SendOptions) -> Result<(), DeliveryError> {
        let mut params = json!({ "chat_id": chat_id.0, "text": text });
        if let Some(ParseMode::Markdown) = options.parse_mode {
            params["parse_mode"] = json!("Markdown");
        }
        if let Some(markup) = reply_markup(options) {
            params["reply_markup"] = markup;
        }
        let _: IgnoredAny = self.call("sendMessage", &params, self.request_timeout).await?;
        debug!("Sent message to chat {}", chat_id);
        Ok(())
    }

    async fn answer_callback(&self, callback_id: &str, text: Option<&str>) -> Result<(), DeliveryError> {
        let mut params = json!({ "callback_query_id": callback_id });
        if let Some(text) = text {
            params["text"] = json!(text);
        }
        let _: bool = self.call("answerCallbackQuery", &params, self.request_timeout).await?;
        Ok(())
    }
}

/// `getUpdates` consumer that tracks the next offset itself.
pub struct LongPoll {
    client: TelegramClient,
    poll_timeout: Duration,
    offset: Option<i64>,
}

impl LongPoll {
    pub fn new(client: TelegramClient, poll_timeout: Duration) -> Self {
        Self {
            client,
            poll_timeout,
            offset: None,
        }
    }

    pub fn offset(&self) -> Option<i64> {
        self.offset
    }
}

#[async_trait]
impl UpdateSource for LongPoll {
    async fn next_batch(&mut self) -> Result<Vec<ChatEvent>, DeliveryError> {
        let updates = self.client.get_updates(self.offset, self.poll_timeout, None).await?;
        if let Some(last) = updates.iter().map(|u| u.update_id).max() {
            self.offset = Some(last + 1);
        }
        Ok(updates
            .into_iter()
            .map(into_event)
            .filter(|event| !matches!(event, ChatEvent::Other))
            .collect())
    }

    async fn confirm(&mut self) -> Result<(), DeliveryError> {
        // Telegram only forgets updates once a later call passes their offset.
        if let Some(offset) = self.offset {
            let _ = self.client.get_updates(Some(offset), Duration::ZERO, Some(1)).await?;
            info!("Confirmed updates up to offset {}", offset);
        }
        Ok(())
    }
}
