use async_trait::async_trait;

use crate::model::ChatId;
use crate::DeliveryError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatRef {
    pub id: ChatId,
    pub username: Option<String>,
}

/// Inbound chat activity, already reduced to what the bot reacts to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatEvent {
    /// JSON submitted by a web-app form through the chat.
    WebAppData { chat: ChatRef, data: String },
    /// A `/command args` text message.
    Command { chat: ChatRef, command: String, args: String },
    /// An inline keyboard button press.
    Callback { id: String, chat: ChatRef, data: String },
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseMode {
    Markdown,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InlineButton {
    pub text: String,
    pub callback_data: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WebAppButton {
    pub text: String,
    pub url: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SendOptions {
    pub parse_mode: Option<ParseMode>,
    pub inline_keyboard: Vec<Vec<InlineButton>>,
    pub web_app_keyboard: Vec<WebAppButton>,
}

impl SendOptions {
    pub fn markdown() -> Self {
        Self {
            parse_mode: Some(ParseMode::Markdown),
            ..Self::default()
        }
    }

    pub fn with_inline_button(mut self, text: impl Into<String>, callback_data: impl Into<String>) -> Self {
        self.inline_keyboard.push(vec![InlineButton {
            text: text.into(),
            callback_data: callback_data.into(),
        }]);
        self
    }

    pub fn with_web_app_button(mut self, text: impl Into<String>, url: impl Into<String>) -> Self {
        self.web_app_keyboard.push(WebAppButton {
            text: text.into(),
            url: url.into(),
        });
        self
    }
}

/// Outbound side of the chat transport.
#[async_trait]
pub trait Messenger: Send + Sync {
    async fn send_message(&self, chat_id: ChatId, text: &str, options: &SendOptions) -> Result<(), DeliveryError>;

    async fn answer_callback(&self, callback_id: &str, text: Option<&str>) -> Result<(), DeliveryError>;
}

/// Inbound side of the chat transport. Each call blocks until at least one event is
/// available or the transport's poll timeout elapses (then returns an empty batch).
#[async_trait]
pub trait UpdateSource: Send {
    async fn next_batch(&mut self) -> Result<Vec<ChatEvent>, DeliveryError>;

    /// Acknowledges everything returned so far so it is not redelivered after a restart.
    async fn confirm(&mut self) -> Result<(), DeliveryError> {
        Ok(())
    }
}
