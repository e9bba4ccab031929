/// Pure rendering of records into messages.
pub mod format;
/// Inline keyboards attached to announcements.
pub mod keyboards;

use std::time::Duration;

use async_trait::async_trait;
use mockall::automock;
use teloxide::{
    RequestError,
    prelude::*,
    types::{InlineKeyboardMarkup, InputFile, LinkPreviewOptions, MessageId, ParseMode, Recipient},
};
use thiserror::Error;
use url::Url;

/// Errors from the chat transport.
#[derive(Debug, Error)]
pub enum MessagingError {
    /// Telegram asked to wait this long before retrying.
    #[error("Rate limited by Telegram, retry after {0:?}")]
    RateLimited(Duration),
    /// Any other request failure.
    #[error("Teloxide API request failed: {0}")]
    TeloxideRequest(RequestError),
}

impl From<RequestError> for MessagingError {
    fn from(e: RequestError) -> Self {
        match e {
            RequestError::RetryAfter(seconds) => MessagingError::RateLimited(seconds.duration()),
            other => MessagingError::TeloxideRequest(other),
        }
    }
}

type Result<T> = std::result::Result<T, MessagingError>;

/// Low-level delivery primitives of the chat transport.
#[automock]
#[async_trait]
pub trait MessagingService: Send + Sync {
    /// Sends an HTML text message, optionally with an inline keyboard.
    async fn send_text(
        &self,
        recipient: Recipient,
        text: String,
        link_preview: bool,
        keyboard: Option<InlineKeyboardMarkup>,
    ) -> Result<MessageId>;

    /// Sends a photo by URL with an HTML caption.
    async fn send_photo(
        &self,
        recipient: Recipient,
        photo: Url,
        caption: String,
        keyboard: Option<InlineKeyboardMarkup>,
    ) -> Result<MessageId>;

    /// Pins a message that was previously sent to the recipient.
    async fn pin_message(&self, recipient: Recipient, message_id: MessageId) -> Result<()>;
}

/// Telegram messaging service.
pub struct TelegramMessagingService {
    bot: Bot,
}

impl TelegramMessagingService {
    /// Wraps a bot handle.
    pub fn new(bot: Bot) -> Self {
        Self { bot }
    }
}

#[async_trait]
impl MessagingService for TelegramMessagingService {
    async fn send_text(
        &self,
        recipient: Recipient,
        text: String,
        link_preview: bool,
        keyboard: Option<InlineKeyboardMarkup>,
    ) -> Result<MessageId> {
        let preview = LinkPreviewOptions {
            is_disabled: !link_preview,
            url: None,
            prefer_small_media: false,
            prefer_large_media: false,
            show_above_text: false,
        };

        let mut request = self
            .bot
            .send_message(recipient, text)
            .parse_mode(ParseMode::Html)
            .link_preview_options(preview);
        if let Some(keyboard) = keyboard {
            request = request.reply_markup(keyboard);
        }

        request.await.map(|msg| msg.id).map_err(MessagingError::from)
    }

    async fn send_photo(
        &self,
        recipient: Recipient,
        photo: Url,
        caption: String,
        keyboard: Option<InlineKeyboardMarkup>,
    ) -> Result<MessageId> {
        let mut request = self
            .bot
            .send_photo(recipient, InputFile::url(photo))
            .caption(caption)
            .parse_mode(ParseMode::Html);
        if let Some(keyboard) = keyboard {
            request = request.reply_markup(keyboard);
        }

        request.await.map(|msg| msg.id).map_err(MessagingError::from)
    }

    async fn pin_message(&self, recipient: Recipient, message_id: MessageId) -> Result<()> {
        self.bot
            .pin_chat_message(recipient, message_id)
            .await
            .map(|_| ())
            .map_err(MessagingError::from)
    }
}

/// Parses a destination from configuration: numeric chat ids or `@channel`
/// usernames.
pub fn parse_recipient(raw: &str) -> Option<Recipient> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    match raw.parse::<i64>() {
        Ok(id) => Some(Recipient::Id(ChatId(id))),
        Err(_) if raw.starts_with('@') => Some(Recipient::ChannelUsername(raw.to_string())),
        Err(_) => None,
    }
}

#[cfg(test)]
mod tests {
    use teloxide::{ApiError, types::Seconds};

    use super::*;

    #[test]
    fn test_retry_after_maps_to_rate_limited() {
        let err = MessagingError::from(RequestError::RetryAfter(Seconds::from_seconds(7)));
        assert!(matches!(err, MessagingError::RateLimited(d) if d == Duration::from_secs(7)));
    }

    #[test]
    fn test_api_error_maps_to_request_error() {
        let err = MessagingError::from(RequestError::Api(ApiError::BotBlocked));
        assert!(matches!(err, MessagingError::TeloxideRequest(_)));
    }

    #[test]
    fn test_parse_recipient() {
        assert_eq!(parse_recipient("521798593"), Some(Recipient::Id(ChatId(521798593))));
        assert_eq!(parse_recipient(" -100123 "), Some(Recipient::Id(ChatId(-100123))));
        assert_eq!(
            parse_recipient("@anime_channel"),
            Some(Recipient::ChannelUsername("@anime_channel".to_string()))
        );
        assert_eq!(parse_recipient("your-chat-id"), None);
        assert_eq!(parse_recipient(""), None);
    }
}
