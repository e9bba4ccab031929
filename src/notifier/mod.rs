
use std::{
    future::Future,
    sync::{
        Arc,
        atomic::{AtomicBool, AtomicU32, Ordering},
    },
    time::Duration,
};

use backoff::{Error as BackoffError, ExponentialBackoff, future::retry};
use teloxide::types::{ChatId, MessageId, Recipient};

use crate::{
    messaging::{
        MessagingError, MessagingService,
        format::{FormattedMessage, Style, format_record},
    },
    record::Record,
};

/// What to do after a failed send.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendVerdict {
    /// Wait this long, then try again.
    RetryAfter(Duration),
    /// Give up on this destination.
    Fatal,
}

/// Rate-limit responses are retried with the server-specified delay; every
/// other failure is final for the destination.
pub fn classify(error: &MessagingError) -> SendVerdict {
    match error {
        MessagingError::RateLimited(delay) => SendVerdict::RetryAfter(*delay),
        MessagingError::TeloxideRequest(_) => SendVerdict::Fatal,
    }
}

/// Runs `op` up to `max_attempts` times, retrying only when `classify` asks
/// for it.
pub async fn retry_send<T, F, Fut, C>(max_attempts: u32, classify: C, op: F) -> Result<T, MessagingError>
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<T, MessagingError>>,
    C: Fn(&MessagingError) -> SendVerdict,
{
    let attempts = AtomicU32::new(0);

    let operation = || async {
        let attempt = attempts.fetch_add(1, Ordering::SeqCst) + 1;

        op().await.map_err(|e| match classify(&e) {
            SendVerdict::RetryAfter(delay) if attempt < max_attempts => {
                tracing::warn!("Send attempt {attempt}/{max_attempts} rate limited, retrying in {delay:?}");
                BackoffError::retry_after(e, delay)
            }
            _ => BackoffError::permanent(e),
        })
    };

    // The server-specified delay always wins; the exponential policy only
    // matters if a verdict ever arrives without one.
    let policy = ExponentialBackoff { max_elapsed_time: None, ..Default::default() };

    retry(policy, operation).await
}

/// Outcome of delivering one record to a list of destinations.
#[derive(Debug, Default)]
pub struct DeliveryReport {
    /// Destinations that received the message.
    pub delivered: Vec<Recipient>,
    /// Destinations that did not, with the final error.
    pub failed: Vec<(Recipient, MessagingError)>,
}

impl DeliveryReport {
    /// True when at least one destination received the message.
    pub fn any_delivered(&self) -> bool {
        !self.delivered.is_empty()
    }
}

/// Formats records and delivers them with bounded retry.
pub struct Notifier {
    messaging_service: Arc<dyn MessagingService>,
    max_attempts: u32,
    // Pause after every send to stay under the transport rate limit.
    send_pause: Duration,
    pinnable: Option<Recipient>,
    pinned: AtomicBool,
}

impl Notifier {
    /// `max_attempts` counts the first try and is at least 1. `pinnable`
    /// gets its first delivered message pinned.
    pub fn new(
        messaging_service: Arc<dyn MessagingService>,
        max_attempts: u32,
        send_pause: Duration,
        pinnable: Option<Recipient>,
    ) -> Self {
        Self {
            messaging_service,
            max_attempts: max_attempts.max(1),
            send_pause,
            pinnable,
            pinned: AtomicBool::new(false),
        }
    }

    /// Sends `record` to every destination in order. A failing destination
    /// never stops delivery to the others.
    pub async fn deliver(
        &self,
        record: &Record,
        style: Style,
        destinations: &[Recipient],
    ) -> DeliveryReport {
        let message = format_record(record, style);
        let mut report = DeliveryReport::default();

        for recipient in destinations {
            match self.send_formatted(recipient, &message).await {
                Ok(message_id) => {
                    tracing::debug!("Delivered {} to {recipient:?}", record.id);
                    self.pin_if_first(recipient, message_id).await;
                    report.delivered.push(recipient.clone());
                }
                Err(e) => {
                    tracing::warn!("Failed to deliver {} to {recipient:?}: {e}", record.id);
                    report.failed.push((recipient.clone(), e));
                }
            }
            self.pause().await;
        }

        report
    }

    /// Sends a plain command reply.
    pub async fn reply(&self, chat_id: ChatId, text: &str) -> Result<(), MessagingError> {
        retry_send(self.max_attempts, classify, || {
            self.messaging_service.send_text(Recipient::Id(chat_id), text.to_string(), false, None)
        })
        .await
        .map(|_| ())
    }

    async fn send_formatted(
        &self,
        recipient: &Recipient,
        message: &FormattedMessage,
    ) -> Result<MessageId, MessagingError> {
        match &message.image {
            Some(image) => {
                retry_send(self.max_attempts, classify, || {
                    self.messaging_service.send_photo(
                        recipient.clone(),
                        image.clone(),
                        message.text.clone(),
                        message.keyboard.clone(),
                    )
                })
                .await
            }
            None => {
                retry_send(self.max_attempts, classify, || {
                    self.messaging_service.send_text(
                        recipient.clone(),
                        message.text.clone(),
                        message.link_preview,
                        message.keyboard.clone(),
                    )
                })
                .await
            }
        }
    }

    /// Pins the first message that reaches the pinnable destination.
    async fn pin_if_first(&self, recipient: &Recipient, message_id: MessageId) {
        if self.pinnable.as_ref() != Some(recipient) || self.pinned.swap(true, Ordering::SeqCst) {
            return;
        }

        if let Err(e) = self.messaging_service.pin_message(recipient.clone(), message_id).await {
            tracing::warn!("Failed to pin message in {recipient:?}: {e}");
        }
    }

    async fn pause(&self) {
        if !self.send_pause.is_zero() {
            tokio::time::sleep(self.send_pause).await;
        }
    }
}
