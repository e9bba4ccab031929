//! Inbound webhook mode. Telegram posts every update to `POST /webhook`.

use std::{net::SocketAddr, sync::Arc};

use axum::{
    Json, Router,
    body::Bytes,
    extract::State,
    http::HeaderMap,
    routing::{get, post},
};
use serde_json::{Value, json};
use teloxide::{
    types::{Update, UpdateKind},
    utils::command::BotCommands,
};
use thiserror::Error;

use crate::bot_handler::{BotHandler, BotHandlerError, Command};

/// Header Telegram sets to the secret registered with `setWebhook`.
pub const SECRET_HEADER: &str = "x-telegram-bot-api-secret-token";

/// Errors from handling one webhook update.
#[derive(Debug, Error)]
pub enum WebhookError {
    /// The body is not a valid update.
    #[error("Invalid update payload: {0}")]
    Payload(#[from] serde_json::Error),
    /// The command ran but failed.
    #[error("Command failed: {0}")]
    Handler(#[from] BotHandlerError),
}

/// Shared state of the webhook routes.
pub struct WebhookState {
    /// Runs the commands carried by updates.
    pub handler: Arc<BotHandler>,
    /// Needed to accept `/cmd@username` in group chats.
    pub bot_username: String,
    /// Updates without this secret token are dropped.
    pub secret: String,
}

fn authorized(headers: &HeaderMap, secret: &str) -> bool {
    headers
        .get(SECRET_HEADER)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|token| token == secret)
}

/// Parses one update and runs the command it carries, if any.
/// Returns whether a command was handled.
pub async fn process_update(state: &WebhookState, body: &[u8]) -> Result<bool, WebhookError> {
    let update: Update = serde_json::from_slice(body)?;

    let UpdateKind::Message(msg) = update.kind else {
        tracing::debug!("Ignoring non-message update {}", update.id.0);
        return Ok(false);
    };
    let Some(text) = msg.text() else {
        return Ok(false);
    };
    let Ok(cmd) = Command::parse(text, &state.bot_username) else {
        tracing::debug!("Ignoring non-command message in chat {}", msg.chat.id);
        return Ok(false);
    };

    state.handler.handle_commands(msg.chat.id, cmd).await?;
    Ok(true)
}

/// Always acknowledges so Telegram does not redeliver; failures are only logged.
async fn receive_update(
    State(state): State<Arc<WebhookState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Json<Value> {
    if !authorized(&headers, &state.secret) {
        tracing::warn!("Dropping webhook update with a missing or wrong secret token");
        return Json(json!({ "ok": true }));
    }

    if let Err(e) = process_update(&state, &body).await {
        tracing::error!("Webhook update failed: {e}");
    }
    Json(json!({ "ok": true }))
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

/// Routes `POST /webhook` and `GET /health`.
pub fn router(state: Arc<WebhookState>) -> Router {
    Router::new()
        .route("/webhook", post(receive_update))
        .route("/health", get(health))
        .with_state(state)
}

/// Serves the webhook until ctrl-c.
pub async fn serve(addr: SocketAddr, state: Arc<WebhookState>) -> std::io::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("Webhook listening on {addr}");

    axum::serve(listener, router(state))
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!("Failed to listen for ctrl-c: {e}");
            }
        })
        .await
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use mockall::predicate::*;
    use teloxide::types::{ChatId, MessageId, Recipient};

    use super::*;
    use crate::{
        context::AppContext,
        fetcher::{FetchWindow, KeywordFilter, MockFetcher},
        messaging::{MockMessagingService, format::Style},
        notifier::Notifier,
        poller::{Feed, Poller},
        storage::MockSeenStore,
        subscribers::Subscribers,
    };

    fn state(messaging: MockMessagingService) -> WebhookState {
        state_with(messaging, Arc::new(Subscribers::new()))
    }

    fn state_with(messaging: MockMessagingService, subscribers: Arc<Subscribers>) -> WebhookState {
        let notifier = Arc::new(Notifier::new(Arc::new(messaging), 3, Duration::ZERO, None));
        let poller = Arc::new(Poller::new(
            Arc::new(MockSeenStore::new()),
            notifier,
            subscribers.clone(),
            Vec::new(),
        ));
        let feed = |name| {
            Arc::new(Feed::new(name, Arc::new(MockFetcher::new()), Style::News, KeywordFilter::allow_all()))
        };
        let app = Arc::new(AppContext {
            poller,
            subscribers,
            news: feed("news"),
            releases: feed("releases"),
            scores: None,
            live_filter: KeywordFilter::allow_all(),
            early_window: FetchWindow::Ahead(3),
        });

        WebhookState {
            handler: Arc::new(BotHandler::new(app)),
            bot_username: "newswire_bot".to_string(),
            secret: SECRET.to_string(),
        }
    }

    const SECRET: &str = "s3cret_token";

    fn message_update(text: &str) -> Vec<u8> {
        message_update_from(123, text)
    }

    fn message_update_from(chat_id: i64, text: &str) -> Vec<u8> {
        json!({
            "update_id": 1,
            "message": {
                "message_id": 10,
                "date": 1735689600,
                "chat": { "id": chat_id, "type": "group", "title": "Test" },
                "from": { "id": 123, "is_bot": false, "first_name": "Test" },
                "text": text
            }
        })
        .to_string()
        .into_bytes()
    }

    fn headers_with_secret(secret: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(SECRET_HEADER, secret.parse().unwrap());
        headers
    }

    #[tokio::test]
    async fn test_help_command_is_handled() {
        let mut messaging = MockMessagingService::new();
        messaging
            .expect_send_text()
            .with(eq(Recipient::Id(ChatId(123))), always(), eq(false), always())
            .times(1)
            .returning(|_, _, _, _| Ok(MessageId(1)));

        let handled = process_update(&state(messaging), &message_update("/help")).await.unwrap();
        assert!(handled);
    }

    #[tokio::test]
    async fn test_addressed_command_is_handled() {
        let mut messaging = MockMessagingService::new();
        messaging.expect_send_text().times(1).returning(|_, _, _, _| Ok(MessageId(1)));

        let handled =
            process_update(&state(messaging), &message_update("/help@newswire_bot")).await.unwrap();
        assert!(handled);
    }

    #[tokio::test]
    async fn test_plain_text_is_ignored() {
        let mut messaging = MockMessagingService::new();
        messaging.expect_send_text().times(0);

        let handled = process_update(&state(messaging), &message_update("hello")).await.unwrap();
        assert!(!handled);
    }

    #[tokio::test]
    async fn test_invalid_payload_is_an_error() {
        let result = process_update(&state(MockMessagingService::new()), b"not json").await;
        assert!(matches!(result, Err(WebhookError::Payload(_))));
    }

    #[tokio::test]
    async fn test_receive_update_always_acks() {
        let state = Arc::new(state(MockMessagingService::new()));
        let Json(reply) =
            receive_update(State(state), headers_with_secret(SECRET), Bytes::from_static(b"{")).await;
        assert_eq!(reply, json!({ "ok": true }));
    }

    #[tokio::test]
    async fn test_update_without_secret_is_dropped() {
        let mut messaging = MockMessagingService::new();
        messaging.expect_send_text().times(0);
        let subscribers = Arc::new(Subscribers::new());
        let state = Arc::new(state_with(messaging, subscribers.clone()));
        let body = Bytes::from(message_update_from(-1009999, "/subscribe"));

        let Json(reply) = receive_update(State(state.clone()), HeaderMap::new(), body.clone()).await;
        assert_eq!(reply, json!({ "ok": true }));

        let Json(reply) = receive_update(State(state.clone()), headers_with_secret("guess"), body).await;
        assert_eq!(reply, json!({ "ok": true }));

        assert!(subscribers.list().await.is_empty());
    }

    #[tokio::test]
    async fn test_update_with_secret_is_handled() {
        let mut messaging = MockMessagingService::new();
        messaging
            .expect_send_text()
            .with(eq(Recipient::Id(ChatId(-1009999))), always(), eq(false), always())
            .times(1)
            .returning(|_, _, _, _| Ok(MessageId(1)));
        let subscribers = Arc::new(Subscribers::new());
        let state = Arc::new(state_with(messaging, subscribers.clone()));
        let body = Bytes::from(message_update_from(-1009999, "/subscribe"));

        receive_update(State(state), headers_with_secret(SECRET), body).await;

        assert_eq!(subscribers.list().await, vec![ChatId(-1009999)]);
    }

    #[tokio::test]
    async fn test_health() {
        let Json(reply) = health().await;
        assert_eq!(reply["status"], "ok");
    }
}
