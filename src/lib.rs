//! A Telegram bot that relays anime news, anime releases and match scores.
//!
//! Upstream sources are polled on a schedule, each record is delivered once
//! to the configured chats, and users can pull fresh results with commands.

#![warn(missing_docs)]

/// Chat command handling.
pub mod bot_handler;
/// The configuration for the application.
pub mod config;
/// Shared application wiring.
pub mod context;
/// The dispatcher for routing updates to the correct handlers.
pub mod dispatcher;
/// Upstream data sources.
pub mod fetcher;
/// The service for sending messages to chats.
pub mod messaging;
/// Delivery with retries and pinning.
pub mod notifier;
/// The fetch, dedupe and notify pipeline.
pub mod poller;
/// The normalized record every source produces.
pub mod record;
/// Recurring jobs.
pub mod scheduler;
/// The persisted set of already-sent record ids.
pub mod storage;
/// Chats that opted into recurring pushes.
pub mod subscribers;
/// The optional inbound webhook server.
pub mod webhook;

use std::sync::Arc;

use anyhow::Context as _;
use teloxide::prelude::*;

use crate::{
    bot_handler::BotHandler,
    config::Config,
    context::AppContext,
    messaging::TelegramMessagingService,
    scheduler::Scheduler,
    webhook::WebhookState,
};

/// Runs the bot until ctrl-c.
pub async fn run() -> anyhow::Result<()> {
    let config = Config::from_env()?;
    let bot = Bot::new(config.telegram_bot_token.clone());
    let messaging_service = Arc::new(TelegramMessagingService::new(bot.clone()));

    let app = Arc::new(
        AppContext::build(&config, messaging_service)
            .await
            .context("Failed to build HTTP client")?,
    );
    if config.destinations.is_empty() {
        tracing::warn!("CHAT_IDS is empty, recurring pushes only reach subscribed chats");
    }

    let mut scheduler = Scheduler::new(app.poller.clone());
    for job in app.jobs(&config) {
        scheduler.spawn(job);
    }

    let handler = Arc::new(BotHandler::new(app.clone()));

    match config.webhook {
        Some(webhook_config) => {
            let me = bot.get_me().await.context("Failed to fetch bot identity")?;
            if let Some(url) = webhook_config.public_url {
                bot.set_webhook(url)
                    .secret_token(webhook_config.secret.clone())
                    .await
                    .context("Failed to register webhook")?;
            }
            let state = Arc::new(WebhookState {
                handler,
                bot_username: me.user.username.clone().unwrap_or_default(),
                secret: webhook_config.secret,
            });
            webhook::serve(webhook_config.addr, state).await.context("Webhook server failed")?;
        }
        None => {
            if let Err(e) = bot.delete_webhook().drop_pending_updates(true).await {
                tracing::warn!("Failed to clear webhook before polling: {e}");
            }
            let mut dispatcher = dispatcher::BotDispatcher::new(handler).build(bot);
            tracing::debug!("Dispatcher built successfully.");

            dispatcher.dispatch().await;
        }
    }

    scheduler.shutdown().await;
    Ok(())
}
