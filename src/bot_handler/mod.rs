mod commands;
#[cfg(test)]
mod tests;

use std::sync::Arc;

use teloxide::{types::ChatId, utils::command::BotCommands};
use thiserror::Error;

use crate::{bot_handler::commands::Context, context::AppContext, messaging::MessagingError};

/// Chat commands. The descriptions double as the `/help` text.
#[allow(missing_docs)]
#[derive(BotCommands, Clone, Debug, PartialEq, Eq)]
#[command(rename_rule = "lowercase", description = "Available commands:")]
pub enum Command {
    #[command(description = "Start the bot and show welcome message.")]
    Start,
    #[command(description = "Show this help text.")]
    Help,
    #[command(description = "Latest anime news. Also subscribes this chat.")]
    News,
    #[command(description = "Today's match scores. Also subscribes this chat.")]
    Score,
    #[command(description = "Matches in progress right now.")]
    Live,
    #[command(description = "Anime releases coming up in the next few days.")]
    Upcoming,
    #[command(description = "Receive recurring pushes in this chat.")]
    Subscribe,
    #[command(description = "Stop recurring pushes in this chat.")]
    Stop,
}

/// Errors from running a command.
#[derive(Debug, Error)]
pub enum BotHandlerError {
    /// The reply could not be sent.
    #[error("Failed to send message: {0}")]
    Messaging(#[from] MessagingError),
}

/// Result type for command handlers.
pub type BotHandlerResult<T> = Result<T, BotHandlerError>;

/// Handles chat commands on top of the shared application context.
pub struct BotHandler {
    app: Arc<AppContext>,
}

impl BotHandler {
    /// Creates a new `BotHandler` instance.
    pub fn new(app: Arc<AppContext>) -> Self {
        Self { app }
    }

    /// Dispatches the incoming command to the appropriate handler.
    pub async fn handle_commands(&self, chat_id: ChatId, cmd: Command) -> BotHandlerResult<()> {
        tracing::debug!("Handling {cmd:?} for chat {chat_id}");
        let ctx = Context { handler: self, chat_id };

        match cmd {
            Command::Start => commands::start::handle(ctx).await,
            Command::Help => commands::help::handle(ctx).await,
            Command::News => commands::news::handle(ctx).await,
            Command::Score => commands::score::handle(ctx).await,
            Command::Live => commands::live::handle(ctx).await,
            Command::Upcoming => commands::upcoming::handle(ctx).await,
            Command::Subscribe => commands::subscribe::handle(ctx).await,
            Command::Stop => commands::stop::handle(ctx).await,
        }
    }
}
