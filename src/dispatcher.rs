use std::sync::Arc;

use teloxide::{
    dispatching::DefaultKey,
    dptree::{self, deps},
    prelude::*,
};

use crate::bot_handler::{BotHandler, Command};

/// Encapsulates the long-polling dispatcher for the bot.
pub struct BotDispatcher {
    handler: Arc<BotHandler>,
}

impl BotDispatcher {
    /// Creates a new `BotDispatcher`.
    pub fn new(handler: Arc<BotHandler>) -> Self {
        Self { handler }
    }

    /// Builds the dispatcher using the provided `bot` instance. Only
    /// recognised commands are routed; other messages are ignored.
    #[must_use = "This function returns a Dispatcher that should not be ignored"]
    pub fn build(&self, bot: Bot) -> Dispatcher<Bot, anyhow::Error, DefaultKey> {
        let commands = Update::filter_message().filter_command::<Command>().endpoint(
            |msg: Message, cmd: Command, handler: Arc<BotHandler>| async move {
                handler.handle_commands(msg.chat.id, cmd).await?;
                Ok::<_, anyhow::Error>(())
            },
        );

        Dispatcher::builder(bot, dptree::entry().branch(commands))
            .dependencies(deps![self.handler.clone()])
            .enable_ctrlc_handler()
            .build()
    }
}
