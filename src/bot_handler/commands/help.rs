use teloxide::utils::command::BotCommands;

use crate::bot_handler::{BotHandlerResult, Command, commands::Context};

pub async fn handle(ctx: Context<'_>) -> BotHandlerResult<()> {
    ctx.reply(&Command::descriptions().to_string()).await
}
