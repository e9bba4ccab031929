use teloxide::utils::command::BotCommands;

use crate::bot_handler::{BotHandlerResult, Command, commands::Context};

pub async fn handle(ctx: Context<'_>) -> BotHandlerResult<()> {
    let text = format!(
        "👋 Welcome! I relay anime news, anime releases and match scores.\n\n{}",
        Command::descriptions()
    );
    ctx.reply(&text).await
}
