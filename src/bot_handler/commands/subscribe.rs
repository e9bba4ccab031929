use crate::bot_handler::{BotHandlerResult, commands::Context};

pub async fn handle(ctx: Context<'_>) -> BotHandlerResult<()> {
    let text = if ctx.handler.app.subscribers.subscribe(ctx.chat_id).await {
        "✅ Subscribed. This chat will receive recurring updates."
    } else {
        "➡️ This chat is already subscribed."
    };
    ctx.reply(text).await
}
