use crate::bot_handler::{BotHandlerResult, commands::Context};

pub async fn handle(ctx: Context<'_>) -> BotHandlerResult<()> {
    let text = if ctx.handler.app.subscribers.unsubscribe(ctx.chat_id).await {
        "🛑 Unsubscribed. Use /subscribe to start again."
    } else {
        "❓ This chat was not subscribed."
    };
    ctx.reply(text).await
}
