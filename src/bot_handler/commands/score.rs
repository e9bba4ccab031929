use crate::{
    bot_handler::{
        BotHandlerResult,
        commands::{Context, SCORES_DISABLED_MSG},
    },
    fetcher::FetchWindow,
};

pub async fn handle(ctx: Context<'_>) -> BotHandlerResult<()> {
    let app = &ctx.handler.app;
    let Some(scores) = &app.scores else {
        return ctx.reply(SCORES_DISABLED_MSG).await;
    };

    if app.subscribers.subscribe(ctx.chat_id).await {
        tracing::info!("Chat {} subscribed via /score", ctx.chat_id);
    }

    ctx.relay(scores, FetchWindow::Today, None).await
}
