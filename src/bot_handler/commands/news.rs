use crate::{
    bot_handler::{BotHandlerResult, commands::Context},
    fetcher::FetchWindow,
};

pub async fn handle(ctx: Context<'_>) -> BotHandlerResult<()> {
    let app = &ctx.handler.app;
    if app.subscribers.subscribe(ctx.chat_id).await {
        tracing::info!("Chat {} subscribed via /news", ctx.chat_id);
    }

    ctx.relay(&app.news, FetchWindow::Today, None).await
}
