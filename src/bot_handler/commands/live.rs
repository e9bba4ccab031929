use crate::{
    bot_handler::{
        BotHandlerResult,
        commands::{Context, SCORES_DISABLED_MSG},
    },
    fetcher::FetchWindow,
};

pub async fn handle(ctx: Context<'_>) -> BotHandlerResult<()> {
    let app = &ctx.handler.app;
    match &app.scores {
        Some(scores) => ctx.relay(scores, FetchWindow::Today, Some(&app.live_filter)).await,
        None => ctx.reply(SCORES_DISABLED_MSG).await,
    }
}
