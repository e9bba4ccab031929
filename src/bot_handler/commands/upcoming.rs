use crate::bot_handler::{BotHandlerResult, commands::Context};

pub async fn handle(ctx: Context<'_>) -> BotHandlerResult<()> {
    let app = &ctx.handler.app;
    ctx.relay(&app.releases, app.early_window, None).await
}
