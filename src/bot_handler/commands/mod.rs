pub mod help;
pub mod live;
pub mod news;
pub mod score;
pub mod start;
pub mod stop;
pub mod subscribe;
pub mod upcoming;

use teloxide::types::{ChatId, Recipient};

use crate::{
    bot_handler::{BotHandler, BotHandlerResult},
    fetcher::{FetchWindow, KeywordFilter},
    poller::Feed,
};

/// Maximum number of records sent in reply to a single command.
pub const COMMAND_LIMIT: usize = 5;
pub const NO_DATA_MSG: &str = "no data found right now.";
pub const SCORES_DISABLED_MSG: &str = "⚽ Scores are not configured on this bot.";

/// Context groups the data needed by all command handlers.
pub struct Context<'a> {
    pub handler: &'a BotHandler,
    pub chat_id: ChatId,
}

impl Context<'_> {
    pub async fn reply(&self, text: &str) -> BotHandlerResult<()> {
        self.handler.app.poller.notifier().reply(self.chat_id, text).await?;
        Ok(())
    }

    /// Fetches `feed` on demand and sends the records to the requesting chat.
    /// Fetch failures and empty results both produce the "no data" reply.
    pub async fn relay(
        &self,
        feed: &Feed,
        window: FetchWindow,
        extra_filter: Option<&KeywordFilter>,
    ) -> BotHandlerResult<()> {
        let poller = &self.handler.app.poller;

        let records =
            match poller.fetch_on_demand(feed, window, extra_filter, COMMAND_LIMIT).await {
                Ok(records) => records,
                Err(e) => {
                    tracing::warn!("[{}] On-demand fetch for chat {} failed: {e}", feed.name, self.chat_id);
                    Vec::new()
                }
            };

        if records.is_empty() {
            return self.reply(NO_DATA_MSG).await;
        }

        let destination = [Recipient::Id(self.chat_id)];
        for record in &records {
            let report = poller.notifier().deliver(record, feed.style, &destination).await;
            // The only destination failed; the rest would fail the same way.
            if let Some((_, e)) = report.failed.into_iter().next() {
                return Err(e.into());
            }
        }

        Ok(())
    }
}
