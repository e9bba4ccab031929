
use std::{collections::HashSet, sync::Arc};

use teloxide::types::Recipient;

use crate::{
    fetcher::{FetchResult, FetchWindow, Fetcher, KeywordFilter},
    messaging::format::Style,
    notifier::Notifier,
    record::Record,
    storage::SeenStore,
    subscribers::Subscribers,
};

/// A named source together with how its records are filtered and rendered.
pub struct Feed {
    /// Short label used in logs.
    pub name: &'static str,
    /// Where records come from.
    pub fetcher: Arc<dyn Fetcher>,
    /// How records are rendered.
    pub style: Style,
    /// Allow-list applied to every fetch.
    pub filter: KeywordFilter,
}

impl Feed {
    /// Creates a new `Feed`.
    pub fn new(
        name: &'static str,
        fetcher: Arc<dyn Fetcher>,
        style: Style,
        filter: KeywordFilter,
    ) -> Self {
        Self { name, fetcher, style, filter }
    }
}

/// Counters for one fetch-dedupe-notify pass.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CycleSummary {
    /// Records returned by the fetcher.
    pub fetched: usize,
    /// Records left after the keyword filter.
    pub matched: usize,
    /// Records not in the seen-set that were sent out this cycle.
    pub new: usize,
    /// New records that reached at least one destination.
    pub delivered: usize,
    /// New records that reached no destination.
    pub undelivered: usize,
    /// New records held back by the per-cycle limit.
    pub deferred: usize,
}

/// Runs the fetch, dedupe and notify pipeline for recurring pushes.
pub struct Poller {
    seen_store: Arc<dyn SeenStore>,
    notifier: Arc<Notifier>,
    subscribers: Arc<Subscribers>,
    destinations: Vec<Recipient>,
    max_per_cycle: usize,
}

impl Poller {
    /// Creates a poller with no per-cycle limit.
    pub fn new(
        seen_store: Arc<dyn SeenStore>,
        notifier: Arc<Notifier>,
        subscribers: Arc<Subscribers>,
        destinations: Vec<Recipient>,
    ) -> Self {
        Self { seen_store, notifier, subscribers, destinations, max_per_cycle: usize::MAX }
    }

    /// Caps how many new records one cycle announces. The rest stay unmarked
    /// and go out on later cycles.
    pub fn with_max_per_cycle(mut self, max_per_cycle: usize) -> Self {
        self.max_per_cycle = max_per_cycle.max(1);
        self
    }

    /// One recurring cycle. Fetch failures degrade to an empty cycle; a
    /// record is only marked as sent once at least one destination got it.
    pub async fn run_cycle(&self, feed: &Feed, window: FetchWindow) -> CycleSummary {
        let records = match feed.fetcher.fetch(window).await {
            Ok(records) => records,
            Err(e) => {
                tracing::warn!("[{}] No data this cycle: {e}", feed.name);
                return CycleSummary::default();
            }
        };

        let mut summary = CycleSummary { fetched: records.len(), ..Default::default() };
        let records = feed.filter.apply(records);
        summary.matched = records.len();

        let targets = self.targets().await;
        if targets.is_empty() {
            tracing::debug!("[{}] No destinations configured, skipping delivery", feed.name);
            return summary;
        }

        let mut seen_this_cycle = HashSet::new();
        for record in records {
            let key = window.seen_key(&record.id);
            if !seen_this_cycle.insert(key.clone()) {
                continue;
            }
            if !self.seen_store.is_new(&key).await {
                continue;
            }
            if summary.new == self.max_per_cycle {
                summary.deferred += 1;
                continue;
            }
            summary.new += 1;

            let report = self.notifier.deliver(&record, feed.style, &targets).await;
            if !report.any_delivered() {
                tracing::warn!(
                    "[{}] {} reached no destination, will retry next cycle",
                    feed.name,
                    record.id
                );
                summary.undelivered += 1;
                continue;
            }

            summary.delivered += 1;
            if let Err(e) = self.seen_store.mark_sent(&key).await {
                tracing::error!("[{}] Failed to persist seen id {key}: {e}", feed.name);
            }
        }

        tracing::info!("[{}] Cycle finished: {summary:?}", feed.name);
        summary
    }

    /// Fetch for a user request. Skips the seen-set so the user always gets a
    /// fresh view.
    pub async fn fetch_on_demand(
        &self,
        feed: &Feed,
        window: FetchWindow,
        extra_filter: Option<&KeywordFilter>,
        limit: usize,
    ) -> FetchResult<Vec<Record>> {
        let records = feed.filter.apply(feed.fetcher.fetch(window).await?);
        let mut records = match extra_filter {
            Some(filter) => filter.apply(records),
            None => records,
        };
        records.truncate(limit);
        Ok(records)
    }

    /// Configured destinations followed by subscribed chats, without repeats.
    pub async fn targets(&self) -> Vec<Recipient> {
        let mut targets = self.destinations.clone();
        for chat_id in self.subscribers.list().await {
            let recipient = Recipient::Id(chat_id);
            if !targets.contains(&recipient) {
                targets.push(recipient);
            }
        }
        targets
    }

    /// The notifier shared with command replies.
    pub fn notifier(&self) -> &Notifier {
        &self.notifier
    }
}
