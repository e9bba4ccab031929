use std::sync::Arc;

use crate::{
    config::Config,
    fetcher::{
        AniListFetcher, FetchWindow, KeywordFilter, RssFetcher, ScoresFetcher, build_http_client,
    },
    messaging::{MessagingService, format::Style},
    notifier::Notifier,
    poller::{Feed, Poller},
    scheduler::{Job, Trigger},
    storage::JsonFileStore,
    subscribers::Subscribers,
};

/// Everything the scheduler and the command handlers share. Built once at
/// startup.
pub struct AppContext {
    /// Runs pipeline cycles and on-demand fetches.
    pub poller: Arc<Poller>,
    /// Chats that opted in with a command.
    pub subscribers: Arc<Subscribers>,
    /// Anime news from RSS.
    pub news: Arc<Feed>,
    /// Anime releases from AniList.
    pub releases: Arc<Feed>,
    /// Absent when no scores API key is configured.
    pub scores: Option<Arc<Feed>>,
    /// Status allow-list for `/live`.
    pub live_filter: KeywordFilter,
    /// Window used by `/upcoming` and the early releases push.
    pub early_window: FetchWindow,
}

impl AppContext {
    /// Wires fetchers, storage and delivery from the configuration.
    pub async fn build(
        config: &Config,
        messaging_service: Arc<dyn MessagingService>,
    ) -> reqwest::Result<Self> {
        let client = build_http_client(config.http_timeout)?;

        let seen_store =
            Arc::new(JsonFileStore::open(&config.seen_file, config.seen_capacity).await);
        let notifier = Arc::new(Notifier::new(
            messaging_service,
            config.max_send_attempts,
            config.send_pause,
            config.pinnable.clone(),
        ));
        let subscribers = Arc::new(Subscribers::new());
        let poller = Arc::new(
            Poller::new(seen_store, notifier, subscribers.clone(), config.destinations.clone())
                .with_max_per_cycle(config.max_per_cycle),
        );

        let news = Arc::new(Feed::new(
            "news",
            Arc::new(RssFetcher::new(client.clone(), config.news_feed_urls.clone())),
            Style::News,
            KeywordFilter::new(&config.news_keywords),
        ));
        let releases = Arc::new(Feed::new(
            "releases",
            Arc::new(AniListFetcher::new(client.clone(), &config.anilist_url)),
            Style::Release,
            KeywordFilter::allow_all(),
        ));
        let scores = config.scores_api_key.as_deref().map(|api_key| {
            Arc::new(Feed::new(
                "scores",
                Arc::new(ScoresFetcher::new(client.clone(), &config.scores_api_url, api_key)),
                Style::Score,
                KeywordFilter::allow_all(),
            ))
        });
        if scores.is_none() {
            tracing::info!("SCORES_API_KEY not set, scores feed disabled");
        }

        Ok(Self {
            poller,
            subscribers,
            news,
            releases,
            scores,
            live_filter: KeywordFilter::status(&config.live_keywords),
            early_window: FetchWindow::Ahead(config.early_window_days),
        })
    }

    /// The recurring pushes: news and scores on an interval, releases daily
    /// for today and for the early window.
    pub fn jobs(&self, config: &Config) -> Vec<Job> {
        let mut jobs = vec![
            Job {
                feed: self.news.clone(),
                window: FetchWindow::Today,
                trigger: Trigger::Interval(config.news_interval),
            },
            Job {
                feed: self.releases.clone(),
                window: FetchWindow::Today,
                trigger: Trigger::Daily(config.releases_daily_at),
            },
            Job {
                feed: self.releases.clone(),
                window: self.early_window,
                trigger: Trigger::Daily(config.releases_daily_at),
            },
        ];

        if let Some(scores) = &self.scores {
            jobs.push(Job {
                feed: scores.clone(),
                window: FetchWindow::Today,
                trigger: Trigger::Interval(config.scores_interval),
            });
        }

        jobs
    }
}
