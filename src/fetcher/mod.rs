mod anilist;
mod rss;
mod scores;

use std::time::Duration;

pub use anilist::AniListFetcher;
use async_trait::async_trait;
use chrono::{Days, NaiveDate};
use mockall::automock;
use reqwest::{
    Client,
    header::{HeaderMap, HeaderValue, USER_AGENT},
};
pub use rss::RssFetcher;
pub use scores::ScoresFetcher;
use thiserror::Error;

use crate::record::Record;

/// Why a fetch produced no records.
#[derive(Debug, Error)]
pub enum FetchError {
    /// Network failure, timeout or non-success status.
    #[error("Source unreachable: {0}")]
    SourceUnreachable(String),
    /// The source answered with something that cannot be parsed.
    #[error("Malformed payload: {0}")]
    MalformedPayload(String),
}

impl From<reqwest::Error> for FetchError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            FetchError::MalformedPayload(e.to_string())
        } else {
            FetchError::SourceUnreachable(e.to_string())
        }
    }
}

/// Result type for fetchers.
pub type FetchResult<T> = Result<T, FetchError>;

/// Which slice of time a fetch should cover.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FetchWindow {
    /// What is current today.
    #[default]
    Today,
    /// Look this many days ahead instead of today.
    Ahead(u32),
}

impl FetchWindow {
    /// The last date covered by this window, counting from `today`.
    pub fn target_date(&self, today: NaiveDate) -> NaiveDate {
        match self {
            FetchWindow::Today => today,
            FetchWindow::Ahead(days) => {
                today.checked_add_days(Days::new(u64::from(*days))).unwrap_or(today)
            }
        }
    }

    /// Seen-set key for a record fetched in this window. Early announcements
    /// are tracked apart from same-day ones, so a show announced ahead of
    /// time is still announced again on the day.
    pub fn seen_key(&self, id: &str) -> String {
        match self {
            FetchWindow::Today => id.to_string(),
            FetchWindow::Ahead(_) => format!("early:{id}"),
        }
    }
}

/// A source of records. Implementations never retry; the next trigger tick
/// is the retry.
#[automock]
#[async_trait]
pub trait Fetcher: Send + Sync {
    /// Fetches the records for `window`, in source order.
    async fn fetch(&self, window: FetchWindow) -> FetchResult<Vec<Record>>;
}

/// Case-insensitive allow-list. Text filters look for substrings of the
/// title and status; status filters require the status to equal a keyword.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeywordFilter {
    keywords: Vec<String>,
    status_only: bool,
}

impl KeywordFilter {
    /// Substring filter over title and status. Blank keywords are dropped,
    /// and an empty list lets everything through.
    pub fn new<I, S>(keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let keywords = keywords
            .into_iter()
            .map(|k| k.as_ref().trim().to_lowercase())
            .filter(|k| !k.is_empty())
            .collect();
        Self { keywords, status_only: false }
    }

    /// Matches on the record status alone, e.g. `["1H", "HT", "2H"]` for
    /// matches in progress.
    pub fn status<I, S>(keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self { status_only: true, ..Self::new(keywords) }
    }

    /// A filter that lets everything through.
    pub fn allow_all() -> Self {
        Self::default()
    }

    /// Whether the record passes the filter.
    pub fn matches(&self, record: &Record) -> bool {
        if self.keywords.is_empty() {
            return true;
        }

        if self.status_only {
            let Some(status) = &record.status else {
                return false;
            };
            let status = status.trim().to_lowercase();
            return self.keywords.iter().any(|k| *k == status);
        }

        let text = record.searchable_text();
        self.keywords.iter().any(|k| text.contains(k.as_str()))
    }

    /// Keeps the matching records, preserving order.
    pub fn apply(&self, records: Vec<Record>) -> Vec<Record> {
        records.into_iter().filter(|r| self.matches(r)).collect()
    }
}

/// Builds the HTTP client shared by all upstream fetchers.
pub fn build_http_client(timeout: Duration) -> reqwest::Result<Client> {
    let mut headers = HeaderMap::new();
    headers.insert(USER_AGENT, HeaderValue::from_static("newswire-bot"));

    Client::builder().default_headers(headers).timeout(timeout).build()
}
