use async_trait::async_trait;
use feed_rs::{model::Entry, parser};
use futures::future;
use reqwest::Client;
use url::Url;

use super::{FetchError, FetchResult, FetchWindow, Fetcher};
use crate::record::Record;

/// Reads one or more RSS/Atom feeds.
pub struct RssFetcher {
    client: Client,
    urls: Vec<String>,
}

impl RssFetcher {
    /// Creates a fetcher over `urls`, fetched concurrently.
    pub fn new(client: Client, urls: Vec<String>) -> Self {
        Self { client, urls }
    }

    async fn fetch_feed(&self, url: &str) -> FetchResult<Vec<Record>> {
        tracing::debug!("Fetching feed: {url}");
        let resp = self.client.get(url).send().await?;
        if !resp.status().is_success() {
            return Err(FetchError::SourceUnreachable(format!("HTTP {} from {url}", resp.status())));
        }
        let bytes = resp.bytes().await?;
        parse_feed(&bytes)
    }
}

#[async_trait]
impl Fetcher for RssFetcher {
    /// Feeds have no notion of a date window, so the window is ignored.
    async fn fetch(&self, _window: FetchWindow) -> FetchResult<Vec<Record>> {
        let results = future::join_all(self.urls.iter().map(|url| self.fetch_feed(url))).await;

        let mut records = Vec::new();
        let mut last_error = None;
        let mut any_ok = false;

        for (url, result) in self.urls.iter().zip(results) {
            match result {
                Ok(mut feed_records) => {
                    any_ok = true;
                    records.append(&mut feed_records);
                }
                Err(e) => {
                    tracing::warn!("Skipping feed {url}: {e}");
                    last_error = Some(e);
                }
            }
        }

        match (any_ok, last_error) {
            (false, Some(e)) => Err(e),
            _ => Ok(records),
        }
    }
}

/// Parses raw feed bytes into records, one per entry.
pub(super) fn parse_feed(bytes: &[u8]) -> FetchResult<Vec<Record>> {
    let feed = parser::parse(bytes).map_err(|e| FetchError::MalformedPayload(e.to_string()))?;
    Ok(feed.entries.into_iter().filter_map(entry_to_record).collect())
}

fn entry_to_record(entry: Entry) -> Option<Record> {
    let title = entry.title.as_ref().map(|t| t.content.trim().to_string())?;
    if title.is_empty() {
        return None;
    }

    let link = entry.links.iter().map(|l| l.href.trim()).find(|h| !h.is_empty()).map(String::from);
    let id = match &link {
        Some(link) => link.clone(),
        None if !entry.id.trim().is_empty() => entry.id.trim().to_string(),
        None => return None,
    };

    let image = entry
        .media
        .iter()
        .flat_map(|m| m.thumbnails.iter())
        .find_map(|t| Url::parse(&t.image.uri).ok());

    Some(Record {
        id,
        title,
        date: entry.published.or(entry.updated).map(|d| d.date_naive()),
        image,
        link,
        summary: entry.summary.map(|s| s.content.trim().to_string()).filter(|s| !s.is_empty()),
        ..Default::default()
    })
}
