use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use reqwest::Client;
use serde::Deserialize;

use super::{FetchError, FetchResult, FetchWindow, Fetcher};
use crate::record::{Record, RecordDetails};

const API_KEY_HEADER: &str = "x-apisports-key";

#[derive(Debug, Deserialize)]
pub(super) struct FixturesResponse {
    #[serde(default)]
    pub response: Vec<FixtureEntry>,
}

#[derive(Debug, Deserialize)]
pub(super) struct FixtureEntry {
    pub fixture: Fixture,
    pub league: League,
    pub teams: Teams,
    #[serde(default)]
    pub goals: Goals,
}

#[derive(Debug, Deserialize)]
pub(super) struct Fixture {
    pub id: i64,
    pub date: Option<String>,
    pub status: Option<FixtureStatus>,
}

#[derive(Debug, Deserialize)]
pub(super) struct FixtureStatus {
    pub short: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(super) struct League {
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub(super) struct Teams {
    pub home: Team,
    pub away: Team,
}

#[derive(Debug, Deserialize)]
pub(super) struct Team {
    pub name: String,
}

#[derive(Debug, Default, Deserialize)]
pub(super) struct Goals {
    pub home: Option<u32>,
    pub away: Option<u32>,
}

/// Polls a metered REST scores API authenticated by an API key header.
pub struct ScoresFetcher {
    client: Client,
    api_url: String,
    api_key: String,
}

impl ScoresFetcher {
    /// Creates a fetcher calling `api_url` with `api_key`.
    pub fn new(client: Client, api_url: &str, api_key: &str) -> Self {
        Self { client, api_url: api_url.to_string(), api_key: api_key.to_string() }
    }
}

#[async_trait]
impl Fetcher for ScoresFetcher {
    async fn fetch(&self, window: FetchWindow) -> FetchResult<Vec<Record>> {
        let date = window.target_date(Utc::now().date_naive());
        tracing::debug!("Fetching fixtures for {date}");

        let resp = self
            .client
            .get(&self.api_url)
            .header(API_KEY_HEADER, &self.api_key)
            .query(&[("date", date.to_string())])
            .send()
            .await?;

        if !resp.status().is_success() {
            return Err(FetchError::SourceUnreachable(format!("Scores HTTP {}", resp.status())));
        }

        let body = resp.text().await?;
        parse_fixtures(&body, date)
    }
}

pub(super) fn parse_fixtures(body: &str, requested: NaiveDate) -> FetchResult<Vec<Record>> {
    let parsed: FixturesResponse =
        serde_json::from_str(body).map_err(|e| FetchError::MalformedPayload(e.to_string()))?;

    Ok(parsed.response.into_iter().map(|entry| fixture_to_record(entry, requested)).collect())
}

fn fixture_to_record(entry: FixtureEntry, requested: NaiveDate) -> Record {
    let FixtureEntry { fixture, league, teams, goals } = entry;

    let date = fixture
        .date
        .as_deref()
        .and_then(|d| DateTime::parse_from_rfc3339(d).ok())
        .map(|d| d.date_naive())
        .unwrap_or(requested);

    Record {
        id: Record::score_id(fixture.id, &teams.home.name, &teams.away.name, Some(date)),
        title: format!("{} vs {}", teams.home.name, teams.away.name),
        date: Some(date),
        status: fixture.status.and_then(|s| s.short),
        details: RecordDetails::Score {
            league: league.name,
            home: teams.home.name,
            away: teams.away.name,
            home_goals: goals.home,
            away_goals: goals.away,
        },
        ..Default::default()
    }
}
