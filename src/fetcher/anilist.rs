use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use graphql_client::{GraphQLQuery, QueryBody, Response};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use url::Url;

use super::{FetchError, FetchResult, FetchWindow, Fetcher};
use crate::{
    messaging::format::NOT_YET_RELEASED,
    record::{Record, RecordDetails},
};

const PER_PAGE: i64 = 10;

const RELEASES_QUERY: &str = r#"
query Releases($status: MediaStatus, $perPage: Int, $startDateLesser: FuzzyDateInt) {
  Page(page: 1, perPage: $perPage) {
    media(type: ANIME, status: $status, startDate_lesser: $startDateLesser, sort: [START_DATE_DESC]) {
      siteUrl
      status
      title { romaji english native }
      startDate { year month day }
      coverImage { large }
      episodes
      genres
    }
  }
}
"#;

/// AniList release listing. The query is small enough to carry inline, so
/// `GraphQLQuery` is implemented by hand instead of derived from a schema.
pub(super) struct ReleasesQuery;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct ReleasesVariables {
    pub status: &'static str,
    pub per_page: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_date_lesser: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub(super) struct ReleasesData {
    #[serde(rename = "Page")]
    pub page: Page,
}

#[derive(Debug, Deserialize)]
pub(super) struct Page {
    #[serde(default)]
    pub media: Vec<Media>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct Media {
    pub site_url: Option<String>,
    pub status: Option<String>,
    pub title: MediaTitle,
    pub start_date: Option<FuzzyDate>,
    pub cover_image: Option<CoverImage>,
    pub episodes: Option<u32>,
    #[serde(default)]
    pub genres: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub(super) struct MediaTitle {
    pub romaji: Option<String>,
    pub english: Option<String>,
    pub native: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(super) struct FuzzyDate {
    pub year: Option<i32>,
    pub month: Option<u32>,
    pub day: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub(super) struct CoverImage {
    pub large: Option<String>,
}

impl GraphQLQuery for ReleasesQuery {
    type Variables = ReleasesVariables;
    type ResponseData = ReleasesData;

    fn build_query(variables: Self::Variables) -> QueryBody<Self::Variables> {
        QueryBody { variables, query: RELEASES_QUERY, operation_name: "Releases" }
    }
}

impl ReleasesVariables {
    /// Finished shows for today, upcoming shows up to the target date otherwise.
    pub fn for_window(window: FetchWindow, today: NaiveDate) -> Self {
        match window {
            FetchWindow::Today => {
                Self { status: "FINISHED", per_page: PER_PAGE, start_date_lesser: None }
            }
            FetchWindow::Ahead(_) => Self {
                status: NOT_YET_RELEASED,
                per_page: PER_PAGE,
                start_date_lesser: Some(fuzzy_date_int(window.target_date(today))),
            },
        }
    }
}

/// AniList encodes dates as YYYYMMDD integers.
fn fuzzy_date_int(date: NaiveDate) -> i64 {
    date.format("%Y%m%d").to_string().parse().unwrap_or_default()
}

/// Fetches anime releases from the AniList GraphQL API.
pub struct AniListFetcher {
    client: Client,
    graphql_url: String,
}

impl AniListFetcher {
    /// Creates a fetcher posting to `graphql_url`.
    pub fn new(client: Client, graphql_url: &str) -> Self {
        Self { client, graphql_url: graphql_url.to_string() }
    }
}

#[async_trait]
impl Fetcher for AniListFetcher {
    async fn fetch(&self, window: FetchWindow) -> FetchResult<Vec<Record>> {
        let variables = ReleasesVariables::for_window(window, Utc::now().date_naive());
        tracing::debug!("Querying AniList with {variables:?}");

        let request_body = ReleasesQuery::build_query(variables);
        let resp = self.client.post(&self.graphql_url).json(&request_body).send().await?;

        if !resp.status().is_success() {
            return Err(FetchError::SourceUnreachable(format!("AniList HTTP {}", resp.status())));
        }

        let body: Response<ReleasesData> = resp.json().await?;
        parse_response(body)
    }
}

pub(super) fn parse_response(body: Response<ReleasesData>) -> FetchResult<Vec<Record>> {
    if let Some(errors) = body.errors.filter(|e| !e.is_empty()) {
        return Err(FetchError::MalformedPayload(format!("GraphQL errors: {errors:?}")));
    }

    let data = body
        .data
        .ok_or_else(|| FetchError::MalformedPayload("No data in GraphQL response".to_string()))?;

    Ok(data.page.media.into_iter().filter_map(media_to_record).collect())
}

fn media_to_record(media: Media) -> Option<Record> {
    let MediaTitle { romaji, english, native } = media.title;
    let title = [romaji, english, native].into_iter().flatten().find(|t| !t.trim().is_empty())?;

    let site_url = media.site_url.filter(|u| !u.is_empty());
    let id = site_url.clone().unwrap_or_else(|| format!("anilist:{title}"));

    let date = media.start_date.and_then(|d| match (d.year, d.month, d.day) {
        (Some(y), Some(m), Some(day)) => NaiveDate::from_ymd_opt(y, m, day),
        _ => None,
    });

    let image =
        media.cover_image.and_then(|c| c.large).and_then(|large| Url::parse(&large).ok());

    Some(Record {
        id,
        title,
        date,
        image,
        link: site_url,
        status: media.status,
        details: RecordDetails::Release { episodes: media.episodes, genres: media.genres },
        ..Default::default()
    })
}
