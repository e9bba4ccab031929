use std::{
    env::{self, VarError},
    net::SocketAddr,
    path::PathBuf,
    str::FromStr,
    time::Duration,
};

use chrono::NaiveTime;
use teloxide::types::Recipient;
use thiserror::Error;
use url::Url;

use crate::messaging::parse_recipient;

const DEFAULT_SCORES_API_URL: &str = "https://v3.football.api-sports.io/fixtures";
const DEFAULT_NEWS_FEED_URLS: &str = "https://www.animenewsnetwork.com/all/rss.xml";
const DEFAULT_ANILIST_URL: &str = "https://graphql.anilist.co";
const DEFAULT_NEWS_KEYWORDS: &str = "anime,manga";
const DEFAULT_LIVE_KEYWORDS: &str = "1H,HT,2H,ET,BT,P,LIVE";
const DEFAULT_NEWS_INTERVAL_MINUTES: u64 = 60;
const DEFAULT_SCORES_INTERVAL_MINUTES: u64 = 10;
const DEFAULT_RELEASES_DAILY_AT: &str = "07:00";
const DEFAULT_EARLY_WINDOW_DAYS: u32 = 3;
const DEFAULT_SEEN_FILE: &str = "sent_news_cache.json";
const DEFAULT_SEEN_CAPACITY: usize = 5000;
const DEFAULT_SEND_PAUSE_MS: u64 = 1000;
const DEFAULT_MAX_SEND_ATTEMPTS: u32 = 3;
const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 10;
const DEFAULT_MAX_PER_CYCLE: usize = 10;

/// Errors raised while reading the configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A required variable is not set.
    #[error("Missing environment variable {0}: {1}")]
    Missing(&'static str, VarError),
    /// A variable is set but cannot be used.
    #[error("Invalid value for {0}: {1}")]
    Invalid(&'static str, String),
}

/// Settings for serving updates over a webhook instead of long polling.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WebhookConfig {
    /// Address the HTTP server binds to.
    pub addr: SocketAddr,
    /// Expected value of the `X-Telegram-Bot-Api-Secret-Token` header.
    pub secret: String,
    /// Public URL to register with Telegram on startup, if any.
    pub public_url: Option<Url>,
}

/// Represents the application configuration.
#[derive(Debug)]
pub struct Config {
    /// The Telegram bot token.
    pub telegram_bot_token: String,
    /// Destinations for recurring pushes.
    pub destinations: Vec<Recipient>,
    /// Destination whose first delivered message gets pinned.
    pub pinnable: Option<Recipient>,
    /// API key for the scores API. The scores feed is disabled without it.
    pub scores_api_key: Option<String>,
    /// Fixtures endpoint of the scores API.
    pub scores_api_url: String,
    /// RSS feeds polled for news.
    pub news_feed_urls: Vec<String>,
    /// AniList GraphQL endpoint.
    pub anilist_url: String,
    /// Allow-list applied to every news fetch.
    pub news_keywords: Vec<String>,
    /// Match statuses that count as in progress for `/live`.
    pub live_keywords: Vec<String>,
    /// How often news is polled.
    pub news_interval: Duration,
    /// How often scores are polled.
    pub scores_interval: Duration,
    /// UTC time of day for the releases push.
    pub releases_daily_at: NaiveTime,
    /// How many days `/upcoming` and the early releases push look ahead.
    pub early_window_days: u32,
    /// Where the seen-set is persisted.
    pub seen_file: PathBuf,
    /// Maximum number of ids kept in the seen-set.
    pub seen_capacity: usize,
    /// Pause after every send.
    pub send_pause: Duration,
    /// Total send attempts per destination, including the first.
    pub max_send_attempts: u32,
    /// Timeout for upstream HTTP requests.
    pub http_timeout: Duration,
    /// Most new records one recurring cycle may announce.
    pub max_per_cycle: usize,
    /// Webhook mode settings. Long polling is used when absent.
    pub webhook: Option<WebhookConfig>,
}

impl Config {
    /// Creates a new `Config` instance from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        let destinations: Vec<Recipient> =
            list_var("CHAT_IDS", "").iter().filter_map(|raw| parse_recipient(raw)).collect();

        // Defaults to the first destination.
        let pinnable = match env::var("PIN_ID") {
            Ok(raw) => Some(
                parse_recipient(&raw).ok_or_else(|| ConfigError::Invalid("PIN_ID", raw.clone()))?,
            ),
            Err(_) => destinations.first().cloned(),
        };

        let releases_daily_at = {
            let raw = env::var("RELEASES_DAILY_AT")
                .unwrap_or_else(|_| DEFAULT_RELEASES_DAILY_AT.to_string());
            NaiveTime::parse_from_str(raw.trim(), "%H:%M")
                .map_err(|_| ConfigError::Invalid("RELEASES_DAILY_AT", raw))?
        };

        let webhook = match env::var("WEBHOOK_ADDR") {
            Ok(raw) => Some(webhook_config(&raw)?),
            Err(_) => None,
        };

        Ok(Self {
            telegram_bot_token: env::var("TELOXIDE_TOKEN")
                .map_err(|e| ConfigError::Missing("TELOXIDE_TOKEN", e))?,
            destinations,
            pinnable,
            scores_api_key: env::var("SCORES_API_KEY").ok().filter(|k| !k.trim().is_empty()),
            scores_api_url: env::var("SCORES_API_URL")
                .unwrap_or_else(|_| DEFAULT_SCORES_API_URL.to_string()),
            news_feed_urls: list_var("NEWS_FEED_URLS", DEFAULT_NEWS_FEED_URLS),
            anilist_url: env::var("ANILIST_URL").unwrap_or_else(|_| DEFAULT_ANILIST_URL.to_string()),
            news_keywords: list_var("NEWS_KEYWORDS", DEFAULT_NEWS_KEYWORDS),
            live_keywords: list_var("LIVE_KEYWORDS", DEFAULT_LIVE_KEYWORDS),
            news_interval: Duration::from_secs(
                parsed_var("NEWS_INTERVAL_MINUTES", DEFAULT_NEWS_INTERVAL_MINUTES).max(1) * 60,
            ),
            scores_interval: Duration::from_secs(
                parsed_var("SCORES_INTERVAL_MINUTES", DEFAULT_SCORES_INTERVAL_MINUTES).max(1) * 60,
            ),
            releases_daily_at,
            early_window_days: parsed_var("EARLY_WINDOW_DAYS", DEFAULT_EARLY_WINDOW_DAYS),
            seen_file: env::var("SEEN_FILE")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from(DEFAULT_SEEN_FILE)),
            seen_capacity: parsed_var("SEEN_CAPACITY", DEFAULT_SEEN_CAPACITY),
            send_pause: Duration::from_millis(parsed_var("SEND_PAUSE_MS", DEFAULT_SEND_PAUSE_MS)),
            max_send_attempts: parsed_var("MAX_SEND_ATTEMPTS", DEFAULT_MAX_SEND_ATTEMPTS),
            http_timeout: Duration::from_secs(parsed_var(
                "HTTP_TIMEOUT_SECS",
                DEFAULT_HTTP_TIMEOUT_SECS,
            )),
            max_per_cycle: parsed_var("MAX_PER_CYCLE", DEFAULT_MAX_PER_CYCLE).max(1),
            webhook,
        })
    }
}

/// Webhook mode is only allowed together with a secret token, so forged
/// updates from anyone who can reach the port are rejected.
fn webhook_config(raw_addr: &str) -> Result<WebhookConfig, ConfigError> {
    let addr = raw_addr
        .trim()
        .parse()
        .map_err(|_| ConfigError::Invalid("WEBHOOK_ADDR", raw_addr.to_string()))?;

    let secret = env::var("WEBHOOK_SECRET").map_err(|e| ConfigError::Missing("WEBHOOK_SECRET", e))?;
    // Telegram accepts 1-256 characters from A-Z, a-z, 0-9, `_` and `-`.
    let valid = (1..=256).contains(&secret.len())
        && secret.chars().all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
    if !valid {
        return Err(ConfigError::Invalid("WEBHOOK_SECRET", "unsupported characters or length".to_string()));
    }

    let public_url = match env::var("WEBHOOK_URL") {
        Ok(raw) => Some(Url::parse(raw.trim()).map_err(|_| ConfigError::Invalid("WEBHOOK_URL", raw.clone()))?),
        Err(_) => None,
    };

    Ok(WebhookConfig { addr, secret, public_url })
}

/// Reads a numeric variable, falling back to the default when absent or
/// unparsable.
fn parsed_var<T: FromStr>(name: &str, default: T) -> T {
    env::var(name).ok().and_then(|v| v.trim().parse().ok()).unwrap_or(default)
}

/// Reads a comma-separated list, dropping empty entries.
fn list_var(name: &str, default: &str) -> Vec<String> {
    env::var(name)
        .unwrap_or_else(|_| default.to_string())
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}
