use teloxide::{types::InlineKeyboardMarkup, utils::html::escape};
use url::Url;

use crate::{
    messaging::keyboards::build_watch_keyboard,
    record::{Record, RecordDetails},
};

/// Telegram rejects photo captions longer than this.
pub const CAPTION_LIMIT: usize = 1024;
const SUMMARY_LIMIT: usize = 600;

/// AniList status of a show that has not aired yet.
pub const NOT_YET_RELEASED: &str = "NOT_YET_RELEASED";

/// Template used to render a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Style {
    /// Headline, summary and a "Read more" link.
    News,
    /// Anime release card with a "Watch Now" button.
    Release,
    /// Match result line.
    Score,
}

/// A rendered message, ready to hand to the transport.
#[derive(Debug, Clone, PartialEq)]
pub struct FormattedMessage {
    /// HTML text, used as the caption when `image` is set.
    pub text: String,
    /// Photo to send, if the caption fits.
    pub image: Option<Url>,
    /// Whether Telegram should render a link preview.
    pub link_preview: bool,
    /// Inline buttons sent with the message.
    pub keyboard: Option<InlineKeyboardMarkup>,
}

/// Renders a record with the given style. Pure: same input, same output.
pub fn format_record(record: &Record, style: Style) -> FormattedMessage {
    let (text, link_preview, keyboard) = match style {
        Style::News => (format_news(record), true, None),
        Style::Release => {
            let (text, keyboard) = format_release(record);
            (text, false, keyboard)
        }
        Style::Score => (format_score(record), false, None),
    };

    // An oversized caption cannot go out as a photo; fall back to text with a
    // preview of the image link instead.
    match &record.image {
        Some(image) if text.chars().count() <= CAPTION_LIMIT => {
            FormattedMessage { text, image: Some(image.clone()), link_preview, keyboard }
        }
        Some(_) => FormattedMessage { text, image: None, link_preview: true, keyboard },
        None => FormattedMessage { text, image: None, link_preview, keyboard },
    }
}

fn format_news(record: &Record) -> String {
    let mut lines = vec![format!("📰 <b>{}</b>", escape(&record.title))];

    if let Some(summary) = &record.summary {
        lines.push(String::new());
        lines.push(escape(&truncate(summary, SUMMARY_LIMIT)));
    }
    if let Some(link) = &record.link {
        lines.push(anchor(link, "Read more"));
    }

    lines.join("\n")
}

/// Upcoming shows get their own heading and tag so an early announcement is
/// never mistaken for the release itself.
fn format_release(record: &Record) -> (String, Option<InlineKeyboardMarkup>) {
    let upcoming = record.status.as_deref() == Some(NOT_YET_RELEASED);
    let (date_label, tag) =
        if upcoming { ("Airs", "#UpcomingAnime") } else { ("Released", "#ReleasedAnime") };

    let mut lines = vec![format!("🎬 <b>{}</b>", escape(&record.title))];

    match record.date {
        Some(date) => lines.push(format!("📅 {date_label}: <code>{date}</code>")),
        None => lines.push(format!("📅 {date_label}: <code>TBA</code>")),
    }

    if let RecordDetails::Release { episodes, genres } = &record.details {
        if let Some(episodes) = episodes {
            lines.push(format!("📺 Episodes: {episodes}"));
        }
        if !genres.is_empty() {
            lines.push(format!("🏷 {}", escape(&genres.join(", "))));
        }
    }

    lines.push(tag.to_string());

    let keyboard = match record.link.as_deref() {
        Some(link) => match Url::parse(link) {
            Ok(url) => Some(build_watch_keyboard(url)),
            Err(_) => {
                lines.push(anchor(link, "Watch now"));
                None
            }
        },
        None => None,
    };

    (lines.join("\n"), keyboard)
}

fn format_score(record: &Record) -> String {
    let mut lines = Vec::new();

    match &record.details {
        RecordDetails::Score { league, home, away, home_goals, away_goals } => {
            let headline = match (home_goals, away_goals) {
                (Some(h), Some(a)) => format!("{} {h} - {a} {}", escape(home), escape(away)),
                _ => format!("{} vs {}", escape(home), escape(away)),
            };
            lines.push(format!("⚽ <b>{headline}</b>"));
            lines.push(format!("🏆 {}", escape(league)));
        }
        _ => lines.push(format!("⚽ <b>{}</b>", escape(&record.title))),
    }

    if let Some(date) = record.date {
        lines.push(format!("📅 <code>{date}</code>"));
    }
    if let Some(status) = &record.status {
        lines.push(format!("⏱ {}", escape(status)));
    }
    if let Some(link) = &record.link {
        lines.push(anchor(link, "Details"));
    }

    lines.join("\n")
}

fn anchor(href: &str, label: &str) -> String {
    format!("<a href=\"{}\">{}</a>", escape(href), escape(label))
}

fn truncate(text: &str, limit: usize) -> String {
    if text.chars().count() <= limit {
        return text.to_string();
    }
    let mut truncated: String = text.chars().take(limit).collect();
    truncated.push('…');
    truncated
}
