use chrono::NaiveDate;
use url::Url;

/// A normalized unit of news, release or score data produced by a fetcher.
///
/// Records are rebuilt on every fetch. Only the `id` outlives the formatting
/// step, by way of the seen-set.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Record {
    /// Stable identifier used for deduplication.
    pub id: String,
    /// Headline, anime title or "Home vs Away".
    pub title: String,
    /// Publication, airing or match date.
    pub date: Option<NaiveDate>,
    /// Cover or article image.
    pub image: Option<Url>,
    /// Where to read or watch more.
    pub link: Option<String>,
    /// Free-form status, e.g. "FT" or "2H" for scores.
    pub status: Option<String>,
    /// Short description, plain text.
    pub summary: Option<String>,
    /// Fields only some sources have.
    pub details: RecordDetails,
}

/// Source-specific structured fields.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum RecordDetails {
    /// News items carry nothing extra.
    #[default]
    None,
    /// An anime release.
    Release {
        /// Total episode count, if known.
        episodes: Option<u32>,
        /// Genre names.
        genres: Vec<String>,
    },
    /// A football fixture.
    Score {
        /// League name.
        league: String,
        /// Home team name.
        home: String,
        /// Away team name.
        away: String,
        /// Absent before kick-off.
        home_goals: Option<u32>,
        /// Absent before kick-off.
        away_goals: Option<u32>,
    },
}

impl Record {
    /// Builds the composite id used for score records.
    pub fn score_id(match_id: i64, home: &str, away: &str, date: Option<NaiveDate>) -> String {
        let date = date.map(|d| d.to_string()).unwrap_or_default();
        format!("match:{match_id}:{home}:{away}:{date}")
    }

    /// Text searched by keyword filters: the title plus any status text.
    pub fn searchable_text(&self) -> String {
        match &self.status {
            Some(status) => format!("{} {}", self.title, status).to_lowercase(),
            None => self.title.to_lowercase(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_score_id_includes_date() {
        let date = NaiveDate::from_ymd_opt(2025, 1, 1);
        assert_eq!(
            Record::score_id(42, "Liverpool", "Everton", date),
            "match:42:Liverpool:Everton:2025-01-01"
        );
    }

    #[test]
    fn test_searchable_text_lowercases_title_and_status() {
        let record = Record {
            title: "Liverpool vs Everton".to_string(),
            status: Some("2H".to_string()),
            ..Default::default()
        };
        assert_eq!(record.searchable_text(), "liverpool vs everton 2h");
    }
}
