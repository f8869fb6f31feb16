//! The inbound ingestion document.
//!
//! One document describes a game and every song appearing in it, nested down
//! to charts. Field names follow the camelCase wire shape. Serde performs the
//! structural half of validation (required fields, types, dates); see
//! [`crate::validate`] for the rest.

use chrono::NaiveDate;
use serde::Deserialize;
use serde_json::Value;

/// Root of an ingestion document.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogDocument {
    pub game: GameInput,
    pub songs: Vec<SongInput>,
    /// Accepted for compatibility; course ingestion is not implemented.
    #[serde(default)]
    pub courses: CourseSection,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameInput {
    pub name: String,
    #[serde(default, deserialize_with = "flexible_date::deserialize")]
    pub release_date: Option<NaiveDate>,
    #[serde(default)]
    pub publisher: Option<String>,
    #[serde(default)]
    pub extra: Option<Value>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SongInput {
    pub title: String,
    #[serde(default)]
    pub original_title: Option<String>,
    #[serde(default)]
    pub song_info: Option<SongInfoInput>,
    #[serde(default)]
    pub composers: Vec<ComposerInput>,
    pub game_versions: Vec<GameVersionInput>,
    #[serde(default)]
    pub tags: Vec<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SongInfoInput {
    #[serde(default)]
    pub bpm: Option<f64>,
    #[serde(default)]
    pub beat: Option<String>,
    #[serde(default)]
    pub length_sec: Option<i64>,
    #[serde(default)]
    pub extra: Option<Value>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComposerInput {
    pub name: String,
    #[serde(default)]
    pub company_name: Option<String>,
    #[serde(default)]
    pub extra: Option<Value>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameVersionInput {
    #[serde(default)]
    pub in_game_title: Option<String>,
    #[serde(default)]
    pub bpm_override: Option<f64>,
    #[serde(default)]
    pub length_sec: Option<i64>,
    #[serde(default)]
    pub arrangement: Option<String>,
    #[serde(default)]
    pub first_version: Option<String>,
    #[serde(default, deserialize_with = "flexible_date::deserialize")]
    pub first_date: Option<NaiveDate>,
    #[serde(default)]
    pub extra: Option<Value>,
    pub charts: Vec<ChartInput>,
    #[serde(default)]
    pub dlc_name: Option<String>,
    #[serde(default, deserialize_with = "flexible_date::deserialize")]
    pub dlc_release_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartInput {
    pub difficulty_name: String,
    pub level: f64,
    #[serde(default)]
    pub note_count: Option<i64>,
    #[serde(default)]
    pub chart_type: Option<String>,
    #[serde(default)]
    pub extra: Option<Value>,
}

// ── Courses ─────────────────────────────────────────────────────────────────

/// The `courses` field of a document.
///
/// The pipeline does not ingest courses. Keeping the payload in a dedicated
/// variant lets the walker report what it skipped instead of dropping it.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(from = "Option<Vec<CourseInput>>")]
pub enum CourseSection {
    #[default]
    Absent,
    NotIngested(Vec<CourseInput>),
}

impl From<Option<Vec<CourseInput>>> for CourseSection {
    fn from(value: Option<Vec<CourseInput>>) -> Self {
        match value {
            Some(courses) => Self::NotIngested(courses),
            None => Self::Absent,
        }
    }
}

impl CourseSection {
    /// Number of courses present in the document (and therefore skipped).
    pub fn len(&self) -> usize {
        match self {
            Self::Absent => 0,
            Self::NotIngested(courses) => courses.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CourseInput {
    pub course_name: String,
    #[serde(default)]
    pub difficulty: Option<String>,
    #[serde(default)]
    pub dlc_name: Option<String>,
    pub course_entries: Vec<CourseEntryInput>,
    #[serde(default)]
    pub extra: Option<Value>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CourseEntryInput {
    pub song_title: String,
    pub difficulty_name: String,
    #[serde(default)]
    pub chart_type: Option<String>,
    pub position: i64,
    #[serde(default)]
    pub extra: Option<Value>,
}

// ── Dates ───────────────────────────────────────────────────────────────────

/// Parse a document date: either `YYYY-MM-DD` or an RFC 3339 timestamp,
/// which is reduced to its UTC calendar date.
pub fn parse_date(s: &str) -> Option<NaiveDate> {
    let s = s.trim();
    if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return Some(date);
    }
    chrono::DateTime::parse_from_rfc3339(s)
        .ok()
        .map(|dt| dt.with_timezone(&chrono::Utc).date_naive())
}

mod flexible_date {
    use chrono::NaiveDate;
    use serde::{Deserialize, Deserializer, de::Error};

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<NaiveDate>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw: Option<String> = Option::deserialize(deserializer)?;
        match raw {
            None => Ok(None),
            Some(s) if s.trim().is_empty() => Ok(None),
            Some(s) => super::parse_date(&s)
                .map(Some)
                .ok_or_else(|| D::Error::custom(format!("invalid date '{s}'"))),
        }
    }
}
