//! Data model types for the rhythm-game archive.
//!
//! These types mirror the persistent schema: games and their DLCs, songs with
//! their info record, composers, per-game song versions with charts, and tags.
//! They serialize in camelCase so read-back output matches the ingest document.

use chrono::NaiveDate;
use serde::Serialize;
use serde_json::Value;

// ── Game ────────────────────────────────────────────────────────────────────

/// A rhythm game. Identity is the unique `name`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Game {
    pub id: String,
    pub name: String,
    pub release_date: Option<NaiveDate>,
    pub publisher: Option<String>,
    pub extra: Option<Value>,
    pub created_at: String,
    pub updated_at: String,
}

/// Downloadable content for a game. Identity is `(game_id, dlc_name)`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Dlc {
    pub id: String,
    pub game_id: String,
    pub dlc_name: String,
    pub release_date: Option<NaiveDate>,
    pub extra: Option<Value>,
    pub created_at: String,
    pub updated_at: String,
}

// ── Song ────────────────────────────────────────────────────────────────────

/// A song, independent of any game it appears in.
///
/// Looked up by `title` only; the store does not enforce uniqueness.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Song {
    pub id: String,
    pub title: String,
    pub original_title: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

/// One-to-one descriptive record for a song.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SongInfo {
    pub id: String,
    pub song_id: String,
    pub bpm: Option<f64>,
    pub beat: Option<String>,
    pub length_sec: Option<i64>,
    pub extra: Option<Value>,
    pub created_at: String,
    pub updated_at: String,
}

/// A composer. `(name, company_name)` is the identity; a missing company is
/// its own identity, distinct from any named company.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Composer {
    pub id: String,
    pub name: String,
    pub company_name: Option<String>,
    pub extra: Option<Value>,
    pub created_at: String,
    pub updated_at: String,
}

/// Join row between a song and a composer.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SongComposer {
    pub id: String,
    pub song_id: String,
    pub composer_id: String,
}

// ── Versions and charts ─────────────────────────────────────────────────────

/// One appearance of a song inside a game (optionally through a DLC).
///
/// Has no identity key: every ingestion that mentions it creates a new row.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SongGameVersion {
    pub id: String,
    pub song_id: String,
    pub game_id: String,
    pub dlc_id: Option<String>,
    pub in_game_title: Option<String>,
    pub bpm_override: Option<f64>,
    pub length_sec: Option<i64>,
    pub arrangement: Option<String>,
    pub first_version: Option<String>,
    pub first_date: Option<NaiveDate>,
    pub extra: Option<Value>,
    pub created_at: String,
    pub updated_at: String,
}

/// A playable chart of a song version.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Chart {
    pub id: String,
    pub sgv_id: String,
    pub difficulty_name: String,
    pub level: f64,
    pub note_count: Option<i64>,
    pub chart_type: Option<String>,
    pub extra: Option<Value>,
    pub created_at: String,
    pub updated_at: String,
}

// ── Tags ────────────────────────────────────────────────────────────────────

/// A tag that can be attached to songs. Identity is the unique `name`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SongTagItem {
    pub id: String,
    pub name: String,
    pub created_at: String,
}

/// Join row between a song and a tag.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SongTag {
    pub id: String,
    pub song_id: String,
    pub tag_id: String,
}

// ── Resolution bookkeeping ──────────────────────────────────────────────────

/// Kinds of rows the ingestion pipeline can touch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Game,
    Dlc,
    Song,
    SongInfo,
    Composer,
    SongComposer,
    SongGameVersion,
    Chart,
    Tag,
    SongTag,
}

impl EntityKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Game => "game",
            Self::Dlc => "dlc",
            Self::Song => "song",
            Self::SongInfo => "song_info",
            Self::Composer => "composer",
            Self::SongComposer => "song_composer",
            Self::SongGameVersion => "song_game_version",
            Self::Chart => "chart",
            Self::Tag => "tag",
            Self::SongTag => "song_tag",
        }
    }
}

impl std::fmt::Display for EntityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a resolver did to produce its row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    /// No row matched the identity key; a new one was inserted.
    Created,
    /// An existing row matched and was returned untouched.
    Reused,
    /// An existing row matched and its attributes were overwritten.
    Updated,
}

impl Outcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Reused => "reused",
            Self::Updated => "updated",
        }
    }
}

/// A row returned by a resolver, together with how it was obtained.
#[derive(Debug, Clone, PartialEq)]
pub struct Resolved<T> {
    pub row: T,
    pub outcome: Outcome,
}

impl<T> Resolved<T> {
    pub fn created(row: T) -> Self {
        Self {
            row,
            outcome: Outcome::Created,
        }
    }

    pub fn reused(row: T) -> Self {
        Self {
            row,
            outcome: Outcome::Reused,
        }
    }

    pub fn updated(row: T) -> Self {
        Self {
            row,
            outcome: Outcome::Updated,
        }
    }
}

// ── Read-back graph ─────────────────────────────────────────────────────────

/// A game with its whole owned subtree, as returned by materialization.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GameGraph {
    #[serde(flatten)]
    pub game: Game,
    pub dlcs: Vec<Dlc>,
    pub song_game_versions: Vec<VersionNode>,
}

/// A song version inside a [`GameGraph`].
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VersionNode {
    #[serde(flatten)]
    pub version: SongGameVersion,
    pub song: SongNode,
    pub dlc: Option<Dlc>,
    pub charts: Vec<Chart>,
}

/// A song with its info record, composers and tags.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SongNode {
    #[serde(flatten)]
    pub song: Song,
    pub info: Option<SongInfo>,
    pub composers: Vec<Composer>,
    pub tags: Vec<SongTagItem>,
}

// ── Ingestion tracking ──────────────────────────────────────────────────────

/// Log entry for one committed ingestion call.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IngestLog {
    pub id: i64,
    pub game_name: String,
    pub source: Option<String>,
    pub ingested_at: String,
    pub songs: i64,
    pub records_created: i64,
    pub records_reused: i64,
    pub records_updated: i64,
    pub courses_skipped: i64,
}
