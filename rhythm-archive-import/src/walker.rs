//! Walk an ingestion document and resolve every entity it mentions.
//!
//! The traversal is depth-first in document order: the game, then for each
//! song its info record, composers, game versions (DLC, version row, charts)
//! and finally its tags. The walker performs no transaction handling of its
//! own; run it inside a transaction (see [`crate::ingest`]) to get
//! all-or-nothing semantics.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use rhythm_archive_catalog::document::{CatalogDocument, GameVersionInput, SongInput};
use rhythm_archive_catalog::types::*;
use rhythm_archive_db::operations;
use rusqlite::Connection;

use crate::ingest::IngestError;
use crate::progress::IngestProgress;

// ── Results ─────────────────────────────────────────────────────────────────

/// Everything an ingestion call touched, grouped by song in document order.
#[derive(Debug, Clone)]
pub struct IngestResult {
    pub game: Resolved<Game>,
    pub songs: Vec<SongResult>,
    /// Every row touched, in the order the walk touched it.
    pub touched: Vec<Touched>,
    pub stats: IngestStats,
    /// Courses present in the document. They are never written.
    pub courses_skipped: usize,
    /// False when the unit was rolled back on purpose (dry run).
    pub committed: bool,
}

#[derive(Debug, Clone)]
pub struct SongResult {
    pub song: Resolved<Song>,
    pub song_info: Option<Resolved<SongInfo>>,
    pub composers: Vec<Resolved<Composer>>,
    pub game_versions: Vec<GameVersionResult>,
    pub tags: Vec<Resolved<SongTagItem>>,
}

#[derive(Debug, Clone)]
pub struct GameVersionResult {
    pub version: SongGameVersion,
    pub dlc: Option<Resolved<Dlc>>,
    pub charts: Vec<Chart>,
}

/// One `(entity kind, row id)` pair produced by the walk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Touched {
    pub kind: EntityKind,
    pub id: String,
    pub outcome: Outcome,
}

/// Per-kind outcome counters for one walk.
#[derive(Debug, Clone, Default)]
pub struct IngestStats {
    counts: HashMap<EntityKind, OutcomeCounts>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OutcomeCounts {
    pub created: u64,
    pub reused: u64,
    pub updated: u64,
}

impl IngestStats {
    fn record(&mut self, kind: EntityKind, outcome: Outcome) {
        let counts = self.counts.entry(kind).or_default();
        match outcome {
            Outcome::Created => counts.created += 1,
            Outcome::Reused => counts.reused += 1,
            Outcome::Updated => counts.updated += 1,
        }
    }

    pub fn get(&self, kind: EntityKind) -> OutcomeCounts {
        self.counts.get(&kind).copied().unwrap_or_default()
    }

    pub fn created(&self, kind: EntityKind) -> u64 {
        self.get(kind).created
    }

    pub fn reused(&self, kind: EntityKind) -> u64 {
        self.get(kind).reused
    }

    pub fn total(&self) -> OutcomeCounts {
        self.counts
            .values()
            .fold(OutcomeCounts::default(), |acc, c| OutcomeCounts {
                created: acc.created + c.created,
                reused: acc.reused + c.reused,
                updated: acc.updated + c.updated,
            })
    }
}

// ── Step guard ──────────────────────────────────────────────────────────────

/// Checked before every resolver step; aborts the walk on cancellation or
/// when the time budget is spent.
#[derive(Debug, Clone)]
pub struct StepGuard {
    started: Instant,
    timeout: Option<Duration>,
    cancel: Option<Arc<AtomicBool>>,
}

impl StepGuard {
    pub fn new(timeout: Option<Duration>, cancel: Option<Arc<AtomicBool>>) -> Self {
        Self {
            started: Instant::now(),
            timeout,
            cancel,
        }
    }

    /// A guard that never trips.
    pub fn unbounded() -> Self {
        Self::new(None, None)
    }

    pub fn check(&self) -> Result<(), IngestError> {
        if self
            .cancel
            .as_ref()
            .is_some_and(|flag| flag.load(Ordering::Relaxed))
        {
            return Err(IngestError::Cancelled);
        }
        if let Some(timeout) = self.timeout {
            let elapsed = self.started.elapsed();
            if elapsed >= timeout {
                return Err(IngestError::TimedOut { elapsed });
            }
        }
        Ok(())
    }
}

// ── Walk ────────────────────────────────────────────────────────────────────

#[derive(Default)]
struct Ledger {
    touched: Vec<Touched>,
    stats: IngestStats,
}

impl Ledger {
    fn touch(&mut self, kind: EntityKind, id: &str, outcome: Outcome) {
        self.stats.record(kind, outcome);
        self.touched.push(Touched {
            kind,
            id: id.to_string(),
            outcome,
        });
    }
}

/// Resolve every entity in `doc` against `conn`, in document order.
///
/// The optional `progress` callback is invoked after each song is walked.
pub fn walk_document(
    conn: &Connection,
    doc: &CatalogDocument,
    guard: &StepGuard,
    progress: Option<&dyn IngestProgress>,
) -> Result<IngestResult, IngestError> {
    let mut ledger = Ledger::default();

    guard.check()?;
    let game = operations::resolve_game(conn, &doc.game)?;
    ledger.touch(EntityKind::Game, &game.row.id, game.outcome);

    let total = doc.songs.len();
    let mut songs = Vec::with_capacity(total);
    for (i, song) in doc.songs.iter().enumerate() {
        songs.push(walk_song(conn, &game.row, song, guard, &mut ledger)?);

        if let Some(p) = progress {
            p.on_song(i + 1, total, &song.title);
        }
    }

    let courses_skipped = doc.courses.len();
    if courses_skipped > 0 {
        log::warn!(
            "'{}': skipping {} course(s), course ingestion is not implemented",
            game.row.name,
            courses_skipped
        );
    }

    Ok(IngestResult {
        game,
        songs,
        touched: ledger.touched,
        stats: ledger.stats,
        courses_skipped,
        committed: false,
    })
}

fn walk_song(
    conn: &Connection,
    game: &Game,
    input: &SongInput,
    guard: &StepGuard,
    ledger: &mut Ledger,
) -> Result<SongResult, IngestError> {
    guard.check()?;
    let song = operations::resolve_song(conn, &input.title, input.original_title.as_deref())?;
    ledger.touch(EntityKind::Song, &song.row.id, song.outcome);
    let song_id = song.row.id.clone();

    let song_info = match &input.song_info {
        Some(info) => {
            guard.check()?;
            let info = operations::upsert_song_info(conn, &song_id, info)?;
            ledger.touch(EntityKind::SongInfo, &info.row.id, info.outcome);
            Some(info)
        }
        None => None,
    };

    let mut composers = Vec::with_capacity(input.composers.len());
    for composer in &input.composers {
        guard.check()?;
        let composer = operations::resolve_composer(conn, composer)?;
        ledger.touch(EntityKind::Composer, &composer.row.id, composer.outcome);

        let link = operations::upsert_song_composer(conn, &song_id, &composer.row.id)?;
        ledger.touch(EntityKind::SongComposer, &link.row.id, link.outcome);
        composers.push(composer);
    }

    let mut game_versions = Vec::with_capacity(input.game_versions.len());
    for version in &input.game_versions {
        game_versions.push(walk_game_version(conn, game, &song_id, version, guard, ledger)?);
    }

    let mut tags = Vec::with_capacity(input.tags.len());
    for name in &input.tags {
        guard.check()?;
        let tag = operations::resolve_tag(conn, name)?;
        ledger.touch(EntityKind::Tag, &tag.row.id, tag.outcome);

        let link = operations::upsert_song_tag(conn, &song_id, &tag.row.id)?;
        ledger.touch(EntityKind::SongTag, &link.row.id, link.outcome);
        tags.push(tag);
    }

    Ok(SongResult {
        song,
        song_info,
        composers,
        game_versions,
        tags,
    })
}

fn walk_game_version(
    conn: &Connection,
    game: &Game,
    song_id: &str,
    input: &GameVersionInput,
    guard: &StepGuard,
    ledger: &mut Ledger,
) -> Result<GameVersionResult, IngestError> {
    guard.check()?;
    let dlc = match &input.dlc_name {
        Some(name) => {
            let dlc = operations::resolve_dlc(conn, &game.id, name, input.dlc_release_date)?;
            ledger.touch(EntityKind::Dlc, &dlc.row.id, dlc.outcome);
            Some(dlc)
        }
        None => None,
    };

    let dlc_id = dlc.as_ref().map(|d| d.row.id.as_str());
    let version = operations::insert_song_game_version(conn, song_id, &game.id, dlc_id, input)?;
    ledger.touch(EntityKind::SongGameVersion, &version.id, Outcome::Created);

    let mut charts = Vec::with_capacity(input.charts.len());
    for chart in &input.charts {
        guard.check()?;
        let chart = operations::insert_chart(conn, &version.id, chart)?;
        ledger.touch(EntityKind::Chart, &chart.id, Outcome::Created);
        charts.push(chart);
    }

    Ok(GameVersionResult {
        version,
        dlc,
        charts,
    })
}
