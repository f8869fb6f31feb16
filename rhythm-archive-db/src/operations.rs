//! Entity resolvers: find-or-create (and find-or-upsert) per entity type.
//!
//! Every resolver issues at most one read and at most one write. None of them
//! catch or retry store errors; a unique-constraint violation on create means a
//! concurrent writer won the race and surfaces as [`OperationError::Conflict`].

use chrono::NaiveDate;
use rhythm_archive_catalog::document::{
    ChartInput, ComposerInput, GameInput, GameVersionInput, SongInfoInput,
};
use rhythm_archive_catalog::types::*;
use rusqlite::ffi::{self, ErrorCode};
use rusqlite::{Connection, params};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum OperationError {
    #[error("SQLite error: {0}")]
    Sqlite(rusqlite::Error),
    #[error("Entity not found: {entity_type} '{id}'")]
    NotFound { entity_type: String, id: String },
    #[error("Conflict: {entity} {key} was created concurrently")]
    Conflict { entity: EntityKind, key: String },
    #[error("Store busy: {0}")]
    Busy(rusqlite::Error),
}

impl From<rusqlite::Error> for OperationError {
    fn from(e: rusqlite::Error) -> Self {
        match e.sqlite_error_code() {
            Some(ErrorCode::DatabaseBusy) | Some(ErrorCode::DatabaseLocked) => Self::Busy(e),
            _ => Self::Sqlite(e),
        }
    }
}

impl OperationError {
    /// Whether re-submitting the whole unit of work may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Conflict { .. } | Self::Busy(_))
    }
}

/// Classify an error raised by a create statement.
fn write_error(e: rusqlite::Error, entity: EntityKind, key: impl FnOnce() -> String) -> OperationError {
    let unique = e.sqlite_error().is_some_and(|err| {
        err.extended_code == ffi::SQLITE_CONSTRAINT_UNIQUE
            || err.extended_code == ffi::SQLITE_CONSTRAINT_PRIMARYKEY
    });
    if unique {
        OperationError::Conflict { entity, key: key() }
    } else {
        e.into()
    }
}

fn optional<T>(result: rusqlite::Result<T>) -> Result<Option<T>, OperationError> {
    match result {
        Ok(row) => Ok(Some(row)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Generate a new opaque row identifier (32 lowercase hex chars).
pub fn new_id() -> String {
    uuid::Uuid::new_v4().simple().to_string()
}

// ── Game ────────────────────────────────────────────────────────────────────

pub(crate) const GAME_COLUMNS: &str =
    "id, name, release_date, publisher, extra, created_at, updated_at";

/// Find a game by its unique name.
pub fn find_game_by_name(conn: &Connection, name: &str) -> Result<Option<Game>, OperationError> {
    optional(conn.query_row(
        &format!("SELECT {GAME_COLUMNS} FROM games WHERE name = ?1"),
        params![name],
        row_to_game,
    ))
}

/// Insert a new game row.
pub fn insert_game(conn: &Connection, input: &GameInput) -> Result<Game, OperationError> {
    conn.query_row(
        &format!(
            "INSERT INTO games (id, name, release_date, publisher, extra)
             VALUES (?1, ?2, ?3, ?4, ?5)
             RETURNING {GAME_COLUMNS}"
        ),
        params![
            new_id(),
            input.name,
            input.release_date,
            input.publisher,
            input.extra,
        ],
        row_to_game,
    )
    .map_err(|e| write_error(e, EntityKind::Game, || format!("'{}'", input.name)))
}

/// Find a game by name, creating it from `input` when absent.
///
/// An existing game's attributes are never updated.
pub fn resolve_game(conn: &Connection, input: &GameInput) -> Result<Resolved<Game>, OperationError> {
    if let Some(game) = find_game_by_name(conn, &input.name)? {
        log::debug!("game '{}' reused ({})", game.name, game.id);
        return Ok(Resolved::reused(game));
    }
    let game = insert_game(conn, input)?;
    log::debug!("game '{}' created ({})", game.name, game.id);
    Ok(Resolved::created(game))
}

// ── Dlc ─────────────────────────────────────────────────────────────────────

pub(crate) const DLC_COLUMNS: &str =
    "id, game_id, dlc_name, release_date, extra, created_at, updated_at";

/// Find a DLC by its natural key.
pub fn find_dlc(
    conn: &Connection,
    game_id: &str,
    dlc_name: &str,
) -> Result<Option<Dlc>, OperationError> {
    optional(conn.query_row(
        &format!("SELECT {DLC_COLUMNS} FROM dlcs WHERE game_id = ?1 AND dlc_name = ?2"),
        params![game_id, dlc_name],
        row_to_dlc,
    ))
}

/// Insert a new DLC row.
pub fn insert_dlc(
    conn: &Connection,
    game_id: &str,
    dlc_name: &str,
    release_date: Option<NaiveDate>,
) -> Result<Dlc, OperationError> {
    conn.query_row(
        &format!(
            "INSERT INTO dlcs (id, game_id, dlc_name, release_date)
             VALUES (?1, ?2, ?3, ?4)
             RETURNING {DLC_COLUMNS}"
        ),
        params![new_id(), game_id, dlc_name, release_date],
        row_to_dlc,
    )
    .map_err(|e| write_error(e, EntityKind::Dlc, || format!("'{dlc_name}' (game {game_id})")))
}

/// Overwrite a DLC's release date.
pub fn update_dlc_release_date(
    conn: &Connection,
    id: &str,
    release_date: Option<NaiveDate>,
) -> Result<Dlc, OperationError> {
    let updated = optional(conn.query_row(
        &format!(
            "UPDATE dlcs SET release_date = ?2, updated_at = datetime('now')
             WHERE id = ?1
             RETURNING {DLC_COLUMNS}"
        ),
        params![id, release_date],
        row_to_dlc,
    ))?;
    updated.ok_or_else(|| OperationError::NotFound {
        entity_type: "dlc".to_string(),
        id: id.to_string(),
    })
}

/// Upsert a DLC keyed by `(game_id, dlc_name)`.
///
/// The only resolver that updates on match: `release_date` is always
/// overwritten, including with `None`.
pub fn resolve_dlc(
    conn: &Connection,
    game_id: &str,
    dlc_name: &str,
    release_date: Option<NaiveDate>,
) -> Result<Resolved<Dlc>, OperationError> {
    match find_dlc(conn, game_id, dlc_name)? {
        Some(existing) => {
            let dlc = update_dlc_release_date(conn, &existing.id, release_date)?;
            log::debug!("dlc '{}' updated ({})", dlc.dlc_name, dlc.id);
            Ok(Resolved::updated(dlc))
        }
        None => {
            let dlc = insert_dlc(conn, game_id, dlc_name, release_date)?;
            log::debug!("dlc '{}' created ({})", dlc.dlc_name, dlc.id);
            Ok(Resolved::created(dlc))
        }
    }
}

// ── Song ────────────────────────────────────────────────────────────────────

pub(crate) const SONG_COLUMNS: &str = "id, title, original_title, created_at, updated_at";

/// Find the first song (in insertion order) with an exact title.
pub fn find_song_by_title(conn: &Connection, title: &str) -> Result<Option<Song>, OperationError> {
    optional(conn.query_row(
        &format!("SELECT {SONG_COLUMNS} FROM songs WHERE title = ?1 ORDER BY rowid LIMIT 1"),
        params![title],
        row_to_song,
    ))
}

/// Insert a new song row.
pub fn insert_song(
    conn: &Connection,
    title: &str,
    original_title: Option<&str>,
) -> Result<Song, OperationError> {
    conn.query_row(
        &format!(
            "INSERT INTO songs (id, title, original_title)
             VALUES (?1, ?2, ?3)
             RETURNING {SONG_COLUMNS}"
        ),
        params![new_id(), title, original_title],
        row_to_song,
    )
    .map_err(|e| write_error(e, EntityKind::Song, || format!("'{title}'")))
}

/// Find a song by title, creating it when absent.
///
/// Title is not unique in the store, so concurrent callers may both create.
pub fn resolve_song(
    conn: &Connection,
    title: &str,
    original_title: Option<&str>,
) -> Result<Resolved<Song>, OperationError> {
    if let Some(song) = find_song_by_title(conn, title)? {
        log::debug!("song '{}' reused ({})", song.title, song.id);
        return Ok(Resolved::reused(song));
    }
    let song = insert_song(conn, title, original_title)?;
    log::debug!("song '{}' created ({})", song.title, song.id);
    Ok(Resolved::created(song))
}

// ── SongInfo ────────────────────────────────────────────────────────────────

pub(crate) const SONG_INFO_COLUMNS: &str =
    "id, song_id, bpm, beat, length_sec, extra, created_at, updated_at";

pub fn find_song_info(conn: &Connection, song_id: &str) -> Result<Option<SongInfo>, OperationError> {
    optional(conn.query_row(
        &format!("SELECT {SONG_INFO_COLUMNS} FROM song_infos WHERE song_id = ?1"),
        params![song_id],
        row_to_song_info,
    ))
}

/// Upsert the info record of a song; attributes are overwritten on repeat.
pub fn upsert_song_info(
    conn: &Connection,
    song_id: &str,
    input: &SongInfoInput,
) -> Result<Resolved<SongInfo>, OperationError> {
    if let Some(existing) = find_song_info(conn, song_id)? {
        let info = conn.query_row(
            &format!(
                "UPDATE song_infos
                 SET bpm = ?2, beat = ?3, length_sec = ?4, extra = ?5, updated_at = datetime('now')
                 WHERE id = ?1
                 RETURNING {SONG_INFO_COLUMNS}"
            ),
            params![existing.id, input.bpm, input.beat, input.length_sec, input.extra],
            row_to_song_info,
        )?;
        return Ok(Resolved::updated(info));
    }

    let info = conn
        .query_row(
            &format!(
                "INSERT INTO song_infos (id, song_id, bpm, beat, length_sec, extra)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                 RETURNING {SONG_INFO_COLUMNS}"
            ),
            params![new_id(), song_id, input.bpm, input.beat, input.length_sec, input.extra],
            row_to_song_info,
        )
        .map_err(|e| write_error(e, EntityKind::SongInfo, || format!("for song {song_id}")))?;
    Ok(Resolved::created(info))
}

// ── Composer ────────────────────────────────────────────────────────────────

pub(crate) const COMPOSER_COLUMNS: &str =
    "id, name, company_name, extra, created_at, updated_at";

/// A blank company name means no company.
fn company_key(company_name: Option<&str>) -> Option<&str> {
    company_name.filter(|c| !c.trim().is_empty())
}

/// Find a composer by `(name, company_name)`.
///
/// With no company, only a composer whose company is NULL matches.
pub fn find_composer(
    conn: &Connection,
    name: &str,
    company_name: Option<&str>,
) -> Result<Option<Composer>, OperationError> {
    let result = match company_key(company_name) {
        Some(company) => conn.query_row(
            &format!(
                "SELECT {COMPOSER_COLUMNS} FROM composers WHERE name = ?1 AND company_name = ?2"
            ),
            params![name, company],
            row_to_composer,
        ),
        None => conn.query_row(
            &format!(
                "SELECT {COMPOSER_COLUMNS} FROM composers WHERE name = ?1 AND company_name IS NULL"
            ),
            params![name],
            row_to_composer,
        ),
    };
    optional(result)
}

/// Insert a new composer row.
pub fn insert_composer(conn: &Connection, input: &ComposerInput) -> Result<Composer, OperationError> {
    let company = company_key(input.company_name.as_deref());
    conn.query_row(
        &format!(
            "INSERT INTO composers (id, name, company_name, extra)
             VALUES (?1, ?2, ?3, ?4)
             RETURNING {COMPOSER_COLUMNS}"
        ),
        params![new_id(), input.name, company, input.extra],
        row_to_composer,
    )
    .map_err(|e| {
        write_error(e, EntityKind::Composer, || match company {
            Some(company) => format!("'{}' ({company})", input.name),
            None => format!("'{}'", input.name),
        })
    })
}

/// Find a composer by identity, creating it when absent.
pub fn resolve_composer(
    conn: &Connection,
    input: &ComposerInput,
) -> Result<Resolved<Composer>, OperationError> {
    if let Some(composer) = find_composer(conn, &input.name, input.company_name.as_deref())? {
        log::debug!("composer '{}' reused ({})", composer.name, composer.id);
        return Ok(Resolved::reused(composer));
    }
    let composer = insert_composer(conn, input)?;
    log::debug!("composer '{}' created ({})", composer.name, composer.id);
    Ok(Resolved::created(composer))
}

/// Attach a composer to a song; a no-op when the link already exists.
pub fn upsert_song_composer(
    conn: &Connection,
    song_id: &str,
    composer_id: &str,
) -> Result<Resolved<SongComposer>, OperationError> {
    let existing = optional(conn.query_row(
        "SELECT id, song_id, composer_id FROM song_composers
         WHERE song_id = ?1 AND composer_id = ?2",
        params![song_id, composer_id],
        |row| {
            Ok(SongComposer {
                id: row.get(0)?,
                song_id: row.get(1)?,
                composer_id: row.get(2)?,
            })
        },
    ))?;
    if let Some(link) = existing {
        return Ok(Resolved::reused(link));
    }

    let link = SongComposer {
        id: new_id(),
        song_id: song_id.to_string(),
        composer_id: composer_id.to_string(),
    };
    conn.execute(
        "INSERT INTO song_composers (id, song_id, composer_id) VALUES (?1, ?2, ?3)",
        params![link.id, link.song_id, link.composer_id],
    )
    .map_err(|e| {
        write_error(e, EntityKind::SongComposer, || {
            format!("(song {song_id}, composer {composer_id})")
        })
    })?;
    Ok(Resolved::created(link))
}

// ── Tag ─────────────────────────────────────────────────────────────────────

pub(crate) const TAG_COLUMNS: &str = "id, name, created_at";

pub fn find_tag_by_name(conn: &Connection, name: &str) -> Result<Option<SongTagItem>, OperationError> {
    optional(conn.query_row(
        &format!("SELECT {TAG_COLUMNS} FROM song_tag_items WHERE name = ?1"),
        params![name],
        row_to_tag,
    ))
}

pub fn insert_tag(conn: &Connection, name: &str) -> Result<SongTagItem, OperationError> {
    conn.query_row(
        &format!(
            "INSERT INTO song_tag_items (id, name) VALUES (?1, ?2)
             RETURNING {TAG_COLUMNS}"
        ),
        params![new_id(), name],
        row_to_tag,
    )
    .map_err(|e| write_error(e, EntityKind::Tag, || format!("'{name}'")))
}

/// Find a tag by name, creating it when absent.
pub fn resolve_tag(conn: &Connection, name: &str) -> Result<Resolved<SongTagItem>, OperationError> {
    if let Some(tag) = find_tag_by_name(conn, name)? {
        return Ok(Resolved::reused(tag));
    }
    let tag = insert_tag(conn, name)?;
    log::debug!("tag '{}' created ({})", tag.name, tag.id);
    Ok(Resolved::created(tag))
}

/// Attach a tag to a song; a no-op when the link already exists.
pub fn upsert_song_tag(
    conn: &Connection,
    song_id: &str,
    tag_id: &str,
) -> Result<Resolved<SongTag>, OperationError> {
    let existing = optional(conn.query_row(
        "SELECT id, song_id, tag_id FROM song_tags WHERE song_id = ?1 AND tag_id = ?2",
        params![song_id, tag_id],
        |row| {
            Ok(SongTag {
                id: row.get(0)?,
                song_id: row.get(1)?,
                tag_id: row.get(2)?,
            })
        },
    ))?;
    if let Some(link) = existing {
        return Ok(Resolved::reused(link));
    }

    let link = SongTag {
        id: new_id(),
        song_id: song_id.to_string(),
        tag_id: tag_id.to_string(),
    };
    conn.execute(
        "INSERT INTO song_tags (id, song_id, tag_id) VALUES (?1, ?2, ?3)",
        params![link.id, link.song_id, link.tag_id],
    )
    .map_err(|e| {
        write_error(e, EntityKind::SongTag, || format!("(song {song_id}, tag {tag_id})"))
    })?;
    Ok(Resolved::created(link))
}

// ── Versions and charts (always created) ────────────────────────────────────

pub(crate) const VERSION_COLUMNS: &str = "id, song_id, game_id, dlc_id, in_game_title, bpm_override,
     length_sec, arrangement, first_version, first_date, extra, created_at, updated_at";

/// Create a new song-in-game version row. There is no existence check.
pub fn insert_song_game_version(
    conn: &Connection,
    song_id: &str,
    game_id: &str,
    dlc_id: Option<&str>,
    input: &GameVersionInput,
) -> Result<SongGameVersion, OperationError> {
    let version = conn.query_row(
        &format!(
            "INSERT INTO song_game_versions (id, song_id, game_id, dlc_id, in_game_title,
                 bpm_override, length_sec, arrangement, first_version, first_date, extra)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
             RETURNING {VERSION_COLUMNS}"
        ),
        params![
            new_id(),
            song_id,
            game_id,
            dlc_id,
            input.in_game_title,
            input.bpm_override,
            input.length_sec,
            input.arrangement,
            input.first_version,
            input.first_date,
            input.extra,
        ],
        row_to_version,
    )?;
    Ok(version)
}

pub(crate) const CHART_COLUMNS: &str =
    "id, sgv_id, difficulty_name, level, note_count, chart_type, extra, created_at, updated_at";

/// Create a new chart under a song version. There is no existence check.
pub fn insert_chart(
    conn: &Connection,
    sgv_id: &str,
    input: &ChartInput,
) -> Result<Chart, OperationError> {
    let chart = conn.query_row(
        &format!(
            "INSERT INTO charts (id, sgv_id, difficulty_name, level, note_count, chart_type, extra)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
             RETURNING {CHART_COLUMNS}"
        ),
        params![
            new_id(),
            sgv_id,
            input.difficulty_name,
            input.level,
            input.note_count,
            input.chart_type,
            input.extra,
        ],
        row_to_chart,
    )?;
    Ok(chart)
}

// ── Ingest Log Operations ───────────────────────────────────────────────────

/// Insert an ingestion log entry. Returns the generated ID.
pub fn insert_ingest_log(conn: &Connection, log: &IngestLog) -> Result<i64, OperationError> {
    conn.execute(
        "INSERT INTO ingest_log (game_name, source, ingested_at, songs,
             records_created, records_reused, records_updated, courses_skipped)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        params![
            log.game_name,
            log.source,
            log.ingested_at,
            log.songs,
            log.records_created,
            log.records_reused,
            log.records_updated,
            log.courses_skipped,
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

// ── Row Mapping Helpers ─────────────────────────────────────────────────────

pub(crate) fn row_to_game(row: &rusqlite::Row<'_>) -> rusqlite::Result<Game> {
    Ok(Game {
        id: row.get(0)?,
        name: row.get(1)?,
        release_date: row.get(2)?,
        publisher: row.get(3)?,
        extra: row.get(4)?,
        created_at: row.get(5)?,
        updated_at: row.get(6)?,
    })
}

pub(crate) fn row_to_dlc(row: &rusqlite::Row<'_>) -> rusqlite::Result<Dlc> {
    Ok(Dlc {
        id: row.get(0)?,
        game_id: row.get(1)?,
        dlc_name: row.get(2)?,
        release_date: row.get(3)?,
        extra: row.get(4)?,
        created_at: row.get(5)?,
        updated_at: row.get(6)?,
    })
}

pub(crate) fn row_to_song(row: &rusqlite::Row<'_>) -> rusqlite::Result<Song> {
    Ok(Song {
        id: row.get(0)?,
        title: row.get(1)?,
        original_title: row.get(2)?,
        created_at: row.get(3)?,
        updated_at: row.get(4)?,
    })
}

pub(crate) fn row_to_song_info(row: &rusqlite::Row<'_>) -> rusqlite::Result<SongInfo> {
    Ok(SongInfo {
        id: row.get(0)?,
        song_id: row.get(1)?,
        bpm: row.get(2)?,
        beat: row.get(3)?,
        length_sec: row.get(4)?,
        extra: row.get(5)?,
        created_at: row.get(6)?,
        updated_at: row.get(7)?,
    })
}

pub(crate) fn row_to_composer(row: &rusqlite::Row<'_>) -> rusqlite::Result<Composer> {
    Ok(Composer {
        id: row.get(0)?,
        name: row.get(1)?,
        company_name: row.get(2)?,
        extra: row.get(3)?,
        created_at: row.get(4)?,
        updated_at: row.get(5)?,
    })
}

pub(crate) fn row_to_tag(row: &rusqlite::Row<'_>) -> rusqlite::Result<SongTagItem> {
    Ok(SongTagItem {
        id: row.get(0)?,
        name: row.get(1)?,
        created_at: row.get(2)?,
    })
}

pub(crate) fn row_to_version(row: &rusqlite::Row<'_>) -> rusqlite::Result<SongGameVersion> {
    Ok(SongGameVersion {
        id: row.get(0)?,
        song_id: row.get(1)?,
        game_id: row.get(2)?,
        dlc_id: row.get(3)?,
        in_game_title: row.get(4)?,
        bpm_override: row.get(5)?,
        length_sec: row.get(6)?,
        arrangement: row.get(7)?,
        first_version: row.get(8)?,
        first_date: row.get(9)?,
        extra: row.get(10)?,
        created_at: row.get(11)?,
        updated_at: row.get(12)?,
    })
}

pub(crate) fn row_to_chart(row: &rusqlite::Row<'_>) -> rusqlite::Result<Chart> {
    Ok(Chart {
        id: row.get(0)?,
        sgv_id: row.get(1)?,
        difficulty_name: row.get(2)?,
        level: row.get(3)?,
        note_count: row.get(4)?,
        chart_type: row.get(5)?,
        extra: row.get(6)?,
        created_at: row.get(7)?,
        updated_at: row.get(8)?,
    })
}
