//! SQLite schema creation and version tracking.

use rusqlite::Connection;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SchemaError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("Unsupported schema: expected version {expected}, found {found}")]
    VersionMismatch { expected: i32, found: i32 },
}

/// Current schema version. Increment when adding migrations.
pub const CURRENT_VERSION: i32 = 1;

/// Create all tables and indexes if they don't exist.
///
/// Idempotent: every statement is `IF NOT EXISTS`.
pub fn create_schema(conn: &Connection) -> Result<(), SchemaError> {
    conn.execute_batch(SCHEMA_SQL)?;
    if get_schema_version(conn)? < CURRENT_VERSION {
        set_schema_version(conn, CURRENT_VERSION)?;
    }
    Ok(())
}

/// Open or create an archive database at the given path.
pub fn open_database(path: &std::path::Path) -> Result<Connection, SchemaError> {
    let conn = Connection::open(path)?;
    conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")?;

    let version = get_schema_version(&conn)?;
    if version == 0 {
        create_schema(&conn)?;
    } else if version > CURRENT_VERSION {
        return Err(SchemaError::VersionMismatch {
            expected: CURRENT_VERSION,
            found: version,
        });
    }

    Ok(conn)
}

/// Open an in-memory database with the full schema. Useful for testing.
pub fn open_memory() -> Result<Connection, SchemaError> {
    let conn = Connection::open_in_memory()?;
    conn.execute_batch("PRAGMA foreign_keys=ON;")?;
    create_schema(&conn)?;
    Ok(conn)
}

/// Get the current schema version, or 0 if no schema exists.
pub fn get_schema_version(conn: &Connection) -> Result<i32, SchemaError> {
    let exists: bool = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE type='table' AND name='schema_version')",
        [],
        |row| row.get(0),
    )?;

    if !exists {
        return Ok(0);
    }

    let version: i32 = conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM schema_version",
        [],
        |row| row.get(0),
    )?;
    Ok(version)
}

fn set_schema_version(conn: &Connection, version: i32) -> Result<(), SchemaError> {
    conn.execute(
        "INSERT INTO schema_version (version) VALUES (?1)",
        [version],
    )?;
    Ok(())
}

const SCHEMA_SQL: &str = r#"
-- Schema version tracking
CREATE TABLE IF NOT EXISTS schema_version (
    version INTEGER NOT NULL,
    applied_at TEXT NOT NULL DEFAULT (datetime('now'))
);

-- Games
CREATE TABLE IF NOT EXISTS games (
    id TEXT PRIMARY KEY,
    name TEXT NOT NULL UNIQUE,
    release_date TEXT,
    publisher TEXT,
    extra TEXT,
    created_at TEXT NOT NULL DEFAULT (datetime('now')),
    updated_at TEXT NOT NULL DEFAULT (datetime('now'))
);

CREATE TABLE IF NOT EXISTS dlcs (
    id TEXT PRIMARY KEY,
    game_id TEXT NOT NULL REFERENCES games(id),
    dlc_name TEXT NOT NULL,
    release_date TEXT,
    extra TEXT,
    created_at TEXT NOT NULL DEFAULT (datetime('now')),
    updated_at TEXT NOT NULL DEFAULT (datetime('now')),
    UNIQUE(game_id, dlc_name)
);

-- Songs (title is a lookup key, not a unique one)
CREATE TABLE IF NOT EXISTS songs (
    id TEXT PRIMARY KEY,
    title TEXT NOT NULL,
    original_title TEXT,
    created_at TEXT NOT NULL DEFAULT (datetime('now')),
    updated_at TEXT NOT NULL DEFAULT (datetime('now'))
);
CREATE INDEX IF NOT EXISTS idx_songs_title ON songs(title);

CREATE TABLE IF NOT EXISTS song_infos (
    id TEXT PRIMARY KEY,
    song_id TEXT NOT NULL UNIQUE REFERENCES songs(id),
    bpm REAL,
    beat TEXT,
    length_sec INTEGER,
    extra TEXT,
    created_at TEXT NOT NULL DEFAULT (datetime('now')),
    updated_at TEXT NOT NULL DEFAULT (datetime('now'))
);

-- Composers
CREATE TABLE IF NOT EXISTS composers (
    id TEXT PRIMARY KEY,
    name TEXT NOT NULL,
    company_name TEXT,
    extra TEXT,
    created_at TEXT NOT NULL DEFAULT (datetime('now')),
    updated_at TEXT NOT NULL DEFAULT (datetime('now')),
    UNIQUE(name, company_name)
);
-- UNIQUE treats NULLs as distinct, so the company-less identity needs its own index
CREATE UNIQUE INDEX IF NOT EXISTS idx_composers_name_no_company
    ON composers(name) WHERE company_name IS NULL;

CREATE TABLE IF NOT EXISTS song_composers (
    id TEXT PRIMARY KEY,
    song_id TEXT NOT NULL REFERENCES songs(id),
    composer_id TEXT NOT NULL REFERENCES composers(id),
    UNIQUE(song_id, composer_id)
);

-- Appearance of a song in a game; no natural key
CREATE TABLE IF NOT EXISTS song_game_versions (
    id TEXT PRIMARY KEY,
    song_id TEXT NOT NULL REFERENCES songs(id),
    game_id TEXT NOT NULL REFERENCES games(id),
    dlc_id TEXT REFERENCES dlcs(id),
    in_game_title TEXT,
    bpm_override REAL,
    length_sec INTEGER,
    arrangement TEXT,
    first_version TEXT,
    first_date TEXT,
    extra TEXT,
    created_at TEXT NOT NULL DEFAULT (datetime('now')),
    updated_at TEXT NOT NULL DEFAULT (datetime('now'))
);
CREATE INDEX IF NOT EXISTS idx_sgv_game ON song_game_versions(game_id);
CREATE INDEX IF NOT EXISTS idx_sgv_song ON song_game_versions(song_id);

CREATE TABLE IF NOT EXISTS charts (
    id TEXT PRIMARY KEY,
    sgv_id TEXT NOT NULL REFERENCES song_game_versions(id),
    difficulty_name TEXT NOT NULL,
    level REAL NOT NULL,
    note_count INTEGER,
    chart_type TEXT,
    extra TEXT,
    created_at TEXT NOT NULL DEFAULT (datetime('now')),
    updated_at TEXT NOT NULL DEFAULT (datetime('now'))
);
CREATE INDEX IF NOT EXISTS idx_charts_sgv ON charts(sgv_id);

-- Tags
CREATE TABLE IF NOT EXISTS song_tag_items (
    id TEXT PRIMARY KEY,
    name TEXT NOT NULL UNIQUE,
    created_at TEXT NOT NULL DEFAULT (datetime('now'))
);

CREATE TABLE IF NOT EXISTS song_tags (
    id TEXT PRIMARY KEY,
    song_id TEXT NOT NULL REFERENCES songs(id),
    tag_id TEXT NOT NULL REFERENCES song_tag_items(id),
    UNIQUE(song_id, tag_id)
);

-- Courses (not populated by ingestion)
CREATE TABLE IF NOT EXISTS courses (
    id TEXT PRIMARY KEY,
    game_id TEXT NOT NULL REFERENCES games(id),
    dlc_id TEXT REFERENCES dlcs(id),
    course_name TEXT NOT NULL,
    difficulty TEXT,
    extra TEXT,
    created_at TEXT NOT NULL DEFAULT (datetime('now')),
    updated_at TEXT NOT NULL DEFAULT (datetime('now')),
    UNIQUE(game_id, course_name)
);

CREATE TABLE IF NOT EXISTS course_entries (
    id TEXT PRIMARY KEY,
    course_id TEXT NOT NULL REFERENCES courses(id),
    chart_id TEXT NOT NULL REFERENCES charts(id),
    position INTEGER NOT NULL,
    extra TEXT,
    UNIQUE(course_id, position)
);

-- Ingestion tracking
CREATE TABLE IF NOT EXISTS ingest_log (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    game_name TEXT NOT NULL,
    source TEXT,
    ingested_at TEXT NOT NULL,
    songs INTEGER NOT NULL DEFAULT 0,
    records_created INTEGER NOT NULL DEFAULT 0,
    records_reused INTEGER NOT NULL DEFAULT 0,
    records_updated INTEGER NOT NULL DEFAULT 0,
    courses_skipped INTEGER NOT NULL DEFAULT 0
);
"#;
