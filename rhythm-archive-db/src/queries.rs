//! Read queries for the archive database.
//!
//! Provides game materialization (the full owned subtree of one game),
//! listings, and statistics.

use std::collections::HashMap;

use rhythm_archive_catalog::types::*;
use rusqlite::{Connection, params};

use crate::operations::{
    CHART_COLUMNS, COMPOSER_COLUMNS, DLC_COLUMNS, GAME_COLUMNS, OperationError, SONG_COLUMNS,
    TAG_COLUMNS, VERSION_COLUMNS, find_game_by_name, find_song_info, row_to_chart,
    row_to_composer, row_to_dlc, row_to_game, row_to_song, row_to_tag, row_to_version,
};

// ── Materialization ─────────────────────────────────────────────────────────

/// Read a game and its whole owned subtree.
///
/// All reads see a single snapshot: they run in a read transaction of their
/// own, or in the caller's transaction when one is already open. Versions,
/// charts, composers and tags come back in insertion order.
pub fn materialize_game(conn: &Connection, name: &str) -> Result<GameGraph, OperationError> {
    if !conn.is_autocommit() {
        return read_game_graph(conn, name);
    }
    let tx = conn.unchecked_transaction()?;
    let graph = read_game_graph(&tx, name)?;
    tx.commit()?;
    Ok(graph)
}

fn read_game_graph(conn: &Connection, name: &str) -> Result<GameGraph, OperationError> {
    let game = find_game_by_name(conn, name)?.ok_or_else(|| OperationError::NotFound {
        entity_type: "game".to_string(),
        id: name.to_string(),
    })?;

    let dlcs = dlcs_for_game(conn, &game.id)?;
    let dlc_by_id: HashMap<&str, &Dlc> = dlcs.iter().map(|d| (d.id.as_str(), d)).collect();

    let mut songs: HashMap<String, SongNode> = HashMap::new();
    let mut nodes = Vec::new();
    for version in versions_for_game(conn, &game.id)? {
        let song = match songs.get(&version.song_id) {
            Some(node) => node.clone(),
            None => {
                let node = song_node(conn, &version.song_id)?;
                songs.insert(version.song_id.clone(), node.clone());
                node
            }
        };
        let dlc = version
            .dlc_id
            .as_deref()
            .and_then(|id| dlc_by_id.get(id))
            .map(|d| (*d).clone());
        let charts = charts_for_version(conn, &version.id)?;
        nodes.push(VersionNode {
            version,
            song,
            dlc,
            charts,
        });
    }

    Ok(GameGraph {
        game,
        dlcs,
        song_game_versions: nodes,
    })
}

fn song_node(conn: &Connection, song_id: &str) -> Result<SongNode, OperationError> {
    let song = conn.query_row(
        &format!("SELECT {SONG_COLUMNS} FROM songs WHERE id = ?1"),
        params![song_id],
        row_to_song,
    )?;
    Ok(SongNode {
        info: find_song_info(conn, song_id)?,
        composers: composers_for_song(conn, song_id)?,
        tags: tags_for_song(conn, song_id)?,
        song,
    })
}

/// List the DLCs of a game in insertion order.
pub fn dlcs_for_game(conn: &Connection, game_id: &str) -> Result<Vec<Dlc>, OperationError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {DLC_COLUMNS} FROM dlcs WHERE game_id = ?1 ORDER BY rowid"
    ))?;
    let rows = stmt.query_map(params![game_id], row_to_dlc)?;
    rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
}

/// List every song version of a game in insertion order.
pub fn versions_for_game(
    conn: &Connection,
    game_id: &str,
) -> Result<Vec<SongGameVersion>, OperationError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {VERSION_COLUMNS} FROM song_game_versions WHERE game_id = ?1 ORDER BY rowid"
    ))?;
    let rows = stmt.query_map(params![game_id], row_to_version)?;
    rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
}

/// List the charts of a song version in insertion order.
pub fn charts_for_version(conn: &Connection, sgv_id: &str) -> Result<Vec<Chart>, OperationError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {CHART_COLUMNS} FROM charts WHERE sgv_id = ?1 ORDER BY rowid"
    ))?;
    let rows = stmt.query_map(params![sgv_id], row_to_chart)?;
    rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
}

/// List a song's composers in the order they were attached.
pub fn composers_for_song(conn: &Connection, song_id: &str) -> Result<Vec<Composer>, OperationError> {
    let columns = prefixed("c", COMPOSER_COLUMNS);
    let mut stmt = conn.prepare(&format!(
        "SELECT {columns} FROM song_composers sc
         JOIN composers c ON c.id = sc.composer_id
         WHERE sc.song_id = ?1 ORDER BY sc.rowid"
    ))?;
    let rows = stmt.query_map(params![song_id], row_to_composer)?;
    rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
}

/// List a song's tags in the order they were attached.
pub fn tags_for_song(conn: &Connection, song_id: &str) -> Result<Vec<SongTagItem>, OperationError> {
    let columns = prefixed("t", TAG_COLUMNS);
    let mut stmt = conn.prepare(&format!(
        "SELECT {columns} FROM song_tags st
         JOIN song_tag_items t ON t.id = st.tag_id
         WHERE st.song_id = ?1 ORDER BY st.rowid"
    ))?;
    let rows = stmt.query_map(params![song_id], row_to_tag)?;
    rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
}

/// Qualify a comma-separated column list with a table alias.
fn prefixed(alias: &str, columns: &str) -> String {
    columns
        .split(',')
        .map(|c| format!("{alias}.{}", c.trim()))
        .collect::<Vec<_>>()
        .join(", ")
}

// ── Game Listing ────────────────────────────────────────────────────────────

/// A game with counts of what hangs off it.
#[derive(Debug)]
pub struct GameSummary {
    pub game: Game,
    pub dlcs: i64,
    pub songs: i64,
    pub versions: i64,
}

/// List all games ordered by name.
pub fn list_games(conn: &Connection) -> Result<Vec<GameSummary>, OperationError> {
    let columns = prefixed("g", GAME_COLUMNS);
    let mut stmt = conn.prepare(&format!(
        "SELECT {columns},
                (SELECT COUNT(*) FROM dlcs d WHERE d.game_id = g.id),
                (SELECT COUNT(DISTINCT v.song_id) FROM song_game_versions v WHERE v.game_id = g.id),
                (SELECT COUNT(*) FROM song_game_versions v WHERE v.game_id = g.id)
         FROM games g ORDER BY g.name"
    ))?;
    let rows = stmt.query_map([], |row| {
        Ok(GameSummary {
            game: row_to_game(row)?,
            dlcs: row.get(7)?,
            songs: row.get(8)?,
            versions: row.get(9)?,
        })
    })?;
    rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
}

// ── Statistics ──────────────────────────────────────────────────────────────

/// Get row counts for every archive table.
pub fn catalog_stats(conn: &Connection) -> Result<CatalogStats, OperationError> {
    let count = |table: &str| -> Result<i64, OperationError> {
        Ok(conn.query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |r| r.get(0))?)
    };

    Ok(CatalogStats {
        games: count("games")?,
        dlcs: count("dlcs")?,
        songs: count("songs")?,
        song_infos: count("song_infos")?,
        composers: count("composers")?,
        song_composers: count("song_composers")?,
        song_game_versions: count("song_game_versions")?,
        charts: count("charts")?,
        tags: count("song_tag_items")?,
        song_tags: count("song_tags")?,
        courses: count("courses")?,
        course_entries: count("course_entries")?,
        ingest_runs: count("ingest_log")?,
    })
}

/// Row counts for the archive.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CatalogStats {
    pub games: i64,
    pub dlcs: i64,
    pub songs: i64,
    pub song_infos: i64,
    pub composers: i64,
    pub song_composers: i64,
    pub song_game_versions: i64,
    pub charts: i64,
    pub tags: i64,
    pub song_tags: i64,
    pub courses: i64,
    pub course_entries: i64,
    pub ingest_runs: i64,
}

// ── Ingest Log Queries ──────────────────────────────────────────────────────

/// List recent ingestion log entries, newest first.
pub fn list_ingest_logs(
    conn: &Connection,
    limit: Option<u32>,
) -> Result<Vec<IngestLog>, OperationError> {
    let limit = limit.unwrap_or(20);
    let mut stmt = conn.prepare(&format!(
        "SELECT id, game_name, source, ingested_at, songs,
                records_created, records_reused, records_updated, courses_skipped
         FROM ingest_log ORDER BY id DESC LIMIT {limit}"
    ))?;
    let rows = stmt.query_map([], |row| {
        Ok(IngestLog {
            id: row.get(0)?,
            game_name: row.get(1)?,
            source: row.get(2)?,
            ingested_at: row.get(3)?,
            songs: row.get(4)?,
            records_created: row.get(5)?,
            records_reused: row.get(6)?,
            records_updated: row.get(7)?,
            courses_skipped: row.get(8)?,
        })
    })?;
    rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
}
