//! SQLite persistence layer for the rhythm-game archive.
//!
//! Provides schema creation, the per-entity resolvers used by ingestion, and
//! read-back queries, backed by SQLite (via rusqlite with bundled feature).

pub mod operations;
pub mod queries;
pub mod schema;

pub use operations::{
    OperationError, find_composer, find_dlc, find_game_by_name, find_song_by_title,
    find_song_info, find_tag_by_name, insert_chart, insert_composer, insert_dlc, insert_game,
    insert_ingest_log, insert_song, insert_song_game_version, insert_tag, new_id,
    resolve_composer, resolve_dlc, resolve_game, resolve_song, resolve_tag,
    update_dlc_release_date, upsert_song_composer, upsert_song_info, upsert_song_tag,
};
pub use queries::{
    CatalogStats, GameSummary, catalog_stats, charts_for_version, composers_for_song,
    dlcs_for_game, list_games, list_ingest_logs, materialize_game, tags_for_song,
    versions_for_game,
};
pub use schema::{open_database, open_memory};
