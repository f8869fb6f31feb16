use owo_colors::OwoColorize;
use owo_colors::Stream::Stdout;

use super::Context;
use crate::CliError;

pub(crate) fn run_stats(ctx: &Context, limit: u32) -> Result<(), CliError> {
    let Some(conn) = ctx.open_existing_db()? else {
        return Ok(());
    };

    let stats = rhythm_archive_db::catalog_stats(&conn)
        .map_err(|e| CliError::database(format!("Failed to query archive stats: {}", e)))?;

    log::info!(
        "{}",
        "Archive Database Statistics".if_supports_color(Stdout, |t| t.bold()),
    );
    log::info!("  Database: {}", ctx.db_path().display());
    crate::log_blank();
    log::info!("  Games:          {:>8}", stats.games);
    log::info!("  DLCs:           {:>8}", stats.dlcs);
    log::info!("  Songs:          {:>8}", stats.songs);
    log::info!("  Song infos:     {:>8}", stats.song_infos);
    log::info!("  Composers:      {:>8}", stats.composers);
    log::info!("  Composer links: {:>8}", stats.song_composers);
    log::info!("  Song versions:  {:>8}", stats.song_game_versions);
    log::info!("  Charts:         {:>8}", stats.charts);
    log::info!("  Tags:           {:>8}", stats.tags);
    log::info!("  Tag links:      {:>8}", stats.song_tags);
    log::info!("  Courses:        {:>8}", stats.courses);
    log::info!("  Ingest runs:    {:>8}", stats.ingest_runs);

    let logs = rhythm_archive_db::list_ingest_logs(&conn, Some(limit))
        .map_err(|e| CliError::database(format!("Failed to query ingest log: {}", e)))?;
    if logs.is_empty() {
        return Ok(());
    }

    crate::log_blank();
    log::info!("{}", "Recent ingestion runs".if_supports_color(Stdout, |t| t.bold()));
    for entry in &logs {
        log::info!(
            "  {} {} ({} songs: {} created, {} reused, {} updated){}",
            entry.ingested_at.if_supports_color(Stdout, |t| t.dimmed()),
            entry.game_name,
            entry.songs,
            entry.records_created,
            entry.records_reused,
            entry.records_updated,
            entry
                .source
                .as_ref()
                .map(|s| format!(" from {}", s))
                .unwrap_or_default(),
        );
    }

    Ok(())
}
