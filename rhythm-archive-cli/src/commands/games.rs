use owo_colors::OwoColorize;
use owo_colors::Stream::Stdout;

use super::Context;
use crate::CliError;

/// List every game in the archive.
pub(crate) fn run_games(ctx: &Context) -> Result<(), CliError> {
    let Some(conn) = ctx.open_existing_db()? else {
        return Ok(());
    };

    let games = rhythm_archive_db::list_games(&conn)
        .map_err(|e| CliError::database(format!("Failed to list games: {}", e)))?;

    if games.is_empty() {
        log::info!("No games in the archive.");
        return Ok(());
    }

    log::info!(
        "{}",
        format!("{:<40} {:>6} {:>9} {:>5}", "Game", "Songs", "Versions", "DLCs")
            .if_supports_color(Stdout, |t| t.bold()),
    );
    for summary in &games {
        log::info!(
            "{:<40} {:>6} {:>9} {:>5}",
            truncate_str(&summary.game.name, 40),
            summary.songs,
            summary.versions,
            summary.dlcs,
        );
    }
    crate::log_blank();
    log::info!("{} game(s)", games.len());

    Ok(())
}

/// Truncate a string to a maximum width in characters, appending "..." if needed.
fn truncate_str(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}
