use std::path::PathBuf;

use owo_colors::OwoColorize;
use owo_colors::Stream::Stdout;

use super::Context;
use crate::CliError;

/// Delete the archive database (and its WAL side files).
pub(crate) fn run_reset(ctx: &Context, confirm: bool) -> Result<(), CliError> {
    let db_path = ctx.db_path();

    if !confirm {
        log::warn!(
            "This will permanently delete the archive database at:\n  {}",
            db_path.display(),
        );
        log::info!("Re-run with --confirm to proceed:");
        log::info!("  rhythm-archive reset --confirm");
        return Ok(());
    }

    if !db_path.exists() {
        log::info!("No archive database found at {}", db_path.display());
        log::info!("Nothing to reset.");
        return Ok(());
    }

    let mut freed = 0u64;
    for path in with_side_files(&db_path) {
        if !path.exists() {
            continue;
        }
        freed += std::fs::metadata(&path).map(|m| m.len()).unwrap_or(0);
        std::fs::remove_file(&path)?;
    }

    let size_mb = freed as f64 / (1024.0 * 1024.0);
    log::info!(
        "{}",
        "Archive database deleted.".if_supports_color(Stdout, |t| t.bold()),
    );
    log::info!("  Path: {}", db_path.display());
    log::info!("  Freed: {:.1} MB", size_mb);

    Ok(())
}

/// The database file followed by its `-wal` and `-shm` companions.
fn with_side_files(db_path: &std::path::Path) -> Vec<PathBuf> {
    let mut paths = vec![db_path.to_path_buf()];
    for suffix in ["-wal", "-shm"] {
        let mut name = db_path.as_os_str().to_owned();
        name.push(suffix);
        paths.push(PathBuf::from(name));
    }
    paths
}
