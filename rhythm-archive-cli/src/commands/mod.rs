pub(crate) mod config;
pub(crate) mod games;
pub(crate) mod ingest;
pub(crate) mod reset;
pub(crate) mod show;
pub(crate) mod stats;
pub(crate) mod validate;

use std::path::{Path, PathBuf};

use rusqlite::Connection;

use crate::CliError;
use crate::settings::Settings;

/// Settings and global flags shared by every command.
pub(crate) struct Context {
    pub settings: Settings,
    db_override: Option<PathBuf>,
    pub quiet: bool,
}

impl Context {
    pub(crate) fn new(settings: Settings, db_override: Option<PathBuf>, quiet: bool) -> Self {
        Self {
            settings,
            db_override,
            quiet,
        }
    }

    pub(crate) fn db_path(&self) -> PathBuf {
        self.settings.db_path(self.db_override.clone())
    }

    /// Open (creating if needed) the archive database.
    pub(crate) fn open_db(&self) -> Result<Connection, CliError> {
        let path = self.db_path();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let conn = rhythm_archive_db::open_database(&path).map_err(|e| {
            CliError::database(format!(
                "Failed to open archive database at {}: {}",
                path.display(),
                e
            ))
        })?;
        conn.busy_timeout(self.settings.busy_timeout())
            .map_err(|e| CliError::database(format!("Failed to set busy timeout: {}", e)))?;
        Ok(conn)
    }

    /// Open an existing archive database; `None` (with a hint) if it is missing.
    pub(crate) fn open_existing_db(&self) -> Result<Option<Connection>, CliError> {
        let path = self.db_path();
        if !path.exists() {
            log::warn!("No archive database found at {}", path.display());
            log::info!("Run 'rhythm-archive ingest <PATH>' to create one.");
            return Ok(None);
        }
        self.open_db().map(Some)
    }
}

/// Display form of a document path, relative to the current directory when possible.
pub(crate) fn display_path(path: &Path) -> String {
    std::env::current_dir()
        .ok()
        .and_then(|cwd| path.strip_prefix(cwd).ok().map(Path::to_path_buf))
        .unwrap_or_else(|| path.to_path_buf())
        .display()
        .to_string()
}
