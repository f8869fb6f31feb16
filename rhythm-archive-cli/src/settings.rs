//! Application settings: `~/.config/rhythm-archive/settings.toml`.
//!
//! Every value is optional. Resolution order is CLI flag, then settings
//! file, then built-in default.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::CliError;

/// SQLite busy timeout used when neither the file nor a flag sets one.
const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5000;

#[derive(Debug, Default, Deserialize, Serialize)]
#[serde(default)]
pub(crate) struct Settings {
    pub database: DatabaseSettings,
    pub ingest: IngestSettings,
}

#[derive(Debug, Default, Deserialize, Serialize)]
#[serde(default)]
pub(crate) struct DatabaseSettings {
    pub path: Option<PathBuf>,
    pub busy_timeout_ms: Option<u64>,
}

#[derive(Debug, Default, Deserialize, Serialize)]
#[serde(default)]
pub(crate) struct IngestSettings {
    pub timeout_secs: Option<u64>,
}

/// Canonical path to the settings file.
pub(crate) fn settings_path() -> PathBuf {
    let config = dirs::config_dir().unwrap_or_else(|| PathBuf::from("."));
    config.join("rhythm-archive").join("settings.toml")
}

/// Default database location: `<data_dir>/rhythm-archive/archive.db`.
pub(crate) fn default_db_path() -> PathBuf {
    let data = dirs::data_dir().unwrap_or_else(|| PathBuf::from("."));
    data.join("rhythm-archive").join("archive.db")
}

impl Settings {
    /// Load the settings file, or defaults when it does not exist.
    pub(crate) fn load() -> Result<Self, CliError> {
        let path = settings_path();
        if !path.exists() {
            return Ok(Self::default());
        }
        let contents = std::fs::read_to_string(&path)?;
        Self::parse(&contents)
            .map_err(|e| CliError::config(format!("{}: {}", path.display(), e)))
    }

    pub(crate) fn parse(contents: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(contents)
    }

    pub(crate) fn db_path(&self, cli_override: Option<PathBuf>) -> PathBuf {
        cli_override
            .or_else(|| self.database.path.clone())
            .unwrap_or_else(default_db_path)
    }

    pub(crate) fn busy_timeout(&self) -> Duration {
        Duration::from_millis(
            self.database
                .busy_timeout_ms
                .unwrap_or(DEFAULT_BUSY_TIMEOUT_MS),
        )
    }

    pub(crate) fn ingest_timeout(&self, cli_override: Option<u64>) -> Option<Duration> {
        cli_override
            .or(self.ingest.timeout_secs)
            .map(Duration::from_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_uses_defaults() {
        let settings = Settings::parse("").unwrap();
        assert_eq!(settings.db_path(None), default_db_path());
        assert_eq!(settings.busy_timeout(), Duration::from_millis(5000));
        assert_eq!(settings.ingest_timeout(None), None);
    }

    #[test]
    fn file_values_apply_and_flags_win() {
        let settings = Settings::parse(
            r#"
            [database]
            path = "/tmp/archive.db"
            busy_timeout_ms = 250

            [ingest]
            timeout_secs = 30
            "#,
        )
        .unwrap();

        assert_eq!(settings.db_path(None), PathBuf::from("/tmp/archive.db"));
        assert_eq!(
            settings.db_path(Some(PathBuf::from("other.db"))),
            PathBuf::from("other.db")
        );
        assert_eq!(settings.busy_timeout(), Duration::from_millis(250));
        assert_eq!(settings.ingest_timeout(None), Some(Duration::from_secs(30)));
        assert_eq!(settings.ingest_timeout(Some(2)), Some(Duration::from_secs(2)));
    }

    #[test]
    fn unknown_types_are_rejected() {
        assert!(Settings::parse("[database]\nbusy_timeout_ms = \"soon\"").is_err());
    }
}
