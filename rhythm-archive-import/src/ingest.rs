//! Ingest one document as a single atomic unit of work.
//!
//! The whole walk runs inside one transaction. Any failure (store error, lost
//! create race, cancellation, timeout) drops the transaction, which rolls
//! back every row written so far. Nothing is retried here; a retryable error
//! means the caller should re-submit the whole document.

use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use std::time::Duration;

use rhythm_archive_catalog::document::CatalogDocument;
use rhythm_archive_catalog::types::IngestLog;
use rhythm_archive_db::operations::{self, OperationError};
use rusqlite::Connection;
use thiserror::Error;

use crate::progress::IngestProgress;
use crate::walker::{IngestResult, StepGuard, walk_document};

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("Database error: {0}")]
    Db(#[from] OperationError),
    #[error("Ingestion cancelled")]
    Cancelled,
    #[error("Ingestion timed out after {elapsed:.1?}")]
    TimedOut { elapsed: Duration },
}

impl From<rusqlite::Error> for IngestError {
    fn from(e: rusqlite::Error) -> Self {
        Self::Db(e.into())
    }
}

impl IngestError {
    /// Whether re-submitting the same document may succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Db(e) => e.is_retryable(),
            Self::Cancelled | Self::TimedOut { .. } => false,
        }
    }
}

/// Options for a single ingestion call.
#[derive(Debug, Clone, Default)]
pub struct IngestOptions {
    /// Abort (and roll back) once the walk has run this long.
    pub timeout: Option<Duration>,
    /// Abort (and roll back) as soon as this flag is set.
    pub cancel: Option<Arc<AtomicBool>>,
    /// Walk the document, then roll back instead of committing.
    pub dry_run: bool,
    /// Label recorded in the ingestion log (usually the document path).
    pub source: Option<String>,
}

/// Ingest a document atomically.
///
/// On success every row created or updated by the walk is committed together
/// with one `ingest_log` entry. On failure nothing is visible afterwards.
pub fn ingest(
    conn: &Connection,
    doc: &CatalogDocument,
    options: &IngestOptions,
    progress: Option<&dyn IngestProgress>,
) -> Result<IngestResult, IngestError> {
    let guard = StepGuard::new(options.timeout, options.cancel.clone());
    let game_name = doc.game.name.as_str();

    if let Some(p) = progress {
        p.on_phase(&format!("Ingesting {} ({} songs)", game_name, doc.songs.len()));
    }

    let tx = conn.unchecked_transaction()?;

    let mut result = match walk_document(&tx, doc, &guard, progress) {
        Ok(result) => result,
        Err(e) => {
            log::warn!("Ingestion of '{}' rolled back: {}", game_name, e);
            return Err(e);
        }
    };

    let totals = result.stats.total();

    if options.dry_run {
        tx.rollback()?;
        if let Some(p) = progress {
            p.on_complete(&format!(
                "Dry run for {}: {} would be created, {} reused, {} updated",
                game_name, totals.created, totals.reused, totals.updated
            ));
        }
        return Ok(result);
    }

    operations::insert_ingest_log(
        &tx,
        &IngestLog {
            id: 0,
            game_name: game_name.to_string(),
            source: options.source.clone(),
            ingested_at: chrono::Utc::now().to_rfc3339(),
            songs: doc.songs.len() as i64,
            records_created: totals.created as i64,
            records_reused: totals.reused as i64,
            records_updated: totals.updated as i64,
            courses_skipped: result.courses_skipped as i64,
        },
    )?;

    tx.commit()?;
    result.committed = true;

    log::info!(
        "Ingested '{}': {} songs, {} created, {} reused, {} updated",
        game_name,
        doc.songs.len(),
        totals.created,
        totals.reused,
        totals.updated
    );
    if let Some(p) = progress {
        p.on_complete(&format!("Ingested {}", game_name));
    }

    Ok(result)
}
