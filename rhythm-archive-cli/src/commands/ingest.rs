use std::path::PathBuf;

use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use owo_colors::OwoColorize;
use owo_colors::Stream::Stdout;

use rhythm_archive_catalog::{
    CatalogDocument, EntityKind, expand_paths, load_document, validate_document,
};
use rhythm_archive_import::{IngestOptions, IngestProgress, ingest};

use super::{Context, display_path};
use crate::CliError;

/// Load, validate and ingest documents. Each document is its own unit of work.
pub(crate) fn run_ingest(
    ctx: &Context,
    paths: Vec<PathBuf>,
    dry_run: bool,
    source: Option<String>,
    timeout: Option<u64>,
) -> Result<(), CliError> {
    let files = expand_paths(&paths).map_err(|e| CliError::document(e.to_string()))?;
    if files.is_empty() {
        log::warn!("No documents found.");
        return Ok(());
    }

    // Every document must validate before the first write.
    let mut docs: Vec<(String, CatalogDocument)> = Vec::with_capacity(files.len());
    let mut invalid = 0usize;
    for file in &files {
        let name = display_path(file);
        match load_document(file).map_err(|e| e.to_string()).and_then(|doc| {
            validate_document(&doc).map_err(|e| e.to_string())?;
            Ok(doc)
        }) {
            Ok(doc) => docs.push((name, doc)),
            Err(e) => {
                invalid += 1;
                log::warn!(
                    "  {} {}: {}",
                    "\u{2718}".if_supports_color(Stdout, |t| t.red()),
                    name.if_supports_color(Stdout, |t| t.bold()),
                    e,
                );
            }
        }
    }
    if invalid > 0 {
        return Err(CliError::validation(format!(
            "{} of {} document(s) invalid, nothing ingested",
            invalid,
            files.len()
        )));
    }

    let conn = ctx.open_db()?;
    let timeout = ctx.settings.ingest_timeout(timeout);

    log::info!(
        "{}",
        format!(
            "{} {} document(s) into {}",
            if dry_run { "Dry run of" } else { "Ingesting" },
            docs.len(),
            ctx.db_path().display()
        )
        .if_supports_color(Stdout, |t| t.bold()),
    );

    let pb = if docs.len() > 1 && !ctx.quiet {
        ProgressBar::new(docs.len() as u64)
    } else {
        ProgressBar::with_draw_target(Some(docs.len() as u64), ProgressDrawTarget::hidden())
    };
    pb.set_style(
        ProgressStyle::with_template("  {bar:30.cyan/blue} {pos}/{len} {msg}")
            .expect("static pattern")
            .progress_chars("=> "),
    );

    let mut failed = 0usize;
    let mut retryable = 0usize;
    let mut created = 0u64;
    let mut reused = 0u64;
    let mut updated = 0u64;

    for (name, doc) in &docs {
        pb.set_message(doc.game.name.clone());

        let options = IngestOptions {
            timeout,
            cancel: None,
            dry_run,
            source: Some(source.clone().unwrap_or_else(|| name.clone())),
        };
        let progress = CliIngestProgress { pb: &pb };

        match ingest(&conn, doc, &options, Some(&progress)) {
            Ok(result) => {
                let totals = result.stats.total();
                created += totals.created;
                reused += totals.reused;
                updated += totals.updated;

                pb.suspend(|| {
                    log::info!(
                        "  {} {} ({}): {} songs, {} versions, {} charts; {} created, {} reused, {} updated",
                        "\u{2714}".if_supports_color(Stdout, |t| t.green()),
                        doc.game.name.if_supports_color(Stdout, |t| t.bold()),
                        name,
                        result.songs.len(),
                        result.stats.created(EntityKind::SongGameVersion),
                        result.stats.created(EntityKind::Chart),
                        totals.created,
                        totals.reused,
                        totals.updated,
                    );
                    if result.courses_skipped > 0 {
                        log::warn!(
                            "    {} course(s) present but not ingested",
                            result.courses_skipped
                        );
                    }
                });
            }
            Err(e) => {
                failed += 1;
                if e.is_retryable() {
                    retryable += 1;
                }
                pb.suspend(|| {
                    log::warn!(
                        "  {} {} ({}): rolled back: {}{}",
                        "\u{2718}".if_supports_color(Stdout, |t| t.red()),
                        doc.game.name.if_supports_color(Stdout, |t| t.bold()),
                        name,
                        e,
                        if e.is_retryable() { " (retryable)" } else { "" },
                    );
                });
            }
        }
        pb.inc(1);
    }
    pb.finish_and_clear();

    let heading = if dry_run {
        "Dry run complete (nothing committed)"
    } else {
        "Ingest complete"
    };
    crate::log_blank();
    log::info!("{}", heading.if_supports_color(Stdout, |t| t.bold()));
    log::info!(
        "  Documents: {} ok, {} failed",
        docs.len() - failed,
        failed
    );
    log::info!(
        "  Records: {} created, {} reused, {} updated",
        created,
        reused,
        updated
    );

    if failed > 0 {
        if retryable > 0 {
            log::info!(
                "  {} failure(s) were caused by concurrent writers; re-run to retry those documents.",
                retryable
            );
        }
        return Err(CliError::ingest(format!("{} document(s) rolled back", failed)));
    }
    Ok(())
}

/// CLI progress reporter: song-level detail goes to the debug log.
struct CliIngestProgress<'a> {
    pb: &'a ProgressBar,
}

impl IngestProgress for CliIngestProgress<'_> {
    fn on_song(&self, current: usize, total: usize, title: &str) {
        log::debug!("    [{}/{}] {}", current, total, title);
    }

    fn on_phase(&self, message: &str) {
        self.pb.suspend(|| log::debug!("{}", message));
    }

    fn on_complete(&self, message: &str) {
        self.pb.suspend(|| log::debug!("{}", message));
    }
}
