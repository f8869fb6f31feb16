use std::path::PathBuf;

use owo_colors::OwoColorize;
use owo_colors::Stream::Stdout;

use rhythm_archive_catalog::{DocumentError, expand_paths, load_document, validate_document};

use super::display_path;
use crate::CliError;

/// Structurally validate documents without opening the archive.
pub(crate) fn run_validate(paths: Vec<PathBuf>) -> Result<(), CliError> {
    let files = expand_paths(&paths).map_err(|e| CliError::document(e.to_string()))?;
    if files.is_empty() {
        log::warn!("No documents found.");
        return Ok(());
    }

    let mut invalid = 0usize;
    for file in &files {
        let name = display_path(file);
        let doc = match load_document(file) {
            Ok(doc) => doc,
            Err(e) => {
                invalid += 1;
                report_load_error(&name, &e);
                continue;
            }
        };

        match validate_document(&doc) {
            Ok(()) => {
                log::info!(
                    "  {} {} ({}: {} songs)",
                    "\u{2714}".if_supports_color(Stdout, |t| t.green()),
                    name.if_supports_color(Stdout, |t| t.bold()),
                    doc.game.name,
                    doc.songs.len(),
                );
                if !doc.courses.is_empty() {
                    log::warn!(
                        "    {} course(s) will be ignored by ingest",
                        doc.courses.len()
                    );
                }
            }
            Err(e) => {
                invalid += 1;
                log::warn!(
                    "  {} {}: {} issue(s)",
                    "\u{2718}".if_supports_color(Stdout, |t| t.red()),
                    name.if_supports_color(Stdout, |t| t.bold()),
                    e.issues.len(),
                );
                for issue in &e.issues {
                    log::warn!(
                        "    {}: {}",
                        issue.path.if_supports_color(Stdout, |t| t.cyan()),
                        issue.message,
                    );
                }
            }
        }
    }

    crate::log_blank();
    log::info!(
        "{} document(s) checked, {} invalid",
        files.len(),
        invalid
    );

    if invalid > 0 {
        return Err(CliError::validation(format!("{} document(s) invalid", invalid)));
    }
    Ok(())
}

fn report_load_error(name: &str, e: &DocumentError) {
    log::warn!(
        "  {} {}: {}",
        "\u{2718}".if_supports_color(Stdout, |t| t.red()),
        name.if_supports_color(Stdout, |t| t.bold()),
        e,
    );
}
