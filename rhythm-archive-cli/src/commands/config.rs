use owo_colors::OwoColorize;
use owo_colors::Stream::Stdout;

use super::Context;
use crate::CliError;
use crate::settings::{default_db_path, settings_path};

/// Show resolved settings and where each value comes from.
pub(crate) fn run_config_show(ctx: &Context) -> Result<(), CliError> {
    let path = settings_path();

    log::info!(
        "{}",
        "rhythm-archive Configuration".if_supports_color(Stdout, |t| t.bold()),
    );
    crate::log_blank();

    if path.exists() {
        log::info!(
            "  Settings file: {} {}",
            path.display().if_supports_color(Stdout, |t| t.cyan()),
            "(exists)".if_supports_color(Stdout, |t| t.green()),
        );
    } else {
        log::info!(
            "  Settings file: {} {}",
            path.display().if_supports_color(Stdout, |t| t.cyan()),
            "(not found)".if_supports_color(Stdout, |t| t.dimmed()),
        );
    }
    crate::log_blank();

    let db_path = ctx.db_path();
    let db_source = if ctx.settings.database.path.as_ref() == Some(&db_path) {
        "(settings file)"
    } else if db_path == default_db_path() {
        "(default)"
    } else {
        "(--db)"
    };
    log::info!(
        "  {} {} {}",
        "database.path:".if_supports_color(Stdout, |t| t.cyan()),
        db_path.display(),
        db_source.if_supports_color(Stdout, |t| t.dimmed()),
    );
    log::info!(
        "  {} {} ms",
        "database.busy_timeout_ms:".if_supports_color(Stdout, |t| t.cyan()),
        ctx.settings.busy_timeout().as_millis(),
    );
    match ctx.settings.ingest.timeout_secs {
        Some(secs) => log::info!(
            "  {} {} s",
            "ingest.timeout_secs:".if_supports_color(Stdout, |t| t.cyan()),
            secs,
        ),
        None => log::info!(
            "  {} {}",
            "ingest.timeout_secs:".if_supports_color(Stdout, |t| t.cyan()),
            "not set".if_supports_color(Stdout, |t| t.yellow()),
        ),
    }

    if path.exists() {
        let rendered = toml::to_string_pretty(&ctx.settings)
            .map_err(|e| CliError::config(format!("Failed to render settings: {}", e)))?;
        crate::log_blank();
        log::info!("{}", "Effective settings file contents:".if_supports_color(Stdout, |t| t.bold()));
        for line in rendered.lines() {
            log::info!("  {}", line);
        }
    }

    Ok(())
}

/// Print the settings file path.
pub(crate) fn run_config_path() {
    println!("{}", settings_path().display());
}
