//! rhythm-archive CLI
//!
//! Command-line interface for ingesting rhythm-game catalog documents and
//! browsing the resulting archive.

mod cli_types;
mod commands;
mod error;
mod settings;

use std::io::Write;

use clap::Parser;

use cli_types::{Cli, Commands, ConfigAction};
use commands::Context;
pub(crate) use error::CliError;
use settings::Settings;

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.quiet);

    if let Err(e) = run(cli) {
        log::error!("{}", e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<(), CliError> {
    let settings = Settings::load()?;
    let ctx = Context::new(settings, cli.db, cli.quiet);

    match cli.command {
        Commands::Ingest {
            paths,
            dry_run,
            source,
            timeout,
        } => commands::ingest::run_ingest(&ctx, paths, dry_run, source, timeout),
        Commands::Validate { paths } => commands::validate::run_validate(paths),
        Commands::Show { game, json } => commands::show::run_show(&ctx, &game, json),
        Commands::Games => commands::games::run_games(&ctx),
        Commands::Stats { limit } => commands::stats::run_stats(&ctx, limit),
        Commands::Reset { confirm } => commands::reset::run_reset(&ctx, confirm),
        Commands::Config { action } => match action {
            ConfigAction::Show => commands::config::run_config_show(&ctx),
            ConfigAction::Path => {
                commands::config::run_config_path();
                Ok(())
            }
        },
    }
}

/// Set up `env_logger`: plain messages by default, timestamps and debug
/// output with `--verbose`, warnings only with `--quiet`. `RUST_LOG` wins.
fn init_logging(verbose: bool, quiet: bool) {
    let level = if verbose {
        log::LevelFilter::Debug
    } else if quiet {
        log::LevelFilter::Warn
    } else {
        log::LevelFilter::Info
    };

    let mut builder = env_logger::Builder::new();
    builder
        .filter_level(level)
        .target(env_logger::Target::Stdout)
        .parse_default_env();

    if verbose {
        builder.format_timestamp_millis();
    } else {
        builder.format(|buf, record| match record.level() {
            log::Level::Info => writeln!(buf, "{}", record.args()),
            level => writeln!(
                buf,
                "{}: {}",
                level.as_str().to_ascii_lowercase(),
                record.args()
            ),
        });
    }

    builder.init();
}

/// Emit an empty line through the logger so `--quiet` suppresses it too.
pub(crate) fn log_blank() {
    log::info!("");
}
