use owo_colors::OwoColorize;
use owo_colors::Stream::Stdout;

use rhythm_archive_catalog::{GameGraph, VersionNode};
use rhythm_archive_db::OperationError;

use super::Context;
use crate::CliError;

/// Materialize one game and print it as a tree (or JSON).
pub(crate) fn run_show(ctx: &Context, game: &str, json: bool) -> Result<(), CliError> {
    let Some(conn) = ctx.open_existing_db()? else {
        return Ok(());
    };

    let graph = match rhythm_archive_db::materialize_game(&conn, game) {
        Ok(graph) => graph,
        Err(OperationError::NotFound { .. }) => {
            return Err(CliError::not_found(format!("no game named '{}'", game)));
        }
        Err(e) => {
            return Err(CliError::database(format!("Failed to read game: {}", e)));
        }
    };

    if json {
        let out = serde_json::to_string_pretty(&graph)
            .map_err(|e| CliError::database(format!("Failed to serialize game: {}", e)))?;
        println!("{}", out);
        return Ok(());
    }

    print_tree(&graph);
    Ok(())
}

fn print_tree(graph: &GameGraph) {
    let game = &graph.game;
    let mut header = vec![];
    if let Some(ref publisher) = game.publisher {
        header.push(publisher.clone());
    }
    if let Some(date) = game.release_date {
        header.push(date.to_string());
    }

    let header = if header.is_empty() {
        String::new()
    } else {
        format!("({})", header.join(", "))
    };
    log::info!(
        "{} {}",
        game.name.if_supports_color(Stdout, |t| t.bold()),
        header.if_supports_color(Stdout, |t| t.dimmed()),
    );
    log::info!(
        "  {} song version(s), {} DLC(s)",
        graph.song_game_versions.len(),
        graph.dlcs.len()
    );

    for dlc in &graph.dlcs {
        log::info!(
            "  {} {}{}",
            "DLC".if_supports_color(Stdout, |t| t.magenta()),
            dlc.dlc_name,
            dlc.release_date
                .map(|d| format!(" ({})", d))
                .unwrap_or_default(),
        );
    }

    for node in &graph.song_game_versions {
        crate::log_blank();
        print_version(node);
    }
}

fn print_version(node: &VersionNode) {
    let song = &node.song;
    let title = node
        .version
        .in_game_title
        .as_deref()
        .unwrap_or(&song.song.title);

    let mut line = format!("  {}", title.if_supports_color(Stdout, |t| t.bold()));
    if title != song.song.title {
        line.push_str(&format!(" [{}]", song.song.title));
    }
    if let Some(ref original) = song.song.original_title {
        line.push_str(&format!(" / {}", original));
    }
    if let Some(ref dlc) = node.dlc {
        line.push_str(&format!(
            " {}",
            format!("<{}>", dlc.dlc_name).if_supports_color(Stdout, |t| t.magenta())
        ));
    }
    log::info!("{}", line);

    if !song.composers.is_empty() {
        let names: Vec<String> = song
            .composers
            .iter()
            .map(|c| match c.company_name {
                Some(ref company) => format!("{} ({})", c.name, company),
                None => c.name.clone(),
            })
            .collect();
        log::info!("    Composers: {}", names.join(", "));
    }

    let bpm = node
        .version
        .bpm_override
        .or_else(|| song.info.as_ref().and_then(|i| i.bpm));
    if let Some(bpm) = bpm {
        log::info!("    BPM: {}", bpm);
    }

    if !song.tags.is_empty() {
        let tags: Vec<&str> = song.tags.iter().map(|t| t.name.as_str()).collect();
        log::info!(
            "    Tags: {}",
            tags.join(", ").if_supports_color(Stdout, |t| t.cyan())
        );
    }

    if node.charts.is_empty() {
        log::info!("    {}", "(no charts)".if_supports_color(Stdout, |t| t.dimmed()));
    }
    for chart in &node.charts {
        let mut line = format!("    {:<10} {:>5}", chart.difficulty_name, chart.level);
        if let Some(notes) = chart.note_count {
            line.push_str(&format!("  {} notes", notes));
        }
        if let Some(ref kind) = chart.chart_type {
            line.push_str(&format!("  {}", kind));
        }
        log::info!("{}", line);
    }
}
