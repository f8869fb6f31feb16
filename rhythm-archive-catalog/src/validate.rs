//! Semantic checks that run before a document reaches the ingestion pipeline.
//!
//! Serde already rejects missing fields and wrong types. This pass catches
//! values that deserialize fine but cannot be stored meaningfully.

use thiserror::Error;

use crate::document::{CatalogDocument, ChartInput, GameVersionInput, SongInput};

/// A single problem found in a document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationIssue {
    /// Location in the document, e.g. `songs[1].gameVersions[0].charts[2].level`.
    pub path: String,
    pub message: String,
}

impl std::fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.path, self.message)
    }
}

#[derive(Debug, Error)]
#[error("document failed validation with {} issue(s){}", .issues.len(), first_issue(.issues))]
pub struct ValidationError {
    pub issues: Vec<ValidationIssue>,
}

fn first_issue(issues: &[ValidationIssue]) -> String {
    issues
        .first()
        .map(|issue| format!("; first: {issue}"))
        .unwrap_or_default()
}

/// Validate a deserialized document, collecting every issue.
pub fn validate_document(doc: &CatalogDocument) -> Result<(), ValidationError> {
    let mut issues = Vec::new();

    require_text(&mut issues, "game.name", &doc.game.name);

    for (i, song) in doc.songs.iter().enumerate() {
        validate_song(&mut issues, &format!("songs[{i}]"), song);
    }

    if issues.is_empty() {
        Ok(())
    } else {
        Err(ValidationError { issues })
    }
}

fn validate_song(issues: &mut Vec<ValidationIssue>, path: &str, song: &SongInput) {
    require_text(issues, &format!("{path}.title"), &song.title);

    if let Some(ref info) = song.song_info {
        require_finite(issues, &format!("{path}.songInfo.bpm"), info.bpm);
    }

    for (i, composer) in song.composers.iter().enumerate() {
        require_text(issues, &format!("{path}.composers[{i}].name"), &composer.name);
    }

    for (i, version) in song.game_versions.iter().enumerate() {
        validate_version(issues, &format!("{path}.gameVersions[{i}]"), version);
    }

    for (i, tag) in song.tags.iter().enumerate() {
        require_text(issues, &format!("{path}.tags[{i}]"), tag);
    }
}

fn validate_version(issues: &mut Vec<ValidationIssue>, path: &str, version: &GameVersionInput) {
    if let Some(ref dlc_name) = version.dlc_name {
        require_text(issues, &format!("{path}.dlcName"), dlc_name);
    }
    require_finite(issues, &format!("{path}.bpmOverride"), version.bpm_override);

    for (i, chart) in version.charts.iter().enumerate() {
        validate_chart(issues, &format!("{path}.charts[{i}]"), chart);
    }
}

fn validate_chart(issues: &mut Vec<ValidationIssue>, path: &str, chart: &ChartInput) {
    require_text(
        issues,
        &format!("{path}.difficultyName"),
        &chart.difficulty_name,
    );
    require_finite(issues, &format!("{path}.level"), Some(chart.level));
}

fn require_text(issues: &mut Vec<ValidationIssue>, path: &str, value: &str) {
    if value.trim().is_empty() {
        issues.push(ValidationIssue {
            path: path.to_string(),
            message: "must not be empty".to_string(),
        });
    }
}

fn require_finite(issues: &mut Vec<ValidationIssue>, path: &str, value: Option<f64>) {
    match value {
        Some(v) if !v.is_finite() => issues.push(ValidationIssue {
            path: path.to_string(),
            message: format!("must be a finite number, got {v}"),
        }),
        _ => {}
    }
}
