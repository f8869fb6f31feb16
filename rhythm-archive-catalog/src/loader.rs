//! Loading ingestion documents from disk.
//!
//! Documents may be JSON (`.json`) or YAML (`.yaml`/`.yml`). A directory
//! expands to every document file it contains, sorted by file name.

use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::document::CatalogDocument;

#[derive(Debug, Error)]
pub enum DocumentError {
    #[error("I/O error reading {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
    #[error("JSON parse error in {path}: {source}")]
    Json {
        path: String,
        source: serde_json::Error,
    },
    #[error("YAML parse error in {path}: {source}")]
    Yaml {
        path: String,
        source: serde_yml::Error,
    },
    #[error("Unsupported document format: {0} (expected .json, .yaml or .yml)")]
    UnsupportedFormat(String),
    #[error("Directory not found: {0}")]
    DirNotFound(String),
}

/// Format of a document, derived from its file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentFormat {
    Json,
    Yaml,
}

impl DocumentFormat {
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "json" => Some(Self::Json),
            "yaml" | "yml" => Some(Self::Yaml),
            _ => None,
        }
    }
}

/// Parse a document from an in-memory string.
pub fn parse_document(
    contents: &str,
    format: DocumentFormat,
    origin: &str,
) -> Result<CatalogDocument, DocumentError> {
    match format {
        DocumentFormat::Json => serde_json::from_str(contents).map_err(|e| DocumentError::Json {
            path: origin.to_string(),
            source: e,
        }),
        DocumentFormat::Yaml => serde_yml::from_str(contents).map_err(|e| DocumentError::Yaml {
            path: origin.to_string(),
            source: e,
        }),
    }
}

/// Load a single document file.
pub fn load_document(path: &Path) -> Result<CatalogDocument, DocumentError> {
    let format = DocumentFormat::from_path(path)
        .ok_or_else(|| DocumentError::UnsupportedFormat(path.display().to_string()))?;
    let contents = std::fs::read_to_string(path).map_err(|e| DocumentError::Io {
        path: path.display().to_string(),
        source: e,
    })?;
    parse_document(&contents, format, &path.display().to_string())
}

/// List the document files in a directory, sorted by file name.
///
/// Files with other extensions are ignored.
pub fn document_files(dir: &Path) -> Result<Vec<PathBuf>, DocumentError> {
    if !dir.is_dir() {
        return Err(DocumentError::DirNotFound(dir.display().to_string()));
    }

    let mut entries: Vec<_> = std::fs::read_dir(dir)
        .map_err(|e| DocumentError::Io {
            path: dir.display().to_string(),
            source: e,
        })?
        .filter_map(|e| e.ok())
        .filter(|e| DocumentFormat::from_path(&e.path()).is_some())
        .collect();
    entries.sort_by_key(|e| e.file_name());

    Ok(entries.into_iter().map(|e| e.path()).collect())
}

/// Expand a mix of files and directories into document file paths.
///
/// Explicit files are kept in the order given, directories expand in place.
pub fn expand_paths(paths: &[PathBuf]) -> Result<Vec<PathBuf>, DocumentError> {
    let mut files = Vec::new();
    for path in paths {
        if path.is_dir() {
            files.extend(document_files(path)?);
        } else {
            files.push(path.clone());
        }
    }
    Ok(files)
}
