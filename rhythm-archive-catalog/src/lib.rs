//! Rhythm-game archive data model, ingestion document types, and document I/O.
//!
//! This crate defines the persistent data model without any database
//! dependencies. Consumers pass these types to `rhythm-archive-db` for
//! persistence and to `rhythm-archive-import` for ingestion.

pub mod document;
pub mod loader;
pub mod types;
pub mod validate;

pub use document::{
    CatalogDocument, ChartInput, ComposerInput, CourseEntryInput, CourseInput, CourseSection,
    GameInput, GameVersionInput, SongInfoInput, SongInput, parse_date,
};
pub use loader::{
    DocumentError, DocumentFormat, document_files, expand_paths, load_document, parse_document,
};
pub use types::*;
pub use validate::{ValidationError, ValidationIssue, validate_document};
