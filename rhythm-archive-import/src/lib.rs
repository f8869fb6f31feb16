//! Ingest rhythm-game catalog documents into the archive database.
//!
//! This crate owns the write pipeline: walking a nested document in a fixed
//! order, resolving each entity against the store, and wrapping the whole
//! walk in one transaction so an ingestion call is all-or-nothing.

pub mod ingest;
pub mod progress;
pub mod walker;

pub use ingest::{IngestError, IngestOptions, ingest};
pub use progress::IngestProgress;
pub use walker::{
    GameVersionResult, IngestResult, IngestStats, OutcomeCounts, SongResult, StepGuard, Touched,
    walk_document,
};
