//! Ingestion progress reporting.

/// Trait for receiving ingestion progress updates.
pub trait IngestProgress {
    /// Called after each song of a document has been walked.
    fn on_song(&self, current: usize, total: usize, title: &str);

    /// Called when a phase starts (e.g., "Ingesting Demo").
    fn on_phase(&self, message: &str);

    /// Called when the unit of work has been committed or discarded.
    fn on_complete(&self, message: &str);
}
