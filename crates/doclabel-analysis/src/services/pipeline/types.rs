//! Pipeline events and results.

use std::path::PathBuf;

use doclabel::dataset::{Dataset, RunSummary};
use doclabel::models::PageKey;

/// Events emitted while building a dataset.
#[derive(Debug, Clone)]
pub enum DatasetEvent {
    /// Run started
    Started { total_documents: usize },
    /// Document rasterization started
    DocumentStarted { document_id: String, path: PathBuf },
    /// Document rasterized; `pages` counts rendered and failed pages alike
    DocumentRendered { document_id: String, pages: usize },
    /// Document could not be rasterized and contributes no pages
    DocumentFailed { document_id: String, error: String },
    /// Page OCR started
    PageStarted { key: PageKey },
    /// Page OCR completed
    PageCompleted { key: PageKey, detections: usize },
    /// Page could not be rendered or recognized; it is kept with an error marker
    PageFailed { key: PageKey, error: String },
    /// Cancellation observed; remaining documents were not started
    Aborted { remaining_documents: usize },
    /// All started work has finished
    Finished { pages: usize, failed_pages: usize },
}

/// Result of a pipeline run.
#[derive(Debug)]
pub struct DatasetRun {
    pub dataset: Dataset,
    pub summary: RunSummary,
}
