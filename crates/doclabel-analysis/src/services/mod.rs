//! Services that drive the PDF-to-dataset run.
//!
//! Separated from UI concerns: they emit events for progress tracking.

pub mod pipeline;

pub use pipeline::{
    discover_documents, DatasetEvent, DatasetRun, DatasetService, DiscoveryError, PipelineOptions,
};
