//! Run-level accounting of what was processed, skipped, and failed.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::record::{Dataset, DatasetRecord};
use crate::models::PageKey;

/// A document that produced no pages.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentFailure {
    pub document: String,
    pub error: String,
}

/// A page recorded with an error marker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageFailure {
    pub key: PageKey,
    pub error: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
    pub documents_discovered: usize,
    pub documents_processed: usize,
    pub document_failures: Vec<DocumentFailure>,
    pub pages_total: usize,
    pub page_failures: Vec<PageFailure>,
    pub detections_emitted: usize,
    pub detections_skipped: usize,
    pub unread_regions: usize,
    pub input_errors: Vec<String>,
    pub aborted: bool,
}

impl RunSummary {
    /// Empty summary stamped with the current time.
    pub fn started() -> Self {
        Self {
            started_at: Some(Utc::now()),
            ..Default::default()
        }
    }

    pub fn finish(&mut self) {
        self.finished_at = Some(Utc::now());
    }

    pub fn record_input_error(&mut self, error: impl Into<String>) {
        self.input_errors.push(error.into());
    }

    pub fn record_document_failure(&mut self, document: impl Into<String>, error: impl Into<String>) {
        self.document_failures.push(DocumentFailure {
            document: document.into(),
            error: error.into(),
        });
    }

    pub fn record_page(&mut self, record: &DatasetRecord) {
        self.pages_total += 1;
        if let Some(error) = &record.error {
            self.page_failures.push(PageFailure {
                key: record.key.clone(),
                error: error.clone(),
            });
        }
        self.detections_emitted += record.shapes.len();
        self.detections_skipped += record.skipped_detections;
        self.unread_regions += record.unread_count();
    }

    /// Summary of page-level counts for an assembled dataset.
    pub fn for_dataset(dataset: &Dataset) -> Self {
        let mut summary = Self::default();
        for record in &dataset.records {
            summary.record_page(record);
        }
        summary
    }

    pub fn pages_failed(&self) -> usize {
        self.page_failures.len()
    }

    pub fn has_failures(&self) -> bool {
        !self.document_failures.is_empty()
            || !self.page_failures.is_empty()
            || !self.input_errors.is_empty()
    }

    pub fn duration_secs(&self) -> Option<f64> {
        match (self.started_at, self.finished_at) {
            (Some(start), Some(end)) => Some((end - start).num_milliseconds() as f64 / 1000.0),
            _ => None,
        }
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{} documents, {} pages ({} failed), {} regions ({} unread), {} detections skipped",
            self.documents_processed,
            self.documents_discovered,
            self.pages_total,
            self.pages_failed(),
            self.detections_emitted,
            self.unread_regions,
            self.detections_skipped,
        )?;
        if self.aborted {
            write!(f, " [aborted]")?;
        }
        Ok(())
    }
}
