//! Dataset Writer.

use std::path::{Path, PathBuf};

use tracing::info;

use super::record::Dataset;
use super::schema::Task;
use crate::utils::{write_json_atomic, WriteError};

/// Writes the dataset as a JSON array of tasks, atomically.
#[derive(Debug, Clone)]
pub struct DatasetWriter {
    path: PathBuf,
}

impl DatasetWriter {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn write(&self, dataset: &Dataset) -> Result<(), WriteError> {
        let tasks = dataset.to_tasks();
        write_json_atomic(&self.path, &tasks)?;
        info!("Wrote {} tasks to {}", tasks.len(), self.path.display());
        Ok(())
    }
}

/// Read a dataset file back as tasks.
pub fn read_tasks(path: &Path) -> Result<Vec<Task>, std::io::Error> {
    let text = std::fs::read_to_string(path)?;
    serde_json::from_str(&text).map_err(std::io::Error::from)
}
