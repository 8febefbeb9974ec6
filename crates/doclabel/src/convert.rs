//! Label Studio export to columnar training set.
//!
//! Reads a JSON-MIN export (one flat object per task) and produces a
//! column-oriented JSON document with `id`, `image`, `tokens`, `bboxes`
//! and `ner_tags`, the layout token-classification trainers load directly.
//! Tokens pair with labeled regions by position; the shorter list wins.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use crate::utils::{write_json_atomic, WriteError};

/// Class id for labels missing from the label map.
pub const UNKNOWN_LABEL_ID: i64 = -1;

#[derive(Debug, Error)]
pub enum ConvertError {
    #[error("Failed to read export {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Invalid export {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error(transparent)]
    Write(#[from] WriteError),
}

/// A field that exports write as either a single value or a list.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum OneOrMany<T> {
    One(T),
    Many(Vec<T>),
}

impl<T> Default for OneOrMany<T> {
    fn default() -> Self {
        Self::Many(Vec::new())
    }
}

impl<T> OneOrMany<T> {
    pub fn into_vec(self) -> Vec<T> {
        match self {
            Self::One(v) => vec![v],
            Self::Many(v) => v,
        }
    }
}

/// Labeled rectangle from the export's `label` column.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct LabeledRegion {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    #[serde(default)]
    pub labels: Vec<String>,
}

/// One exported task.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ExportItem {
    pub id: serde_json::Value,
    pub ocr: String,
    #[serde(default)]
    pub transcription: OneOrMany<String>,
    #[serde(default)]
    pub label: OneOrMany<LabeledRegion>,
}

/// Label name to class id; ids are positions in the configured list.
#[derive(Debug, Clone, Default)]
pub struct LabelMap {
    ids: HashMap<String, i64>,
}

impl LabelMap {
    pub fn new<S: AsRef<str>>(labels: &[S]) -> Self {
        let mut ids = HashMap::new();
        for (i, label) in labels.iter().enumerate() {
            // first occurrence wins
            ids.entry(label.as_ref().to_string()).or_insert(i as i64);
        }
        Self { ids }
    }

    pub fn id_of(&self, label: &str) -> i64 {
        self.ids.get(label).copied().unwrap_or(UNKNOWN_LABEL_ID)
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

/// Column-oriented training set.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TrainingSet {
    pub id: Vec<serde_json::Value>,
    pub image: Vec<String>,
    pub tokens: Vec<Vec<String>>,
    pub bboxes: Vec<Vec<[f64; 4]>>,
    pub ner_tags: Vec<Vec<i64>>,
}

impl TrainingSet {
    pub fn len(&self) -> usize {
        self.id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.id.is_empty()
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConvertStats {
    pub examples: usize,
    pub tokens: usize,
    pub unknown_labels: usize,
    /// Tokens or regions dropped because the two lists differed in length.
    pub unpaired: usize,
}

pub fn read_export(path: &Path) -> Result<Vec<ExportItem>, ConvertError> {
    let text = std::fs::read_to_string(path).map_err(|source| ConvertError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&text).map_err(|source| ConvertError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

pub fn convert_export(items: Vec<ExportItem>, labels: &LabelMap) -> (TrainingSet, ConvertStats) {
    let mut set = TrainingSet::default();
    let mut stats = ConvertStats::default();

    for item in items {
        let transcription = item.transcription.into_vec();
        let regions = item.label.into_vec();
        let paired = transcription.len().min(regions.len());
        stats.unpaired += transcription.len().max(regions.len()) - paired;
        if transcription.len() != regions.len() {
            debug!(
                "Task {}: {} tokens vs {} regions, keeping {}",
                item.id,
                transcription.len(),
                regions.len(),
                paired
            );
        }

        let mut tokens = Vec::with_capacity(paired);
        let mut bboxes = Vec::with_capacity(paired);
        let mut tags = Vec::with_capacity(paired);
        for (token, region) in transcription.into_iter().zip(regions) {
            let tag = region
                .labels
                .first()
                .map(|l| labels.id_of(l))
                .unwrap_or(UNKNOWN_LABEL_ID);
            if tag == UNKNOWN_LABEL_ID {
                stats.unknown_labels += 1;
            }
            tokens.push(token);
            bboxes.push([region.x, region.y, region.width, region.height]);
            tags.push(tag);
        }

        stats.examples += 1;
        stats.tokens += tokens.len();
        set.id.push(item.id);
        set.image.push(item.ocr);
        set.tokens.push(tokens);
        set.bboxes.push(bboxes);
        set.ner_tags.push(tags);
    }

    (set, stats)
}

/// Convert an export file and write the training set atomically.
pub fn convert_file(
    input: &Path,
    output: &Path,
    labels: &LabelMap,
) -> Result<ConvertStats, ConvertError> {
    if labels.is_empty() {
        warn!("No labels configured; every tag will be {}", UNKNOWN_LABEL_ID);
    }
    let items = read_export(input)?;
    let (set, stats) = convert_export(items, labels);
    write_json_atomic(output, &set)?;
    Ok(stats)
}
