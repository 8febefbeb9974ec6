//! Dataset records and their conversion to and from importable tasks.

use std::collections::HashMap;

use thiserror::Error;

use super::schema::{
    Prediction, Region, RegionKind, RegionMeta, RegionValue, Task, TaskData,
    BBOX_FROM_NAME, IMAGE_TO_NAME, TRANSCRIPTION_FROM_NAME,
};
use crate::geometry::NormalizedBox;
use crate::models::PageKey;

/// Errors rebuilding a record from a task.
#[derive(Debug, Error, PartialEq)]
pub enum SchemaError {
    #[error("Region '{0}' has no geometry record")]
    MissingGeometry(String),

    #[error("Region '{0}' has no transcription record")]
    MissingText(String),

    #[error("Region '{id}' appears more than once as {kind:?}")]
    DuplicateRegion { id: String, kind: RegionKind },

    #[error("Task has more than one prediction set")]
    MultiplePredictions,
}

/// One annotation shape: geometry plus editable transcription.
#[derive(Debug, Clone, PartialEq)]
pub struct AnnotationShape {
    pub id: String,
    pub geometry: NormalizedBox,
    pub text: String,
    pub confidence: f64,
}

impl AnnotationShape {
    /// Detected but not read.
    pub fn is_unread(&self) -> bool {
        self.text.trim().is_empty()
    }

    fn to_regions(&self) -> [Region; 2] {
        let meta = self.is_unread().then(RegionMeta::unread);
        let value = RegionValue {
            x: self.geometry.x,
            y: self.geometry.y,
            width: self.geometry.width,
            height: self.geometry.height,
            rotation: self.geometry.rotation,
            text: None,
        };

        let bbox = Region {
            id: self.id.clone(),
            from_name: BBOX_FROM_NAME.to_string(),
            to_name: IMAGE_TO_NAME.to_string(),
            kind: RegionKind::Rectangle,
            value: value.clone(),
            score: None,
            meta: meta.clone(),
        };
        let transcription = Region {
            id: self.id.clone(),
            from_name: TRANSCRIPTION_FROM_NAME.to_string(),
            to_name: IMAGE_TO_NAME.to_string(),
            kind: RegionKind::TextArea,
            value: RegionValue {
                text: Some(vec![self.text.clone()]),
                ..value
            },
            score: Some(self.confidence),
            meta,
        };
        [bbox, transcription]
    }
}

/// One record per rendered page.
#[derive(Debug, Clone, PartialEq)]
pub struct DatasetRecord {
    pub key: PageKey,
    pub image_url: String,
    pub shapes: Vec<AnnotationShape>,
    /// Set when recognition or assembly failed; `shapes` is then empty.
    pub error: Option<String>,
    /// Detections dropped for degenerate geometry.
    pub skipped_detections: usize,
}

impl DatasetRecord {
    pub fn failed(key: PageKey, image_url: String, error: impl Into<String>) -> Self {
        Self {
            key,
            image_url,
            shapes: Vec::new(),
            error: Some(error.into()),
            skipped_detections: 0,
        }
    }

    pub fn is_failed(&self) -> bool {
        self.error.is_some()
    }

    pub fn unread_count(&self) -> usize {
        self.shapes.iter().filter(|s| s.is_unread()).count()
    }

    /// Mean shape confidence, 0 for an empty page.
    pub fn score(&self) -> f64 {
        if self.shapes.is_empty() {
            return 0.0;
        }
        let total: f64 = self.shapes.iter().map(|s| s.confidence).sum();
        round4(total / self.shapes.len() as f64)
    }

    pub fn to_task(&self) -> Task {
        let result = self.shapes.iter().flat_map(|s| s.to_regions()).collect();
        Task {
            data: TaskData {
                ocr: self.image_url.clone(),
                document: self.key.document.clone(),
                page: self.key.page,
                error: self.error.clone(),
            },
            predictions: vec![Prediction {
                result,
                score: self.score(),
            }],
        }
    }

    /// Rebuild a record by pairing regions on their shared id.
    ///
    /// Shapes come back in the order their ids first appear.
    pub fn from_task(task: &Task) -> Result<Self, SchemaError> {
        let regions: &[Region] = match task.predictions.as_slice() {
            [] => &[],
            [only] => &only.result,
            _ => return Err(SchemaError::MultiplePredictions),
        };

        let mut order: Vec<&str> = Vec::new();
        let mut pairs: HashMap<&str, (Option<&Region>, Option<&Region>)> = HashMap::new();
        for region in regions {
            let entry = pairs.entry(region.id.as_str()).or_insert_with(|| {
                order.push(region.id.as_str());
                (None, None)
            });
            let slot = match region.kind {
                RegionKind::Rectangle => &mut entry.0,
                RegionKind::TextArea => &mut entry.1,
            };
            if slot.replace(region).is_some() {
                return Err(SchemaError::DuplicateRegion {
                    id: region.id.clone(),
                    kind: region.kind,
                });
            }
        }

        let mut shapes = Vec::with_capacity(order.len());
        for id in order {
            let (geometry, text) = pairs[id];
            let geometry = geometry.ok_or_else(|| SchemaError::MissingGeometry(id.to_string()))?;
            let text = text.ok_or_else(|| SchemaError::MissingText(id.to_string()))?;
            shapes.push(AnnotationShape {
                id: id.to_string(),
                geometry: NormalizedBox {
                    x: geometry.value.x,
                    y: geometry.value.y,
                    width: geometry.value.width,
                    height: geometry.value.height,
                    rotation: geometry.value.rotation,
                },
                text: text
                    .value
                    .text
                    .as_ref()
                    .and_then(|t| t.first())
                    .cloned()
                    .unwrap_or_default(),
                confidence: text.score.unwrap_or(0.0),
            });
        }

        Ok(Self {
            key: PageKey::new(task.data.document.clone(), task.data.page),
            image_url: task.data.ocr.clone(),
            shapes,
            error: task.data.error.clone(),
            skipped_detections: 0,
        })
    }
}

/// Ordered records for a whole run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Dataset {
    pub records: Vec<DatasetRecord>,
}

impl Dataset {
    pub fn new(records: Vec<DatasetRecord>) -> Self {
        Self { records }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn failed_pages(&self) -> impl Iterator<Item = &DatasetRecord> {
        self.records.iter().filter(|r| r.is_failed())
    }

    pub fn to_tasks(&self) -> Vec<Task> {
        self.records.iter().map(DatasetRecord::to_task).collect()
    }
}

pub(crate) fn round4(value: f64) -> f64 {
    (value * 10_000.0).round() / 10_000.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn shape(id: &str, text: &str) -> AnnotationShape {
        AnnotationShape {
            id: id.to_string(),
            geometry: NormalizedBox {
                x: 10.0,
                y: 10.0,
                width: 20.0,
                height: 10.0,
                rotation: 0.0,
            },
            text: text.to_string(),
            confidence: 0.9,
        }
    }

    fn record(shapes: Vec<AnnotationShape>) -> DatasetRecord {
        DatasetRecord {
            key: PageKey::new("doc", 1),
            image_url: "http://localhost:8080/doc/page_1.png".into(),
            shapes,
            error: None,
            skipped_detections: 0,
        }
    }

    #[test]
    fn test_each_shape_becomes_linked_pair() {
        let task = record(vec![shape("a1", "Total: $42")]).to_task();
        let result = &task.predictions[0].result;
        assert_eq!(result.len(), 2);
        assert_eq!(result[0].id, result[1].id);
        assert_eq!(result[0].kind, RegionKind::Rectangle);
        assert_eq!(result[0].value.text, None);
        assert_eq!(result[1].kind, RegionKind::TextArea);
        assert_eq!(result[1].value.text, Some(vec!["Total: $42".to_string()]));
        assert_eq!(result[0].value.x, result[1].value.x);
        assert_eq!(result[1].score, Some(0.9));
    }

    #[test]
    fn test_unread_shape_is_flagged() {
        let task = record(vec![shape("a1", "")]).to_task();
        for region in &task.predictions[0].result {
            assert!(region.meta.as_ref().is_some_and(RegionMeta::is_unread));
        }
    }

    #[test]
    fn test_empty_page_keeps_prediction() {
        let task = record(vec![]).to_task();
        assert_eq!(task.predictions.len(), 1);
        assert!(task.predictions[0].result.is_empty());
        assert_eq!(task.predictions[0].score, 0.0);
    }

    #[test]
    fn test_from_task_recombines_by_id() {
        let original = record(vec![shape("a1", "first"), shape("b2", "second")]);
        let mut task = original.to_task();
        // pairing must not depend on region order
        task.predictions[0].result.reverse();

        let rebuilt = DatasetRecord::from_task(&task).unwrap();
        let texts: Vec<_> = rebuilt.shapes.iter().map(|s| s.text.as_str()).collect();
        assert_eq!(texts, vec!["second", "first"]);
        assert_eq!(rebuilt.key, original.key);
        assert_eq!(rebuilt.shapes[1], original.shapes[0]);
    }

    #[test]
    fn test_from_task_detects_unpaired_region() {
        let mut task = record(vec![shape("a1", "x")]).to_task();
        task.predictions[0].result.pop();
        assert_eq!(
            DatasetRecord::from_task(&task),
            Err(SchemaError::MissingText("a1".into()))
        );
    }

    #[test]
    fn test_failed_record_serializes_error() {
        let rec = DatasetRecord::failed(PageKey::new("doc", 2), "u".into(), "engine crashed");
        let json = serde_json::to_value(rec.to_task()).unwrap();
        assert_eq!(json["data"]["error"], "engine crashed");
        assert_eq!(json["data"]["page"], 2);
        assert_eq!(json["predictions"][0]["result"].as_array().unwrap().len(), 0);
    }
}
