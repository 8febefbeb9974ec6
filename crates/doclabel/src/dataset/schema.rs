//! Label Studio import format.
//!
//! Field names and nesting must match what the annotation tool imports.
//! Each detection becomes two regions sharing one `id`: a `rectangle`
//! carrying geometry and a `textarea` carrying geometry plus transcription.

use serde::{Deserialize, Serialize};

/// Data key holding the image URL; the labeling config refers to it as `$ocr`.
pub const IMAGE_DATA_KEY: &str = "ocr";
/// Control name of the bounding-box tool.
pub const BBOX_FROM_NAME: &str = "bbox";
/// Control name of the transcription text area.
pub const TRANSCRIPTION_FROM_NAME: &str = "transcription";
/// Name of the image object both controls attach to.
pub const IMAGE_TO_NAME: &str = "image";
/// Region meta note attached to detected-but-unread regions.
pub const UNREAD_MARKER: &str = "unread";

/// One importable task (one page image).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub data: TaskData,
    #[serde(default)]
    pub predictions: Vec<Prediction>,
}

/// Task payload: the image reference plus traceability metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskData {
    /// Image URL resolvable against the file server.
    pub ocr: String,
    #[serde(default)]
    pub document: String,
    #[serde(default)]
    pub page: u32,
    /// Present only when OCR or assembly failed for this page.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// A set of pre-annotations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    pub result: Vec<Region>,
    pub score: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RegionKind {
    #[serde(rename = "rectangle")]
    Rectangle,
    #[serde(rename = "textarea")]
    TextArea,
}

/// One region record. Geometry-bearing and text-bearing records share `id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Region {
    pub id: String,
    pub from_name: String,
    pub to_name: String,
    #[serde(rename = "type")]
    pub kind: RegionKind,
    pub value: RegionValue,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<RegionMeta>,
}

/// Percentage-space geometry; `text` only on textarea regions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegionValue {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    pub rotation: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<Vec<String>>,
}

/// Free-form region notes shown in the annotation tool's region panel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegionMeta {
    pub text: Vec<String>,
}

impl RegionMeta {
    pub fn unread() -> Self {
        Self {
            text: vec![UNREAD_MARKER.to_string()],
        }
    }

    pub fn is_unread(&self) -> bool {
        self.text.iter().any(|t| t == UNREAD_MARKER)
    }
}
