//! Documents and their rendered pages.

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use super::Detection;

/// A PDF discovered on disk, identified by its file stem.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceDocument {
    pub id: String,
    pub path: PathBuf,
}

impl SourceDocument {
    pub fn new(id: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            id: id.into(),
            path: path.into(),
        }
    }
}

/// Identity of a page across the whole run: `(document id, 1-based page number)`.
///
/// Carried from rasterization through recognition to the final record so
/// nothing downstream has to parse image filenames.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PageKey {
    pub document: String,
    pub page: u32,
}

impl PageKey {
    pub fn new(document: impl Into<String>, page: u32) -> Self {
        Self {
            document: document.into(),
            page,
        }
    }
}

impl fmt::Display for PageKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} p{}", self.document, self.page)
    }
}

/// A rendered page image with known pixel dimensions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageImage {
    pub key: PageKey,
    pub path: PathBuf,
    pub width: u32,
    pub height: u32,
}

/// Outcome of running the recognizer over one page image.
#[derive(Debug, Clone, PartialEq)]
pub enum PageOcr {
    Recognized(Vec<Detection>),
    Failed(String),
}

/// A page ready for assembly.
#[derive(Debug, Clone, PartialEq)]
pub struct Page {
    pub image: PageImage,
    pub ocr: PageOcr,
}

impl Page {
    pub fn recognized(image: PageImage, detections: Vec<Detection>) -> Self {
        Self {
            image,
            ocr: PageOcr::Recognized(detections),
        }
    }

    pub fn failed(image: PageImage, error: impl Into<String>) -> Self {
        Self {
            image,
            ocr: PageOcr::Failed(error.into()),
        }
    }

    pub fn key(&self) -> &PageKey {
        &self.image.key
    }
}

/// A document with its pages in page order.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub id: String,
    pub pages: Vec<Page>,
}
