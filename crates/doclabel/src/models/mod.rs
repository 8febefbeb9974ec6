//! Domain model: documents, pages, and OCR detections.

mod detection;
mod document;

pub use detection::{Detection, Point, Quad};
pub use document::{Document, Page, PageImage, PageKey, PageOcr, SourceDocument};
