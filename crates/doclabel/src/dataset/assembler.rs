//! Turns per-page OCR detections into dataset records.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use super::record::{round4, AnnotationShape, Dataset, DatasetRecord};
use crate::geometry::{self, GeometryError, NormalizedBox, DEFAULT_ROTATION_TOLERANCE_DEG};
use crate::models::{Detection, Document, Page, PageKey, PageOcr};
use crate::utils::ImageLocator;

/// Errors that abort assembly of a whole page.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum AssemblyError {
    #[error("Invalid image size {width}x{height}")]
    InvalidImageSize { width: u32, height: u32 },
}

/// How region identifiers are generated.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RegionIdStrategy {
    /// 10-character random token.
    #[default]
    Random,
    /// `r0001`, `r0002`, ... restarting on every page.
    Sequential,
}

impl RegionIdStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Random => "random",
            Self::Sequential => "sequential",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "random" => Some(Self::Random),
            "sequential" | "seq" => Some(Self::Sequential),
            _ => None,
        }
    }
}

/// Per-page id source; guarantees uniqueness within the page.
struct RegionIds {
    strategy: RegionIdStrategy,
    issued: HashSet<String>,
}

impl RegionIds {
    fn new(strategy: RegionIdStrategy) -> Self {
        Self {
            strategy,
            issued: HashSet::new(),
        }
    }

    fn next(&mut self) -> String {
        loop {
            let candidate = match self.strategy {
                RegionIdStrategy::Random => {
                    let token = uuid::Uuid::new_v4().simple().to_string();
                    token[..10].to_string()
                }
                RegionIdStrategy::Sequential => format!("r{:04}", self.issued.len() + 1),
            };
            if self.issued.insert(candidate.clone()) {
                return candidate;
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AssemblyOptions {
    pub rotation_tolerance_deg: f64,
    pub region_ids: RegionIdStrategy,
}

impl Default for AssemblyOptions {
    fn default() -> Self {
        Self {
            rotation_tolerance_deg: DEFAULT_ROTATION_TOLERANCE_DEG,
            region_ids: RegionIdStrategy::default(),
        }
    }
}

/// Annotation Assembler.
///
/// Stateless apart from its options: assembling the same page twice yields
/// the same geometry (ids aside), so pages can be assembled on any thread.
#[derive(Debug, Clone)]
pub struct Assembler {
    options: AssemblyOptions,
    locator: ImageLocator,
}

impl Assembler {
    pub fn new(options: AssemblyOptions, locator: ImageLocator) -> Self {
        Self { options, locator }
    }

    pub fn options(&self) -> &AssemblyOptions {
        &self.options
    }

    pub fn locator(&self) -> &ImageLocator {
        &self.locator
    }

    /// Assemble one page whose image follows the standard naming.
    pub fn assemble(
        &self,
        document_id: &str,
        page: u32,
        image_width: u32,
        image_height: u32,
        detections: &[Detection],
    ) -> Result<DatasetRecord, AssemblyError> {
        let key = PageKey::new(document_id, page);
        let image_url = self.locator.url_for_key(&key);
        self.assemble_with_url(key, image_url, image_width, image_height, detections)
    }

    fn assemble_with_url(
        &self,
        key: PageKey,
        image_url: String,
        image_width: u32,
        image_height: u32,
        detections: &[Detection],
    ) -> Result<DatasetRecord, AssemblyError> {
        if image_width == 0 || image_height == 0 {
            return Err(AssemblyError::InvalidImageSize {
                width: image_width,
                height: image_height,
            });
        }

        let mut ids = RegionIds::new(self.options.region_ids);
        let mut shapes = Vec::with_capacity(detections.len());
        let mut skipped = 0;

        for (index, detection) in detections.iter().enumerate() {
            let geometry = match self.normalize(detection, image_width, image_height) {
                Ok(g) => g,
                Err(e) => {
                    debug!("{}: skipping detection {}: {}", key, index, e);
                    skipped += 1;
                    continue;
                }
            };
            shapes.push(AnnotationShape {
                id: ids.next(),
                geometry,
                text: detection.text.clone(),
                confidence: round4(f64::from(detection.confidence)),
            });
        }

        Ok(DatasetRecord {
            key,
            image_url,
            shapes,
            error: None,
            skipped_detections: skipped,
        })
    }

    fn normalize(
        &self,
        detection: &Detection,
        image_width: u32,
        image_height: u32,
    ) -> Result<NormalizedBox, GeometryError> {
        geometry::normalize(
            &detection.quad,
            image_width,
            image_height,
            self.options.rotation_tolerance_deg,
        )
    }

    /// Assemble a page, folding recognition or assembly failure into an
    /// error-marked record with no shapes.
    pub fn assemble_page(&self, page: &Page) -> DatasetRecord {
        let key = page.key().clone();
        let image_url = self.locator.url_for_path(&page.image.path);

        match &page.ocr {
            PageOcr::Failed(error) => {
                warn!("{}: recognition failed: {}", key, error);
                DatasetRecord::failed(key, image_url, error.clone())
            }
            PageOcr::Recognized(detections) => {
                match self.assemble_with_url(
                    key.clone(),
                    image_url.clone(),
                    page.image.width,
                    page.image.height,
                    detections,
                ) {
                    Ok(record) => record,
                    Err(e) => {
                        warn!("{}: assembly failed: {}", key, e);
                        DatasetRecord::failed(key, image_url, e.to_string())
                    }
                }
            }
        }
    }

    /// Records for every page of every document, in document then page order.
    pub fn build_dataset(&self, documents: &[Document]) -> Dataset {
        let records = documents
            .iter()
            .flat_map(|doc| doc.pages.iter())
            .map(|page| self.assemble_page(page))
            .collect();
        Dataset::new(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{PageImage, Quad};
    use std::path::PathBuf;

    fn assembler(ids: RegionIdStrategy) -> Assembler {
        let locator = ImageLocator::new("http://localhost:8080/", "image").unwrap();
        Assembler::new(
            AssemblyOptions {
                region_ids: ids,
                ..Default::default()
            },
            locator,
        )
    }

    fn detection(text: &str) -> Detection {
        Detection::new(Quad::from_rect(100.0, 200.0, 300.0, 400.0), text, 0.95)
    }

    #[test]
    fn test_scenario_total_line() {
        let record = assembler(RegionIdStrategy::Random)
            .assemble("invoice", 1, 1000, 2000, &[detection("Total: $42")])
            .unwrap();
        assert_eq!(record.image_url, "http://localhost:8080/invoice/page_1.png");
        assert_eq!(record.shapes.len(), 1);

        let shape = &record.shapes[0];
        assert_eq!(shape.id.len(), 10);
        assert_eq!(
            shape.geometry,
            NormalizedBox {
                x: 10.0,
                y: 10.0,
                width: 20.0,
                height: 10.0,
                rotation: 0.0
            }
        );
        assert_eq!(shape.text, "Total: $42");
    }

    #[test]
    fn test_zero_image_size_is_error() {
        let err = assembler(RegionIdStrategy::Random)
            .assemble("doc", 1, 0, 2000, &[detection("x")])
            .unwrap_err();
        assert_eq!(
            err,
            AssemblyError::InvalidImageSize {
                width: 0,
                height: 2000
            }
        );
    }

    #[test]
    fn test_degenerate_detection_is_skipped() {
        let flat = Detection::new(Quad::from_rect(5.0, 5.0, 5.0, 50.0), "bad", 0.5);
        let record = assembler(RegionIdStrategy::Sequential)
            .assemble("doc", 1, 100, 100, &[flat, detection("ok")])
            .unwrap();
        assert_eq!(record.skipped_detections, 1);
        assert_eq!(record.shapes.len(), 1);
        assert_eq!(record.shapes[0].id, "r0001");
    }

    #[test]
    fn test_empty_text_is_kept() {
        let record = assembler(RegionIdStrategy::Random)
            .assemble("doc", 1, 1000, 1000, &[detection("")])
            .unwrap();
        assert_eq!(record.shapes.len(), 1);
        assert_eq!(record.unread_count(), 1);
    }

    #[test]
    fn test_random_ids_are_unique_within_page() {
        let detections: Vec<_> = (0..200).map(|_| detection("w")).collect();
        let record = assembler(RegionIdStrategy::Random)
            .assemble("doc", 1, 1000, 1000, &detections)
            .unwrap();
        let ids: HashSet<_> = record.shapes.iter().map(|s| &s.id).collect();
        assert_eq!(ids.len(), 200);
    }

    #[test]
    fn test_assembly_is_idempotent() {
        let a = assembler(RegionIdStrategy::Sequential);
        let detections = [detection("one"), detection("two")];
        let first = a.assemble("doc", 4, 850, 1100, &detections).unwrap();
        let second = a.assemble("doc", 4, 850, 1100, &detections).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_assemble_page_marks_failures() {
        let image = PageImage {
            key: PageKey::new("doc", 2),
            path: PathBuf::from("image/doc/page_2.png"),
            width: 1000,
            height: 1000,
        };
        let record = assembler(RegionIdStrategy::Random)
            .assemble_page(&Page::failed(image.clone(), "tesseract exited 1"));
        assert!(record.is_failed());
        assert!(record.shapes.is_empty());
        assert_eq!(record.image_url, "http://localhost:8080/doc/page_2.png");

        let zero = PageImage { width: 0, ..image };
        let record =
            assembler(RegionIdStrategy::Random).assemble_page(&Page::recognized(zero, vec![]));
        assert!(record.error.unwrap().contains("Invalid image size"));
    }

    #[test]
    fn test_strategy_parsing() {
        assert_eq!(
            RegionIdStrategy::from_str("Sequential"),
            Some(RegionIdStrategy::Sequential)
        );
        assert_eq!(RegionIdStrategy::from_str("uuid"), None);
        assert_eq!(RegionIdStrategy::Random.as_str(), "random");
    }
}
