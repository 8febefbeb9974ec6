//! OCRS backend: pure-Rust text detection and recognition.
//!
//! Each recognized text line becomes one detection whose quad is the line's
//! rotated rectangle. OCRS reports no recognition score, so confidence is 1.

use std::path::Path;
use std::sync::OnceLock;

use doclabel::models::{Detection, Point};
use ocrs::{ImageSource, OcrEngine, OcrEngineParams, TextItem};

use super::backend::{OcrBackend, OcrBackendType, OcrConfig, OcrError};
use super::model_store::{ModelFile, ModelStore};
use super::quad::order_corners;

const DETECTION_MODEL: &str = "text-detection.rten";
const RECOGNITION_MODEL: &str = "text-recognition.rten";

const MODELS: ModelStore = ModelStore {
    subdir: "ocrs",
    files: &[
        ModelFile {
            name: DETECTION_MODEL,
            url: "https://ocrs-models.s3-accelerate.amazonaws.com/text-detection.rten",
        },
        ModelFile {
            name: RECOGNITION_MODEL,
            url: "https://ocrs-models.s3-accelerate.amazonaws.com/text-recognition.rten",
        },
    ],
    download_size: "12 MB",
};

/// Shared across backends and workers; `OcrEngine` methods take `&self`.
static ENGINE: OnceLock<OcrEngine> = OnceLock::new();

fn load_model(dir: &Path, name: &str) -> Result<rten::Model, OcrError> {
    rten::Model::load_file(dir.join(name))
        .map_err(|e| OcrError::ModelNotFound(format!("{}: {}", name, e)))
}

pub struct OcrsBackend {
    config: OcrConfig,
}

impl OcrsBackend {
    pub fn new() -> Self {
        Self::with_config(OcrConfig::default())
    }

    pub fn with_config(config: OcrConfig) -> Self {
        Self { config }
    }

    fn engine(&self) -> Result<&'static OcrEngine, OcrError> {
        if let Some(engine) = ENGINE.get() {
            return Ok(engine);
        }

        let dir = MODELS.ensure(self.config.model_path.as_deref())?;
        let engine = OcrEngine::new(OcrEngineParams {
            detection_model: Some(load_model(&dir, DETECTION_MODEL)?),
            recognition_model: Some(load_model(&dir, RECOGNITION_MODEL)?),
            ..Default::default()
        })
        .map_err(|e| OcrError::OcrFailed(format!("Failed to create OCRS engine: {}", e)))?;

        // a concurrent worker may have initialized it first
        Ok(ENGINE.get_or_init(|| engine))
    }
}

impl Default for OcrsBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl OcrBackend for OcrsBackend {
    fn backend_type(&self) -> OcrBackendType {
        OcrBackendType::Ocrs
    }

    fn is_available(&self) -> bool {
        true
    }

    fn availability_hint(&self) -> String {
        MODELS.hint(self.config.model_path.as_deref(), "OCRS")
    }

    fn run_ocr(&self, image_path: &Path) -> Result<Vec<Detection>, OcrError> {
        let engine = self.engine()?;

        let rgb = image::open(image_path)
            .map_err(|e| OcrError::ImageError(format!("{}: {}", image_path.display(), e)))?
            .into_rgb8();
        let source = ImageSource::from_bytes(rgb.as_raw(), rgb.dimensions())
            .map_err(|e| OcrError::ImageError(e.to_string()))?;
        let input = engine
            .prepare_input(source)
            .map_err(|e| OcrError::OcrFailed(e.to_string()))?;

        let words = engine
            .detect_words(&input)
            .map_err(|e| OcrError::OcrFailed(format!("Text detection failed: {}", e)))?;
        let lines = engine.find_text_lines(&input, &words);
        let recognized = engine
            .recognize_text(&input, &lines)
            .map_err(|e| OcrError::OcrFailed(format!("Text recognition failed: {}", e)))?;

        Ok(recognized
            .iter()
            .flatten()
            .map(|line| {
                let corners = line
                    .rotated_rect()
                    .corners()
                    .map(|c| Point::new(f64::from(c.x), f64::from(c.y)));
                Detection::new(order_corners(corners), line.to_string(), 1.0)
            })
            .collect())
    }
}
