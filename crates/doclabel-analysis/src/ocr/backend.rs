//! OCR backend abstraction.
//!
//! Every backend turns one page image into positioned detections:
//! - Tesseract: command-line, line boxes from TSV output (CPU, default)
//! - Ocrs: pure Rust engine (feature: ocr-ocrs)
//! - PaddleOCR: CNN-based via ONNX Runtime (feature: ocr-paddle)

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use doclabel::models::Detection;
use thiserror::Error;

/// Errors from OCR backends.
#[derive(Debug, Error)]
pub enum OcrError {
    #[error("Backend not available: {0}")]
    BackendNotAvailable(String),

    #[error("OCR failed: {0}")]
    OcrFailed(String),

    #[error("Model not found: {0}")]
    ModelNotFound(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Image error: {0}")]
    ImageError(String),
}

/// Detections for one image plus timing.
#[derive(Debug, Clone)]
pub struct OcrResult {
    pub detections: Vec<Detection>,
    pub backend: OcrBackendType,
    pub processing_time_ms: u64,
}

/// Available OCR backend types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OcrBackendType {
    /// Tesseract OCR via command-line.
    Tesseract,
    /// Pure Rust OCR engine (ocrs crate).
    Ocrs,
    /// PaddleOCR via ONNX Runtime.
    PaddleOcr,
}

impl OcrBackendType {
    pub const ALL: [OcrBackendType; 3] = [Self::Tesseract, Self::Ocrs, Self::PaddleOcr];

    pub fn as_str(&self) -> &'static str {
        match self {
            OcrBackendType::Tesseract => "tesseract",
            OcrBackendType::Ocrs => "ocrs",
            OcrBackendType::PaddleOcr => "paddleocr",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "tesseract" => Some(OcrBackendType::Tesseract),
            "ocrs" => Some(OcrBackendType::Ocrs),
            "paddleocr" | "paddle" => Some(OcrBackendType::PaddleOcr),
            _ => None,
        }
    }

    /// Cargo feature needed to compile this backend in, if any.
    pub fn feature(&self) -> Option<&'static str> {
        match self {
            OcrBackendType::Tesseract => None,
            OcrBackendType::Ocrs => Some("ocr-ocrs"),
            OcrBackendType::PaddleOcr => Some("ocr-paddle"),
        }
    }

    pub fn is_compiled(&self) -> bool {
        match self {
            OcrBackendType::Tesseract => true,
            OcrBackendType::Ocrs => cfg!(feature = "ocr-ocrs"),
            OcrBackendType::PaddleOcr => cfg!(feature = "ocr-paddle"),
        }
    }
}

impl std::fmt::Display for OcrBackendType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Trait for OCR backends.
///
/// Implementations are called from blocking worker threads, possibly many
/// at once, so they must be `Send + Sync`.
pub trait OcrBackend: Send + Sync {
    /// Get the backend type.
    fn backend_type(&self) -> OcrBackendType;

    /// Check if this backend is available (dependencies installed, models present).
    fn is_available(&self) -> bool;

    /// Get a description of what's needed to make this backend available.
    fn availability_hint(&self) -> String;

    /// Core OCR: detections in the image's pixel space, in engine order.
    /// A blank image yields an empty list, not an error.
    fn run_ocr(&self, image_path: &Path) -> Result<Vec<Detection>, OcrError>;

    /// Run OCR on an image file, returning a timed result.
    fn detect(&self, image_path: &Path) -> Result<OcrResult, OcrError> {
        let start = Instant::now();
        let detections = self.run_ocr(image_path)?;
        Ok(OcrResult {
            detections,
            backend: self.backend_type(),
            processing_time_ms: start.elapsed().as_millis() as u64,
        })
    }
}

/// Configuration for OCR backends.
#[derive(Debug, Clone)]
pub struct OcrConfig {
    /// Language for OCR (e.g., "eng", "por").
    pub language: String,
    /// Path to model files (for backends that need them).
    pub model_path: Option<PathBuf>,
    /// Threads an engine may use internally.
    pub num_threads: usize,
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self {
            language: "eng".to_string(),
            model_path: None,
            num_threads: 4,
        }
    }
}

/// Build a backend by type. Backends behind a disabled feature report
/// themselves unavailable with a rebuild hint.
pub fn create_backend(
    backend_type: OcrBackendType,
    config: OcrConfig,
) -> Result<Arc<dyn OcrBackend>, OcrError> {
    match backend_type {
        OcrBackendType::Tesseract => Ok(Arc::new(super::TesseractBackend::with_config(config))),
        #[cfg(feature = "ocr-ocrs")]
        OcrBackendType::Ocrs => Ok(Arc::new(super::OcrsBackend::with_config(config))),
        #[cfg(feature = "ocr-paddle")]
        OcrBackendType::PaddleOcr => Ok(Arc::new(super::PaddleBackend::with_config(config))),
        #[allow(unreachable_patterns)]
        other => Err(OcrError::BackendNotAvailable(format!(
            "{} support not compiled in (rebuild with --features {})",
            other,
            other.feature().unwrap_or_default()
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_type_round_trip() {
        for t in OcrBackendType::ALL {
            assert_eq!(OcrBackendType::from_str(t.as_str()), Some(t));
        }
        assert_eq!(
            OcrBackendType::from_str("Paddle"),
            Some(OcrBackendType::PaddleOcr)
        );
        assert_eq!(OcrBackendType::from_str("gemini"), None);
    }

    #[test]
    fn test_tesseract_is_always_constructible() {
        let backend = create_backend(OcrBackendType::Tesseract, OcrConfig::default()).unwrap();
        assert_eq!(backend.backend_type(), OcrBackendType::Tesseract);
    }

    #[cfg(not(feature = "ocr-ocrs"))]
    #[test]
    fn test_missing_feature_is_reported() {
        let err = create_backend(OcrBackendType::Ocrs, OcrConfig::default())
            .err()
            .unwrap();
        assert!(err.to_string().contains("ocr-ocrs"));
    }
}
