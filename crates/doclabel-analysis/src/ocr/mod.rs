//! OCR backends.
//!
//! Tesseract is the default backend and needs only the `tesseract` binary.
//! Additional engines are available via feature flags:
//!
//! - **OCRS**: Pure Rust OCR, no external binaries (feature: ocr-ocrs)
//! - **PaddleOCR**: CNN-based, GPU support via ONNX (feature: ocr-paddle)

mod backend;
mod model_store;
mod quad;
mod tesseract;
mod tools;

#[cfg(feature = "ocr-ocrs")]
mod ocrs_backend;
#[cfg(feature = "ocr-paddle")]
mod paddle_backend;

pub use backend::{create_backend, OcrBackend, OcrBackendType, OcrConfig, OcrError, OcrResult};
pub use quad::order_corners;
pub use tesseract::{parse_tsv, TesseractBackend};
pub use tools::{check_binary, POPPLER_HINT};

#[cfg(feature = "ocr-ocrs")]
pub use ocrs_backend::OcrsBackend;
#[cfg(feature = "ocr-paddle")]
pub use paddle_backend::PaddleBackend;
