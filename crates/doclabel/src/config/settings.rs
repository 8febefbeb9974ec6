//! Resolved application settings.

use std::path::PathBuf;
use std::time::Duration;

use crate::dataset::{AssemblyOptions, RegionIdStrategy};
use crate::geometry::DEFAULT_ROTATION_TOLERANCE_DEG;
use crate::utils::{ImageLocator, ImageUrlError};

use super::ConfigError;

pub const DEFAULT_DPI: u32 = 300;
pub const DEFAULT_IMAGES_DIR: &str = "image";
pub const DEFAULT_OUTPUT: &str = "label_studio_dataset.json";
pub const DEFAULT_BASE_URL: &str = "http://localhost:8080/";
pub const DEFAULT_SERVE_HOST: &str = "0.0.0.0";
pub const DEFAULT_SERVE_PORT: u16 = 8080;
pub const DEFAULT_ANNOTATOR_PROGRAM: &str = "label-studio";
pub const DEFAULT_ANNOTATOR_PORT: u16 = 8081;
pub const DEFAULT_OCR_BACKEND: &str = "tesseract";
pub const DEFAULT_OCR_LANGUAGE: &str = "eng";

/// Annotation tool process settings.
#[derive(Debug, Clone, PartialEq)]
pub struct AnnotatorSettings {
    pub enabled: bool,
    pub program: String,
    /// Extra arguments; `-p <port>` is appended when no `-p`/`--port` is given.
    pub args: Vec<String>,
    pub port: u16,
    pub start_timeout: Duration,
    pub stop_timeout: Duration,
}

impl Default for AnnotatorSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            program: DEFAULT_ANNOTATOR_PROGRAM.to_string(),
            args: Vec::new(),
            port: DEFAULT_ANNOTATOR_PORT,
            start_timeout: Duration::from_secs(60),
            stop_timeout: Duration::from_secs(5),
        }
    }
}

impl AnnotatorSettings {
    /// Full argument list passed to the annotator program.
    pub fn command_args(&self) -> Vec<String> {
        let mut args = self.args.clone();
        let has_port = args
            .iter()
            .any(|a| a == "-p" || a == "--port" || a.starts_with("--port="));
        if !has_port {
            args.push("-p".to_string());
            args.push(self.port.to_string());
        }
        args
    }
}

/// File server and annotator settings for `serve`.
#[derive(Debug, Clone, PartialEq)]
pub struct ServeSettings {
    pub host: String,
    pub port: u16,
    pub shutdown_timeout: Duration,
    pub annotator: AnnotatorSettings,
}

impl Default for ServeSettings {
    fn default() -> Self {
        Self {
            host: DEFAULT_SERVE_HOST.to_string(),
            port: DEFAULT_SERVE_PORT,
            shutdown_timeout: Duration::from_secs(5),
            annotator: AnnotatorSettings::default(),
        }
    }
}

/// Application settings.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    /// Directory rendered page images are written to and served from.
    pub images_dir: PathBuf,
    /// Dataset file path.
    pub output_path: PathBuf,
    /// Rasterization resolution.
    pub dpi: u32,
    /// Base URL the file server exposes `images_dir` under.
    pub base_url: String,
    /// Concurrent page recognition tasks.
    pub workers: usize,
    pub rotation_tolerance_deg: f64,
    pub region_ids: RegionIdStrategy,
    /// OCR backend name (tesseract, ocrs, paddleocr).
    pub ocr_backend: String,
    pub ocr_language: String,
    /// Label names for training-set conversion; position is the class id.
    pub labels: Vec<String>,
    pub serve: ServeSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            images_dir: PathBuf::from(DEFAULT_IMAGES_DIR),
            output_path: PathBuf::from(DEFAULT_OUTPUT),
            dpi: DEFAULT_DPI,
            base_url: DEFAULT_BASE_URL.to_string(),
            workers: default_workers(),
            rotation_tolerance_deg: DEFAULT_ROTATION_TOLERANCE_DEG,
            region_ids: RegionIdStrategy::default(),
            ocr_backend: DEFAULT_OCR_BACKEND.to_string(),
            ocr_language: DEFAULT_OCR_LANGUAGE.to_string(),
            labels: Vec::new(),
            serve: ServeSettings::default(),
        }
    }
}

pub fn default_workers() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}

impl Settings {
    /// Settings with paths anchored at `base_dir`.
    pub fn with_base_dir(base_dir: &std::path::Path) -> Self {
        Self {
            images_dir: base_dir.join(DEFAULT_IMAGES_DIR),
            output_path: base_dir.join(DEFAULT_OUTPUT),
            ..Default::default()
        }
    }

    pub fn assembly_options(&self) -> AssemblyOptions {
        AssemblyOptions {
            rotation_tolerance_deg: self.rotation_tolerance_deg,
            region_ids: self.region_ids,
        }
    }

    pub fn image_locator(&self) -> Result<ImageLocator, ImageUrlError> {
        ImageLocator::new(&self.base_url, self.images_dir.clone())
    }

    /// Reject values that would make a run meaningless.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.dpi == 0 {
            return Err(ConfigError::Invalid("dpi must be positive".into()));
        }
        if self.workers == 0 {
            return Err(ConfigError::Invalid("workers must be positive".into()));
        }
        if !self.rotation_tolerance_deg.is_finite() || self.rotation_tolerance_deg < 0.0 {
            return Err(ConfigError::Invalid(format!(
                "rotation tolerance must be a non-negative number, got {}",
                self.rotation_tolerance_deg
            )));
        }
        self.image_locator()
            .map_err(|e| ConfigError::Invalid(e.to_string()))?;
        Ok(())
    }
}
