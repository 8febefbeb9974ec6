//! PaddleOCR backend via ONNX Runtime.
//!
//! Text blocks map one-to-one onto detections, keeping the block's four
//! box points and its recognition score.

use std::path::Path;
use std::sync::{Mutex, OnceLock};

use doclabel::models::{Detection, Point};
use paddle_ocr_rs::ocr_lite::OcrLite;
use tracing::debug;

use super::backend::{OcrBackend, OcrBackendType, OcrConfig, OcrError};
use super::model_store::{ModelFile, ModelStore};
use super::quad::order_corners;

const DET_MODEL: &str = "ch_PP-OCRv4_det_infer.onnx";
const CLS_MODEL: &str = "ch_ppocr_mobile_v2.0_cls_infer.onnx";
const REC_MODEL: &str = "ch_PP-OCRv4_rec_infer.onnx";

const MODELS: ModelStore = ModelStore {
    subdir: "paddle-ocr",
    files: &[
        ModelFile {
            name: DET_MODEL,
            url: "https://huggingface.co/SWHL/RapidOCR/resolve/main/PP-OCRv4/ch_PP-OCRv4_det_infer.onnx",
        },
        ModelFile {
            name: CLS_MODEL,
            url: "https://www.modelscope.cn/models/RapidAI/RapidOCR/resolve/v3.4.0/onnx/PP-OCRv4/cls/ch_ppocr_mobile_v2.0_cls_infer.onnx",
        },
        ModelFile {
            name: REC_MODEL,
            url: "https://huggingface.co/SWHL/RapidOCR/resolve/main/PP-OCRv4/ch_PP-OCRv4_rec_infer.onnx",
        },
    ],
    download_size: "15 MB",
};

/// Detection tuning passed to `detect_from_path`.
const PADDING: u32 = 50;
const MAX_SIDE_LEN: u32 = 1024;
const BOX_SCORE_THRESH: f32 = 0.5;
const BOX_THRESH: f32 = 0.3;
const UNCLIP_RATIO: f32 = 1.6;

/// `detect_from_path` takes `&mut self`, so page workers share the engine
/// through a mutex.
static ENGINE: OnceLock<Mutex<OcrLite>> = OnceLock::new();

pub struct PaddleBackend {
    config: OcrConfig,
}

impl PaddleBackend {
    pub fn new() -> Self {
        Self::with_config(OcrConfig::default())
    }

    pub fn with_config(config: OcrConfig) -> Self {
        Self { config }
    }

    fn engine(&self) -> Result<&'static Mutex<OcrLite>, OcrError> {
        if let Some(engine) = ENGINE.get() {
            return Ok(engine);
        }

        let dir = MODELS.ensure(self.config.model_path.as_deref())?;
        let model = |name: &str| dir.join(name).to_string_lossy().into_owned();

        let mut ocr = OcrLite::new();
        ocr.init_models(
            &model(DET_MODEL),
            &model(CLS_MODEL),
            &model(REC_MODEL),
            self.config.num_threads as _,
        )
        .map_err(|e| OcrError::ModelNotFound(format!("Failed to init PaddleOCR: {}", e)))?;

        Ok(ENGINE.get_or_init(|| Mutex::new(ocr)))
    }
}

impl Default for PaddleBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl OcrBackend for PaddleBackend {
    fn backend_type(&self) -> OcrBackendType {
        OcrBackendType::PaddleOcr
    }

    fn is_available(&self) -> bool {
        true
    }

    fn availability_hint(&self) -> String {
        MODELS.hint(self.config.model_path.as_deref(), "PaddleOCR")
    }

    fn run_ocr(&self, image_path: &Path) -> Result<Vec<Detection>, OcrError> {
        let path = image_path.to_str().ok_or_else(|| {
            OcrError::ImageError(format!("Non UTF-8 image path: {}", image_path.display()))
        })?;

        let mut ocr = self
            .engine()?
            .lock()
            .map_err(|_| OcrError::OcrFailed("PaddleOCR engine lock poisoned".to_string()))?;
        let result = ocr
            .detect_from_path(
                path,
                PADDING,
                MAX_SIDE_LEN,
                BOX_SCORE_THRESH,
                BOX_THRESH,
                UNCLIP_RATIO,
                false,
                false,
            )
            .map_err(|e| OcrError::OcrFailed(format!("PaddleOCR detection failed: {}", e)))?;

        let mut detections = Vec::with_capacity(result.text_blocks.len());
        for block in &result.text_blocks {
            let points: Vec<Point> = block
                .box_points
                .iter()
                .map(|p| Point::new(f64::from(p.x), f64::from(p.y)))
                .collect();
            match <[Point; 4]>::try_from(points) {
                Ok(corners) => detections.push(Detection::new(
                    order_corners(corners),
                    block.text.clone(),
                    block.text_score,
                )),
                Err(points) => debug!("Skipping text block with {} points", points.len()),
            }
        }
        Ok(detections)
    }
}
