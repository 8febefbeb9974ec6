//! Tesseract OCR backend implementation.
//!
//! Runs the `tesseract` command with TSV output and groups word rows into
//! text lines. Each line becomes one detection: the line's box from the
//! level-4 row, the words joined by spaces, and the mean word confidence.

use std::collections::BTreeMap;
use std::path::Path;
use std::process::Command;

use doclabel::models::{Detection, Quad};

use super::backend::{OcrBackend, OcrBackendType, OcrConfig, OcrError};
use super::tools::check_binary;

const LEVEL_LINE: u32 = 4;
const LEVEL_WORD: u32 = 5;

/// Tesseract OCR backend.
pub struct TesseractBackend {
    config: OcrConfig,
}

impl TesseractBackend {
    /// Create a new Tesseract backend with default configuration.
    pub fn new() -> Self {
        Self {
            config: OcrConfig::default(),
        }
    }

    /// Create a new Tesseract backend with custom configuration.
    pub fn with_config(config: OcrConfig) -> Self {
        Self { config }
    }

    /// Run Tesseract on an image file, returning raw TSV.
    fn run_tesseract_impl(&self, image_path: &Path) -> Result<String, OcrError> {
        let output = Command::new("tesseract")
            .arg(image_path)
            .arg("stdout")
            .args(["-l", &self.config.language])
            .arg("tsv")
            .output();

        match output {
            Ok(output) => {
                if output.status.success() {
                    Ok(String::from_utf8_lossy(&output.stdout).to_string())
                } else {
                    let stderr = String::from_utf8_lossy(&output.stderr);
                    Err(OcrError::OcrFailed(format!("tesseract failed: {}", stderr.trim())))
                }
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(OcrError::BackendNotAvailable(
                    "tesseract not found (install tesseract-ocr)".to_string(),
                ))
            }
            Err(e) => Err(OcrError::Io(e)),
        }
    }
}

impl Default for TesseractBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl OcrBackend for TesseractBackend {
    fn backend_type(&self) -> OcrBackendType {
        OcrBackendType::Tesseract
    }

    fn is_available(&self) -> bool {
        check_binary("tesseract")
    }

    fn availability_hint(&self) -> String {
        if check_binary("tesseract") {
            format!("Tesseract is available (language: {})", self.config.language)
        } else {
            "Tesseract not installed. Install with: apt install tesseract-ocr".to_string()
        }
    }

    fn run_ocr(&self, image_path: &Path) -> Result<Vec<Detection>, OcrError> {
        let tsv = self.run_tesseract_impl(image_path)?;
        parse_tsv(&tsv)
    }
}

/// (page, block, paragraph, line)
type LineId = (u32, u32, u32, u32);

#[derive(Default)]
struct LineAccumulator {
    rect: Option<(f64, f64, f64, f64)>,
    words: Vec<String>,
    confidences: Vec<f32>,
}

/// Parse `tesseract ... tsv` output into line detections, in reading order.
pub fn parse_tsv(tsv: &str) -> Result<Vec<Detection>, OcrError> {
    let mut lines: BTreeMap<LineId, LineAccumulator> = BTreeMap::new();
    let mut order: Vec<LineId> = Vec::new();

    for (n, row) in tsv.lines().enumerate() {
        if n == 0 || row.trim().is_empty() {
            continue; // header
        }
        let cols: Vec<&str> = row.splitn(12, '\t').collect();
        if cols.len() < 11 {
            return Err(OcrError::OcrFailed(format!(
                "malformed tesseract TSV row {}: {:?}",
                n + 1,
                row
            )));
        }

        let num = |i: usize| -> Result<u32, OcrError> {
            cols[i].trim().parse::<u32>().map_err(|_| {
                OcrError::OcrFailed(format!("bad TSV field {} in row {}: {:?}", i, n + 1, cols[i]))
            })
        };
        let level = num(0)?;
        if level != LEVEL_LINE && level != LEVEL_WORD {
            continue;
        }
        let id = (num(1)?, num(2)?, num(3)?, num(4)?);
        let entry = lines.entry(id).or_insert_with(|| {
            order.push(id);
            LineAccumulator::default()
        });

        if level == LEVEL_LINE {
            let (left, top) = (num(6)? as f64, num(7)? as f64);
            let (width, height) = (num(8)? as f64, num(9)? as f64);
            entry.rect = Some((left, top, left + width, top + height));
        } else {
            let text = cols.get(11).map(|t| t.trim()).unwrap_or_default();
            if text.is_empty() {
                continue;
            }
            entry.words.push(text.to_string());
            if let Ok(conf) = cols[10].trim().parse::<f32>() {
                if conf >= 0.0 {
                    entry.confidences.push(conf / 100.0);
                }
            }
        }
    }

    let detections = order
        .into_iter()
        .filter_map(|id| lines.remove(&id))
        .filter_map(|line| {
            let (left, top, right, bottom) = line.rect?;
            let confidence = if line.confidences.is_empty() {
                0.0
            } else {
                line.confidences.iter().sum::<f32>() / line.confidences.len() as f32
            };
            Some(Detection::new(
                Quad::from_rect(left, top, right, bottom),
                line.words.join(" "),
                confidence,
            ))
        })
        .collect();
    Ok(detections)
}

#[cfg(test)]
mod tests {
    use super::*;

    const HEADER: &str =
        "level\tpage_num\tblock_num\tpar_num\tline_num\tword_num\tleft\ttop\twidth\theight\tconf\ttext";

    fn tsv(rows: &[&str]) -> String {
        let mut out = String::from(HEADER);
        for row in rows {
            out.push('\n');
            out.push_str(row);
        }
        out
    }

    #[test]
    fn test_groups_words_into_lines() {
        let input = tsv(&[
            "1\t1\t0\t0\t0\t0\t0\t0\t1000\t2000\t-1\t",
            "4\t1\t1\t1\t1\t0\t100\t200\t200\t40\t-1\t",
            "5\t1\t1\t1\t1\t1\t100\t200\t90\t40\t96.5\tTotal:",
            "5\t1\t1\t1\t1\t2\t200\t200\t100\t40\t91.5\t$42",
            "4\t1\t1\t1\t2\t0\t100\t260\t300\t40\t-1\t",
            "5\t1\t1\t1\t2\t1\t100\t260\t300\t40\t88\tThanks",
        ]);
        let detections = parse_tsv(&input).unwrap();
        assert_eq!(detections.len(), 2);
        assert_eq!(detections[0].text, "Total: $42");
        assert_eq!(detections[0].quad, Quad::from_rect(100.0, 200.0, 300.0, 240.0));
        assert!((detections[0].confidence - 0.94).abs() < 1e-6);
        assert_eq!(detections[1].text, "Thanks");
    }

    #[test]
    fn test_line_without_words_is_unread() {
        let input = tsv(&[
            "4\t1\t1\t1\t1\t0\t10\t10\t50\t20\t-1\t",
            "5\t1\t1\t1\t1\t1\t10\t10\t50\t20\t-1\t ",
        ]);
        let detections = parse_tsv(&input).unwrap();
        assert_eq!(detections.len(), 1);
        assert!(!detections[0].has_text());
        assert_eq!(detections[0].confidence, 0.0);
    }

    #[test]
    fn test_blank_page_has_no_detections() {
        let input = tsv(&["1\t1\t0\t0\t0\t0\t0\t0\t1000\t2000\t-1\t"]);
        assert!(parse_tsv(&input).unwrap().is_empty());
        assert!(parse_tsv("").unwrap().is_empty());
    }

    #[test]
    fn test_malformed_row_is_error() {
        let input = tsv(&["4\t1\t1"]);
        assert!(matches!(parse_tsv(&input), Err(OcrError::OcrFailed(_))));
    }
}
