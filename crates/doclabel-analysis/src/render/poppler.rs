//! Rasterizer backed by poppler's `pdfinfo` and `pdftoppm`.

use std::path::Path;
use std::process::Command;

use doclabel::models::{PageImage, PageKey};
use doclabel::utils::page_image_name;
use tracing::{debug, warn};

use super::{PageRender, PageRenderError, Rasterizer, RenderError};
use crate::ocr::{check_binary, POPPLER_HINT};

/// Renders pages one at a time with `pdftoppm -singlefile`.
#[derive(Debug, Clone, Default)]
pub struct PopplerRasterizer;

impl PopplerRasterizer {
    pub fn new() -> Self {
        Self
    }

    /// Page count from `pdfinfo`.
    pub fn page_count(&self, pdf_path: &Path) -> Result<u32, RenderError> {
        let output = Command::new("pdfinfo")
            .arg(pdf_path)
            .output()
            .map_err(|e| tool_error(e, "pdfinfo"))?;

        if !output.status.success() {
            return Err(RenderError::ToolFailed {
                tool: "pdfinfo",
                path: pdf_path.to_path_buf(),
                message: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        parse_page_count(&stdout).ok_or_else(|| RenderError::ToolFailed {
            tool: "pdfinfo",
            path: pdf_path.to_path_buf(),
            message: "no page count in output".to_string(),
        })
    }

    /// Render one 1-based page to `output_prefix.png`.
    fn render_page(
        &self,
        pdf_path: &Path,
        page: u32,
        dpi: u32,
        output_prefix: &Path,
    ) -> Result<(), RenderError> {
        let page_str = page.to_string();
        let dpi_str = dpi.to_string();

        let output = Command::new("pdftoppm")
            .args(["-png", "-singlefile", "-r", &dpi_str, "-f", &page_str, "-l", &page_str])
            .arg(pdf_path)
            .arg(output_prefix)
            .output()
            .map_err(|e| tool_error(e, "pdftoppm"))?;

        if output.status.success() {
            Ok(())
        } else {
            Err(RenderError::ToolFailed {
                tool: "pdftoppm",
                path: pdf_path.to_path_buf(),
                message: format!(
                    "page {}: {}",
                    page,
                    String::from_utf8_lossy(&output.stderr).trim()
                ),
            })
        }
    }

    /// Render a page to `path` and read back its pixel size.
    fn render_one(
        &self,
        pdf_path: &Path,
        page: u32,
        dpi: u32,
        path: &Path,
    ) -> Result<(u32, u32), RenderError> {
        // pdftoppm appends the extension itself
        self.render_page(pdf_path, page, dpi, &path.with_extension(""))?;
        image::image_dimensions(path).map_err(|e| RenderError::Image {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }
}

fn tool_error(e: std::io::Error, tool: &str) -> RenderError {
    if e.kind() == std::io::ErrorKind::NotFound {
        RenderError::ToolNotFound(format!("{} not found. {}", tool, POPPLER_HINT))
    } else {
        RenderError::Io(e)
    }
}

/// Extract `Pages:` from `pdfinfo` output.
pub fn parse_page_count(pdfinfo_output: &str) -> Option<u32> {
    pdfinfo_output
        .lines()
        .find_map(|line| line.strip_prefix("Pages:"))
        .and_then(|rest| rest.trim().parse().ok())
}

impl Rasterizer for PopplerRasterizer {
    fn render_pages(
        &self,
        pdf_path: &Path,
        document_id: &str,
        dpi: u32,
        images_dir: &Path,
    ) -> Result<Vec<PageRender>, RenderError> {
        let count = self.page_count(pdf_path)?;
        if count == 0 {
            return Err(RenderError::NoPages(pdf_path.to_path_buf()));
        }

        let doc_dir = images_dir.join(document_id);
        std::fs::create_dir_all(&doc_dir)?;

        let mut pages = Vec::with_capacity(count as usize);
        for page in 1..=count {
            let key = PageKey::new(document_id, page);
            let path = doc_dir.join(page_image_name(page));
            match self.render_one(pdf_path, page, dpi, &path) {
                Ok((width, height)) => {
                    debug!("Rendered {} ({}x{})", path.display(), width, height);
                    pages.push(Ok(PageImage {
                        key,
                        path,
                        width,
                        height,
                    }));
                }
                Err(e @ RenderError::ToolNotFound(_)) => return Err(e),
                Err(source) => {
                    warn!("{}: {}", key, source);
                    pages.push(Err(PageRenderError { key, path, source }));
                }
            }
        }
        Ok(pages)
    }

    fn is_available(&self) -> bool {
        check_binary("pdftoppm") && check_binary("pdfinfo")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_page_count() {
        let out = "Title:          Report\nProducer:       LaTeX\nPages:          12\nEncrypted:      no\n";
        assert_eq!(parse_page_count(out), Some(12));
        assert_eq!(parse_page_count("Title: x\n"), None);
        assert_eq!(parse_page_count("Pages: many\n"), None);
    }

    #[test]
    fn test_missing_pdf_fails_per_document() {
        if !check_binary("pdfinfo") {
            return;
        }
        let dir = tempfile::TempDir::new().unwrap();
        let missing = dir.path().join("missing.pdf");
        let result = PopplerRasterizer::new().render_pages(&missing, "missing", 72, dir.path());
        assert!(matches!(result, Err(RenderError::ToolFailed { tool: "pdfinfo", .. })));
    }
}
