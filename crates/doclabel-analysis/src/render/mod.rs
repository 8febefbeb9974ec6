//! PDF rasterization.

mod poppler;

use std::path::{Path, PathBuf};

use doclabel::models::{PageImage, PageKey};
use thiserror::Error;

pub use poppler::{parse_page_count, PopplerRasterizer};

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("{0}")]
    ToolNotFound(String),

    #[error("{tool} failed on {path}: {message}")]
    ToolFailed {
        tool: &'static str,
        path: PathBuf,
        message: String,
    },

    #[error("No pages in {0}")]
    NoPages(PathBuf),

    #[error("Cannot read rendered image {path}: {message}")]
    Image { path: PathBuf, message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// One page that could not be rendered. Its siblings are unaffected.
#[derive(Debug, Error)]
#[error("{key}: {source}")]
pub struct PageRenderError {
    pub key: PageKey,
    /// Where the image would have been written.
    pub path: PathBuf,
    #[source]
    pub source: RenderError,
}

/// Outcome of rendering a single page.
pub type PageRender = Result<PageImage, PageRenderError>;

/// Turns a PDF into page images on disk.
///
/// Implementations write `images_dir/<document_id>/page_<n>.png` for every
/// page, 1-based, and return one outcome per page in page order. The outer
/// error is reserved for failures that leave no page renderable: an
/// unreadable PDF, zero pages, or a missing tool.
pub trait Rasterizer: Send + Sync {
    fn render_pages(
        &self,
        pdf_path: &Path,
        document_id: &str,
        dpi: u32,
        images_dir: &Path,
    ) -> Result<Vec<PageRender>, RenderError>;

    /// Whether the external tools this rasterizer needs are installed.
    fn is_available(&self) -> bool {
        true
    }
}
