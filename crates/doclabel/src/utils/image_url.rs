//! Page image locations on disk and on the file server.

use std::path::{Component, Path, PathBuf};

use thiserror::Error;
use url::Url;

use crate::models::PageKey;

#[derive(Debug, Error)]
pub enum ImageUrlError {
    #[error("Invalid image base URL '{url}': {source}")]
    Parse {
        url: String,
        source: url::ParseError,
    },

    #[error("Image base URL '{0}' cannot have path segments")]
    NotABase(String),
}

/// File name of a rendered page, 1-based.
pub fn page_image_name(page: u32) -> String {
    format!("page_{}.png", page)
}

/// Maps page keys to image paths under `images_dir` and to URLs under the
/// file server's base URL. The server serves `images_dir` as its root, so a
/// path relative to `images_dir` is also the URL path relative to the base.
#[derive(Debug, Clone)]
pub struct ImageLocator {
    base_url: Url,
    images_dir: PathBuf,
}

impl ImageLocator {
    pub fn new(base_url: &str, images_dir: impl Into<PathBuf>) -> Result<Self, ImageUrlError> {
        let parsed = Url::parse(base_url).map_err(|source| ImageUrlError::Parse {
            url: base_url.to_string(),
            source,
        })?;
        if parsed.cannot_be_a_base() {
            return Err(ImageUrlError::NotABase(base_url.to_string()));
        }
        Ok(Self {
            base_url: parsed,
            images_dir: images_dir.into(),
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn images_dir(&self) -> &Path {
        &self.images_dir
    }

    /// `images_dir/<document>/page_<n>.png`
    pub fn page_image_path(&self, key: &PageKey) -> PathBuf {
        self.images_dir
            .join(&key.document)
            .join(page_image_name(key.page))
    }

    pub fn url_for_key(&self, key: &PageKey) -> String {
        let name = page_image_name(key.page);
        self.join([key.document.as_str(), name.as_str()])
    }

    /// URL for an image file. Paths outside `images_dir` fall back to the
    /// file name alone.
    pub fn url_for_path(&self, path: &Path) -> String {
        let relative = path.strip_prefix(&self.images_dir).ok().and_then(|rel| {
            let parts: Option<Vec<&str>> = rel
                .components()
                .map(|c| match c {
                    Component::Normal(s) => s.to_str(),
                    _ => None,
                })
                .collect();
            parts.filter(|p| !p.is_empty())
        });

        match relative {
            Some(parts) => self.join(parts),
            None => {
                let name = path
                    .file_name()
                    .and_then(|n| n.to_str())
                    .unwrap_or_default();
                self.join([name])
            }
        }
    }

    fn join<'a>(&self, segments: impl IntoIterator<Item = &'a str>) -> String {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url_for_key() {
        let locator = ImageLocator::new("http://localhost:8080/", "image").unwrap();
        assert_eq!(
            locator.url_for_key(&PageKey::new("report", 2)),
            "http://localhost:8080/report/page_2.png"
        );
    }

    #[test]
    fn test_base_path_is_kept() {
        let locator = ImageLocator::new("https://files.example.org/images/", "out").unwrap();
        assert_eq!(
            locator.url_for_key(&PageKey::new("a", 1)),
            "https://files.example.org/images/a/page_1.png"
        );
    }

    #[test]
    fn test_segments_are_percent_encoded() {
        let locator = ImageLocator::new("http://localhost:8080", "image").unwrap();
        assert_eq!(
            locator.url_for_key(&PageKey::new("tax return #2", 1)),
            "http://localhost:8080/tax%20return%20%232/page_1.png"
        );
    }

    #[test]
    fn test_url_for_path_relative_to_images_dir() {
        let locator = ImageLocator::new("http://localhost:8080/", "/data/image").unwrap();
        let path = locator.page_image_path(&PageKey::new("doc", 3));
        assert_eq!(path, PathBuf::from("/data/image/doc/page_3.png"));
        assert_eq!(
            locator.url_for_path(&path),
            "http://localhost:8080/doc/page_3.png"
        );
        assert_eq!(
            locator.url_for_path(Path::new("/elsewhere/scan.png")),
            "http://localhost:8080/scan.png"
        );
    }

    #[test]
    fn test_rejects_non_base_url() {
        assert!(matches!(
            ImageLocator::new("mailto:someone@example.org", "image"),
            Err(ImageUrlError::NotABase(_))
        ));
        assert!(ImageLocator::new("not a url", "image").is_err());
    }
}
