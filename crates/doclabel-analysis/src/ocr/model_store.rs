//! On-disk model files for engines that need them.
//!
//! A store is complete when every file it lists exists in one directory.
//! Missing files are fetched with `curl` (or `wget`) into the default
//! directory; each download lands under a `.part` name first so an
//! interrupted fetch never looks like a usable model.

// only the feature-gated engines hold a store
#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::process::Command;

use tracing::{info, warn};

use super::backend::OcrError;

/// Downloaders tried in order, with the flag that precedes the output path.
const DOWNLOADERS: &[(&str, &[&str])] = &[
    ("curl", &["-fSL", "--progress-bar", "-o"]),
    ("wget", &["-q", "--show-progress", "-O"]),
];

pub struct ModelFile {
    pub name: &'static str,
    pub url: &'static str,
}

pub struct ModelStore {
    /// Directory name under the data dir, e.g. `ocrs`.
    pub subdir: &'static str,
    pub files: &'static [ModelFile],
    /// Approximate total download, for messages.
    pub download_size: &'static str,
}

impl ModelStore {
    pub fn default_dir(&self) -> PathBuf {
        dirs::data_dir()
            .or_else(dirs::home_dir)
            .unwrap_or_else(|| PathBuf::from("."))
            .join("doclabel")
            .join("models")
            .join(self.subdir)
    }

    fn search_dirs(&self, configured: Option<&Path>) -> Vec<PathBuf> {
        let mut dirs = Vec::new();
        if let Some(dir) = configured {
            dirs.push(dir.to_path_buf());
        }
        dirs.push(self.default_dir());
        if let Some(home) = dirs::home_dir() {
            dirs.push(home.join(format!(".{}", self.subdir)).join("models"));
        }
        dirs
    }

    pub fn is_complete(&self, dir: &Path) -> bool {
        self.files.iter().all(|f| dir.join(f.name).is_file())
    }

    /// First directory holding every model file.
    pub fn locate(&self, configured: Option<&Path>) -> Option<PathBuf> {
        self.search_dirs(configured)
            .into_iter()
            .find(|dir| self.is_complete(dir))
    }

    /// Locate the models, downloading whatever is missing.
    pub fn ensure(&self, configured: Option<&Path>) -> Result<PathBuf, OcrError> {
        if let Some(dir) = self.locate(configured) {
            return Ok(dir);
        }

        let dir = self.default_dir();
        std::fs::create_dir_all(&dir)?;
        for file in self.files {
            let dest = dir.join(file.name);
            if dest.is_file() {
                continue;
            }
            info!("Downloading {} to {}", file.name, dir.display());
            download(file.url, &dest)?;
        }
        Ok(dir)
    }

    pub fn hint(&self, configured: Option<&Path>, engine: &str) -> String {
        match self.locate(configured) {
            Some(dir) => format!("{} models found at {}", engine, dir.display()),
            None => format!(
                "{} models will be downloaded on first use (~{}) to {}",
                engine,
                self.download_size,
                self.default_dir().display()
            ),
        }
    }
}

fn download(url: &str, dest: &Path) -> Result<(), OcrError> {
    let partial = dest.with_extension("part");

    for (tool, args) in DOWNLOADERS {
        let status = match Command::new(tool).args(*args).arg(&partial).arg(url).status() {
            Ok(status) => status,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => continue,
            Err(e) => return Err(OcrError::Io(e)),
        };

        if status.success() {
            std::fs::rename(&partial, dest)?;
            return Ok(());
        }
        warn!("{} failed for {} ({})", tool, url, status);
        let _ = std::fs::remove_file(&partial);
        return Err(OcrError::ModelNotFound(format!("Failed to download {}", url)));
    }

    Err(OcrError::BackendNotAvailable(
        "Neither curl nor wget found. Install one to download models.".to_string(),
    ))
}
