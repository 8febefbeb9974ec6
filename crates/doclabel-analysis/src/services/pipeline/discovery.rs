//! Input discovery: a single PDF or the PDFs directly inside a directory.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use doclabel::models::SourceDocument;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DiscoveryError {
    #[error("Input not found: {0}")]
    NotFound(PathBuf),

    #[error("Not a PDF: {0}")]
    NotPdf(PathBuf),

    #[error("No PDF files in {0}")]
    Empty(PathBuf),

    #[error("Cannot read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

fn is_pdf(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("pdf"))
}

/// Find the documents to process.
///
/// A file input must have a `.pdf` extension. A directory input yields its
/// direct `.pdf` children sorted by file name; subdirectories are not
/// searched. Document ids are file stems, suffixed `-2`, `-3`, ... when two
/// files share a stem. A suffixed id never collides with another file's own
/// stem.
pub fn discover_documents(input: &Path) -> Result<Vec<SourceDocument>, DiscoveryError> {
    let metadata = std::fs::metadata(input).map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => DiscoveryError::NotFound(input.to_path_buf()),
        _ => DiscoveryError::Io {
            path: input.to_path_buf(),
            source: e,
        },
    })?;

    let mut paths = if metadata.is_file() {
        if !is_pdf(input) {
            return Err(DiscoveryError::NotPdf(input.to_path_buf()));
        }
        vec![input.to_path_buf()]
    } else {
        let entries = std::fs::read_dir(input).map_err(|e| DiscoveryError::Io {
            path: input.to_path_buf(),
            source: e,
        })?;
        let mut paths = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| DiscoveryError::Io {
                path: input.to_path_buf(),
                source: e,
            })?;
            let path = entry.path();
            if path.is_file() && is_pdf(&path) {
                paths.push(path);
            }
        }
        paths
    };

    if paths.is_empty() {
        return Err(DiscoveryError::Empty(input.to_path_buf()));
    }
    paths.sort_by(|a, b| a.file_name().cmp(&b.file_name()));

    let stems: Vec<String> = paths
        .iter()
        .map(|path| {
            path.file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_default()
        })
        .collect();
    let reserved: HashSet<&str> = stems.iter().map(String::as_str).collect();
    let mut issued: HashSet<String> = HashSet::new();

    let documents = paths
        .into_iter()
        .zip(stems.iter())
        .map(|(path, stem)| {
            let id = if issued.insert(stem.clone()) {
                stem.clone()
            } else {
                let mut n = 2;
                loop {
                    let candidate = format!("{}-{}", stem, n);
                    if !reserved.contains(candidate.as_str())
                        && issued.insert(candidate.clone())
                    {
                        break candidate;
                    }
                    n += 1;
                }
            };
            SourceDocument::new(id, path)
        })
        .collect();
    Ok(documents)
}
