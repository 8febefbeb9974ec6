//! Crash-safe JSON output.

use std::fs;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use serde::Serialize;
use serde_json::ser::PrettyFormatter;
use tempfile::NamedTempFile;
use thiserror::Error;

/// Failure persisting an output file. Nothing was moved into place.
#[derive(Debug, Error)]
pub enum WriteError {
    #[error("Cannot create output directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("I/O error writing {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Serialization error: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("Cannot move output into place at {path}: {source}")]
    Persist {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Serialize `value` as 4-space indented JSON and atomically replace `path`.
///
/// The document is written to a temporary file in the destination directory,
/// synced, then renamed over the target, so readers see either the previous
/// file or the complete new one.
pub fn write_json_atomic<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<(), WriteError> {
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    };
    fs::create_dir_all(&parent).map_err(|source| WriteError::CreateDir {
        path: parent.clone(),
        source,
    })?;

    let io_err = |source| WriteError::Io {
        path: path.to_path_buf(),
        source,
    };

    let mut tmp = NamedTempFile::new_in(&parent).map_err(io_err)?;
    {
        let mut writer = BufWriter::new(tmp.as_file_mut());
        let mut ser =
            serde_json::Serializer::with_formatter(&mut writer, PrettyFormatter::with_indent(b"    "));
        value.serialize(&mut ser)?;
        writer.write_all(b"\n").map_err(io_err)?;
        writer.flush().map_err(io_err)?;
    }
    tmp.as_file().sync_all().map_err(io_err)?;

    tmp.persist(path).map_err(|e| WriteError::Persist {
        path: path.to_path_buf(),
        source: e.error,
    })?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_writes_indented_json() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out.json");
        write_json_atomic(&path, &vec![serde_json::json!({"a": 1})]).unwrap();

        let text = fs::read_to_string(&path).unwrap();
        assert!(text.contains("\n        \"a\": 1"), "got {text}");
        let parsed: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(parsed[0]["a"], 1);
    }

    #[test]
    fn test_replaces_existing_file_and_leaves_no_temp() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out.json");
        fs::write(&path, "old").unwrap();

        write_json_atomic(&path, &[1, 2, 3]).unwrap();

        let parsed: Vec<i32> = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(parsed, vec![1, 2, 3]);
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn test_creates_missing_parent() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested/deeper/out.json");
        write_json_atomic(&path, &serde_json::json!([])).unwrap();
        assert!(path.exists());
    }

    #[test]
    fn test_unwritable_destination_fails() {
        let dir = TempDir::new().unwrap();
        let blocker = dir.path().join("file");
        fs::write(&blocker, "x").unwrap();
        // parent is a regular file, so the directory cannot be created
        let path = blocker.join("out.json");
        assert!(write_json_atomic(&path, &[0]).is_err());
    }
}
