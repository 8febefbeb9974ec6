//! Configuration management for doclabel using the prefer crate.

mod loader;
mod settings;

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::dataset::RegionIdStrategy;

pub use loader::{apply_env_overrides, load_settings_with_options, LoadOptions};
pub use settings::{
    default_workers, AnnotatorSettings, ServeSettings, Settings, DEFAULT_ANNOTATOR_PORT,
    DEFAULT_ANNOTATOR_PROGRAM, DEFAULT_BASE_URL, DEFAULT_DPI, DEFAULT_IMAGES_DIR,
    DEFAULT_OCR_BACKEND, DEFAULT_OCR_LANGUAGE, DEFAULT_OUTPUT, DEFAULT_SERVE_HOST,
    DEFAULT_SERVE_PORT,
};

/// Name used for config file discovery (`doclabel.toml`, `doclabel.yaml`, ...).
pub const CONFIG_NAME: &str = "doclabel";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse {format} config {path}: {message}")]
    Parse {
        path: PathBuf,
        format: &'static str,
        message: String,
    },

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// OCR section.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OcrSection {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub backend: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
}

impl OcrSection {
    pub fn is_default(&self) -> bool {
        *self == Self::default()
    }
}

/// Annotation tool section.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnnotatorSection {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub program: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub args: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
    /// Seconds to wait for the annotator to accept connections.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_timeout: Option<u64>,
    /// Seconds to wait after the stop signal before killing.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stop_timeout: Option<u64>,
}

/// Services section.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ServeSection {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shutdown_timeout: Option<u64>,
    #[serde(default)]
    pub annotator: AnnotatorSection,
}

impl ServeSection {
    pub fn is_default(&self) -> bool {
        *self == Self::default()
    }
}

/// Configuration file structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Directory for rendered page images.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub images_dir: Option<String>,
    /// Dataset output file.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dpi: Option<u32>,
    /// Base URL for image references in the dataset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workers: Option<usize>,
    /// Degrees from horizontal still treated as axis-aligned.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rotation_tolerance: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region_ids: Option<RegionIdStrategy>,
    #[serde(default, skip_serializing_if = "OcrSection::is_default")]
    pub ocr: OcrSection,
    #[serde(default, skip_serializing_if = "ServeSection::is_default")]
    pub serve: ServeSection,
    /// Entity labels, in class-id order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub labels: Vec<String>,
    /// Path to the config file this was loaded from (not serialized).
    #[serde(skip)]
    pub source_path: Option<PathBuf>,
}

impl Config {
    /// Load configuration using prefer for discovery.
    /// Falls back to defaults when nothing is found or the file is unreadable.
    pub async fn load() -> Self {
        match prefer::load(CONFIG_NAME).await {
            Ok(pref_config) => match pref_config.source_path() {
                Some(path) => match Self::load_from_path(path).await {
                    Ok(config) => config,
                    Err(e) => {
                        tracing::warn!("{}", e);
                        Self::default()
                    }
                },
                None => Self::default(),
            },
            Err(_) => Self::default(),
        }
    }

    /// Load configuration from a specific file path; format follows the extension.
    pub async fn load_from_path(path: &Path) -> Result<Self, ConfigError> {
        let contents =
            tokio::fs::read_to_string(path)
                .await
                .map_err(|source| ConfigError::Read {
                    path: path.to_path_buf(),
                    source,
                })?;
        let mut config = Self::parse(path, &contents)?;
        config.source_path = Some(path.to_path_buf());
        Ok(config)
    }

    fn parse(path: &Path, contents: &str) -> Result<Self, ConfigError> {
        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("json");
        let parse_err = |format: &'static str, message: String| ConfigError::Parse {
            path: path.to_path_buf(),
            format,
            message,
        };

        match ext {
            "toml" => toml::from_str(contents).map_err(|e| parse_err("TOML", e.to_string())),
            "yaml" | "yml" => {
                serde_yaml::from_str(contents).map_err(|e| parse_err("YAML", e.to_string()))
            }
            _ => serde_json::from_str(contents).map_err(|e| parse_err("JSON", e.to_string())),
        }
    }

    /// Directory of the config file, if loaded from one.
    pub fn base_dir(&self) -> Option<PathBuf> {
        self.source_path
            .as_ref()
            .and_then(|p| p.parent().map(|p| p.to_path_buf()))
    }

    /// Resolve a path that may be relative to the config file.
    pub fn resolve_path(&self, path_str: &str, base_dir: &Path) -> PathBuf {
        let expanded = shellexpand::tilde(path_str);
        let path = Path::new(expanded.as_ref());

        if path.is_absolute() {
            path.to_path_buf()
        } else {
            base_dir.join(path)
        }
    }

    /// Apply configuration to settings.
    pub fn apply_to_settings(&self, settings: &mut Settings, base_dir: &Path) {
        settings.images_dir = match self.images_dir {
            Some(ref dir) => self.resolve_path(dir, base_dir),
            None => base_dir.join(DEFAULT_IMAGES_DIR),
        };
        settings.output_path = match self.output {
            Some(ref output) => self.resolve_path(output, base_dir),
            None => base_dir.join(DEFAULT_OUTPUT),
        };
        if let Some(dpi) = self.dpi {
            settings.dpi = dpi;
        }
        if let Some(ref url) = self.base_url {
            settings.base_url = url.clone();
        }
        if let Some(workers) = self.workers {
            settings.workers = workers;
        }
        if let Some(tolerance) = self.rotation_tolerance {
            settings.rotation_tolerance_deg = tolerance;
        }
        if let Some(strategy) = self.region_ids {
            settings.region_ids = strategy;
        }
        if let Some(ref backend) = self.ocr.backend {
            settings.ocr_backend = backend.clone();
        }
        if let Some(ref language) = self.ocr.language {
            settings.ocr_language = language.clone();
        }
        if !self.labels.is_empty() {
            settings.labels = self.labels.clone();
        }

        let serve = &self.serve;
        if let Some(ref host) = serve.host {
            settings.serve.host = host.clone();
        }
        if let Some(port) = serve.port {
            settings.serve.port = port;
        }
        if let Some(secs) = serve.shutdown_timeout {
            settings.serve.shutdown_timeout = Duration::from_secs(secs);
        }

        let annotator = &serve.annotator;
        let target = &mut settings.serve.annotator;
        if let Some(enabled) = annotator.enabled {
            target.enabled = enabled;
        }
        if let Some(ref program) = annotator.program {
            target.program = program.clone();
        }
        if let Some(ref args) = annotator.args {
            target.args = args.clone();
        }
        if let Some(port) = annotator.port {
            target.port = port;
        }
        if let Some(secs) = annotator.start_timeout {
            target.start_timeout = Duration::from_secs(secs);
        }
        if let Some(secs) = annotator.stop_timeout {
            target.stop_timeout = Duration::from_secs(secs);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_load_toml() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("doclabel.toml");
        std::fs::write(
            &path,
            r#"
images_dir = "pages"
dpi = 150
region_ids = "sequential"
labels = ["name", "total"]

[ocr]
backend = "ocrs"

[serve.annotator]
port = 9001
start_timeout = 10
"#,
        )
        .unwrap();

        let config = Config::load_from_path(&path).await.unwrap();
        assert_eq!(config.base_dir().as_deref(), Some(dir.path()));

        let mut settings = Settings::default();
        config.apply_to_settings(&mut settings, dir.path());
        assert_eq!(settings.images_dir, dir.path().join("pages"));
        assert_eq!(settings.output_path, dir.path().join(DEFAULT_OUTPUT));
        assert_eq!(settings.dpi, 150);
        assert_eq!(settings.region_ids, RegionIdStrategy::Sequential);
        assert_eq!(settings.ocr_backend, "ocrs");
        assert_eq!(settings.labels, vec!["name", "total"]);
        assert_eq!(settings.serve.annotator.port, 9001);
        assert_eq!(
            settings.serve.annotator.start_timeout,
            Duration::from_secs(10)
        );
        assert_eq!(settings.serve.port, DEFAULT_SERVE_PORT);
    }

    #[tokio::test]
    async fn test_load_yaml_and_json() {
        let dir = TempDir::new().unwrap();
        let yaml = dir.path().join("doclabel.yaml");
        std::fs::write(&yaml, "base_url: http://files:9000/\nworkers: 3\n").unwrap();
        let config = Config::load_from_path(&yaml).await.unwrap();
        assert_eq!(config.workers, Some(3));

        let json = dir.path().join("doclabel.json");
        std::fs::write(&json, r#"{"output": "/tmp/out.json"}"#).unwrap();
        let config = Config::load_from_path(&json).await.unwrap();
        let mut settings = Settings::default();
        config.apply_to_settings(&mut settings, dir.path());
        assert_eq!(settings.output_path, PathBuf::from("/tmp/out.json"));
    }

    #[tokio::test]
    async fn test_parse_error_names_format() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("doclabel.toml");
        std::fs::write(&path, "dpi = [").unwrap();
        let err = Config::load_from_path(&path).await.unwrap_err();
        assert!(matches!(err, ConfigError::Parse { format: "TOML", .. }));
    }

    #[test]
    fn test_resolve_path_expands_tilde() {
        let config = Config::default();
        if let Some(home) = dirs::home_dir() {
            assert_eq!(
                config.resolve_path("~/scans", Path::new("/base")),
                home.join("scans")
            );
        }
        assert_eq!(
            config.resolve_path("rel", Path::new("/base")),
            PathBuf::from("/base/rel")
        );
    }
}
