//! Configuration discovery and merging.

use std::path::PathBuf;

use super::{Config, ConfigError, Settings};

pub const ENV_BASE_URL: &str = "DOCLABEL_BASE_URL";
pub const ENV_OCR_BACKEND: &str = "DOCLABEL_OCR_BACKEND";
pub const ENV_WORKERS: &str = "DOCLABEL_WORKERS";

/// Options for loading settings.
#[derive(Debug, Clone, Default)]
pub struct LoadOptions {
    /// Explicit config file path (overrides auto-discovery).
    pub config_path: Option<PathBuf>,
    /// Use CWD for relative paths instead of config file directory.
    pub use_cwd: bool,
}

fn current_dir() -> PathBuf {
    std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."))
}

/// Load settings with explicit options.
///
/// Priority, lowest first: defaults, config file, environment. Command-line
/// flags are applied by the caller on top of the result. An explicitly named
/// config file that cannot be read is an error; a discovered one that cannot
/// be read is skipped with a warning.
pub async fn load_settings_with_options(
    options: LoadOptions,
) -> Result<(Settings, Config), ConfigError> {
    let config = match options.config_path {
        Some(ref path) => Config::load_from_path(path).await?,
        None => Config::load().await,
    };

    if let Some(ref path) = config.source_path {
        tracing::debug!("Using config file: {}", path.display());
    }

    let base_dir = if options.use_cwd {
        current_dir()
    } else {
        config.base_dir().unwrap_or_else(current_dir)
    };

    let mut settings = Settings::default();
    config.apply_to_settings(&mut settings, &base_dir);
    apply_env_overrides(&mut settings, |key| std::env::var(key).ok());

    Ok((settings, config))
}

/// Apply `DOCLABEL_*` environment overrides. Empty values are ignored.
pub fn apply_env_overrides(settings: &mut Settings, env: impl Fn(&str) -> Option<String>) {
    let var = |key: &str| env(key).filter(|v| !v.trim().is_empty());

    if let Some(url) = var(ENV_BASE_URL) {
        tracing::debug!("Using {} from environment: {}", ENV_BASE_URL, url);
        settings.base_url = url;
    }
    if let Some(backend) = var(ENV_OCR_BACKEND) {
        tracing::debug!("Using {} from environment: {}", ENV_OCR_BACKEND, backend);
        settings.ocr_backend = backend;
    }
    if let Some(workers) = var(ENV_WORKERS) {
        match workers.trim().parse::<usize>() {
            Ok(n) if n > 0 => settings.workers = n,
            _ => tracing::warn!("Ignoring invalid {}={}", ENV_WORKERS, workers),
        }
    }
}
