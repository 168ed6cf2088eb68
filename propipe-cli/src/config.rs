//! Configuration loading for the CLI.
//!
//! Settings are read from, in order of preference:
//! 1. `--config <path>` (or `PROPIPE_CONFIG`)
//! 2. `~/.propipe/config.toml` if it exists
//! 3. Environment variables (`API_KEYS`, `THINKING_EFFORT`, ...)

use std::path::{Path, PathBuf};

use propipe::PipeConfig;
use tracing::{debug, info};

use crate::error::Result;

const SHORT_KEY_CHARS: usize = 8;

/// Default config directory.
#[must_use]
pub fn default_config_dir() -> PathBuf {
    dirs_next::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".propipe")
}

/// Default config file path.
#[must_use]
pub fn config_path() -> PathBuf {
    default_config_dir().join("config.toml")
}

/// Resolve settings from an explicit path, the default file, or the
/// environment.
pub async fn load(explicit: Option<&Path>) -> Result<PipeConfig> {
    if let Some(path) = explicit {
        return load_file(path).await;
    }

    let path = config_path();
    if path.exists() {
        return load_file(&path).await;
    }

    info!(path = %path.display(), "config file not found, reading environment");
    Ok(PipeConfig::from_env()?)
}

/// Parse a TOML file; keys missing from it fall back to the environment.
pub async fn load_file(path: &Path) -> Result<PipeConfig> {
    let content = tokio::fs::read_to_string(path).await?;
    let mut config = parse(&content)?;
    if config.api_keys.is_empty() {
        config.api_keys = PipeConfig::from_env()?.api_keys;
    }
    debug!(path = %path.display(), "loaded config file");
    Ok(config)
}

/// Parse TOML config text and check its settings.
pub fn parse(content: &str) -> Result<PipeConfig> {
    let config: PipeConfig = toml::from_str(content)?;
    config.check_settings()?;
    Ok(config)
}

/// Render settings as TOML with keys masked.
pub fn render_masked(config: &PipeConfig) -> Result<String> {
    let mut shown = config.clone();
    shown.api_keys = shown
        .api_keys
        .iter()
        .map(String::as_str)
        .map(mask_key)
        .collect();
    Ok(toml::to_string_pretty(&shown)?)
}

/// Keep the last four characters of a key; short keys are hidden entirely.
fn mask_key(key: &str) -> String {
    if key.chars().count() <= SHORT_KEY_CHARS {
        return "****".to_owned();
    }
    let visible: String = key
        .chars()
        .rev()
        .take(4)
        .collect::<Vec<_>>()
        .into_iter()
        .rev()
        .collect();
    format!("...{visible}")
}
