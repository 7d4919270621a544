//! Configuration management for lodestar
//!
//! Stores settings in ~/.config/lodestar/config.json. API keys never touch
//! this file; they come from the environment.

use serde::{Deserialize, Serialize};
use std::fs;
use std::io::Write;
use std::path::PathBuf;
use tracing::warn;

/// Default per-request timeout for generative calls, in seconds.
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 60;

/// Default number of ideas requested per run.
const DEFAULT_NUM_IDEAS: usize = 10;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Model override for the generative backend.
    #[serde(default)]
    pub model: Option<String>,
    /// Per-request timeout in seconds for generative calls.
    #[serde(default)]
    pub request_timeout_secs: Option<u64>,
    /// Default number of ideas per run.
    #[serde(default)]
    pub num_ideas: Option<usize>,
}

impl Config {
    fn sanitize(&mut self) {
        if self.request_timeout_secs == Some(0) {
            self.request_timeout_secs = None;
        }
        if self.num_ideas == Some(0) {
            self.num_ideas = None;
        }
    }

    /// Get the config directory path
    fn config_dir() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("lodestar"))
    }

    /// Get the config file path
    fn config_path() -> Option<PathBuf> {
        Self::config_dir().map(|p| p.join("config.json"))
    }

    /// Load config from disk, or return default
    pub fn load() -> Self {
        if let Some(path) = Self::config_path() {
            if let Ok(content) = fs::read_to_string(&path) {
                match serde_json::from_str::<Config>(&content) {
                    Ok(mut config) => {
                        config.sanitize();
                        return config;
                    }
                    Err(err) => {
                        preserve_corrupt_config(&path, &content);
                        warn!(
                            error = %err,
                            "config file was corrupted; a backup was saved and defaults loaded"
                        );
                    }
                }
            }
        }
        Self::default()
    }

    /// Save config to disk
    pub fn save(&self) -> anyhow::Result<()> {
        let mut sanitized = self.clone();
        sanitized.sanitize();
        let dir = Self::config_dir()
            .ok_or_else(|| anyhow::anyhow!("could not determine config directory"))?;
        fs::create_dir_all(&dir)?;

        let path = dir.join("config.json");
        let content = serde_json::to_string_pretty(&sanitized)?;

        #[cfg(unix)]
        {
            write_config_atomic(&path, &content)?;
        }
        #[cfg(not(unix))]
        {
            fs::write(&path, content)?;
        }
        Ok(())
    }

    pub fn request_timeout_secs(&self) -> u64 {
        self.request_timeout_secs
            .unwrap_or(DEFAULT_REQUEST_TIMEOUT_SECS)
    }

    pub fn num_ideas(&self) -> usize {
        self.num_ideas.unwrap_or(DEFAULT_NUM_IDEAS)
    }

    /// Get the config file location for display
    pub fn config_location() -> String {
        Self::config_path()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "~/.config/lodestar/config.json".to_string())
    }
}

fn preserve_corrupt_config(path: &std::path::Path, content: &str) {
    let corrupt_path = path.with_extension("json.corrupt");
    if fs::rename(path, &corrupt_path).is_err() {
        let _ = fs::write(&corrupt_path, content);
    }
}

#[cfg(unix)]
fn write_config_atomic(path: &std::path::Path, content: &str) -> anyhow::Result<()> {
    use std::fs::OpenOptions;

    let tmp_path = path.with_extension("tmp");
    let mut file = OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(&tmp_path)?;
    file.write_all(content.as_bytes())?;
    if let Err(err) = fs::rename(&tmp_path, path) {
        let _ = fs::remove_file(&tmp_path);
        return Err(err.into());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default_round_trip() {
        let config = Config::default();
        let encoded = serde_json::to_string(&config).unwrap();
        let decoded: Config = serde_json::from_str(&encoded).unwrap();
        assert!(decoded.model.is_none());
        assert_eq!(decoded.request_timeout_secs(), DEFAULT_REQUEST_TIMEOUT_SECS);
        assert_eq!(decoded.num_ideas(), DEFAULT_NUM_IDEAS);
    }

    #[test]
    fn test_config_deserializes_unknown_fields_with_defaults() {
        let legacy = r#"{"model":"gpt-4o","api_base":"https://old.example","retired_flag":true}"#;
        let parsed: Config = serde_json::from_str(legacy).unwrap();
        assert_eq!(parsed.model.as_deref(), Some("gpt-4o"));
    }

    #[test]
    fn test_sanitize_drops_zero_values() {
        let mut config = Config {
            model: None,
            request_timeout_secs: Some(0),
            num_ideas: Some(0),
        };
        config.sanitize();
        assert!(config.request_timeout_secs.is_none());
        assert!(config.num_ideas.is_none());
    }
}
