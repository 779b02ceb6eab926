use crate::global;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::info;

pub const DEFAULT_ENDPOINT: &str = "https://ttycast.io";

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub upload: UploadSettings,
    pub capture: CaptureConfig,
    pub behavior: BehaviorConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UploadSettings {
    /// Base URL of the viewing service. TTYCAST_SERVER takes precedence.
    pub endpoint: String,
    pub connect_timeout_secs: u64,
    pub read_timeout_secs: u64,
    /// PEM file with extra `PUBLIC KEY` pins for the default endpoint.
    pub extra_pinned_keys: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureConfig {
    pub primary_utility: String,
    /// Path to ttyrec; empty means look it up on PATH.
    pub fallback_utility: String,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct BehaviorConfig {
    /// Keep a copy of the recording when the upload fails.
    pub save_on_failure: bool,
}

impl Default for UploadSettings {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            connect_timeout_secs: 10,
            read_timeout_secs: 10,
            extra_pinned_keys: String::new(),
        }
    }
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            primary_utility: "script".to_string(),
            fallback_utility: String::new(),
        }
    }
}

impl Default for BehaviorConfig {
    fn default() -> Self {
        Self {
            save_on_failure: true,
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path()?;
        if !config_path.exists() {
            info!(
                "Config file not found, creating default at {:?}",
                config_path
            );
            let config = Self::default();
            config.save()?;
            return Ok(config);
        }

        let content =
            std::fs::read_to_string(&config_path).context("Failed to read config file")?;

        let config = Self::parse(&content)?;

        info!("Loaded config from {:?}", config_path);
        Ok(config)
    }

    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).context("Failed to parse config file")
    }

    pub fn save(&self) -> Result<()> {
        let config_path = Self::config_path()?;

        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent).context("Failed to create config directory")?;
        }

        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;

        std::fs::write(&config_path, content).context("Failed to write config file")?;

        Ok(())
    }

    fn config_path() -> Result<PathBuf> {
        global::config_file()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.upload.endpoint, DEFAULT_ENDPOINT);
        assert_eq!(config.upload.connect_timeout_secs, 10);
        assert_eq!(config.upload.read_timeout_secs, 10);
        assert_eq!(config.capture.primary_utility, "script");
        assert!(config.behavior.save_on_failure);
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let config = Config::parse(
            r#"
[capture]
fallback_utility = "/usr/local/bin/ttyrec"
"#,
        )
        .unwrap();

        assert_eq!(config.capture.fallback_utility, "/usr/local/bin/ttyrec");
        assert_eq!(config.capture.primary_utility, "script");
        assert_eq!(config.upload.endpoint, DEFAULT_ENDPOINT);
    }

    #[test]
    fn test_serialized_defaults_parse_back() {
        let text = toml::to_string_pretty(&Config::default()).unwrap();
        let config = Config::parse(&text).unwrap();
        assert_eq!(config.upload.endpoint, DEFAULT_ENDPOINT);
        assert!(config.behavior.save_on_failure);
    }

    #[test]
    fn test_invalid_file_is_an_error() {
        assert!(Config::parse("upload = 3").is_err());
    }
}
