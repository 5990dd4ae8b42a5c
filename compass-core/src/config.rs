use anyhow::{Context, Result, anyhow};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::{fs, path::PathBuf, time::Duration};

/// Placeholder shipped in the default config. While the key still holds this
/// value the app runs in degraded mode and falls back to demo data.
pub const PLACEHOLDER_API_KEY: &str = "YOUR_API_KEY_HERE";

/// Top-level configuration stored on disk.
///
/// Every field has a serde default, so a missing or partial config file still
/// yields a usable (if degraded) configuration. The API key is injected from
/// here into the provider at startup; nothing in the fetch path reads globals.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// WeatherAPI.com API key.
    #[serde(default = "default_api_key")]
    pub api_key: String,

    /// Location query sent to the provider.
    #[serde(default = "default_location")]
    pub location: String,

    /// Current-conditions endpoint. Overridable mainly so tests can point the
    /// client at a mock server.
    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    /// Minutes between automatic re-fetches.
    #[serde(default = "default_refresh_minutes")]
    pub refresh_minutes: u64,

    /// Total fetch attempts per cycle (first try + retries).
    #[serde(default = "default_retry_attempts")]
    pub retry_attempts: u32,
}

fn default_api_key() -> String {
    PLACEHOLDER_API_KEY.to_string()
}

fn default_location() -> String {
    "Colombo,Sri Lanka".to_string()
}

fn default_endpoint() -> String {
    "https://api.weatherapi.com/v1/current.json".to_string()
}

const fn default_refresh_minutes() -> u64 {
    5
}

const fn default_retry_attempts() -> u32 {
    3
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_key: default_api_key(),
            location: default_location(),
            endpoint: default_endpoint(),
            refresh_minutes: default_refresh_minutes(),
            retry_attempts: default_retry_attempts(),
        }
    }
}

impl Config {
    /// True once the placeholder key has been replaced with a real one.
    pub fn has_real_key(&self) -> bool {
        !self.api_key.is_empty() && self.api_key != PLACEHOLDER_API_KEY
    }

    /// Refresh interval as a [`Duration`].
    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.refresh_minutes * 60)
    }

    /// Load config from disk, or return the defaults if no file exists yet.
    pub fn load() -> Result<Self> {
        let path = Self::config_file_path()?;
        if !path.exists() {
            // First run: no config file, run with defaults.
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let cfg: Config = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(cfg)
    }

    /// Save config to disk, creating parent directories as needed.
    pub fn save(&self) -> Result<()> {
        let path = Self::config_file_path()?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        let toml =
            toml::to_string_pretty(self).context("Failed to serialize configuration to TOML")?;

        fs::write(&path, toml)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        Ok(())
    }

    /// Path to the config file.
    pub fn config_file_path() -> Result<PathBuf> {
        let dirs = ProjectDirs::from("dev", "weather-compass", "compass")
            .ok_or_else(|| anyhow!("Could not determine platform config directory"))?;

        Ok(dirs.config_dir().join("config.toml"))
    }
}
