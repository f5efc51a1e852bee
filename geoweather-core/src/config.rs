use anyhow::{Context, Result, anyhow};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::{fs, path::Path, path::PathBuf, time::Duration};

use crate::model::Units;

pub const DEFAULT_API_BASE_URL: &str = "https://api.openweathermap.org/data";
pub const DEFAULT_GEOCODER_BASE_URL: &str = "https://nominatim.openstreetmap.org";
pub const DEFAULT_USER_AGENT: &str = concat!("geoweather/", env!("CARGO_PKG_VERSION"));

/// Which country decides the temperature symbol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum UnitSource {
    /// `sys.country` of the fetched payload, i.e. the place being shown.
    #[default]
    PayloadCountry,
    /// Country part of the machine locale.
    DeviceLocale,
}

impl UnitSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            UnitSource::PayloadCountry => "payload_country",
            UnitSource::DeviceLocale => "device_locale",
        }
    }
}

/// Country part of the process locale (`LC_ALL`, then `LC_MESSAGES`, then `LANG`).
pub fn device_locale_country() -> Option<String> {
    ["LC_ALL", "LC_MESSAGES", "LANG"]
        .iter()
        .filter_map(|var| std::env::var(var).ok())
        .find(|v| !v.is_empty())
        .and_then(|v| locale_country(&v))
}

/// `en_US.UTF-8` -> `US`, `de-AT` -> `AT`; `C` and `POSIX` carry no country.
pub fn locale_country(locale: &str) -> Option<String> {
    let tag = locale.split(['.', '@']).next().unwrap_or_default();
    let region = tag.split(['_', '-']).nth(1)?;
    if region.len() == 2 && region.chars().all(|c| c.is_ascii_alphabetic()) {
        Some(region.to_ascii_uppercase())
    } else {
        None
    }
}

impl std::fmt::Display for UnitSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Weather API endpoint and credentials.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiSection {
    pub base_url: String,
    pub api_key: Option<String>,
    pub units: Units,
}

impl Default for ApiSection {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_API_BASE_URL.to_string(),
            api_key: None,
            units: Units::default(),
        }
    }
}

/// Validated settings handed to a weather client constructor.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiConfig {
    pub base_url: String,
    pub api_key: String,
    pub units: Units,
}

impl ApiConfig {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>, units: Units) -> Self {
        Self {
            base_url: base_url.into(),
            api_key: api_key.into(),
            units,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeocoderSection {
    pub base_url: String,
    pub user_agent: String,
}

impl Default for GeocoderSection {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_GEOCODER_BASE_URL.to_string(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

/// Upper bounds for each wait of a run, in seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeadlineSection {
    pub location_secs: u64,
    pub fetch_secs: u64,
    pub geocode_secs: u64,
}

impl Default for DeadlineSection {
    fn default() -> Self {
        Self {
            location_secs: 30,
            fetch_secs: 15,
            geocode_secs: 10,
        }
    }
}

impl DeadlineSection {
    pub fn location(&self) -> Duration {
        Duration::from_secs(self.location_secs)
    }

    pub fn fetch(&self) -> Duration {
        Duration::from_secs(self.fetch_secs)
    }

    pub fn geocode(&self) -> Duration {
        Duration::from_secs(self.geocode_secs)
    }
}

/// Top-level configuration stored on disk.
///
/// Example TOML:
/// ```toml
/// unit_source = "payload_country"
///
/// [api]
/// api_key = "..."
/// units = "metric"
///
/// [deadlines]
/// fetch_secs = 15
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub unit_source: UnitSource,
    pub api: ApiSection,
    pub geocoder: GeocoderSection,
    pub deadlines: DeadlineSection,
}

impl Config {
    /// Load config from disk, or return an empty default if it doesn't exist yet.
    pub fn load() -> Result<Self> {
        let path = Self::config_file_path()?;
        Self::load_from(&path)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            // First run: no config file, return empty.
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let cfg: Config = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(cfg)
    }

    /// Save config to disk, creating parent directories as needed.
    pub fn save(&self) -> Result<()> {
        let path = Self::config_file_path()?;
        self.save_to(&path)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        let toml =
            toml::to_string_pretty(self).context("Failed to serialize configuration to TOML")?;

        fs::write(path, toml)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        Ok(())
    }

    /// Path to the config file.
    pub fn config_file_path() -> Result<PathBuf> {
        let dirs = ProjectDirs::from("dev", "geoweather", "geoweather")
            .ok_or_else(|| anyhow!("Could not determine platform config directory"))?;

        Ok(dirs.config_dir().join("config.toml"))
    }

    pub fn set_api_key(&mut self, api_key: String) {
        self.api.api_key = Some(api_key);
    }

    /// Returns the API key, if one is set and non-blank.
    pub fn api_key(&self) -> Option<&str> {
        self.api
            .api_key
            .as_deref()
            .map(str::trim)
            .filter(|k| !k.is_empty())
    }

    /// Settings for the weather client; fails when no API key is configured.
    pub fn api_config(&self) -> Result<ApiConfig> {
        let api_key = self.api_key().ok_or_else(|| {
            anyhow!(
                "No weather API key configured.\n\
                 Hint: run `geoweather configure` and enter your OpenWeather API key."
            )
        })?;

        Ok(ApiConfig::new(
            self.api.base_url.clone(),
            api_key.to_owned(),
            self.api.units,
        ))
    }
}
