use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use url::Url;

use crate::error::ConfigError;

/// Environment variable holding the weather provider API key
pub const API_KEY_ENV: &str = "SKYCAST_API_KEY";
/// Alias accepted for compatibility with other OpenWeatherMap tooling
pub const API_KEY_ENV_ALIAS: &str = "OPENWEATHER_API_KEY";

/// One problem found in the configuration, keyed by its dotted field path
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigIssue {
    pub field: String,
    pub message: String,
}

impl fmt::Display for ConfigIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.message, self.field)
    }
}

/// Outcome of [`Config::validate`]. Only errors make a config unusable.
#[derive(Debug, Clone, Default)]
pub struct ValidationResult {
    pub errors: Vec<ConfigIssue>,
    pub warnings: Vec<ConfigIssue>,
}

impl ValidationResult {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn add_error(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.errors.push(issue(field, message));
    }

    pub fn add_warning(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.warnings.push(issue(field, message));
    }

    pub fn error_summary(&self) -> String {
        let mut summary = String::new();
        for (i, error) in self.errors.iter().enumerate() {
            if i > 0 {
                summary.push_str("; ");
            }
            summary.push_str(&error.to_string());
        }
        summary
    }
}

fn issue(field: impl Into<String>, message: impl Into<String>) -> ConfigIssue {
    ConfigIssue {
        field: field.into(),
        message: message.into(),
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Directory holding `config.toml` and the preferences database
    #[serde(default = "default_config_dir")]
    pub config_dir: PathBuf,

    /// Provider API key. Never written to disk; read from the environment.
    #[serde(skip, default = "api_key_from_env")]
    pub api_key: Option<String>,

    /// Weather provider endpoints
    #[serde(default)]
    pub weather: WeatherConfig,

    /// Geolocation behaviour
    #[serde(default)]
    pub location: LocationConfig,

    /// Preferences storage
    #[serde(default)]
    pub storage: StorageConfig,

    /// City search input
    #[serde(default)]
    pub search: SearchConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeatherConfig {
    /// Base URL for current/forecast requests
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,

    /// Base URL for the direct geocoding endpoint
    #[serde(default = "default_geo_base_url")]
    pub geo_base_url: String,
}

fn default_api_base_url() -> String {
    "https://api.openweathermap.org/data/2.5".to_string()
}

fn default_geo_base_url() -> String {
    "https://api.openweathermap.org/geo/1.0".to_string()
}

impl Default for WeatherConfig {
    fn default() -> Self {
        Self {
            api_base_url: default_api_base_url(),
            geo_base_url: default_geo_base_url(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocationConfig {
    /// City shown when the device position cannot be determined on startup
    #[serde(default = "default_fallback_name")]
    pub fallback_name: String,
    #[serde(default = "default_fallback_latitude")]
    pub fallback_latitude: f64,
    #[serde(default = "default_fallback_longitude")]
    pub fallback_longitude: f64,

    /// Upper bound on the initial position request
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Age up to which a previous fix is reused instead of asking again
    #[serde(default = "default_maximum_age_secs")]
    pub maximum_age_secs: u64,

    /// Static device position for hosts without a positioning service
    #[serde(default)]
    pub fixed_latitude: Option<f64>,
    #[serde(default)]
    pub fixed_longitude: Option<f64>,
}

fn default_fallback_name() -> String {
    "New York".to_string()
}

fn default_fallback_latitude() -> f64 {
    40.7128
}

fn default_fallback_longitude() -> f64 {
    -74.0060
}

fn default_timeout_secs() -> u64 {
    10
}

fn default_maximum_age_secs() -> u64 {
    300
}

impl Default for LocationConfig {
    fn default() -> Self {
        Self {
            fallback_name: default_fallback_name(),
            fallback_latitude: default_fallback_latitude(),
            fallback_longitude: default_fallback_longitude(),
            timeout_secs: default_timeout_secs(),
            maximum_age_secs: default_maximum_age_secs(),
            fixed_latitude: None,
            fixed_longitude: None,
        }
    }
}

impl LocationConfig {
    /// Returns the configured static position when both coordinates are set.
    pub fn fixed_position(&self) -> Option<(f64, f64)> {
        self.fixed_latitude.zip(self.fixed_longitude)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StorageConfig {
    /// SQLite file for preferences (defaults to `<config_dir>/preferences.db`)
    #[serde(default)]
    pub database_path: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Quiet period before a typed query is sent
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,

    /// Queries shorter than this clear the suggestions without a request
    #[serde(default = "default_min_query_len")]
    pub min_query_len: usize,
}

fn default_debounce_ms() -> u64 {
    300
}

fn default_min_query_len() -> usize {
    2
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            debounce_ms: default_debounce_ms(),
            min_query_len: default_min_query_len(),
        }
    }
}

fn api_key_from_env() -> Option<String> {
    std::env::var(API_KEY_ENV)
        .or_else(|_| std::env::var(API_KEY_ENV_ALIAS))
        .ok()
        .filter(|key| !key.trim().is_empty())
}

fn default_config_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("skycast")
}

impl Default for Config {
    fn default() -> Self {
        Self {
            config_dir: default_config_dir(),
            api_key: api_key_from_env(),
            weather: WeatherConfig::default(),
            location: LocationConfig::default(),
            storage: StorageConfig::default(),
            search: SearchConfig::default(),
        }
    }
}

impl Config {
    /// Load `config.toml` from the user config directory, creating it with
    /// defaults on first run.
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::info!("Writing default configuration to {}", path.display());
            let config = Self::default();
            config.save_to(path)?;
            return Ok(config);
        }

        let contents = std::fs::read_to_string(path).map_err(|e| unreadable(path, e))?;
        let config = toml::from_str(&contents).map_err(|e| ConfigError::Malformed(e.to_string()))?;
        Ok(config)
    }

    /// Load and validate. Errors abort; warnings are logged.
    pub fn load_validated() -> Result<Self> {
        Self::load_validated_from(&Self::config_path()?)
    }

    pub fn load_validated_from(path: &Path) -> Result<Self> {
        let config = Self::load_from(path)?;
        let validation = config.validate();

        if !validation.is_valid() {
            return Err(ConfigError::Invalid(validation.error_summary()).into());
        }

        for warning in &validation.warnings {
            tracing::warn!("Config warning: {}", warning);
        }

        Ok(config)
    }

    pub fn validate(&self) -> ValidationResult {
        let mut result = ValidationResult::default();

        check_endpoint("weather.api_base_url", &self.weather.api_base_url, &mut result);
        check_endpoint("weather.geo_base_url", &self.weather.geo_base_url, &mut result);

        let loc = &self.location;
        if !valid_coordinates(loc.fallback_latitude, loc.fallback_longitude) {
            result.add_error(
                "location.fallback",
                format!(
                    "Fallback coordinates out of range: {}, {}",
                    loc.fallback_latitude, loc.fallback_longitude
                ),
            );
        }

        match (loc.fixed_latitude, loc.fixed_longitude) {
            (Some(lat), Some(lon)) if !valid_coordinates(lat, lon) => {
                result.add_error(
                    "location.fixed",
                    format!("Fixed coordinates out of range: {}, {}", lat, lon),
                );
            }
            (Some(_), None) | (None, Some(_)) => {
                result.add_error(
                    "location.fixed",
                    "Both fixed_latitude and fixed_longitude must be set",
                );
            }
            _ => {}
        }

        if loc.timeout_secs == 0 {
            result.add_warning(
                "location.timeout_secs",
                "Position requests will time out immediately (0 seconds)",
            );
        }

        if self.search.debounce_ms == 0 {
            result.add_warning(
                "search.debounce_ms",
                "Search debounce disabled, every keystroke sends a request",
            );
        }

        if self.api_key.is_none() {
            result.add_warning(
                "api_key",
                format!("{} not set, weather requests will be rejected", API_KEY_ENV),
            );
        }

        result
    }

    /// Path of the preferences database
    pub fn database_path(&self) -> PathBuf {
        self.storage
            .database_path
            .clone()
            .unwrap_or_else(|| self.config_dir.join("preferences.db"))
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| unreadable(parent, e))?;
        }

        let contents = toml::to_string_pretty(self).context("Failed to serialize config")?;
        std::fs::write(path, contents).map_err(|e| unreadable(path, e))?;
        Ok(())
    }

    fn config_path() -> Result<PathBuf> {
        let base = dirs::config_dir().context("No user config directory on this platform")?;
        Ok(base.join("skycast").join("config.toml"))
    }
}

fn unreadable(path: &Path, e: std::io::Error) -> ConfigError {
    ConfigError::Unreadable {
        path: path.display().to_string(),
        reason: e.to_string(),
    }
}

/// Endpoints must be absolute http(s) URLs with a host.
fn check_endpoint(field: &str, value: &str, result: &mut ValidationResult) {
    let url = match Url::parse(value) {
        Ok(url) => url,
        Err(e) => {
            result.add_error(field, format!("Invalid URL: {}", e));
            return;
        }
    };

    if !matches!(url.scheme(), "http" | "https") {
        result.add_error(
            field,
            format!("URL must use http or https scheme, got: {}", url.scheme()),
        );
    }
    if url.host().is_none() {
        result.add_error(field, "URL must have a host");
    }
}

fn valid_coordinates(lat: f64, lon: f64) -> bool {
    lat.is_finite()
        && lon.is_finite()
        && (-90.0..=90.0).contains(&lat)
        && (-180.0..=180.0).contains(&lon)
}
