use anyhow::{Context, Result, anyhow};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
};

pub const DEFAULT_GEOCODING_URL: &str = "https://geocoding-api.open-meteo.com/v1/search";
pub const DEFAULT_REVERSE_URL: &str = "https://nominatim.openstreetmap.org/reverse";
pub const DEFAULT_FORECAST_URL: &str = "https://api.open-meteo.com/v1/forecast";
pub const DEFAULT_ARCHIVE_URL: &str = "https://archive-api.open-meteo.com/v1/archive";

/// Base URLs of the external services.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Endpoints {
    pub geocoding: String,
    pub reverse: String,
    pub forecast: String,
    pub archive: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            geocoding: DEFAULT_GEOCODING_URL.to_string(),
            reverse: DEFAULT_REVERSE_URL.to_string(),
            forecast: DEFAULT_FORECAST_URL.to_string(),
            archive: DEFAULT_ARCHIVE_URL.to_string(),
        }
    }
}

/// Top-level configuration stored on disk.
///
/// Example TOML:
/// ```toml
/// model_path = "/opt/skycast/model.json"
/// default_country = "VN"
///
/// [endpoints]
/// forecast = "https://api.open-meteo.com/v1/forecast"
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Path of the JSON model artifact.
    pub model_path: PathBuf,

    /// ISO 3166-1 alpha-2 code preselected for city search.
    pub default_country: String,

    /// Client identifier sent to the reverse geocoder, which rejects anonymous clients.
    pub user_agent: String,

    pub timeout_secs: u64,

    pub endpoints: Endpoints,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            model_path: PathBuf::from("model.json"),
            default_country: "VN".to_string(),
            user_agent: "MyWeatherApp/1.0".to_string(),
            timeout_secs: 10,
            endpoints: Endpoints::default(),
        }
    }
}

/// Validate an ISO 3166-1 alpha-2 code and return it in upper case.
pub fn parse_country_code(code: &str) -> Result<String> {
    let code = code.trim().to_uppercase();
    if code.len() != 2 || !code.chars().all(|c| c.is_ascii_alphabetic()) {
        return Err(anyhow!(
            "Invalid country code '{code}'. Expected a two-letter ISO code such as VN or US."
        ));
    }
    Ok(code)
}

impl Config {
    /// Load config from an explicit path, or return defaults if the file is absent.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::debug!(path = %path.display(), "no config file, using defaults");
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let cfg: Config = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        cfg.validate()?;
        Ok(cfg)
    }

    /// Save config to `path`, creating parent directories as needed.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        fs::write(path, self.to_toml()?)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        Ok(())
    }

    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).context("Failed to serialize configuration to TOML")
    }

    /// Path to the config file.
    pub fn config_file_path() -> Result<PathBuf> {
        let dirs = ProjectDirs::from("dev", "skycast", "skycast")
            .ok_or_else(|| anyhow!("Could not determine platform config directory"))?;

        Ok(dirs.config_dir().join("config.toml"))
    }

    /// Set the preselected country, normalized to upper case.
    pub fn set_default_country(&mut self, code: &str) -> Result<()> {
        self.default_country = parse_country_code(code)?;
        Ok(())
    }

    fn validate(&self) -> Result<()> {
        if self.timeout_secs == 0 {
            return Err(anyhow!("timeout_secs must be greater than zero"));
        }
        Ok(())
    }
}
