// ============================================================
// Layer 6 - Environment Settings
// ============================================================
// Host-environment values read from the process environment,
// after loading a `.env` file if one exists.
//
//   AQICN_API_TOKEN  - API token, required for live collection only
//   AQI_DATA_DIR     - base directory (default "data")
//   AQI_CITIES       - comma separated (default tehran,isfahan,mashhad,ahvaz)
//
// A missing or placeholder token is a ValidationError raised
// before anything is fetched or written. Loading never touches
// the data directory; each writer creates what it needs.

use std::path::{Path, PathBuf};

use crate::domain::error::{AqiError, Result};

pub const TOKEN_VAR: &str = "AQICN_API_TOKEN";
pub const DATA_DIR_VAR: &str = "AQI_DATA_DIR";
pub const CITIES_VAR: &str = "AQI_CITIES";

const TOKEN_PLACEHOLDER: &str = "YOUR_API_TOKEN_HERE";
const DEFAULT_DATA_DIR: &str = "data";
const DEFAULT_CITIES: [&str; 4] = ["tehran", "isfahan", "mashhad", "ahvaz"];
const DB_FILE_NAME: &str = "aqi_history.sqlite";

#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub api_token: Option<String>,
    pub data_dir:  PathBuf,
    pub cities:    Vec<String>,
}

impl Settings {
    /// Load `.env` (if present) and read settings from the environment.
    /// A `.env` that exists but cannot be parsed is a ValidationError.
    pub fn load() -> Result<Self> {
        match dotenvy::dotenv() {
            Ok(path) => tracing::debug!("Loaded '{}'", path.display()),
            Err(e) if e.not_found() => {}
            Err(e) => return Err(AqiError::Validation(format!("cannot read .env: {e}"))),
        }
        Ok(Self::from_lookup(|key| std::env::var(key).ok()))
    }

    /// Build settings from any key lookup. Does not touch the filesystem.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let api_token = lookup(TOKEN_VAR)
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty());

        let data_dir = lookup(DATA_DIR_VAR)
            .map(|d| d.trim().to_string())
            .filter(|d| !d.is_empty())
            .map_or_else(|| PathBuf::from(DEFAULT_DATA_DIR), PathBuf::from);

        let cities = lookup(CITIES_VAR)
            .map(|c| parse_cities(&c))
            .filter(|c| !c.is_empty())
            .unwrap_or_else(|| DEFAULT_CITIES.iter().map(|c| c.to_string()).collect());

        Self { api_token, data_dir, cities }
    }

    /// The API token, or a ValidationError if it is missing or still the placeholder.
    pub fn require_token(&self) -> Result<&str> {
        match self.api_token.as_deref() {
            Some(token) if token != TOKEN_PLACEHOLDER => Ok(token),
            _ => Err(AqiError::Validation(format!(
                "{TOKEN_VAR} is missing or invalid; set it in the environment or .env"
            ))),
        }
    }

    pub fn db_path(&self) -> PathBuf {
        self.data_dir.join(DB_FILE_NAME)
    }

    pub fn plots_dir(&self) -> PathBuf {
        self.data_dir.join("plots")
    }

    pub fn models_dir(&self) -> PathBuf {
        self.data_dir.join("models")
    }

    pub fn uci_csv(&self) -> PathBuf {
        self.data_dir.join("uci").join("AirQualityUCI.csv")
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }
}

/// Split a comma separated list, trimming and lowercasing each city.
pub fn parse_cities(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|c| c.trim().to_lowercase())
        .filter(|c| !c.is_empty())
        .collect()
}
