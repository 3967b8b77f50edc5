// ============================================================
// Layer 2 - CollectUseCase
// ============================================================
// One collection run:
//
//   Step 1: Pick the fetcher          (Layer 6 - infra)
//           live requires a valid token; checked before
//           anything is fetched or written
//   Step 2: Snapshot every city       (Layer 4 - data)
//   Step 3: Append to the store       (Layer 6 - infra)
//   Step 4: Latest reading per city   (Layer 6 - infra)
//   Step 5: Bar chart of latest AQI   (Layer 7 - report)

use std::path::PathBuf;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::data::collector::collect_readings;
use crate::domain::reading::Reading;
use crate::domain::traits::ReadingFetcher;
use crate::infra::{
    aqicn_client::AqicnClient,
    clock::SystemClock,
    fetchers::{FixtureFetcher, SyntheticFetcher},
    settings::Settings,
    store::ReadingStore,
};
use crate::report::plots::plot_latest_aqi_bar;

pub const LATEST_PLOT_FILE: &str = "latest_aqi.svg";

/// Where readings come from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FetchSource {
    /// The aqicn.org feed API
    Live,
    /// A recorded JSON file keyed by city
    Fixture(PathBuf),
    /// Deterministic pseudo-random readings
    Synthetic { seed: u64 },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollectConfig {
    pub source: FetchSource,
    /// Empty means the configured default cities
    pub cities: Vec<String>,
    /// Overrides the settings' database path
    pub db:     Option<PathBuf>,
    pub plot:   bool,
}

impl Default for CollectConfig {
    fn default() -> Self {
        Self {
            source: FetchSource::Live,
            cities: Vec::new(),
            db:     None,
            plot:   true,
        }
    }
}

/// What a run produced, for the CLI to print.
#[derive(Debug, Clone)]
pub struct CollectSummary {
    pub stored:    usize,
    pub errors:    Vec<String>,
    pub latest:    Vec<Reading>,
    pub plot_path: Option<PathBuf>,
}

pub struct CollectUseCase {
    config:   CollectConfig,
    settings: Settings,
}

impl CollectUseCase {
    pub fn new(config: CollectConfig, settings: Settings) -> Self {
        Self { config, settings }
    }

    pub fn execute(&self) -> Result<CollectSummary> {
        let cfg = &self.config;

        // ── Step 1: Fetcher ───────────────────────────────────────────────────
        let fetcher = self.build_fetcher()?;
        let cities: &[String] = if cfg.cities.is_empty() {
            &self.settings.cities
        } else {
            &cfg.cities
        };
        tracing::info!("Collecting {} cities from {:?}", cities.len(), cfg.source);

        // ── Step 2: Snapshot ──────────────────────────────────────────────────
        let result = collect_readings(fetcher.as_ref(), &SystemClock, cities);

        // ── Step 3: Store ─────────────────────────────────────────────────────
        let db_path   = cfg.db.clone().unwrap_or_else(|| self.settings.db_path());
        let mut store = ReadingStore::open(&db_path)
            .with_context(|| format!("Cannot open store '{}'", db_path.display()))?;
        let stored = store.append(&result.readings)?;
        tracing::info!("Stored {} reading(s) in '{}'", stored, db_path.display());

        // ── Step 4: Latest ────────────────────────────────────────────────────
        let latest = store.latest_per_city()?;

        // ── Step 5: Plot ──────────────────────────────────────────────────────
        let plot_path = if cfg.plot {
            let path = self.settings.plots_dir().join(LATEST_PLOT_FILE);
            let bars = plot_latest_aqi_bar(&latest, &path)?;
            (bars > 0).then_some(path)
        } else {
            None
        };

        Ok(CollectSummary { stored, errors: result.errors, latest, plot_path })
    }

    fn build_fetcher(&self) -> Result<Box<dyn ReadingFetcher>> {
        let fetcher: Box<dyn ReadingFetcher> = match &self.config.source {
            FetchSource::Live => {
                let token = self.settings.require_token()?;
                Box::new(AqicnClient::new(token)?)
            }
            FetchSource::Fixture(path) => Box::new(FixtureFetcher::from_file(path)?),
            FetchSource::Synthetic { seed } => Box::new(SyntheticFetcher::new(*seed)),
        };
        Ok(fetcher)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::error::AqiError;
    use std::fs;

    fn settings(dir: &std::path::Path, token: Option<&str>) -> Settings {
        Settings {
            api_token: token.map(str::to_string),
            data_dir:  dir.to_path_buf(),
            cities:    vec!["tehran".into(), "isfahan".into()],
        }
    }

    #[test]
    fn test_synthetic_run_stores_and_plots() {
        let dir = tempfile::tempdir().unwrap();
        let config = CollectConfig {
            source: FetchSource::Synthetic { seed: 7 },
            ..CollectConfig::default()
        };

        let summary = CollectUseCase::new(config, settings(dir.path(), None))
            .execute()
            .unwrap();

        assert_eq!(summary.stored, 2);
        assert!(summary.errors.is_empty());
        assert_eq!(summary.latest.len(), 2);
        assert!(summary.plot_path.unwrap().exists());
        assert!(dir.path().join("aqi_history.sqlite").exists());
    }

    #[test]
    fn test_fixture_run_reports_missing_city() {
        let dir     = tempfile::tempdir().unwrap();
        let fixture = dir.path().join("recorded.json");
        fs::write(&fixture, r#"{ "tehran": { "aqi": 153, "timestamp": "2024-05-01T12:00:00Z" } }"#)
            .unwrap();

        let config = CollectConfig {
            source: FetchSource::Fixture(fixture),
            plot:   false,
            ..CollectConfig::default()
        };
        let summary = CollectUseCase::new(config, settings(dir.path(), None))
            .execute()
            .unwrap();

        assert_eq!(summary.stored, 1);
        assert_eq!(summary.errors.len(), 1);
        assert!(summary.errors[0].starts_with("isfahan"));
        assert!(summary.plot_path.is_none());
    }

    #[test]
    fn test_live_without_token_fails_before_writing() {
        let dir = tempfile::tempdir().unwrap();
        let err = CollectUseCase::new(CollectConfig::default(), settings(dir.path(), None))
            .execute()
            .unwrap_err();

        assert!(matches!(err.downcast_ref::<AqiError>(), Some(AqiError::Validation(_))));
        assert!(!dir.path().join("aqi_history.sqlite").exists());
    }
}
