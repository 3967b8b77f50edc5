// ============================================================
// Layer 2 - Store Use Cases
// ============================================================
// Small workflows around the reading store:
//
//   InitDbUseCase  - create the database file and schema
//   InspectUseCase - total row count plus the first N rows

use std::path::PathBuf;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::domain::reading::Reading;
use crate::infra::{settings::Settings, store::ReadingStore};

fn open_store(db: Option<&PathBuf>, settings: &Settings) -> Result<ReadingStore> {
    let path = db.cloned().unwrap_or_else(|| settings.db_path());
    ReadingStore::open(&path).with_context(|| format!("Cannot open store '{}'", path.display()))
}

// ─── InitDbUseCase ────────────────────────────────────────────────────────────
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InitDbConfig {
    pub db: Option<PathBuf>,
}

pub struct InitDbUseCase {
    config:   InitDbConfig,
    settings: Settings,
}

impl InitDbUseCase {
    pub fn new(config: InitDbConfig, settings: Settings) -> Self {
        Self { config, settings }
    }

    /// Opening the store creates the schema if needed.
    /// Returns the database path.
    pub fn execute(&self) -> Result<PathBuf> {
        let store = open_store(self.config.db.as_ref(), &self.settings)?;
        tracing::info!("Database ready at '{}'", store.path().display());
        Ok(store.path().to_path_buf())
    }
}

// ─── InspectUseCase ───────────────────────────────────────────────────────────
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InspectConfig {
    pub db:    Option<PathBuf>,
    pub limit: usize,
}

impl Default for InspectConfig {
    fn default() -> Self {
        Self { db: None, limit: 5 }
    }
}

#[derive(Debug, Clone)]
pub struct InspectReport {
    pub path:  PathBuf,
    pub total: usize,
    pub head:  Vec<Reading>,
}

pub struct InspectUseCase {
    config:   InspectConfig,
    settings: Settings,
}

impl InspectUseCase {
    pub fn new(config: InspectConfig, settings: Settings) -> Self {
        Self { config, settings }
    }

    pub fn execute(&self) -> Result<InspectReport> {
        let store = open_store(self.config.db.as_ref(), &self.settings)?;
        let total = store.count()?;
        let head  = store.head(self.config.limit)?;
        tracing::debug!("Inspected '{}': {} row(s)", store.path().display(), total);

        Ok(InspectReport { path: store.path().to_path_buf(), total, head })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings(dir: &std::path::Path) -> Settings {
        Settings {
            api_token: None,
            data_dir:  dir.to_path_buf(),
            cities:    vec![],
        }
    }

    #[test]
    fn test_init_then_inspect_empty() {
        let dir = tempfile::tempdir().unwrap();

        let path = InitDbUseCase::new(InitDbConfig::default(), settings(dir.path()))
            .execute()
            .unwrap();
        assert!(path.exists());

        let report = InspectUseCase::new(InspectConfig::default(), settings(dir.path()))
            .execute()
            .unwrap();
        assert_eq!(report.total, 0);
        assert!(report.head.is_empty());
    }

    #[test]
    fn test_inspect_limits_rows() {
        let dir  = tempfile::tempdir().unwrap();
        let db   = dir.path().join("custom.sqlite");
        let mut store = ReadingStore::open(&db).unwrap();
        let readings: Vec<Reading> = (0..8)
            .map(|i| Reading::new("tehran", format!("2024-05-01T0{i}:00:00Z")))
            .collect();
        store.append(&readings).unwrap();

        let config = InspectConfig { db: Some(db), limit: 3 };
        let report = InspectUseCase::new(config, settings(dir.path())).execute().unwrap();

        assert_eq!(report.total, 8);
        assert_eq!(report.head.len(), 3);
        assert_eq!(report.head[0].timestamp, "2024-05-01T00:00:00Z");
    }
}
