// ============================================================
// Layer 2 - TrainUseCase
// ============================================================
// Orchestrates one training run in order:
//
//   Step 1: Build the feature table   (Layer 4 - data / Layer 6 - infra)
//           UCI: load CSV, clean       → AirQualityDataset
//           Store: read every reading  → [Reading]
//   Step 2: Fit, export, reload        (Layer 5 - ml)
//   Step 3: Check round-trip agreement (Layer 5 - ml)
//   Step 4: Model card + run config    (Layer 6 - infra)
//   Step 5: Metrics CSV row            (Layer 6 - infra)
//   Step 6: Scatter and histogram      (Layer 7 - report)
//
// A round-trip mismatch fails the run before anything but the
// ONNX file has been written.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::data::{
    loader::CsvLoader,
    preprocessor::{Preprocessor, CO_SENSOR_COLUMN, CO_TARGET_COLUMN},
};
use crate::domain::error::AqiError;
use crate::infra::{
    artifacts::{ModelArtifacts, ModelCard},
    metrics::{MetricsLogger, RunMetrics},
    settings::Settings,
    store::ReadingStore,
};
use crate::ml::trainer::{fit_and_export, Evaluation, TrainerConfig};
use crate::report::plots::{plot_actual_vs_predicted, plot_error_histogram};

/// Store-backed training predicts AQI from the pollutant columns.
pub const STORE_FEATURES: [&str; 6] = ["pm25", "pm10", "co", "no2", "so2", "o3"];
pub const STORE_TARGET: &str = "aqi";

pub const UCI_MODEL_NAME: &str = "uci_co";
pub const STORE_MODEL_NAME: &str = "store_aqi";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TrainingSource {
    /// The UCI Air Quality CSV; None means the settings' default path
    Uci { csv: Option<PathBuf> },
    /// Every reading in the store; None means the settings' database
    Store { db: Option<PathBuf> },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainConfig {
    pub source:     TrainingSource,
    pub model_name: String,
    /// Overrides the settings' models directory
    pub models_dir: Option<PathBuf>,
    pub plots:      bool,
    pub trainer:    TrainerConfig,
}

impl TrainConfig {
    pub fn uci() -> Self {
        Self {
            source:     TrainingSource::Uci { csv: None },
            model_name: UCI_MODEL_NAME.to_string(),
            models_dir: None,
            plots:      true,
            trainer:    TrainerConfig::default(),
        }
    }

    pub fn store() -> Self {
        Self {
            source:     TrainingSource::Store { db: None },
            model_name: STORE_MODEL_NAME.to_string(),
            ..Self::uci()
        }
    }
}

/// Everything a run wrote, for the CLI to print.
#[derive(Debug, Clone)]
pub struct TrainReport {
    pub evaluation: Evaluation,
    pub onnx_path:  PathBuf,
    pub card_path:  PathBuf,
    pub plots:      Vec<PathBuf>,
}

// ─── TrainUseCase ─────────────────────────────────────────────────────────────
pub struct TrainUseCase {
    config:   TrainConfig,
    settings: Settings,
}

impl TrainUseCase {
    pub fn new(config: TrainConfig, settings: Settings) -> Self {
        Self { config, settings }
    }

    pub fn execute(&self) -> Result<TrainReport> {
        let cfg       = &self.config;
        let artifacts = ModelArtifacts::new(
            cfg.models_dir.clone().unwrap_or_else(|| self.settings.models_dir()),
        );
        let onnx_path = artifacts.onnx_path(&cfg.model_name);

        // ── Steps 1-2: Feature table, fit, export, reload ─────────────────────
        let evaluation = match &cfg.source {
            TrainingSource::Uci { csv } => {
                let csv = csv.clone().unwrap_or_else(|| self.settings.uci_csv());
                self.train_uci(&csv, &onnx_path)?
            }
            TrainingSource::Store { db } => {
                let db = db.clone().unwrap_or_else(|| self.settings.db_path());
                self.train_store(&db, &onnx_path)?
            }
        };

        // ── Step 3: Round-trip check ──────────────────────────────────────────
        evaluation
            .ensure_round_trip(cfg.trainer.rel_tolerance, cfg.trainer.abs_tolerance)
            .with_context(|| format!("ONNX round trip failed for '{}'", onnx_path.display()))?;

        // ── Step 4: Model card and run config ─────────────────────────────────
        let card = ModelCard::from_evaluation(&cfg.model_name, &evaluation, cfg.trainer.seed, Utc::now());
        let card_path = artifacts.save_card(&card)?;
        artifacts.save_run_config(&cfg.model_name, cfg)?;

        // ── Step 5: Metrics ───────────────────────────────────────────────────
        let metrics = MetricsLogger::new(artifacts.dir())?;
        metrics.log(&RunMetrics::from_evaluation(&cfg.model_name, &evaluation))?;
        tracing::info!("Run metrics appended to '{}'", metrics.csv_path().display());

        // ── Step 6: Plots ─────────────────────────────────────────────────────
        let plots = if cfg.plots { self.render_plots(&evaluation)? } else { Vec::new() };

        Ok(TrainReport { evaluation, onnx_path, card_path, plots })
    }

    fn train_uci(&self, csv: &Path, onnx_path: &Path) -> Result<Evaluation> {
        tracing::info!("Loading UCI dataset from '{}'", csv.display());
        let raw = CsvLoader::new()
            .load(csv)
            .with_context(|| format!("Cannot load '{}'", csv.display()))?;
        let dataset = Preprocessor::new().clean(&raw)?;
        if dataset.is_empty() {
            return Err(AqiError::Data(format!("no usable rows in '{}'", csv.display())).into());
        }
        if let (Some(first), Some(last)) = (dataset.rows().first(), dataset.rows().last()) {
            tracing::info!(
                "{} clean rows after preprocessing, {} to {}",
                dataset.len(),
                first.timestamp,
                last.timestamp
            );
        }
        tracing::debug!("Dataset columns: {}", dataset.columns().join(", "));

        Ok(fit_and_export(
            &dataset,
            &[CO_SENSOR_COLUMN],
            CO_TARGET_COLUMN,
            onnx_path,
            &self.config.trainer,
        )?)
    }

    fn train_store(&self, db: &Path, onnx_path: &Path) -> Result<Evaluation> {
        let store = ReadingStore::open(db)
            .with_context(|| format!("Cannot open store '{}'", db.display()))?;
        let readings = store.all()?;
        tracing::info!("Loaded {} stored reading(s)", readings.len());

        Ok(fit_and_export(
            readings.as_slice(),
            &STORE_FEATURES,
            STORE_TARGET,
            onnx_path,
            &self.config.trainer,
        )?)
    }

    fn render_plots(&self, eval: &Evaluation) -> Result<Vec<PathBuf>> {
        let name = &self.config.model_name;
        let dir  = self.settings.plots_dir();

        let scatter = dir.join(format!("{name}_actual_vs_pred.svg"));
        plot_actual_vs_predicted(&eval.y_test, &eval.reloaded_predictions, eval.mae_reloaded, name, &scatter)?;

        let histogram = dir.join(format!("{name}_error_hist.svg"));
        plot_error_histogram(&eval.y_test, &eval.reloaded_predictions, name, &histogram)?;

        Ok(vec![scatter, histogram])
    }
}
