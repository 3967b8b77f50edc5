// ============================================================
// Layer 6 - Model Artifacts
// ============================================================
// Every trained model is two files side by side:
//
//   models/
//     uci_co.onnx   ← the portable model (ml::export)
//     uci_co.json   ← the model card below
//
// The card records what the ONNX file alone does not say
// plainly: the evaluation, the split and when it was made.
// `predict` reads it to know how many features to expect.

use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ml::trainer::Evaluation;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelCard {
    pub name:         String,
    pub features:     Vec<String>,
    pub target:       String,
    pub coefficients: Vec<f64>,
    pub intercept:    f64,
    pub mae_native:   f64,
    pub mae_reloaded: f64,
    pub train_rows:   usize,
    pub test_rows:    usize,
    pub seed:         u64,
    pub trained_at:   DateTime<Utc>,
}

impl ModelCard {
    pub fn from_evaluation(name: &str, eval: &Evaluation, seed: u64, trained_at: DateTime<Utc>) -> Self {
        Self {
            name:         name.to_string(),
            features:     eval.model.feature_names.clone(),
            target:       eval.target.clone(),
            coefficients: eval.model.coefficients.clone(),
            intercept:    eval.model.intercept,
            mae_native:   eval.mae_native,
            mae_reloaded: eval.mae_reloaded,
            train_rows:   eval.train_rows,
            test_rows:    eval.test_rows,
            seed,
            trained_at,
        }
    }
}

/// Resolves and reads/writes the files of named models in one directory.
pub struct ModelArtifacts {
    dir: PathBuf,
}

impl ModelArtifacts {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn onnx_path(&self, name: &str) -> PathBuf {
        self.dir.join(format!("{name}.onnx"))
    }

    pub fn card_path(&self, name: &str) -> PathBuf {
        self.dir.join(format!("{name}.json"))
    }

    pub fn save_card(&self, card: &ModelCard) -> Result<PathBuf> {
        fs::create_dir_all(&self.dir)
            .with_context(|| format!("Cannot create '{}'", self.dir.display()))?;

        let path = self.card_path(&card.name);
        let json = serde_json::to_string_pretty(card)?;
        fs::write(&path, json)
            .with_context(|| format!("Cannot write model card to '{}'", path.display()))?;

        tracing::debug!("Saved model card to '{}'", path.display());
        Ok(path)
    }

    /// Write the configuration a model was trained with to
    /// `<name>.config.json`.
    pub fn save_run_config<C: Serialize>(&self, name: &str, config: &C) -> Result<PathBuf> {
        fs::create_dir_all(&self.dir)
            .with_context(|| format!("Cannot create '{}'", self.dir.display()))?;

        let path = self.dir.join(format!("{name}.config.json"));
        fs::write(&path, serde_json::to_string_pretty(config)?)
            .with_context(|| format!("Cannot write config to '{}'", path.display()))?;
        Ok(path)
    }

    pub fn load_card(&self, name: &str) -> Result<ModelCard> {
        let path = self.card_path(name);
        let json = fs::read_to_string(&path).with_context(|| {
            format!(
                "Cannot read model card '{}'. Has the model been trained?",
                path.display()
            )
        })?;
        serde_json::from_str(&json)
            .with_context(|| format!("Model card '{}' is malformed", path.display()))
    }
}
