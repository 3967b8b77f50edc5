// ============================================================
// Layer 2 - PredictUseCase
// ============================================================
// Runs a trained model on feature rows given by the user.
//
//   Step 1: Read the model card        (Layer 6 - infra)
//   Step 2: Check the ONNX metadata agrees with the card
//   Step 3: Check every row's width against the card's features
//   Step 4: Load the ONNX file and predict through tract (Layer 5)

use std::path::PathBuf;

use anyhow::{Context, Result};
use ndarray::Array2;
use serde::{Deserialize, Serialize};

use crate::domain::error::AqiError;
use crate::infra::{
    artifacts::{ModelArtifacts, ModelCard},
    settings::Settings,
};
use crate::ml::export::read_onnx;
use crate::ml::inferencer::OnnxSession;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredictConfig {
    pub model_name: String,
    pub models_dir: Option<PathBuf>,
    pub rows:       Vec<Vec<f64>>,
}

#[derive(Debug, Clone)]
pub struct Prediction {
    pub card:   ModelCard,
    pub values: Vec<f64>,
}

pub struct PredictUseCase {
    config:   PredictConfig,
    settings: Settings,
}

impl PredictUseCase {
    pub fn new(config: PredictConfig, settings: Settings) -> Self {
        Self { config, settings }
    }

    pub fn execute(&self) -> Result<Prediction> {
        let cfg       = &self.config;
        let artifacts = ModelArtifacts::new(
            cfg.models_dir.clone().unwrap_or_else(|| self.settings.models_dir()),
        );

        // ── Step 1: Card ──────────────────────────────────────────────────────
        let card      = artifacts.load_card(&cfg.model_name)?;
        let onnx_path = artifacts.onnx_path(&cfg.model_name);

        // ── Step 2: Card vs ONNX ──────────────────────────────────────────────
        let (exported, target) = read_onnx(&onnx_path)?;
        if exported.feature_names != card.features || target != card.target {
            return Err(AqiError::Export(format!(
                "'{}' was exported as {} = f({}) but its card says {} = f({})",
                onnx_path.display(),
                target,
                exported.feature_names.join(", "),
                card.target,
                card.features.join(", ")
            ))
            .into());
        }

        // ── Step 3: Shape ─────────────────────────────────────────────────────
        let k = card.features.len();
        if let Some(bad) = cfg.rows.iter().position(|r| r.len() != k) {
            return Err(AqiError::Validation(format!(
                "row {} has {} value(s) but '{}' expects {} ({})",
                bad + 1,
                cfg.rows[bad].len(),
                card.name,
                k,
                card.features.join(", ")
            ))
            .into());
        }
        let flat: Vec<f64> = cfg.rows.iter().flatten().copied().collect();
        let x = Array2::from_shape_vec((cfg.rows.len(), k), flat)
            .context("Cannot build the feature matrix")?;

        // ── Step 4: Predict ───────────────────────────────────────────────────
        let session = OnnxSession::load(&onnx_path)?;
        let values  = session.predict(x.view())?;
        tracing::info!("Predicted {} row(s) with '{}'", values.len(), card.name);

        Ok(Prediction { card, values })
    }
}
