// ============================================================
// Layer 5 - Trainer / Exporter
// ============================================================
// Fit, export, reload, compare:
//
//   FeatureTable ──select──► (X, y) ──split──► train / test
//                                                │
//        LinearModel::fit(train) ◄───────────────┘
//              │
//              ├── predict(test)           → mae_native
//              │
//              └── write_onnx(path)
//                      │
//                      ▼
//              OnnxSession::load(path)
//                      └── predict(test)   → mae_reloaded
//
// Both predictions are scored on the same held-out rows, so
// the two MAEs differ only by what the ONNX round trip loses
// (the f32 cast of weights and inputs).

use std::path::Path;

use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};

use crate::data::splitter::{split_train_test, DEFAULT_SEED, DEFAULT_TEST_FRACTION};
use crate::domain::error::{AqiError, Result};
use crate::domain::traits::FeatureTable;
use crate::ml::export::write_onnx;
use crate::ml::inferencer::OnnxSession;
use crate::ml::model::{mean_absolute_error, LinearModel};

pub const DEFAULT_REL_TOLERANCE: f64 = 1e-3;
pub const DEFAULT_ABS_TOLERANCE: f64 = 1e-6;

const MIN_TRAIN_ROWS: usize = 2;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrainerConfig {
    pub seed:          u64,
    pub test_fraction: f64,
    pub rel_tolerance: f64,
    pub abs_tolerance: f64,
}

impl Default for TrainerConfig {
    fn default() -> Self {
        Self {
            seed:          DEFAULT_SEED,
            test_fraction: DEFAULT_TEST_FRACTION,
            rel_tolerance: DEFAULT_REL_TOLERANCE,
            abs_tolerance: DEFAULT_ABS_TOLERANCE,
        }
    }
}

/// Outcome of one fit/export/reload run.
#[derive(Debug, Clone)]
pub struct Evaluation {
    pub model:                 LinearModel,
    pub target:                String,
    pub mae_native:            f64,
    pub mae_reloaded:          f64,
    pub y_test:                Vec<f64>,
    pub native_predictions:    Vec<f64>,
    pub reloaded_predictions:  Vec<f64>,
    pub train_rows:            usize,
    pub test_rows:             usize,
    pub skipped_rows:          usize,
}

impl Evaluation {
    /// `|a - b| <= rel * max(|a|, |b|) + abs` on the two MAEs.
    pub fn agrees(&self, rel_tolerance: f64, abs_tolerance: f64) -> bool {
        let a = self.mae_native;
        let b = self.mae_reloaded;
        (a - b).abs() <= rel_tolerance * a.abs().max(b.abs()) + abs_tolerance
    }

    pub fn ensure_round_trip(&self, rel_tolerance: f64, abs_tolerance: f64) -> Result<()> {
        if self.agrees(rel_tolerance, abs_tolerance) {
            Ok(())
        } else {
            Err(AqiError::SerializationMismatch {
                native:    self.mae_native,
                reloaded:  self.mae_reloaded,
                tolerance: rel_tolerance,
            })
        }
    }
}

/// Select columns, split, fit, export to `out_path`, reload and
/// score both models on the held-out rows.
pub fn fit_and_export<T>(
    table:           &T,
    feature_columns: &[&str],
    target:          &str,
    out_path:        &Path,
    cfg:             &TrainerConfig,
) -> Result<Evaluation>
where
    T: FeatureTable + ?Sized,
{
    if feature_columns.is_empty() {
        return Err(AqiError::Validation("at least one feature column is required".into()));
    }

    // ── 1. Select ─────────────────────────────────────────────────────────────
    let (samples, skipped_rows) = select_rows(table, feature_columns, target)?;
    if skipped_rows > 0 {
        tracing::warn!("Skipped {} row(s) with missing values", skipped_rows);
    }

    // ── 2. Split ──────────────────────────────────────────────────────────────
    let total = samples.len();
    let (train, test) = split_train_test(samples, cfg.test_fraction, cfg.seed);
    if train.len() < MIN_TRAIN_ROWS || test.is_empty() {
        return Err(AqiError::Data(format!(
            "{total} usable row(s) give {} train / {} test; need at least {MIN_TRAIN_ROWS} / 1",
            train.len(),
            test.len()
        )));
    }
    tracing::info!("Training on {} rows, testing on {}", train.len(), test.len());

    let k = feature_columns.len();
    let (x_train, y_train) = to_arrays(&train, k)?;
    let (x_test, y_test)   = to_arrays(&test, k)?;

    // ── 3. Fit ────────────────────────────────────────────────────────────────
    let names = feature_columns.iter().map(|c| c.to_string()).collect();
    let model = LinearModel::fit(names, x_train.view(), y_train.view())?;
    tracing::debug!(
        "Fitted coefficients {:?}, intercept {:.6}",
        model.coefficients,
        model.intercept
    );

    // ── 4. Native score ───────────────────────────────────────────────────────
    let y_test = y_test.to_vec();
    let native_predictions = model.predict(x_test.view()).to_vec();
    let mae_native = mean_absolute_error(&y_test, &native_predictions);

    // ── 5. Export ─────────────────────────────────────────────────────────────
    write_onnx(&model, target, out_path)?;

    // ── 6. Reload and rescore ─────────────────────────────────────────────────
    let session = OnnxSession::load(out_path)?;
    let reloaded_predictions = session.predict(x_test.view())?;
    let mae_reloaded = mean_absolute_error(&y_test, &reloaded_predictions);

    tracing::info!(
        "MAE native {:.6}, reloaded {:.6} ({})",
        mae_native,
        mae_reloaded,
        target
    );

    Ok(Evaluation {
        model,
        target: target.to_string(),
        mae_native,
        mae_reloaded,
        y_test,
        native_predictions,
        reloaded_predictions,
        train_rows: train.len(),
        test_rows: test.len(),
        skipped_rows,
    })
}

type Sample = (Vec<f64>, f64);

/// Complete (features, target) rows and the number of rows skipped.
fn select_rows<T>(table: &T, feature_columns: &[&str], target: &str) -> Result<(Vec<Sample>, usize)>
where
    T: FeatureTable + ?Sized,
{
    let column = |name: &str| {
        table
            .column(name)
            .ok_or_else(|| AqiError::Schema(name.to_string()))
    };

    let features = feature_columns
        .iter()
        .map(|name| column(*name))
        .collect::<Result<Vec<_>>>()?;
    let targets = column(target)?;

    let mut samples = Vec::with_capacity(table.row_count());
    let mut skipped = 0;
    for (row, y) in targets.iter().enumerate() {
        let x: Option<Vec<f64>> = features
            .iter()
            .map(|col| col.get(row).copied().flatten())
            .collect();
        match (x, y) {
            (Some(x), Some(y)) => samples.push((x, *y)),
            _ => skipped += 1,
        }
    }
    Ok((samples, skipped))
}

fn to_arrays(samples: &[Sample], k: usize) -> Result<(Array2<f64>, Array1<f64>)> {
    let flat: Vec<f64> = samples.iter().flat_map(|(x, _)| x.iter().copied()).collect();
    let x = Array2::from_shape_vec((samples.len(), k), flat)
        .map_err(|e| AqiError::Data(format!("feature matrix: {e}")))?;
    let y = samples.iter().map(|(_, y)| *y).collect();
    Ok((x, y))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    struct Columns {
        rows: usize,
        cols: HashMap<String, Vec<Option<f64>>>,
    }

    impl FeatureTable for Columns {
        fn row_count(&self) -> usize {
            self.rows
        }

        fn column(&self, name: &str) -> Option<Vec<Option<f64>>> {
            self.cols.get(name).cloned()
        }
    }

    /// y = 0.5 x + 1 plus a small deterministic wobble.
    fn noisy_line(n: usize) -> Columns {
        let x: Vec<Option<f64>> = (0..n).map(|i| Some(i as f64)).collect();
        let y: Vec<Option<f64>> = (0..n)
            .map(|i| Some(0.5 * i as f64 + 1.0 + if i % 2 == 0 { 0.3 } else { -0.3 }))
            .collect();
        Columns {
            rows: n,
            cols: HashMap::from([("x".to_string(), x), ("y".to_string(), y)]),
        }
    }

    #[test]
    fn test_round_trip_agrees() {
        let dir  = tempfile::tempdir().unwrap();
        let path = dir.path().join("models").join("line.onnx");
        let cfg  = TrainerConfig::default();

        let eval = fit_and_export(&noisy_line(50), &["x"], "y", &path, &cfg).unwrap();

        assert!(path.exists());
        assert_eq!(eval.train_rows, 40);
        assert_eq!(eval.test_rows, 10);
        assert_eq!(eval.y_test.len(), eval.reloaded_predictions.len());
        assert!(eval.mae_native > 0.0);
        assert!((eval.model.coefficients[0] - 0.5).abs() < 0.05);
        eval.ensure_round_trip(cfg.rel_tolerance, cfg.abs_tolerance).unwrap();
    }

    #[test]
    fn test_same_seed_same_result() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = TrainerConfig::default();
        let a = fit_and_export(&noisy_line(30), &["x"], "y", &dir.path().join("a.onnx"), &cfg).unwrap();
        let b = fit_and_export(&noisy_line(30), &["x"], "y", &dir.path().join("b.onnx"), &cfg).unwrap();

        assert_eq!(a.y_test, b.y_test);
        assert_eq!(a.mae_native, b.mae_native);
    }

    #[test]
    fn test_missing_column_is_schema_error() {
        let dir = tempfile::tempdir().unwrap();
        let result = fit_and_export(
            &noisy_line(10),
            &["nope"],
            "y",
            &dir.path().join("m.onnx"),
            &TrainerConfig::default(),
        );
        assert!(matches!(result, Err(AqiError::Schema(_))));
    }

    #[test]
    fn test_too_few_rows_is_data_error() {
        let dir = tempfile::tempdir().unwrap();
        let result = fit_and_export(
            &noisy_line(2),
            &["x"],
            "y",
            &dir.path().join("m.onnx"),
            &TrainerConfig::default(),
        );
        assert!(matches!(result, Err(AqiError::Data(_))));
    }

    #[test]
    fn test_rows_with_nulls_are_skipped() {
        let mut table = noisy_line(20);
        if let Some(x) = table.cols.get_mut("x") {
            x[3] = None;
            x[7] = None;
        }
        let dir  = tempfile::tempdir().unwrap();
        let eval = fit_and_export(&table, &["x"], "y", &dir.path().join("m.onnx"), &TrainerConfig::default())
            .unwrap();

        assert_eq!(eval.skipped_rows, 2);
        assert_eq!(eval.train_rows + eval.test_rows, 18);
    }

    #[test]
    fn test_mismatch_detection() {
        let eval = Evaluation {
            model:                LinearModel::new(vec!["x".into()], vec![1.0], 0.0),
            target:               "y".into(),
            mae_native:           1.0,
            mae_reloaded:         1.01,
            y_test:               vec![],
            native_predictions:   vec![],
            reloaded_predictions: vec![],
            train_rows:           0,
            test_rows:            0,
            skipped_rows:         0,
        };
        assert!(!eval.agrees(1e-3, 1e-6));
        assert!(eval.agrees(0.02, 0.0));
        assert!(matches!(
            eval.ensure_round_trip(1e-3, 1e-6),
            Err(AqiError::SerializationMismatch { .. })
        ));
    }
}
