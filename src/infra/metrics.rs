// ============================================================
// Layer 6 - Metrics Logger
// ============================================================
// Appends one row per training run to a CSV file so runs can
// be compared over time.
//
// Output file: <models_dir>/metrics.csv
//
//   model,rows_train,rows_test,mae_native,mae_reloaded
//   uci_co,7485,1872,0.623411,0.623412
//   store_aqi,96,24,9.104117,9.104121
//
// Rows go through csv::Writer, so a model name with a comma
// or a quote is quoted rather than splitting the row.

use anyhow::Result;
use std::{
    fs::{self, OpenOptions},
    path::{Path, PathBuf},
};

use crate::ml::trainer::Evaluation;

const HEADER: [&str; 5] = ["model", "rows_train", "rows_test", "mae_native", "mae_reloaded"];

/// One row of the metrics CSV
#[derive(Debug, Clone, PartialEq)]
pub struct RunMetrics {
    pub model:        String,
    pub rows_train:   usize,
    pub rows_test:    usize,
    pub mae_native:   f64,
    pub mae_reloaded: f64,
}

impl RunMetrics {
    pub fn from_evaluation(model: &str, eval: &Evaluation) -> Self {
        Self {
            model:        model.to_string(),
            rows_train:   eval.train_rows,
            rows_test:    eval.test_rows,
            mae_native:   eval.mae_native,
            mae_reloaded: eval.mae_reloaded,
        }
    }
}

pub struct MetricsLogger {
    csv_path: PathBuf,
}

impl MetricsLogger {
    /// Writes the header if the file doesn't exist yet.
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;

        let csv_path = dir.join("metrics.csv");
        if !csv_path.exists() {
            let mut w = csv::Writer::from_path(&csv_path)?;
            w.write_record(HEADER)?;
            w.flush()?;
            tracing::debug!("Created metrics CSV: '{}'", csv_path.display());
        }

        Ok(Self { csv_path })
    }

    pub fn log(&self, m: &RunMetrics) -> Result<()> {
        let file = OpenOptions::new().append(true).open(&self.csv_path)?;
        let mut w = csv::WriterBuilder::new().has_headers(false).from_writer(file);

        w.write_record([
            m.model.clone(),
            m.rows_train.to_string(),
            m.rows_test.to_string(),
            format!("{:.6}", m.mae_native),
            format!("{:.6}", m.mae_reloaded),
        ])?;
        w.flush()?;

        tracing::debug!(
            "Logged run '{}': mae_native={:.4}, mae_reloaded={:.4}",
            m.model,
            m.mae_native,
            m.mae_reloaded,
        );
        Ok(())
    }

    pub fn csv_path(&self) -> &Path {
        &self.csv_path
    }
}
