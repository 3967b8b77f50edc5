// ============================================================
// Layer 3 - Error Taxonomy
// ============================================================
// Every failure the pipeline can produce, as one enum.
//
// Two families:
//   - Absorbed locally:  Fetch (one city), Parse (one row).
//     These are logged or collected and the run continues.
//   - Fatal for the run: Validation, FileNotFound, Schema,
//     Data, SerializationMismatch and the wrapped I/O kinds.
//
// The application layer converts these into anyhow::Error
// with `?`, adding context as it goes.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AqiError {
    /// Malformed configuration, credentials or record fields
    #[error("validation failed: {0}")]
    Validation(String),

    #[error("input file not found: {}", .0.display())]
    FileNotFound(PathBuf),

    /// A single entity's fetch failed
    #[error("{entity}: {message}")]
    Fetch { entity: String, message: String },

    /// An unparseable timestamp or number in one row
    #[error("cannot parse {what} from {value:?}")]
    Parse { what: &'static str, value: String },

    /// A required column is absent
    #[error("missing column '{0}'")]
    Schema(String),

    /// Not enough usable rows to go on
    #[error("insufficient data: {0}")]
    Data(String),

    #[error(
        "round-trip mismatch: native MAE {native:.6} vs reloaded MAE {reloaded:.6} \
         (tolerance {tolerance:.3e})"
    )]
    SerializationMismatch {
        native:    f64,
        reloaded:  f64,
        tolerance: f64,
    },

    #[error("storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("model export failed: {0}")]
    Export(String),

    #[error("inference failed: {0}")]
    Inference(String),

    #[error("plot rendering failed: {0}")]
    Plot(String),
}

pub type Result<T> = std::result::Result<T, AqiError>;
