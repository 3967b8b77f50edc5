// ============================================================
// Layer 4 - Dataset Cleaner
// ============================================================
// Turns a RawTable from the loader into an AirQualityDataset
// the trainer can use.
//
// Cleaning steps (applied in order):
//   1. Drop trailing columns with an empty header (";;" artifact)
//   2. Combine Date + Time into one timestamp
//      ("10/03/2004" + "18.00.00", day-first, 24h clock);
//      rows that fail to parse are dropped and counted
//   3. Coerce every other column to a number (decimal comma),
//      unparseable cells become None
//   4. Drop rows where a required training column is None
//   5. Stable sort by timestamp; equal timestamps keep input order
//
// Output rows are a subsequence of the input, ordered by time,
// with no gaps in the required columns.

use chrono::NaiveDateTime;

use crate::data::dataset::{AirQualityDataset, DatasetRow};
use crate::data::loader::RawTable;
use crate::domain::error::{AqiError, Result};
use crate::domain::reading::parse_decimal_comma;

pub const DATE_COLUMN: &str = "Date";
pub const TIME_COLUMN: &str = "Time";
/// Target concentration in the UCI dataset
pub const CO_TARGET_COLUMN: &str = "CO(GT)";
/// Tin-oxide sensor response correlated with CO
pub const CO_SENSOR_COLUMN: &str = "PT08.S1(CO)";

const TIMESTAMP_FORMAT: &str = "%d/%m/%Y %H.%M.%S";

pub struct Preprocessor {
    required: Vec<String>,
}

impl Preprocessor {
    /// Cleaner for the CO regression: both training columns required.
    pub fn new() -> Self {
        Self::with_required([CO_TARGET_COLUMN, CO_SENSOR_COLUMN])
    }

    pub fn with_required<I, S>(required: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self { required: required.into_iter().map(Into::into).collect() }
    }

    pub fn clean(&self, raw: &RawTable) -> Result<AirQualityDataset> {
        // ── Step 1: Trailing unnamed columns ─────────────────────────────────
        let width = raw
            .headers
            .iter()
            .rposition(|h| !h.trim().is_empty())
            .map_or(0, |i| i + 1);
        if width < raw.headers.len() {
            tracing::debug!("Dropping {} trailing unnamed column(s)", raw.headers.len() - width);
        }
        let headers = &raw.headers[..width];

        let date_idx = raw
            .column_index(DATE_COLUMN)
            .ok_or_else(|| AqiError::Schema(DATE_COLUMN.to_string()))?;
        let time_idx = raw
            .column_index(TIME_COLUMN)
            .ok_or_else(|| AqiError::Schema(TIME_COLUMN.to_string()))?;

        let value_columns: Vec<(usize, String)> = headers
            .iter()
            .enumerate()
            .filter(|(i, _)| *i != date_idx && *i != time_idx)
            .map(|(i, h)| (i, h.clone()))
            .collect();
        let names: Vec<String> = value_columns.iter().map(|(_, h)| h.clone()).collect();

        let required_positions: Vec<usize> = self
            .required
            .iter()
            .map(|req| {
                names
                    .iter()
                    .position(|n| n == req)
                    .ok_or_else(|| AqiError::Schema(req.clone()))
            })
            .collect::<Result<_>>()?;

        // ── Steps 2-4: Per-row parse and filter ──────────────────────────────
        let mut rows            = Vec::with_capacity(raw.row_count());
        let mut bad_timestamps  = 0usize;
        let mut missing_targets = 0usize;

        for r in 0..raw.row_count() {
            let timestamp = match parse_timestamp(raw.cell(r, date_idx), raw.cell(r, time_idx)) {
                Ok(ts) => ts,
                Err(e) => {
                    tracing::trace!("Row {}: {}", r, e);
                    bad_timestamps += 1;
                    continue;
                }
            };

            let values: Vec<Option<f64>> = value_columns
                .iter()
                .map(|(col, _)| parse_decimal_comma(raw.cell(r, *col)))
                .collect();

            if required_positions.iter().any(|&p| values[p].is_none()) {
                missing_targets += 1;
                continue;
            }

            rows.push(DatasetRow { timestamp, values });
        }

        if bad_timestamps > 0 {
            tracing::warn!("Dropped {} row(s) with unparseable timestamps", bad_timestamps);
        }
        if missing_targets > 0 {
            tracing::warn!(
                "Dropped {} row(s) with non-numeric {:?}",
                missing_targets,
                self.required
            );
        }

        // ── Step 5: Chronological order ──────────────────────────────────────
        // sort_by_key is stable, so duplicate timestamps keep file order
        rows.sort_by_key(|row| row.timestamp);

        tracing::info!("Cleaned dataset: {} of {} rows kept", rows.len(), raw.row_count());
        Ok(AirQualityDataset::new(names, rows))
    }
}

impl Default for Preprocessor {
    fn default() -> Self {
        Self::new()
    }
}

/// Combine a UCI date and time cell into one timestamp.
pub fn parse_timestamp(date: &str, time: &str) -> Result<NaiveDateTime> {
    let combined = format!("{} {}", date.trim(), time.trim());
    NaiveDateTime::parse_from_str(&combined, TIMESTAMP_FORMAT).map_err(|_| AqiError::Parse {
        what:  "timestamp",
        value: combined,
    })
}
