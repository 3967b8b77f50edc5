// ============================================================
// Layer 3 - Core Traits (Abstractions)
// ============================================================
// The seams the pipeline is built around. The data and ml
// layers only see these traits, never the concrete sources.
//
//   ReadingFetcher - one raw reading per city
//                    (AqicnClient, FixtureFetcher, SyntheticFetcher,
//                     or any closure in tests)
//   Clock          - "now" for readings that arrive without a time
//                    (SystemClock, FixedClock)
//   FeatureTable   - named numeric columns the trainer can select
//                    (AirQualityDataset, a slice of stored Readings)

use anyhow::Result;
use chrono::{DateTime, Utc};

use crate::domain::reading::RawReading;

// ─── ReadingFetcher ───────────────────────────────────────────────────────────
/// Anything that can produce the current raw reading for a city.
pub trait ReadingFetcher {
    /// Single best-effort attempt. Errors are reported per city
    /// by the collector and never abort the other cities.
    fn fetch(&self, city: &str) -> Result<RawReading>;
}

/// Closures work as fetchers, which keeps tests short.
impl<F> ReadingFetcher for F
where
    F: Fn(&str) -> Result<RawReading>,
{
    fn fetch(&self, city: &str) -> Result<RawReading> {
        self(city)
    }
}

// ─── Clock ────────────────────────────────────────────────────────────────────
pub trait Clock {
    fn now(&self) -> DateTime<Utc>;
}

// ─── FeatureTable ─────────────────────────────────────────────────────────────
/// A table of named numeric columns with a shared row count.
pub trait FeatureTable {
    fn row_count(&self) -> usize;

    /// The full column, one entry per row, or None if the
    /// table has no column with this name.
    fn column(&self, name: &str) -> Option<Vec<Option<f64>>>;
}
