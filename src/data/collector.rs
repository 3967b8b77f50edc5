// ============================================================
// Layer 4 - Reading Collector
// ============================================================
// Takes one snapshot for a list of cities.
//
// For every city, in order:
//   1. fetcher.fetch(city)          - one attempt, no retry
//   2. coerce each measurement      - parse_optional_float
//   3. stamp "now" if the source gave no timestamp; numeric
//      epoch seconds become RFC 3339 UTC
//
// A failing city adds "<city>: <error>" to `errors` and the
// loop moves on. The result always holds one entry per city,
// either in `readings` or in `errors`.

use chrono::{DateTime, SecondsFormat};
use serde_json::Value;

use crate::domain::error::AqiError;
use crate::domain::reading::{parse_optional_float, RawReading, Reading};
use crate::domain::traits::{Clock, ReadingFetcher};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CollectorResult {
    pub readings: Vec<Reading>,
    pub errors:   Vec<String>,
}

pub fn collect_readings<S: AsRef<str>>(
    fetcher: &dyn ReadingFetcher,
    clock:   &dyn Clock,
    cities:  &[S],
) -> CollectorResult {
    let mut result = CollectorResult::default();

    for city in cities {
        let city = city.as_ref();
        match fetcher.fetch(city) {
            Ok(raw) => {
                let reading = to_reading(city, &raw, clock);
                tracing::debug!("Collected {} (aqi={:?})", city, reading.aqi);
                result.readings.push(reading);
            }
            Err(e) => {
                let err = AqiError::Fetch {
                    entity:  city.to_string(),
                    message: format!("{e:#}"),
                };
                tracing::warn!("{}", err);
                result.errors.push(err.to_string());
            }
        }
    }

    tracing::info!(
        "Collected {} reading(s), {} error(s)",
        result.readings.len(),
        result.errors.len()
    );
    result
}

/// Coerce one raw mapping into a Reading.
pub fn to_reading(city: &str, raw: &RawReading, clock: &dyn Clock) -> Reading {
    let now = || clock.now().to_rfc3339_opts(SecondsFormat::Secs, true);
    let timestamp = match raw.get("timestamp") {
        None | Some(Value::Null) => now(),
        Some(Value::String(s)) if s.trim().is_empty() => now(),
        Some(Value::String(s)) => s.trim().to_string(),
        Some(Value::Number(n)) => match epoch_to_rfc3339(n) {
            Some(ts) => ts,
            None => {
                tracing::debug!("{}: epoch {} out of range, using clock", city, n);
                now()
            }
        },
        Some(other) => {
            tracing::debug!("{}: discarding non-text timestamp {}", city, other);
            now()
        }
    };

    Reading {
        city:  city.to_string(),
        aqi:   parse_optional_float(raw.get("aqi")),
        pm25:  parse_optional_float(raw.get("pm25")),
        pm10:  parse_optional_float(raw.get("pm10")),
        co:    parse_optional_float(raw.get("co")),
        no2:   parse_optional_float(raw.get("no2")),
        so2:   parse_optional_float(raw.get("so2")),
        o3:    parse_optional_float(raw.get("o3")),
        timestamp,
    }
}

/// Unix seconds (fraction dropped) as RFC 3339 UTC.
fn epoch_to_rfc3339(n: &serde_json::Number) -> Option<String> {
    let secs = n.as_i64().or_else(|| {
        n.as_f64()
            .filter(|f| f.is_finite() && f.abs() < i64::MAX as f64)
            .map(|f| f.trunc() as i64)
    })?;
    DateTime::from_timestamp(secs, 0).map(|dt| dt.to_rfc3339_opts(SecondsFormat::Secs, true))
}
