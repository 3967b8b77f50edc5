// ============================================================
// Layer 6 - Offline Fetchers
// ============================================================
// Two ReadingFetcher implementations that need no network:
//
//   FixtureFetcher   - replays a recorded JSON file
//                      { "tehran": { "aqi": 153, ... }, ... }
//   SyntheticFetcher - deterministic pseudo-random readings,
//                      seeded per (seed, city)

use std::{collections::BTreeMap, fs, path::Path};

use anyhow::{anyhow, Context, Result};
use rand::{rngs::StdRng, Rng, SeedableRng};
use serde_json::{json, Value};

use crate::domain::reading::RawReading;
use crate::domain::traits::ReadingFetcher;

// ─── FixtureFetcher ───────────────────────────────────────────────────────────
pub struct FixtureFetcher {
    recorded: BTreeMap<String, RawReading>,
}

impl FixtureFetcher {
    pub fn new(recorded: BTreeMap<String, RawReading>) -> Self {
        Self { recorded }
    }

    /// Load recordings from a JSON object keyed by city.
    pub fn from_file(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("Cannot read fixture '{}'", path.display()))?;
        let recorded: BTreeMap<String, RawReading> = serde_json::from_str(&text)
            .with_context(|| format!("Fixture '{}' is not a city -> object map", path.display()))?;

        tracing::info!("Loaded {} recorded reading(s) from '{}'", recorded.len(), path.display());
        Ok(Self::new(recorded))
    }
}

impl ReadingFetcher for FixtureFetcher {
    fn fetch(&self, city: &str) -> Result<RawReading> {
        self.recorded
            .get(city)
            .cloned()
            .ok_or_else(|| anyhow!("no recorded reading"))
    }
}

// ─── SyntheticFetcher ─────────────────────────────────────────────────────────
pub struct SyntheticFetcher {
    seed: u64,
}

impl SyntheticFetcher {
    pub fn new(seed: u64) -> Self {
        Self { seed }
    }
}

impl ReadingFetcher for SyntheticFetcher {
    fn fetch(&self, city: &str) -> Result<RawReading> {
        let mut rng = StdRng::seed_from_u64(self.seed ^ fnv1a(city.as_bytes()));

        let pm25: f64 = rng.gen_range(5.0..250.0);
        let pm10: f64 = pm25 * rng.gen_range(1.1..1.8);
        let co:   f64 = rng.gen_range(0.5..15.0);
        let no2:  f64 = rng.gen_range(2.0..60.0);
        let so2:  f64 = rng.gen_range(1.0..30.0);
        let o3:   f64 = rng.gen_range(5.0..80.0);
        // loosely tied to the pollutants so a regression has signal
        let aqi = 0.8 * pm25 + 0.2 * pm10 + 1.5 * no2 + rng.gen_range(-5.0..5.0);

        let value = json!({
            "aqi":  round2(aqi),
            "pm25": round2(pm25),
            "pm10": round2(pm10),
            "co":   round2(co),
            "no2":  round2(no2),
            "so2":  round2(so2),
            "o3":   round2(o3),
        });

        match value {
            Value::Object(map) => Ok(map),
            _ => Err(anyhow!("synthetic reading is not an object")),
        }
    }
}

fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

/// FNV-1a, used to derive a stable per-city seed.
fn fnv1a(bytes: &[u8]) -> u64 {
    bytes.iter().fold(0xcbf2_9ce4_8422_2325, |hash, &b| {
        (hash ^ u64::from(b)).wrapping_mul(0x0000_0100_0000_01b3)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixture_fetcher_known_and_unknown_city() {
        let dir  = tempfile::tempdir().unwrap();
        let path = dir.path().join("fixture.json");
        fs::write(&path, r#"{ "tehran": { "aqi": 153, "pm25": "-" } }"#).unwrap();

        let fetcher = FixtureFetcher::from_file(&path).unwrap();
        let raw     = fetcher.fetch("tehran").unwrap();
        assert_eq!(raw.get("aqi"), Some(&json!(153)));
        assert!(fetcher.fetch("ahvaz").is_err());
    }

    #[test]
    fn test_fixture_rejects_wrong_shape() {
        let dir  = tempfile::tempdir().unwrap();
        let path = dir.path().join("fixture.json");
        fs::write(&path, "[1, 2, 3]").unwrap();
        assert!(FixtureFetcher::from_file(&path).is_err());
    }

    #[test]
    fn test_synthetic_is_deterministic_per_city() {
        let fetcher = SyntheticFetcher::new(42);
        assert_eq!(fetcher.fetch("tehran").unwrap(), fetcher.fetch("tehran").unwrap());
        assert_ne!(fetcher.fetch("tehran").unwrap(), fetcher.fetch("ahvaz").unwrap());

        let raw = fetcher.fetch("isfahan").unwrap();
        for key in ["aqi", "pm25", "pm10", "co", "no2", "so2", "o3"] {
            assert!(raw.get(key).and_then(Value::as_f64).is_some(), "missing {key}");
        }
    }
}
