//! Live readings from the World Air Quality Index (aqicn.org) feed API.
//!
//! `GET {base}/feed/{city}/?token=...` answers with
//!
//! ```json
//! { "status": "ok",
//!   "data": { "aqi": 153,
//!             "iaqi": { "pm25": { "v": 153 }, "o3": { "v": 21.4 } },
//!             "time": { "iso": "2024-05-01T15:00:00+03:30" } } }
//! ```
//!
//! which is flattened into the collector's raw mapping. Values
//! are passed through untouched; coercion is the collector's job.

use std::time::Duration;

use anyhow::{bail, Context, Result};
use chrono::{DateTime, SecondsFormat, Utc};
use reqwest::blocking::Client;
use serde::Deserialize;
use serde_json::Value;

use crate::domain::reading::RawReading;
use crate::domain::traits::ReadingFetcher;

pub const DEFAULT_BASE_URL: &str = "https://api.waqi.info";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(20);

/// Pollutant keys read from the `iaqi` block.
const POLLUTANTS: [&str; 6] = ["pm25", "pm10", "co", "no2", "so2", "o3"];

#[derive(Debug, Deserialize)]
struct FeedResponse {
    status: String,
    #[serde(default)]
    data:   Value,
}

pub struct AqicnClient {
    http:     Client,
    token:    String,
    base_url: String,
}

impl AqicnClient {
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be created.
    pub fn new(token: impl Into<String>) -> Result<Self> {
        Self::with_base_url(token, DEFAULT_BASE_URL)
    }

    pub fn with_base_url(token: impl Into<String>, base_url: impl Into<String>) -> Result<Self> {
        let http = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            http,
            token:    token.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }
}

impl ReadingFetcher for AqicnClient {
    fn fetch(&self, city: &str) -> Result<RawReading> {
        let url = format!("{}/feed/{}/", self.base_url, city);

        let response: FeedResponse = self
            .http
            .get(&url)
            .query(&[("token", self.token.as_str())])
            .send()
            .with_context(|| format!("Request for '{city}' failed"))?
            .error_for_status()?
            .json()
            .with_context(|| format!("Unexpected response body for '{city}'"))?;

        if response.status != "ok" {
            bail!("API status '{}': {}", response.status, response.data);
        }

        flatten_feed(&response.data)
    }
}

/// Turn the `data` object of a feed response into a raw reading.
pub fn flatten_feed(data: &Value) -> Result<RawReading> {
    let Some(obj) = data.as_object() else {
        bail!("feed data is not an object: {data}");
    };

    let mut raw = RawReading::new();
    if let Some(aqi) = obj.get("aqi") {
        raw.insert("aqi".into(), aqi.clone());
    }

    if let Some(iaqi) = obj.get("iaqi").and_then(Value::as_object) {
        for key in POLLUTANTS {
            if let Some(v) = iaqi.get(key).and_then(|entry| entry.get("v")) {
                raw.insert(key.into(), v.clone());
            }
        }
    }

    if let Some(iso) = obj
        .get("time")
        .and_then(|t| t.get("iso"))
        .and_then(Value::as_str)
    {
        raw.insert("timestamp".into(), Value::String(normalize_timestamp(iso)));
    }

    Ok(raw)
}

/// Station times carry a local offset; store them in UTC so that
/// lexical order matches chronological order. Unparseable values
/// are kept as they are.
fn normalize_timestamp(iso: &str) -> String {
    DateTime::parse_from_rfc3339(iso)
        .map(|t| t.with_timezone(&Utc).to_rfc3339_opts(SecondsFormat::Secs, true))
        .unwrap_or_else(|_| iso.to_string())
}
