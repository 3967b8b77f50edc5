// ============================================================
// Layer 3 - Reading Domain Type
// ============================================================
// One timestamped air-quality observation for one city.
//
// The seven measurements are all optional: the live API
// regularly omits pollutants or reports "-" for them, and
// such values are stored as NULL rather than rejected.
//
// Also home of `parse_optional_float`, the total coercion
// used by the collector for every numeric field.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::domain::error::{AqiError, Result};

/// Raw mapping returned by a fetcher, before coercion.
/// Recognised keys: aqi, pm25, pm10, co, no2, so2, o3, timestamp.
pub type RawReading = serde_json::Map<String, Value>;

/// Names of the numeric measurement columns, in storage order.
pub const MEASUREMENT_FIELDS: [&str; 7] = ["aqi", "pm25", "pm10", "co", "no2", "so2", "o3"];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reading {
    pub city:      String,
    pub aqi:       Option<f64>,
    pub pm25:      Option<f64>,
    pub pm10:      Option<f64>,
    pub co:        Option<f64>,
    pub no2:       Option<f64>,
    pub so2:       Option<f64>,
    pub o3:        Option<f64>,
    /// ISO-8601 string, compared lexically
    pub timestamp: String,
}

impl Reading {
    /// A reading with every measurement absent.
    pub fn new(city: impl Into<String>, timestamp: impl Into<String>) -> Self {
        Self {
            city:      city.into(),
            aqi:       None,
            pm25:      None,
            pm10:      None,
            co:        None,
            no2:       None,
            so2:       None,
            o3:        None,
            timestamp: timestamp.into(),
        }
    }

    /// Look up a measurement by column name.
    /// Returns None for unknown names as well as for null values.
    pub fn measurement(&self, name: &str) -> Option<f64> {
        match name {
            "aqi"  => self.aqi,
            "pm25" => self.pm25,
            "pm10" => self.pm10,
            "co"   => self.co,
            "no2"  => self.no2,
            "so2"  => self.so2,
            "o3"   => self.o3,
            _      => None,
        }
    }

    /// The measurements in MEASUREMENT_FIELDS order.
    pub fn measurements(&self) -> [Option<f64>; 7] {
        [self.aqi, self.pm25, self.pm10, self.co, self.no2, self.so2, self.o3]
    }

    /// Check the persisted-record invariants.
    pub fn validate(&self) -> Result<()> {
        if self.city.trim().is_empty() {
            return Err(AqiError::Validation("reading has an empty city".into()));
        }
        if self.timestamp.trim().is_empty() {
            return Err(AqiError::Validation(format!(
                "reading for '{}' has an empty timestamp",
                self.city
            )));
        }
        for (name, value) in MEASUREMENT_FIELDS.iter().zip(self.measurements()) {
            if let Some(v) = value {
                if !v.is_finite() {
                    return Err(AqiError::Validation(format!(
                        "reading for '{}' at {} has non-finite {name}: {v}",
                        self.city, self.timestamp
                    )));
                }
            }
        }
        Ok(())
    }
}

/// Best-effort numeric coercion.
///
/// Total over every JSON value:
///   - finite numbers map to themselves
///   - strings are trimmed and parsed, "-" or "" give None
///   - NaN/inf (from any source), null, bools, arrays and objects give None
pub fn parse_optional_float(raw: Option<&Value>) -> Option<f64> {
    let parsed = match raw? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    parsed.filter(|v| v.is_finite())
}

/// Decimal-comma aware parsing for CSV cells ("2,6" -> 2.6).
/// Same totality as `parse_optional_float`.
pub fn parse_decimal_comma(cell: &str) -> Option<f64> {
    let cell = cell.trim();
    if cell.is_empty() {
        return None;
    }
    cell.replace(',', ".")
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_optional_float_numbers() {
        assert_eq!(parse_optional_float(Some(&json!(42))), Some(42.0));
        assert_eq!(parse_optional_float(Some(&json!(3.5))), Some(3.5));
    }

    #[test]
    fn test_parse_optional_float_strings() {
        assert_eq!(parse_optional_float(Some(&json!(" 17.25 "))), Some(17.25));
        assert_eq!(parse_optional_float(Some(&json!("-"))), None);
        assert_eq!(parse_optional_float(Some(&json!(""))), None);
        assert_eq!(parse_optional_float(Some(&json!("NaN"))), None);
        assert_eq!(parse_optional_float(Some(&json!("inf"))), None);
    }

    #[test]
    fn test_parse_optional_float_other_shapes() {
        assert_eq!(parse_optional_float(None), None);
        assert_eq!(parse_optional_float(Some(&Value::Null)), None);
        assert_eq!(parse_optional_float(Some(&json!(true))), None);
        assert_eq!(parse_optional_float(Some(&json!([1, 2]))), None);
        assert_eq!(parse_optional_float(Some(&json!({"v": 1}))), None);
    }

    #[test]
    fn test_parse_decimal_comma() {
        assert_eq!(parse_decimal_comma("2,6"), Some(2.6));
        assert_eq!(parse_decimal_comma("1360"), Some(1360.0));
        assert_eq!(parse_decimal_comma("  "), None);
        assert_eq!(parse_decimal_comma("n/a"), None);
    }

    #[test]
    fn test_measurement_lookup() {
        let mut r = Reading::new("tehran", "2024-01-01T00:00:00Z");
        r.pm25 = Some(80.0);
        assert_eq!(r.measurement("pm25"), Some(80.0));
        assert_eq!(r.measurement("aqi"), None);
        assert_eq!(r.measurement("city"), None);
    }

    #[test]
    fn test_validate_rejects_bad_fields() {
        assert!(Reading::new("tehran", "2024-01-01T00:00:00Z").validate().is_ok());
        assert!(matches!(
            Reading::new("", "2024-01-01T00:00:00Z").validate(),
            Err(AqiError::Validation(_))
        ));
        assert!(matches!(
            Reading::new("tehran", " ").validate(),
            Err(AqiError::Validation(_))
        ));

        let mut r = Reading::new("tehran", "2024-01-01T00:00:00Z");
        r.o3 = Some(f64::NAN);
        assert!(matches!(r.validate(), Err(AqiError::Validation(_))));
    }
}
