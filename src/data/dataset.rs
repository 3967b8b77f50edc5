use chrono::NaiveDateTime;

use crate::domain::reading::Reading;
use crate::domain::traits::FeatureTable;

/// One cleaned row: a parsed timestamp and one value per numeric column.
#[derive(Debug, Clone, PartialEq)]
pub struct DatasetRow {
    pub timestamp: NaiveDateTime,
    pub values:    Vec<Option<f64>>,
}

/// The cleaned historical dataset, sorted by timestamp.
/// Row positions are contiguous from 0.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AirQualityDataset {
    columns: Vec<String>,
    rows:    Vec<DatasetRow>,
}

impl AirQualityDataset {
    pub fn new(columns: Vec<String>, rows: Vec<DatasetRow>) -> Self {
        Self { columns, rows }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[DatasetRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

impl FeatureTable for AirQualityDataset {
    fn row_count(&self) -> usize {
        self.rows.len()
    }

    fn column(&self, name: &str) -> Option<Vec<Option<f64>>> {
        let idx = self.columns.iter().position(|c| c == name)?;
        Some(self.rows.iter().map(|r| r.values.get(idx).copied().flatten()).collect())
    }
}

/// Stored readings are a feature table over the measurement columns.
impl FeatureTable for [Reading] {
    fn row_count(&self) -> usize {
        self.len()
    }

    fn column(&self, name: &str) -> Option<Vec<Option<f64>>> {
        if !crate::domain::reading::MEASUREMENT_FIELDS.contains(&name) {
            return None;
        }
        Some(self.iter().map(|r| r.measurement(name)).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn ts(hour: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2004, 3, 10)
            .unwrap()
            .and_hms_opt(hour, 0, 0)
            .unwrap()
    }

    #[test]
    fn test_dataset_column_lookup() {
        let ds = AirQualityDataset::new(
            vec!["CO(GT)".into(), "PT08.S1(CO)".into()],
            vec![
                DatasetRow { timestamp: ts(18), values: vec![Some(2.6), Some(1360.0)] },
                DatasetRow { timestamp: ts(19), values: vec![Some(2.0), None] },
            ],
        );
        assert_eq!(ds.row_count(), 2);
        assert_eq!(ds.column("CO(GT)"), Some(vec![Some(2.6), Some(2.0)]));
        assert_eq!(ds.column("PT08.S1(CO)"), Some(vec![Some(1360.0), None]));
        assert_eq!(ds.column("NOx(GT)"), None);
    }

    #[test]
    fn test_reading_slice_columns() {
        let mut a = Reading::new("tehran", "2024-01-01T00:00:00Z");
        a.aqi = Some(120.0);
        let b = Reading::new("ahvaz", "2024-01-01T00:00:00Z");
        let readings = vec![a, b];

        let table: &[Reading] = &readings;
        assert_eq!(table.row_count(), 2);
        assert_eq!(table.column("aqi"), Some(vec![Some(120.0), None]));
        assert_eq!(table.column("city"), None);
    }
}
