// ============================================================
// Layer 4 - Historical Dataset Loader
// ============================================================
// Reads the UCI Air Quality CSV into an untyped RawTable.
//
// File format quirks:
//   - fields are separated by ';'
//   - decimals use ',' ("2,6" means 2.6)
//   - every line ends with ";;", which shows up as one or
//     two trailing columns with an empty header
//   - the file ends with a block of fully empty rows
//
// Nothing is interpreted here. Cells stay strings so the
// preprocessor can decide what survives.

use std::{fs::File, path::Path};

use crate::domain::error::{AqiError, Result};

/// Header plus string cells, exactly as found in the file.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawTable {
    pub headers: Vec<String>,
    pub rows:    Vec<Vec<String>>,
}

impl RawTable {
    pub fn new(headers: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        Self { headers, rows }
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    /// Cell lookup that treats short rows as having empty cells.
    pub fn cell(&self, row: usize, col: usize) -> &str {
        self.rows
            .get(row)
            .and_then(|r| r.get(col))
            .map(String::as_str)
            .unwrap_or("")
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }
}

/// Loads a semicolon-delimited file from disk.
pub struct CsvLoader {
    delimiter: u8,
}

impl CsvLoader {
    /// Loader configured for the UCI format.
    pub fn new() -> Self {
        Self { delimiter: b';' }
    }

    pub fn load(&self, path: &Path) -> Result<RawTable> {
        if !path.exists() {
            return Err(AqiError::FileNotFound(path.to_path_buf()));
        }

        let file = File::open(path)?;
        let table = self.read_from(file)?;

        tracing::info!(
            "Loaded {} rows x {} columns from '{}'",
            table.rows.len(),
            table.headers.len(),
            path.display()
        );
        Ok(table)
    }

    /// Parse from any reader. Used by `load` and by tests.
    pub fn read_from<R: std::io::Read>(&self, reader: R) -> Result<RawTable> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .delimiter(self.delimiter)
            .has_headers(true)
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(reader);

        let headers: Vec<String> = csv_reader
            .headers()?
            .iter()
            .map(str::to_string)
            .collect();

        let mut rows = Vec::new();
        for record in csv_reader.records() {
            let record = record?;
            rows.push(record.iter().map(str::to_string).collect());
        }

        Ok(RawTable::new(headers, rows))
    }
}

impl Default for CsvLoader {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_is_file_not_found() {
        let err = CsvLoader::new()
            .load(Path::new("definitely/not/here.csv"))
            .unwrap_err();
        assert!(matches!(err, AqiError::FileNotFound(_)));
    }

    #[test]
    fn test_reads_semicolon_fields() {
        let text = "Date;Time;CO(GT);PT08.S1(CO);;\n\
                    10/03/2004;18.00.00;2,6;1360;;\n";
        let table = CsvLoader::new().read_from(text.as_bytes()).unwrap();

        assert_eq!(table.headers, vec!["Date", "Time", "CO(GT)", "PT08.S1(CO)", "", ""]);
        assert_eq!(table.row_count(), 1);
        assert_eq!(table.cell(0, 2), "2,6");
        assert_eq!(table.column_index("PT08.S1(CO)"), Some(3));
    }

    #[test]
    fn test_short_rows_read_as_empty_cells() {
        let text = "Date;Time;CO(GT)\n;;\n10/03/2004\n";
        let table = CsvLoader::new().read_from(text.as_bytes()).unwrap();
        assert_eq!(table.row_count(), 2);
        assert_eq!(table.cell(1, 2), "");
        assert_eq!(table.cell(9, 0), "");
    }

    #[test]
    fn test_load_from_disk() {
        let dir  = tempfile::tempdir().unwrap();
        let path = dir.path().join("air.csv");
        std::fs::write(&path, "Date;Time\n10/03/2004;18.00.00\n").unwrap();

        let table = CsvLoader::new().load(&path).unwrap();
        assert_eq!(table.row_count(), 1);
    }
}
