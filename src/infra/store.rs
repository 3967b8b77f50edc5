// ============================================================
// Layer 6 - Reading Store (SQLite)
// ============================================================
// Durable, append-only table of readings.
//
// Schema:
//   aqi_readings(id INTEGER PRIMARY KEY AUTOINCREMENT,
//                city TEXT NOT NULL,
//                aqi, pm25, pm10, co, no2, so2, o3 REAL,
//                timestamp TEXT NOT NULL)
//   idx_aqi_city_time ON aqi_readings(city, timestamp)
//
// The file is opened in WAL mode with a busy timeout so a
// collector run and an inspection run can use it at the
// same time. Rows are never updated or deleted.

use std::{
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

use rusqlite::{params, Connection, Row};

use crate::domain::error::Result;
use crate::domain::reading::Reading;

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

const SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS aqi_readings (
        id        INTEGER PRIMARY KEY AUTOINCREMENT,
        city      TEXT NOT NULL,
        aqi       REAL,
        pm25      REAL,
        pm10      REAL,
        co        REAL,
        no2       REAL,
        so2       REAL,
        o3        REAL,
        timestamp TEXT NOT NULL
    );
    CREATE INDEX IF NOT EXISTS idx_aqi_city_time
        ON aqi_readings(city, timestamp);
";

const INSERT_READING: &str = "
    INSERT INTO aqi_readings (city, aqi, pm25, pm10, co, no2, so2, o3, timestamp)
    VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
";

const SELECT_COLUMNS: &str = "city, aqi, pm25, pm10, co, no2, so2, o3, timestamp";

// Greatest timestamp per city, lowest id among equal timestamps.
const LATEST_PER_CITY: &str = "
    SELECT r.city, r.aqi, r.pm25, r.pm10, r.co, r.no2, r.so2, r.o3, r.timestamp
    FROM aqi_readings r
    WHERE r.id = (
        SELECT r2.id
        FROM aqi_readings r2
        WHERE r2.city = r.city
        ORDER BY r2.timestamp DESC, r2.id ASC
        LIMIT 1
    )
    ORDER BY r.city ASC
";

pub struct ReadingStore {
    conn: Connection,
    path: PathBuf,
}

impl ReadingStore {
    /// Open (or create) the database file and make sure the schema exists.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(&path)?;
        conn.busy_timeout(BUSY_TIMEOUT)?;
        let mode: String =
            conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get(0))?;
        conn.pragma_update(None, "foreign_keys", true)?;
        tracing::debug!("Opened '{}' (journal_mode={})", path.display(), mode);

        let store = Self { conn, path };
        store.initialize()?;
        Ok(store)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Create the table and index if absent. Safe to call repeatedly.
    pub fn initialize(&self) -> Result<()> {
        self.conn.execute_batch(SCHEMA)?;
        Ok(())
    }

    /// Insert all readings in one transaction and return the number written.
    ///
    /// Every reading is validated before the transaction starts, so a
    /// bad record leaves the table untouched.
    pub fn append(&mut self, readings: &[Reading]) -> Result<usize> {
        if readings.is_empty() {
            return Ok(0);
        }
        for reading in readings {
            reading.validate()?;
        }

        let tx = self.conn.transaction()?;
        let mut written = 0usize;
        {
            let mut stmt = tx.prepare_cached(INSERT_READING)?;
            for r in readings {
                written += stmt.execute(params![
                    r.city, r.aqi, r.pm25, r.pm10, r.co, r.no2, r.so2, r.o3, r.timestamp
                ])?;
            }
        }
        tx.commit()?;

        tracing::debug!("Appended {} reading(s) to '{}'", written, self.path.display());
        Ok(written)
    }

    /// One reading per city: the most recent one, ordered by city name.
    pub fn latest_per_city(&self) -> Result<Vec<Reading>> {
        self.query_readings(LATEST_PER_CITY, [])
    }

    pub fn count(&self) -> Result<usize> {
        let n: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM aqi_readings", [], |row| row.get(0))?;
        Ok(n as usize)
    }

    /// The first `limit` readings in insertion order.
    pub fn head(&self, limit: usize) -> Result<Vec<Reading>> {
        let sql = format!("SELECT {SELECT_COLUMNS} FROM aqi_readings ORDER BY id ASC LIMIT ?1");
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        self.query_readings(&sql, [limit])
    }

    /// Every reading in insertion order.
    pub fn all(&self) -> Result<Vec<Reading>> {
        let sql = format!("SELECT {SELECT_COLUMNS} FROM aqi_readings ORDER BY id ASC");
        self.query_readings(&sql, [])
    }

    fn query_readings<P: rusqlite::Params>(&self, sql: &str, params: P) -> Result<Vec<Reading>> {
        let mut stmt = self.conn.prepare(sql)?;
        let rows = stmt
            .query_map(params, row_to_reading)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }
}

fn row_to_reading(row: &Row<'_>) -> rusqlite::Result<Reading> {
    Ok(Reading {
        city:      row.get(0)?,
        aqi:       row.get(1)?,
        pm25:      row.get(2)?,
        pm10:      row.get(3)?,
        co:        row.get(4)?,
        no2:       row.get(5)?,
        so2:       row.get(6)?,
        o3:        row.get(7)?,
        timestamp: row.get(8)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::error::AqiError;

    fn reading(city: &str, ts: &str, aqi: f64) -> Reading {
        let mut r = Reading::new(city, ts);
        r.aqi = Some(aqi);
        r
    }

    fn temp_store() -> (tempfile::TempDir, ReadingStore) {
        let dir   = tempfile::tempdir().unwrap();
        let store = ReadingStore::open(dir.path().join("db").join("aqi.sqlite")).unwrap();
        (dir, store)
    }

    fn schema_objects(store: &ReadingStore) -> (i64, i64) {
        let tables = store
            .conn
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = 'aqi_readings'",
                [],
                |r| r.get(0),
            )
            .unwrap();
        let indexes = store
            .conn
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type = 'index' AND name = 'idx_aqi_city_time'",
                [],
                |r| r.get(0),
            )
            .unwrap();
        (tables, indexes)
    }

    #[test]
    fn test_wal_mode_enabled() {
        let (_dir, store) = temp_store();
        let mode: String = store
            .conn
            .query_row("PRAGMA journal_mode", [], |r| r.get(0))
            .unwrap();
        assert_eq!(mode.to_lowercase(), "wal");
    }

    #[test]
    fn test_initialize_is_idempotent() {
        let (_dir, mut store) = temp_store();
        store.append(&[reading("tehran", "2024-01-01T00:00:00Z", 150.0)]).unwrap();

        store.initialize().unwrap();
        store.initialize().unwrap();

        assert_eq!(schema_objects(&store), (1, 1));
        assert_eq!(store.count().unwrap(), 1);
    }

    #[test]
    fn test_append_empty_returns_zero() {
        let (_dir, mut store) = temp_store();
        store.append(&[reading("tehran", "2024-01-01T00:00:00Z", 150.0)]).unwrap();

        assert_eq!(store.append(&[]).unwrap(), 0);
        assert_eq!(store.count().unwrap(), 1);
    }

    #[test]
    fn test_append_is_additive() {
        let (_dir, mut store) = temp_store();
        let first: Vec<Reading> = (0..3)
            .map(|i| reading("tehran", &format!("2024-01-0{}T00:00:00Z", i + 1), 100.0))
            .collect();
        let second: Vec<Reading> = (0..4)
            .map(|i| reading("ahvaz", &format!("2024-02-0{}T00:00:00Z", i + 1), 200.0))
            .collect();

        assert_eq!(store.append(&first).unwrap(), 3);
        assert_eq!(store.append(&second).unwrap(), 4);
        assert_eq!(store.count().unwrap(), 7);

        let all = store.all().unwrap();
        assert_eq!(all[..3], first[..]);
        assert_eq!(all[3..], second[..]);
    }

    #[test]
    fn test_invalid_reading_writes_nothing() {
        let (_dir, mut store) = temp_store();
        let mut bad = reading("tehran", "2024-01-02T00:00:00Z", 1.0);
        bad.pm25 = Some(f64::INFINITY);

        let err = store
            .append(&[reading("tehran", "2024-01-01T00:00:00Z", 1.0), bad])
            .unwrap_err();
        assert!(matches!(err, AqiError::Validation(_)));
        assert_eq!(store.count().unwrap(), 0);
    }

    #[test]
    fn test_latest_per_city() {
        let (_dir, mut store) = temp_store();
        store
            .append(&[
                reading("tehran", "2024-01-02T00:00:00Z", 160.0),
                reading("ahvaz", "2024-01-01T00:00:00Z", 90.0),
                reading("tehran", "2024-01-03T00:00:00Z", 170.0),
                reading("tehran", "2024-01-01T00:00:00Z", 150.0),
                reading("ahvaz", "2024-01-05T00:00:00Z", 95.0),
            ])
            .unwrap();
        store.append(&[reading("isfahan", "2023-12-31T23:00:00Z", 80.0)]).unwrap();

        let latest = store.latest_per_city().unwrap();
        let summary: Vec<(&str, &str, Option<f64>)> = latest
            .iter()
            .map(|r| (r.city.as_str(), r.timestamp.as_str(), r.aqi))
            .collect();

        assert_eq!(
            summary,
            vec![
                ("ahvaz", "2024-01-05T00:00:00Z", Some(95.0)),
                ("isfahan", "2023-12-31T23:00:00Z", Some(80.0)),
                ("tehran", "2024-01-03T00:00:00Z", Some(170.0)),
            ]
        );
    }

    #[test]
    fn test_latest_tie_break_is_first_inserted() {
        let (_dir, mut store) = temp_store();
        store
            .append(&[
                reading("mashhad", "2024-01-01T00:00:00Z", 1.0),
                reading("mashhad", "2024-01-01T00:00:00Z", 2.0),
            ])
            .unwrap();

        let latest = store.latest_per_city().unwrap();
        assert_eq!(latest.len(), 1);
        assert_eq!(latest[0].aqi, Some(1.0));
    }

    #[test]
    fn test_nulls_round_trip() {
        let (_dir, mut store) = temp_store();
        let r = Reading::new("ahvaz", "2024-01-01T00:00:00Z");
        store.append(std::slice::from_ref(&r)).unwrap();
        assert_eq!(store.head(10).unwrap(), vec![r]);
    }

    #[test]
    fn test_data_survives_reopen() {
        let dir  = tempfile::tempdir().unwrap();
        let path = dir.path().join("aqi.sqlite");
        {
            let mut store = ReadingStore::open(&path).unwrap();
            store.append(&[reading("tehran", "2024-01-01T00:00:00Z", 1.0)]).unwrap();
        }
        let store = ReadingStore::open(&path).unwrap();
        assert_eq!(store.count().unwrap(), 1);
        assert_eq!(schema_objects(&store), (1, 1));
    }

    #[test]
    fn test_second_connection_sees_committed_rows() {
        let dir        = tempfile::tempdir().unwrap();
        let path       = dir.path().join("aqi.sqlite");
        let mut writer = ReadingStore::open(&path).unwrap();
        let reader     = ReadingStore::open(&path).unwrap();

        writer.append(&[reading("tehran", "2024-01-01T00:00:00Z", 1.0)]).unwrap();
        assert_eq!(reader.count().unwrap(), 1);
    }

    #[test]
    fn test_head_limits_rows() {
        let (_dir, mut store) = temp_store();
        let rows: Vec<Reading> = (0..5)
            .map(|i| reading("tehran", &format!("2024-01-0{}T00:00:00Z", i + 1), i as f64))
            .collect();
        store.append(&rows).unwrap();

        let head = store.head(2).unwrap();
        assert_eq!(head, rows[..2].to_vec());
    }
}
