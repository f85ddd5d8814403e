use std::path::Path;
use std::time::Duration;

use chrono::{DateTime, Utc};
use dbmigrate_common::{Error, Result};
use dbmigrate_config::DatabaseConfig;
use rusqlite::Error::FromSqlConversionFailure;
use rusqlite::types::Type;
use rusqlite::{Connection, Transaction, params};
use tracing::{debug, info};

use crate::connection::{MigrationConnection, MigrationTransaction};
use crate::migrations::{AppliedRecord, CREATE_BOOKKEEPING_TABLE_SQL, MigrationStatus, RunSummary};
use crate::runner::MigrationRunner;

impl MigrationConnection for Connection {
    type Error = rusqlite::Error;
    type Transaction<'t> = Transaction<'t>;

    fn ensure_bookkeeping_table(&mut self) -> rusqlite::Result<()> {
        self.execute_batch(CREATE_BOOKKEEPING_TABLE_SQL)
    }

    fn applied_versions(&mut self) -> rusqlite::Result<Vec<i64>> {
        let mut stmt = self.prepare("SELECT version FROM schema_migrations ORDER BY version")?;
        let rows = stmt.query_map([], |row| row.get(0))?;
        rows.collect()
    }

    fn applied_records(&mut self) -> rusqlite::Result<Vec<AppliedRecord>> {
        let mut stmt = self.prepare(
            "SELECT version, name, applied_at FROM schema_migrations ORDER BY version",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok(AppliedRecord {
                version: row.get(0)?,
                name: row.get(1)?,
                applied_at: parse_datetime(2, row.get::<_, Option<String>>(2)?)?,
            })
        })?;
        rows.collect()
    }

    fn begin(&mut self) -> rusqlite::Result<Transaction<'_>> {
        self.transaction()
    }
}

impl MigrationTransaction for Transaction<'_> {
    type Error = rusqlite::Error;

    fn execute(&mut self, sql: &str) -> rusqlite::Result<()> {
        self.execute_batch(sql)
    }

    fn record_applied(&mut self, version: i64, name: &str) -> rusqlite::Result<()> {
        Connection::execute(
            self,
            "INSERT INTO schema_migrations (version, name) VALUES (?1, ?2)",
            params![version, name],
        )?;
        Ok(())
    }

    fn commit(self) -> rusqlite::Result<()> {
        Transaction::commit(self)
    }

    fn rollback(self) -> rusqlite::Result<()> {
        Transaction::rollback(self)
    }
}

/// An open SQLite database configured from [`DatabaseConfig`].
pub struct SqliteDatabase {
    conn: Connection,
}

impl SqliteDatabase {
    pub fn open(config: &DatabaseConfig) -> Result<Self> {
        info!("opening database at {}", config.path.display());
        let conn = Connection::open(&config.path)
            .map_err(|e| Error::Database(format!("failed to open database: {e}")))?;

        let db = Self { conn };
        db.configure(config)?;
        db.ping()?;
        Ok(db)
    }

    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()
            .map_err(|e| Error::Database(format!("failed to open in-memory database: {e}")))?;

        let db = Self { conn };
        db.ping()?;
        Ok(db)
    }

    fn configure(&self, config: &DatabaseConfig) -> Result<()> {
        self.conn
            .busy_timeout(Duration::from_millis(config.busy_timeout_ms))
            .map_err(|e| Error::Database(format!("failed to set busy timeout: {e}")))?;

        let foreign_keys = if config.foreign_keys { "ON" } else { "OFF" };
        self.conn
            .execute_batch(&format!(
                "PRAGMA journal_mode={}; PRAGMA foreign_keys={foreign_keys};",
                config.journal_mode.as_pragma()
            ))
            .map_err(|e| Error::Database(format!("failed to set pragmas: {e}")))?;
        Ok(())
    }

    fn ping(&self) -> Result<()> {
        self.conn
            .query_row("SELECT 1", [], |row| row.get::<_, i64>(0))
            .map_err(|e| Error::Database(format!("failed to ping database: {e}")))?;
        debug!("database connection verified");
        Ok(())
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    pub fn connection_mut(&mut self) -> &mut Connection {
        &mut self.conn
    }

    pub fn run_migrations(&mut self, dir: &Path) -> Result<RunSummary> {
        MigrationRunner::new(&mut self.conn).run(dir)
    }

    pub fn migration_status(&mut self, dir: &Path) -> Result<Vec<MigrationStatus>> {
        MigrationRunner::new(&mut self.conn).status(dir)
    }

    pub fn close(self) -> Result<()> {
        self.conn
            .close()
            .map_err(|(_, e)| Error::Database(format!("failed to close database: {e}")))
    }
}

/// Decode an `applied_at` column. NULL stays `None`; text in neither RFC 3339
/// nor `CURRENT_TIMESTAMP` form is a conversion error.
fn parse_datetime(column: usize, s: Option<String>) -> rusqlite::Result<Option<DateTime<Utc>>> {
    let Some(s) = s else {
        return Ok(None);
    };
    if let Ok(dt) = DateTime::parse_from_rfc3339(&s) {
        return Ok(Some(dt.with_timezone(&Utc)));
    }
    // CURRENT_TIMESTAMP produces "YYYY-MM-DD HH:MM:SS"
    chrono::NaiveDateTime::parse_from_str(&s, "%Y-%m-%d %H:%M:%S")
        .map(|naive| Some(naive.and_utc()))
        .map_err(|e| FromSqlConversionFailure(column, Type::Text, Box::new(e)))
}

#[cfg(test)]
mod tests {
    use chrono::{Datelike, Timelike};

    use super::*;

    #[test]
    fn parses_sqlite_timestamp() {
        let dt = parse_datetime(2, Some("2024-03-05 10:20:30".into()))
            .unwrap()
            .unwrap();
        assert_eq!((dt.year(), dt.month(), dt.day()), (2024, 3, 5));
        assert_eq!((dt.hour(), dt.minute(), dt.second()), (10, 20, 30));
    }

    #[test]
    fn parses_rfc3339_timestamp() {
        let dt = parse_datetime(2, Some("2024-03-05T10:20:30+02:00".into()))
            .unwrap()
            .unwrap();
        assert_eq!(dt.hour(), 8);
    }

    #[test]
    fn null_timestamp_is_none() {
        assert_eq!(parse_datetime(2, None).unwrap(), None);
    }

    #[test]
    fn unparseable_timestamp_is_a_conversion_error() {
        let err = parse_datetime(2, Some("garbage".into())).unwrap_err();
        assert!(matches!(err, FromSqlConversionFailure(2, Type::Text, _)));
    }

    #[test]
    fn bookkeeping_table_creation_is_idempotent() {
        let mut conn = Connection::open_in_memory().unwrap();
        conn.ensure_bookkeeping_table().unwrap();
        conn.ensure_bookkeeping_table().unwrap();
        assert!(conn.applied_versions().unwrap().is_empty());
    }

    #[test]
    fn records_are_visible_after_commit() {
        let mut conn = Connection::open_in_memory().unwrap();
        conn.ensure_bookkeeping_table().unwrap();

        let mut tx = conn.begin().unwrap();
        MigrationTransaction::execute(&mut tx, "CREATE TABLE t (id INTEGER);").unwrap();
        tx.record_applied(1, "001_init").unwrap();
        MigrationTransaction::commit(tx).unwrap();

        let records = conn.applied_records().unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].version, 1);
        assert_eq!(records[0].name, "001_init");
        assert!(records[0].applied_at.is_some());
    }

    #[test]
    fn dropped_transaction_rolls_back() {
        let mut conn = Connection::open_in_memory().unwrap();
        conn.ensure_bookkeeping_table().unwrap();

        {
            let mut tx = conn.begin().unwrap();
            tx.record_applied(1, "001_init").unwrap();
        }

        assert!(conn.applied_versions().unwrap().is_empty());
    }

    #[test]
    fn duplicate_record_violates_primary_key() {
        let mut conn = Connection::open_in_memory().unwrap();
        conn.ensure_bookkeeping_table().unwrap();

        let mut tx = conn.begin().unwrap();
        tx.record_applied(1, "001_init").unwrap();
        assert!(tx.record_applied(1, "001_init").is_err());
    }

    #[test]
    fn open_applies_configured_pragmas() {
        let dir = tempfile::tempdir().unwrap();
        let config = DatabaseConfig {
            path: dir.path().join("app.db"),
            ..Default::default()
        };

        let db = SqliteDatabase::open(&config).unwrap();
        let mode: String = db
            .connection()
            .query_row("PRAGMA journal_mode", [], |row| row.get(0))
            .unwrap();
        assert_eq!(mode.to_lowercase(), "wal");

        let fk: i64 = db
            .connection()
            .query_row("PRAGMA foreign_keys", [], |row| row.get(0))
            .unwrap();
        assert_eq!(fk, 1);
        db.close().unwrap();
    }
}
