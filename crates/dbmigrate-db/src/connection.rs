use std::fmt::Display;

use crate::migrations::AppliedRecord;

/// Caller-owned database handle the runner drives.
///
/// Implementations own the dialect: how the bookkeeping table is created and
/// queried, and how a row is inserted into it.
pub trait MigrationConnection {
    type Error: Display;
    type Transaction<'t>: MigrationTransaction<Error = Self::Error>
    where
        Self: 't;

    /// Create `schema_migrations` if it does not exist.
    fn ensure_bookkeeping_table(&mut self) -> Result<(), Self::Error>;

    fn applied_versions(&mut self) -> Result<Vec<i64>, Self::Error>;

    /// Bookkeeping rows ordered by version.
    fn applied_records(&mut self) -> Result<Vec<AppliedRecord>, Self::Error>;

    fn begin(&mut self) -> Result<Self::Transaction<'_>, Self::Error>;
}

/// One open transaction. Dropping it without `commit` must roll back.
pub trait MigrationTransaction {
    type Error: Display;

    /// Run a script of one or more statements verbatim.
    fn execute(&mut self, sql: &str) -> Result<(), Self::Error>;

    fn record_applied(&mut self, version: i64, name: &str) -> Result<(), Self::Error>;

    fn commit(self) -> Result<(), Self::Error>;

    fn rollback(self) -> Result<(), Self::Error>;
}
