use std::collections::HashMap;
use std::path::Path;

use dbmigrate_common::{Error, MigrationPhase, Result};

use crate::connection::{MigrationConnection, MigrationTransaction};
use crate::loader::load_migrations;
use crate::migrations::{Migration, MigrationState, MigrationStatus, RunSummary};
use crate::observer::{MigrationEvent, MigrationObserver, TracingObserver};
use crate::tracker;

/// Applies pending migrations from a directory, one transaction each.
///
/// The connection is borrowed from the caller for the runner's lifetime.
pub struct MigrationRunner<'a, C: MigrationConnection> {
    conn: &'a mut C,
    observer: Box<dyn MigrationObserver + 'a>,
}

impl<'a, C: MigrationConnection> MigrationRunner<'a, C> {
    pub fn new(conn: &'a mut C) -> Self {
        Self {
            conn,
            observer: Box::new(TracingObserver),
        }
    }

    pub fn with_observer(mut self, observer: impl MigrationObserver + 'a) -> Self {
        self.observer = Box::new(observer);
        self
    }

    /// Apply every migration in `dir` whose version is not yet recorded.
    ///
    /// Stops at the first failure; migrations committed before it stay
    /// committed and are skipped on the next run.
    pub fn run(&mut self, dir: &Path) -> Result<RunSummary> {
        self.conn
            .ensure_bookkeeping_table()
            .map_err(|e| Error::Database(format!("failed to create migrations table: {e}")))?;

        let migrations = load_migrations(dir, &*self.observer)?;
        let mut summary = RunSummary::default();
        if migrations.is_empty() {
            self.observer
                .on_event(&MigrationEvent::NoMigrations { directory: dir });
            return Ok(summary);
        }

        let applied = tracker::applied_versions(self.conn)?;

        for migration in &migrations {
            if applied.contains(&migration.version) {
                self.observer
                    .on_event(&MigrationEvent::AlreadyApplied(migration));
                summary.skipped.push(migration.version);
                continue;
            }

            self.observer.on_event(&MigrationEvent::Applying(migration));
            if let Err(error) = self.apply(migration) {
                self.observer.on_event(&MigrationEvent::Failed {
                    migration,
                    error: &error,
                });
                return Err(error);
            }
            self.observer.on_event(&MigrationEvent::Applied(migration));
            summary.applied.push(migration.version);
        }

        self.observer.on_event(&MigrationEvent::Completed(&summary));
        Ok(summary)
    }

    fn apply(&mut self, migration: &Migration) -> Result<()> {
        let mut tx = self
            .conn
            .begin()
            .map_err(|e| migration_error(migration, MigrationPhase::Begin, e))?;

        if let Err(e) = tx.execute(&migration.content) {
            let error = migration_error(migration, MigrationPhase::Execute, e);
            rollback(tx, migration, &*self.observer);
            return Err(error);
        }

        if let Err(e) = tx.record_applied(migration.version, &migration.name) {
            let error = migration_error(migration, MigrationPhase::Record, e);
            rollback(tx, migration, &*self.observer);
            return Err(error);
        }

        tx.commit()
            .map_err(|e| migration_error(migration, MigrationPhase::Commit, e))
    }

    /// Report each migration in `dir` as applied or pending. Read-only: the
    /// bookkeeping table is not created, so a fresh database yields a
    /// database error.
    pub fn status(&mut self, dir: &Path) -> Result<Vec<MigrationStatus>> {
        let migrations = load_migrations(dir, &*self.observer)?;
        let applied: HashMap<i64, _> = tracker::applied_records(self.conn)?
            .into_iter()
            .map(|record| (record.version, record.applied_at))
            .collect();

        Ok(migrations
            .into_iter()
            .map(|m| {
                let (state, applied_at) = match applied.get(&m.version) {
                    Some(applied_at) => (MigrationState::Applied, *applied_at),
                    None => (MigrationState::Pending, None),
                };
                MigrationStatus {
                    version: m.version,
                    name: m.name,
                    state,
                    applied_at,
                }
            })
            .collect())
    }
}

fn migration_error(
    migration: &Migration,
    phase: MigrationPhase,
    cause: impl std::fmt::Display,
) -> Error {
    Error::Migration {
        version: migration.version,
        name: migration.name.clone(),
        phase,
        cause: cause.to_string(),
    }
}

fn rollback<T: MigrationTransaction>(
    tx: T,
    migration: &Migration,
    observer: &dyn MigrationObserver,
) {
    if let Err(e) = tx.rollback() {
        let cause = e.to_string();
        observer.on_event(&MigrationEvent::RollbackFailed {
            migration,
            cause: &cause,
        });
    }
}
