use std::fmt;
use std::path::Path;

use dbmigrate_common::Error;
use tracing::{info, warn};

use crate::migrations::{Migration, RunSummary};

/// Why the loader passed over a `.sql` file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum SkipReason {
    /// No `_` between version and name.
    MissingSeparator,
    /// Prefix before the first `_` is not a non-negative integer.
    InvalidVersion,
    NonUtf8Name,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingSeparator => f.write_str("invalid name format"),
            Self::InvalidVersion => f.write_str("invalid version number"),
            Self::NonUtf8Name => f.write_str("file name is not valid UTF-8"),
        }
    }
}

/// Decisions made while loading and applying migrations.
#[derive(Debug)]
pub enum MigrationEvent<'a> {
    FileSkipped {
        file_name: &'a str,
        reason: SkipReason,
    },
    NoMigrations {
        directory: &'a Path,
    },
    AlreadyApplied(&'a Migration),
    Applying(&'a Migration),
    Applied(&'a Migration),
    Failed {
        migration: &'a Migration,
        error: &'a Error,
    },
    RollbackFailed {
        migration: &'a Migration,
        cause: &'a str,
    },
    Completed(&'a RunSummary),
}

/// Receives every [`MigrationEvent`] the loader and runner emit.
pub trait MigrationObserver {
    fn on_event(&self, event: &MigrationEvent<'_>);
}

impl<F> MigrationObserver for F
where
    F: Fn(&MigrationEvent<'_>),
{
    fn on_event(&self, event: &MigrationEvent<'_>) {
        self(event)
    }
}

/// Default observer: writes each event to `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingObserver;

impl MigrationObserver for TracingObserver {
    fn on_event(&self, event: &MigrationEvent<'_>) {
        match event {
            MigrationEvent::FileSkipped { file_name, reason } => {
                warn!("skipping migration file {file_name}: {reason}");
            }
            MigrationEvent::NoMigrations { directory } => {
                info!("no migration files found in {}", directory.display());
            }
            MigrationEvent::AlreadyApplied(m) => {
                info!(
                    "migration {} ({}) already applied, skipping",
                    m.version, m.name
                );
            }
            MigrationEvent::Applying(m) => {
                info!("applying migration {}: {}", m.version, m.name);
            }
            MigrationEvent::Applied(m) => {
                info!("applied migration {}: {}", m.version, m.name);
            }
            MigrationEvent::Failed { migration, error } => {
                warn!("migration {} failed: {error}", migration.version);
            }
            MigrationEvent::RollbackFailed { migration, cause } => {
                warn!(
                    "rollback of migration {} failed: {cause}",
                    migration.version
                );
            }
            MigrationEvent::Completed(summary) => {
                info!(
                    applied = summary.applied.len(),
                    skipped = summary.skipped.len(),
                    "all migrations completed successfully"
                );
            }
        }
    }
}

/// Observer that drops every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopObserver;

impl MigrationObserver for NoopObserver {
    fn on_event(&self, _event: &MigrationEvent<'_>) {}
}
