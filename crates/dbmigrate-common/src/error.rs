use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Step of a single migration's transaction that failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MigrationPhase {
    Begin,
    Execute,
    Record,
    Commit,
}

impl fmt::Display for MigrationPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let phase = match self {
            Self::Begin => "begin",
            Self::Execute => "execute",
            Self::Record => "record",
            Self::Commit => "commit",
        };
        f.write_str(phase)
    }
}

#[derive(Error, Debug)]
pub enum Error {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("database error: {0}")]
    Database(String),

    #[error("migration {version} ({name}) failed at {phase}: {cause}")]
    Migration {
        version: i64,
        name: String,
        phase: MigrationPhase,
        cause: String,
    },

    #[error("duplicate migration version {version}: {first} and {second}")]
    DuplicateVersion {
        version: i64,
        first: String,
        second: String,
    },

    #[error("io error at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl Error {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{Error, MigrationPhase};

    #[test]
    fn error_display_includes_context() {
        let e = Error::Config("bad yaml".into());
        assert_eq!(e.to_string(), "configuration error: bad yaml");

        let e = Error::Database("no such table: schema_migrations".into());
        assert_eq!(
            e.to_string(),
            "database error: no such table: schema_migrations"
        );

        let e = Error::Migration {
            version: 2,
            name: "002_bad".into(),
            phase: MigrationPhase::Execute,
            cause: "syntax error".into(),
        };
        assert_eq!(
            e.to_string(),
            "migration 2 (002_bad) failed at execute: syntax error"
        );
    }

    #[test]
    fn io_error_names_the_path() {
        let e = Error::io(
            "/tmp/migrations",
            std::io::Error::new(std::io::ErrorKind::NotFound, "missing"),
        );
        assert_eq!(e.to_string(), "io error at /tmp/migrations: missing");
    }
}
