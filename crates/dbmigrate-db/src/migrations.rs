use std::fmt;

use chrono::{DateTime, Utc};
use serde::Serialize;

pub const CREATE_BOOKKEEPING_TABLE_SQL: &str = "
CREATE TABLE IF NOT EXISTS schema_migrations (
    version INTEGER PRIMARY KEY,
    name TEXT NOT NULL,
    applied_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP
);
";

/// A single versioned SQL file loaded from the migrations directory.
///
/// `name` is the file name without its `.sql` extension, so it still
/// carries the version prefix (`001_create_users`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Migration {
    pub version: i64,
    pub name: String,
    pub content: String,
}

/// A row of the bookkeeping table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AppliedRecord {
    pub version: i64,
    pub name: String,
    pub applied_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum MigrationState {
    Applied,
    Pending,
}

impl fmt::Display for MigrationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Applied => f.write_str("APPLIED"),
            Self::Pending => f.write_str("PENDING"),
        }
    }
}

/// One line of a status report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MigrationStatus {
    pub version: i64,
    pub name: String,
    pub state: MigrationState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub applied_at: Option<DateTime<Utc>>,
}

impl fmt::Display for MigrationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Version {}: {} [{}]", self.version, self.name, self.state)
    }
}

/// Outcome of a successful run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub applied: Vec<i64>,
    pub skipped: Vec<i64>,
}

impl RunSummary {
    pub fn is_noop(&self) -> bool {
        self.applied.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_line_format() {
        let status = MigrationStatus {
            version: 1,
            name: "001_init".into(),
            state: MigrationState::Applied,
            applied_at: None,
        };
        assert_eq!(status.to_string(), "Version 1: 001_init [APPLIED]");

        let status = MigrationStatus {
            state: MigrationState::Pending,
            ..status
        };
        assert_eq!(status.to_string(), "Version 1: 001_init [PENDING]");
    }

    #[test]
    fn status_serializes_state_uppercase() {
        let status = MigrationStatus {
            version: 2,
            name: "002_seed".into(),
            state: MigrationState::Pending,
            applied_at: None,
        };
        let json = serde_json::to_value(&status).unwrap();
        assert_eq!(json["state"], "PENDING");
        assert!(json.get("applied_at").is_none());
    }
}
