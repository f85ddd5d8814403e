use std::collections::BTreeSet;

use dbmigrate_common::{Error, Result};

use crate::connection::MigrationConnection;
use crate::migrations::AppliedRecord;

/// Versions already recorded in `schema_migrations`.
///
/// The bookkeeping table must exist before this is called.
pub fn applied_versions<C: MigrationConnection>(conn: &mut C) -> Result<BTreeSet<i64>> {
    let versions = conn
        .applied_versions()
        .map_err(|e| Error::Database(format!("failed to get applied migrations: {e}")))?;
    Ok(versions.into_iter().collect())
}

pub fn applied_records<C: MigrationConnection>(conn: &mut C) -> Result<Vec<AppliedRecord>> {
    conn.applied_records()
        .map_err(|e| Error::Database(format!("failed to get applied migrations: {e}")))
}
