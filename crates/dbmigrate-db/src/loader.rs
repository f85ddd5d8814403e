use std::path::Path;

use dbmigrate_common::{Error, Result};

use crate::migrations::Migration;
use crate::observer::{MigrationEvent, MigrationObserver, SkipReason};

const MIGRATION_EXTENSION: &str = ".sql";

/// Read every `<version>_<name>.sql` file in `dir`, sorted by version.
///
/// Sub-directories and files with other extensions are ignored. Files that
/// end in `.sql` but do not follow the naming pattern are reported through
/// `observer` and skipped. Two files with the same version are an error.
pub fn load_migrations(dir: &Path, observer: &dyn MigrationObserver) -> Result<Vec<Migration>> {
    let entries = std::fs::read_dir(dir).map_err(|e| Error::io(dir, e))?;

    let mut migrations = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| Error::io(dir, e))?;
        let file_type = entry.file_type().map_err(|e| Error::io(entry.path(), e))?;
        if file_type.is_dir() {
            continue;
        }

        let os_name = entry.file_name();
        let Some(file_name) = os_name.to_str() else {
            if os_name.to_string_lossy().ends_with(MIGRATION_EXTENSION) {
                observer.on_event(&MigrationEvent::FileSkipped {
                    file_name: &os_name.to_string_lossy(),
                    reason: SkipReason::NonUtf8Name,
                });
            }
            continue;
        };
        let Some(name) = file_name.strip_suffix(MIGRATION_EXTENSION) else {
            continue;
        };

        let version = match parse_version(file_name) {
            Ok(version) => version,
            Err(reason) => {
                observer.on_event(&MigrationEvent::FileSkipped { file_name, reason });
                continue;
            }
        };

        let path = entry.path();
        let content = std::fs::read_to_string(&path).map_err(|e| Error::io(&path, e))?;

        migrations.push(Migration {
            version,
            name: name.to_string(),
            content,
        });
    }

    sort_migrations(&mut migrations)?;
    Ok(migrations)
}

/// Extract the version prefix from `001_create_users.sql`.
pub fn parse_version(file_name: &str) -> std::result::Result<i64, SkipReason> {
    let (prefix, _) = file_name
        .split_once('_')
        .ok_or(SkipReason::MissingSeparator)?;

    if prefix.is_empty() || !prefix.bytes().all(|b| b.is_ascii_digit()) {
        return Err(SkipReason::InvalidVersion);
    }
    prefix.parse().map_err(|_| SkipReason::InvalidVersion)
}

/// Stable sort by version, rejecting duplicates.
fn sort_migrations(migrations: &mut [Migration]) -> Result<()> {
    migrations.sort_by_key(|m| m.version);

    if let Some(pair) = migrations.windows(2).find(|w| w[0].version == w[1].version) {
        return Err(Error::DuplicateVersion {
            version: pair[0].version,
            first: pair[0].name.clone(),
            second: pair[1].name.clone(),
        });
    }
    Ok(())
}
