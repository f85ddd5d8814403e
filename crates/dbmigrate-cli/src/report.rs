use std::path::Path;

use dbmigrate_db::{MigrationStatus, RunSummary};

/// Render the status listing: a header followed by one line per migration.
pub fn render_status(statuses: &[MigrationStatus]) -> String {
    let mut out = String::from("Migration Status:\n================\n");
    for status in statuses {
        out.push_str(&status.to_string());
        out.push('\n');
    }
    out
}

pub fn render_status_json(statuses: &[MigrationStatus]) -> dbmigrate_common::Result<String> {
    Ok(serde_json::to_string_pretty(statuses)?)
}

pub fn render_summary(summary: &RunSummary, migrations_dir: &Path) -> String {
    let dir = display_path(migrations_dir);
    if summary.is_noop() {
        return format!("Database is up to date ({dir})");
    }
    format!(
        "Applied {} migration{} from {dir} ({} already applied)",
        summary.applied.len(),
        if summary.applied.len() == 1 { "" } else { "s" },
        summary.skipped.len()
    )
}

fn display_path(path: &Path) -> String {
    let home = std::env::var("HOME").ok().filter(|h| !h.is_empty() && h != "/");
    match home.and_then(|h| path.strip_prefix(h).ok().map(Path::to_path_buf)) {
        Some(rest) => format!("~/{}", rest.display()),
        None => path.display().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use dbmigrate_db::MigrationState;

    use super::*;

    fn status(version: i64, name: &str, state: MigrationState) -> MigrationStatus {
        MigrationStatus {
            version,
            name: name.to_string(),
            state,
            applied_at: None,
        }
    }

    #[test]
    fn status_listing_has_header_and_one_line_per_migration() {
        let rendered = render_status(&[
            status(1, "001_init", MigrationState::Applied),
            status(2, "002_seed", MigrationState::Pending),
        ]);
        assert_eq!(
            rendered,
            "Migration Status:\n================\n\
             Version 1: 001_init [APPLIED]\n\
             Version 2: 002_seed [PENDING]\n"
        );
    }

    #[test]
    fn status_json_is_an_array() {
        let json = render_status_json(&[status(1, "001_init", MigrationState::Pending)]).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value[0]["version"], 1);
        assert_eq!(value[0]["state"], "PENDING");
    }

    #[test]
    fn summary_pluralizes() {
        let dir = Path::new("db/migrations");
        let one = RunSummary {
            applied: vec![3],
            skipped: vec![1, 2],
        };
        assert_eq!(
            render_summary(&one, dir),
            "Applied 1 migration from db/migrations (2 already applied)"
        );

        let none = RunSummary {
            applied: vec![],
            skipped: vec![1],
        };
        assert_eq!(
            render_summary(&none, dir),
            "Database is up to date (db/migrations)"
        );
    }
}
