pub mod connection;
pub mod loader;
pub mod migrations;
pub mod observer;
pub mod runner;
pub mod sqlite;
pub mod tracker;

pub use connection::{MigrationConnection, MigrationTransaction};
pub use loader::load_migrations;
pub use migrations::{AppliedRecord, Migration, MigrationState, MigrationStatus, RunSummary};
pub use observer::{MigrationEvent, MigrationObserver, NoopObserver, SkipReason, TracingObserver};
pub use runner::MigrationRunner;
pub use sqlite::SqliteDatabase;
