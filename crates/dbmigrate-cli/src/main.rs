mod report;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use dbmigrate_config::{AppConfig, ConfigLoader};
use dbmigrate_db::SqliteDatabase;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "dbmigrate", version, about = "Apply versioned SQL migrations exactly once")]
struct Cli {
    /// Config file (YAML or TOML)
    #[arg(short, long, global = true, env = "DBMIGRATE_CONFIG")]
    config: Option<PathBuf>,

    /// Database file, overrides the config
    #[arg(long, global = true)]
    database: Option<PathBuf>,

    /// Migrations directory, overrides the config
    #[arg(long, global = true)]
    migrations_dir: Option<PathBuf>,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Apply all pending migrations
    Up,
    /// Show which migrations are applied and which are pending
    Status {
        #[arg(long)]
        json: bool,
    },
    /// Apply pending migrations, then print the status listing
    Init,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_json);

    let config = load_config(&cli)?;
    let migrations_dir = config.migrations.directory.clone();
    let mut db = SqliteDatabase::open(&config.database)
        .with_context(|| format!("failed to open {}", config.database.path.display()))?;

    match cli.command {
        Command::Up => {
            let summary = db
                .run_migrations(&migrations_dir)
                .context("failed to run migrations")?;
            println!("{}", report::render_summary(&summary, &migrations_dir));
        }
        Command::Status { json } => {
            let statuses = db
                .migration_status(&migrations_dir)
                .context("failed to get migration status")?;
            if json {
                println!("{}", report::render_status_json(&statuses)?);
            } else {
                print!("{}", report::render_status(&statuses));
            }
        }
        Command::Init => {
            db.run_migrations(&migrations_dir)
                .context("failed to run migrations")?;
            let statuses = db
                .migration_status(&migrations_dir)
                .context("failed to get migration status")?;
            print!("{}", report::render_status(&statuses));
            info!("database initialized successfully");
        }
    }

    db.close().context("failed to close database")?;
    Ok(())
}

fn load_config(cli: &Cli) -> Result<AppConfig> {
    let loader = match &cli.config {
        Some(path) => ConfigLoader::new(path),
        None => ConfigLoader::with_default_path(),
    };
    let mut config = loader
        .load()
        .with_context(|| format!("failed to load config from {}", loader.path().display()))?;

    apply_cli_overrides(cli, &mut config);
    Ok(config)
}

fn apply_cli_overrides(cli: &Cli, config: &mut AppConfig) {
    if let Some(path) = &cli.database {
        config.database.path = path.clone();
    }
    if let Some(dir) = &cli.migrations_dir {
        config.migrations.directory = dir.clone();
    }
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr);

    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}
