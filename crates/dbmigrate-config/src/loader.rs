use std::path::{Path, PathBuf};

use dbmigrate_common::{Error, Result};
use tracing::{debug, info};

use crate::model::AppConfig;

pub const DATABASE_PATH_ENV: &str = "DBMIGRATE_DATABASE_PATH";
pub const MIGRATIONS_DIR_ENV: &str = "DBMIGRATE_MIGRATIONS_DIR";

/// Resolves an `AppConfig` from a YAML or TOML file plus environment overrides.
pub struct ConfigLoader {
    path: PathBuf,
}

impl ConfigLoader {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Loader pointed at `<config dir>/dbmigrate/config.yml`.
    pub fn with_default_path() -> Self {
        let base = dirs::config_dir().unwrap_or_else(|| PathBuf::from("."));
        Self::new(base.join("dbmigrate").join("config.yml"))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the config file (defaults if it does not exist), then apply
    /// `.env` and process environment overrides.
    pub fn load(&self) -> Result<AppConfig> {
        if let Ok(env_file) = dotenvy::dotenv() {
            debug!("loaded environment from {}", env_file.display());
        }
        self.load_with_env(|key| std::env::var(key).ok())
    }

    /// Like [`load`](Self::load), with variables resolved through `lookup`
    /// instead of the process environment.
    pub fn load_with_env(&self, lookup: impl Fn(&str) -> Option<String>) -> Result<AppConfig> {
        let mut config = if self.path.exists() {
            let config = parse_config_file(&self.path)?;
            info!("loaded config from {}", self.path.display());
            config
        } else {
            debug!(
                "no config file at {}, using defaults",
                self.path.display()
            );
            AppConfig::default()
        };

        apply_env_overrides(&mut config, lookup);
        Ok(config)
    }
}

pub fn parse_config_file(path: &Path) -> Result<AppConfig> {
    let contents = std::fs::read_to_string(path).map_err(|e| Error::io(path, e))?;

    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
    match ext {
        "yml" | "yaml" => serde_yaml::from_str(&contents)
            .map_err(|e| Error::Config(format!("YAML parse error in {}: {e}", path.display()))),
        "toml" => toml::from_str(&contents)
            .map_err(|e| Error::Config(format!("TOML parse error in {}: {e}", path.display()))),
        other => Err(Error::Config(format!(
            "unsupported config extension: {other}"
        ))),
    }
}

fn apply_env_overrides(config: &mut AppConfig, lookup: impl Fn(&str) -> Option<String>) {
    if let Some(path) = lookup(DATABASE_PATH_ENV).filter(|v| !v.is_empty()) {
        config.database.path = PathBuf::from(path);
    }
    if let Some(dir) = lookup(MIGRATIONS_DIR_ENV).filter(|v| !v.is_empty()) {
        config.migrations.directory = PathBuf::from(dir);
    }
}
