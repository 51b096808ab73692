//! # rf-config
//!
//! Layered runtime settings: built-in defaults, an optional TOML file,
//! `FORUM__SECTION__KEY` environment variables and the legacy
//! `COUCHDB_DSN` / `COUCHDB_DB` variables, later layers winning.

use std::path::{Path, PathBuf};
use std::time::Duration;

use config::{Config, ConfigError, Environment, File, FileFormat, Map};
use secrecy::SecretString;
use serde::Deserialize;
use thiserror::Error;

/// File picked up from the working directory when no path is given.
pub const DEFAULT_FILE: &str = "forum.toml";

/// Loads `.env` from the working directory or its parents into the process
/// environment. A missing file is `Ok(None)`; an unreadable or malformed
/// one is returned so the caller can report it once logging is up.
pub fn load_env_file() -> Result<Option<PathBuf>, dotenvy::Error> {
    env_file_outcome(dotenvy::dotenv())
}

fn env_file_outcome(loaded: Result<PathBuf, dotenvy::Error>) -> Result<Option<PathBuf>, dotenvy::Error> {
    match loaded {
        Ok(path) => Ok(Some(path)),
        Err(e) if e.not_found() => Ok(None),
        Err(e) => Err(e),
    }
}

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("failed to load settings: {0}")]
    Load(#[from] ConfigError),

    #[error("invalid setting {key}: {reason}")]
    Invalid { key: &'static str, reason: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    Memory,
    #[serde(alias = "couch")]
    CouchDb,
}

#[derive(Debug, Deserialize)]
pub struct CouchSettings {
    pub url: String,
    pub database: String,
    pub username: Option<String>,
    pub password: Option<SecretString>,
    pub timeout_secs: u64,
}

impl CouchSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Deserialize)]
pub struct StoreSettings {
    pub max_retries: u32,
}

#[derive(Debug, Deserialize)]
pub struct LogSettings {
    pub filter: String,
    pub json: bool,
}

#[derive(Debug, Deserialize)]
pub struct Settings {
    pub backend: BackendKind,
    pub couchdb: CouchSettings,
    pub store: StoreSettings,
    pub log: LogSettings,
}

impl Settings {
    /// Layers `path` (or `forum.toml` if present) and the process
    /// environment over the defaults. Call `load_env_file` first to pick up
    /// a `.env` file.
    pub fn load(path: Option<&Path>) -> Result<Self, SettingsError> {
        let file = match path {
            Some(path) => File::from(path).required(true),
            None => File::with_name(DEFAULT_FILE).required(false),
        };
        let env: Map<String, String> = std::env::vars().collect();
        Self::build(Some(file), env)
    }

    /// Parses settings from TOML text alone, without the environment.
    pub fn from_toml_str(toml: &str) -> Result<Self, SettingsError> {
        Self::build(Some(File::from_str(toml, FileFormat::Toml)), Map::new())
    }

    fn build<F>(file: Option<F>, env: Map<String, String>) -> Result<Self, SettingsError>
    where
        F: config::Source + Send + Sync + 'static,
    {
        let legacy_url = env.get("COUCHDB_DSN").cloned();
        let legacy_db = env.get("COUCHDB_DB").cloned();

        let mut builder = Config::builder()
            .set_default("backend", "memory")?
            .set_default("couchdb.url", "http://localhost:5984")?
            .set_default("couchdb.database", "forum")?
            .set_default("couchdb.timeout_secs", 10)?
            .set_default("store.max_retries", 3)?
            .set_default("log.filter", "info")?
            .set_default("log.json", false)?;

        if let Some(file) = file {
            builder = builder.add_source(file);
        }

        let settings: Settings = builder
            .add_source(
                Environment::with_prefix("FORUM")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true)
                    .source(Some(env)),
            )
            .set_override_option("couchdb.url", legacy_url)?
            .set_override_option("couchdb.database", legacy_db)?
            .build()?
            .try_deserialize()?;

        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<(), SettingsError> {
        if self.store.max_retries == 0 {
            return Err(SettingsError::Invalid {
                key: "store.max_retries",
                reason: "must be at least 1".into(),
            });
        }
        if self.couchdb.timeout_secs == 0 {
            return Err(SettingsError::Invalid {
                key: "couchdb.timeout_secs",
                reason: "must be at least 1".into(),
            });
        }
        if self.couchdb.database.trim().is_empty() {
            return Err(SettingsError::Invalid {
                key: "couchdb.database",
                reason: "must not be empty".into(),
            });
        }
        Ok(())
    }
}
