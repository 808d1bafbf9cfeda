//! Handles settings for the application. Configuration is read from
//! `settings.toml` (optional) and from `FINBOARD__*` environment variables,
//! e.g. `FINBOARD__SERVER__PORT=8080`.
//!
//! See `settings.toml` for the configuration.
use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct App {
    #[serde(default = "default_level")]
    pub level: String,
}

impl Default for App {
    fn default() -> Self {
        Self {
            level: default_level(),
        }
    }
}

fn default_level() -> String {
    "info".to_string()
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Database {
    Memory,
    Sqlite(String),
}

#[derive(Debug, Deserialize)]
pub struct Server {
    pub bind: Option<String>,
    pub port: u16,
}

/// Rebuild worker pool. Every field falls back to the pool defaults.
#[derive(Debug, Default, Deserialize)]
pub struct Worker {
    pub concurrency: Option<usize>,
    pub max_attempts: Option<u32>,
    pub retry_after_secs: Option<u64>,
    pub backoff_secs: Option<u64>,
    pub poll_interval_ms: Option<u64>,
}

#[derive(Debug, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub app: App,
    pub database: Database,
    pub server: Option<Server>,
    pub worker: Option<Worker>,
}

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        let settings = Config::builder()
            .add_source(File::with_name("settings").required(false))
            .add_source(Environment::with_prefix("FINBOARD").separator("__"))
            .build()?;

        settings.try_deserialize()
    }
}
