use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const DEFAULT_DB_PATH: &str = "owl.db";
/// Scheduler tick cadence — coarser than the finest supported reminder
/// granularity (one minute), fine enough that nothing fires visibly late.
pub const DEFAULT_TICK_SECS: u64 = 30;
/// A dispatch slower than this counts as failed and is retried next tick.
pub const DEFAULT_DISPATCH_TIMEOUT_SECS: u64 = 10;

#[derive(Debug, Error)]
#[error("Configuration error: {0}")]
pub struct ConfigError(String);

/// Top-level config (owl.toml + OWL_* env overrides).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OwlConfig {
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub scheduler: SchedulerSettings,
    #[serde(default)]
    pub discord: DiscordConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Path to the SQLite file holding all reminder state.
    #[serde(default = "default_db_path")]
    pub path: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerSettings {
    /// Seconds between due scans.
    #[serde(default = "default_tick_secs")]
    pub tick_secs: u64,
    /// Per-dispatch wait bound in seconds.
    #[serde(default = "default_dispatch_timeout_secs")]
    pub dispatch_timeout_secs: u64,
}

impl Default for SchedulerSettings {
    fn default() -> Self {
        Self {
            tick_secs: default_tick_secs(),
            dispatch_timeout_secs: default_dispatch_timeout_secs(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DiscordConfig {
    /// Bot token for REST delivery. Empty disables Discord delivery.
    #[serde(default)]
    pub token: Option<String>,
}

impl OwlConfig {
    /// Load config from a TOML file with OWL_* env var overrides.
    ///
    /// Checks in order:
    ///   1. Explicit path argument
    ///   2. ~/.owl/owl.toml
    pub fn load(config_path: Option<&str>) -> Result<Self, ConfigError> {
        let path = config_path
            .map(String::from)
            .unwrap_or_else(default_config_path);

        let config: OwlConfig = Figment::new()
            .merge(Toml::file(&path))
            .merge(Env::prefixed("OWL_").split("_"))
            .extract()
            .map_err(|e| ConfigError(e.to_string()))?;

        Ok(config)
    }
}

fn default_config_path() -> String {
    let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
    format!("{}/.owl/owl.toml", home)
}

fn default_db_path() -> String {
    DEFAULT_DB_PATH.to_string()
}

fn default_tick_secs() -> u64 {
    DEFAULT_TICK_SECS
}

fn default_dispatch_timeout_secs() -> u64 {
    DEFAULT_DISPATCH_TIMEOUT_SECS
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sane() {
        let cfg = OwlConfig::default();
        assert_eq!(cfg.database.path, DEFAULT_DB_PATH);
        assert_eq!(cfg.scheduler.tick_secs, DEFAULT_TICK_SECS);
        assert!(cfg.discord.token.is_none());
    }

    #[test]
    fn missing_sections_fall_back_to_defaults() {
        let cfg: OwlConfig = serde_json::from_str("{}").expect("deserialize");
        assert_eq!(cfg.scheduler.dispatch_timeout_secs, DEFAULT_DISPATCH_TIMEOUT_SECS);
    }
}
