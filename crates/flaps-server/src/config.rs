//! Server configuration: `.env` first, then environment variables.

use std::net::SocketAddr;

use serde::Deserialize;

/// Runtime configuration for the Flaps server.
///
/// Field names map directly onto the environment variables named in the
/// external-interfaces contract: `DATABASE_URL`, `CACHE_URL`,
/// `WORKSPACE_API_URL`. No further configuration is part of the core.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Address the HTTP listener binds to.
    #[serde(default = "default_bind_addr")]
    pub bind_addr: SocketAddr,
    /// PostgreSQL or SQLite connection string.
    pub database_url: String,
    /// Redis connection string for the flag cache. Caching is disabled if absent.
    pub cache_url: Option<String>,
    /// Base URL of the Workspace API (project/tenant source of truth).
    pub workspace_api_url: Option<String>,
    /// TTL, in seconds, for cached flag lists.
    #[serde(default = "default_cache_ttl_secs")]
    pub cache_ttl_secs: u64,
    /// Subscriber buffer capacity for the in-process change bus.
    #[serde(default = "default_change_bus_capacity")]
    pub change_bus_capacity: usize,
    /// Poll interval, in seconds, for the scheduled enable/disable tick loop.
    #[serde(default = "default_scheduler_tick_secs")]
    pub scheduler_tick_secs: u64,
}

fn default_bind_addr() -> SocketAddr {
    "0.0.0.0:8080".parse().expect("hardcoded address is valid")
}

fn default_cache_ttl_secs() -> u64 {
    300
}

fn default_change_bus_capacity() -> usize {
    256
}

fn default_scheduler_tick_secs() -> u64 {
    10
}

impl ServerConfig {
    /// Loads configuration from `.env`, an optional `config/server.toml`, then
    /// environment variables, in that order of increasing precedence.
    pub fn load() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let settings = config::Config::builder()
            .set_default("bind_addr", "0.0.0.0:8080")?
            .set_default("cache_ttl_secs", 300i64)?
            .set_default("change_bus_capacity", 256i64)?
            .set_default("scheduler_tick_secs", 10i64)?
            .add_source(config::File::with_name("config/server").required(false))
            .add_source(config::Environment::default())
            .build()?;

        Ok(settings.try_deserialize()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_bind_addr_parses() {
        assert_eq!(default_bind_addr().port(), 8080);
    }

    #[test]
    fn test_load_picks_up_database_url_from_env() {
        std::env::set_var("DATABASE_URL", "sqlite::memory:");
        let config = ServerConfig::load().expect("config should load from env");
        assert_eq!(config.database_url, "sqlite::memory:");
        assert_eq!(config.cache_ttl_secs, 300);
        std::env::remove_var("DATABASE_URL");
    }
}
