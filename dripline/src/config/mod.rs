//! Worker configuration.
//!
//! Loaded from `dripline.toml` merged with `DRIPLINE_`-prefixed environment
//! variables (`__` separates nesting levels). Every section has serde
//! defaults so a partial file is enough.
//!
//! # Example configuration
//!
//! ```toml
//! [database]
//! url = "postgres://localhost/dripline"
//! max_connections = 5
//!
//! [worker]
//! poll_interval_ms = 500
//! queue_capacity = 10000
//! retry_base_ms = 1000
//!
//! [providers.default]
//! type = "smtp"
//! host = "smtp.example.com"
//! port = 587
//! username = "outreach@example.com"
//! password = "secret"
//!
//! [providers."founder@example.com"]
//! type = "gmail"
//! user = "founder@example.com"
//! client_id = "..."
//! client_secret = "..."
//! refresh_token = "..."
//! ```

use figment::providers::{Env, Format, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::email::ProviderSettings;

/// Database settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseSettings {
    /// Postgres connection URL.
    pub url: String,
    /// Pool size.
    pub max_connections: u32,
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        Self {
            url: "postgres://localhost/dripline".to_string(),
            max_connections: default_max_connections(),
        }
    }
}

const fn default_max_connections() -> u32 {
    5
}

/// Queue runner settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkerSettings {
    /// How often each runner polls its queue, in milliseconds.
    pub poll_interval_ms: u64,
    /// Maximum jobs waiting per queue.
    pub queue_capacity: usize,
    /// First-retry backoff, in milliseconds; doubles per attempt.
    pub retry_base_ms: u64,
}

impl Default for WorkerSettings {
    fn default() -> Self {
        Self {
            poll_interval_ms: 500,
            queue_capacity: 10_000,
            retry_base_ms: 1_000,
        }
    }
}

/// Complete worker configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Database settings.
    pub database: DatabaseSettings,
    /// Queue runner settings.
    pub worker: WorkerSettings,
    /// Email providers keyed by sender account identifier. The entry named
    /// `default` is the fallback for unknown accounts.
    pub providers: HashMap<String, ProviderSettings>,
}

impl Config {
    /// Load configuration from `dripline.toml` and the environment.
    pub fn load() -> anyhow::Result<Self> {
        Self::from_figment(
            Figment::new()
                .merge(Toml::file("dripline.toml"))
                .merge(Env::prefixed("DRIPLINE_").split("__")),
        )
    }

    fn from_figment(figment: Figment) -> anyhow::Result<Self> {
        Ok(figment.extract()?)
    }
}
