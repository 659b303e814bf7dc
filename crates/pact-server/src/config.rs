//! Configuration for the registration server.

use anyhow::{Context, Result};
use registration_number::{AllocationStrategy, DEFAULT_MAX_ATTEMPTS, DEFAULT_PREFIX};
use serde::Deserialize;
use std::path::PathBuf;

/// Server configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Server configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// Record storage configuration
    #[serde(default)]
    pub store: StoreConfig,

    /// Registration number configuration
    #[serde(default)]
    pub registration: RegistrationConfig,

    /// Rate limiting configuration
    #[serde(default)]
    pub rate_limit: RateLimitConfig,

    /// Logging configuration
    #[serde(default)]
    pub log: LogConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Server listen address
    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,

    /// Server port
    #[serde(default = "default_port")]
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StoreConfig {
    /// Path to the JSON snapshot
    #[serde(default = "default_store_path")]
    pub path: PathBuf,

    /// Enable persistence (if false, records are in-memory only)
    #[serde(default = "default_true")]
    pub persist: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RegistrationConfig {
    /// Registration number prefix
    #[serde(default = "default_prefix")]
    pub prefix: String,

    /// How numbers are allocated: transaction, sequence or scan
    #[serde(default)]
    pub strategy: AllocationStrategy,

    /// Insert attempts before a number conflict is reported
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Accept new registrations
    #[serde(default = "default_true")]
    pub open: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RateLimitConfig {
    /// Global requests per minute
    #[serde(default = "default_global_rpm")]
    pub global_per_minute: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LogConfig {
    /// Log level
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Emit JSON log lines
    #[serde(default)]
    pub json: bool,
}

// Default implementations
impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: default_listen_addr(),
            port: default_port(),
        }
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: default_store_path(),
            persist: true,
        }
    }
}

impl Default for RegistrationConfig {
    fn default() -> Self {
        Self {
            prefix: default_prefix(),
            strategy: AllocationStrategy::default(),
            max_attempts: default_max_attempts(),
            open: true,
        }
    }
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            global_per_minute: default_global_rpm(),
        }
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

// Default value functions
fn default_listen_addr() -> String {
    "0.0.0.0".into()
}

fn default_port() -> u16 {
    8080
}

fn default_store_path() -> PathBuf {
    PathBuf::from("/data/registrations.json")
}

fn default_true() -> bool {
    true
}

fn default_prefix() -> String {
    DEFAULT_PREFIX.into()
}

fn default_max_attempts() -> u32 {
    DEFAULT_MAX_ATTEMPTS
}

fn default_global_rpm() -> u32 {
    60
}

fn default_log_level() -> String {
    "info".into()
}

impl Config {
    /// Load configuration from environment variables.
    pub fn load() -> Result<Self> {
        // Load .env file if present
        dotenvy::dotenv().ok();

        let config = config::Config::builder()
            .add_source(
                config::Environment::default()
                    .separator("__")
                    .try_parsing(false),
            )
            .build()
            .context("Failed to build configuration")?;

        config
            .try_deserialize()
            .context("Failed to deserialize configuration")
    }
}
