//! Configuration management for the scrape service
//!
//! This module handles loading and validating configuration from environment
//! variables and command-line arguments.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use crate::engine::DEFAULT_TIME_BUDGET;

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// HTTP server configuration
    pub server: ServerConfig,

    /// Database configuration
    pub database: DatabaseConfig,

    /// Scraper configuration
    pub scraper: ScraperConfig,

    /// Logging configuration
    pub logging: LoggingConfig,
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Bind host
    pub host: String,

    /// Bind port
    pub port: u16,

    /// Enable permissive CORS
    pub enable_cors: bool,

    /// Enable per-request tracing
    pub enable_request_logging: bool,
}

/// Session store backend selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StoreBackend {
    /// Process-local store, records lost on restart
    Memory,

    /// PostgreSQL store
    Postgres,
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Store backend
    pub backend: StoreBackend,

    /// PostgreSQL connection string
    pub url: String,

    /// Maximum pool size
    pub pool_size: usize,
}

/// Scraper configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScraperConfig {
    /// Path to the selector schema JSON file
    pub schema_path: PathBuf,

    /// Wall-clock budget per session in seconds
    pub time_budget_secs: u64,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,

    /// Log format (text, json)
    pub format: String,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        let host = std::env::var("COMET_HOST").unwrap_or_else(|_| String::from("0.0.0.0"));

        let port = std::env::var("COMET_PORT")
            .ok()
            .and_then(|v| v.parse::<u16>().ok())
            .unwrap_or(8080);

        let enable_cors = std::env::var("COMET_ENABLE_CORS")
            .ok()
            .and_then(|v| v.parse::<bool>().ok())
            .unwrap_or(true);

        let enable_request_logging = std::env::var("COMET_REQUEST_LOGGING")
            .ok()
            .and_then(|v| v.parse::<bool>().ok())
            .unwrap_or(true);

        let backend = match std::env::var("COMET_STORE_BACKEND").as_deref() {
            Ok("memory") => StoreBackend::Memory,
            _ => StoreBackend::Postgres,
        };

        let url = std::env::var("POSTGRES_URL")
            .or_else(|_| std::env::var("DATABASE_URL"))
            .unwrap_or_else(|_| String::from("postgresql://localhost/comet"));

        let pool_size = std::env::var("COMET_DB_POOL_SIZE")
            .ok()
            .and_then(|v| v.parse::<usize>().ok())
            .unwrap_or(10);

        let schema_path = std::env::var("COMET_SCHEMA_PATH")
            .unwrap_or_else(|_| String::from("selectors.json"))
            .into();

        let time_budget_secs = std::env::var("COMET_TIME_BUDGET")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(DEFAULT_TIME_BUDGET.as_secs());

        let log_level = std::env::var("COMET_LOG_LEVEL").unwrap_or_else(|_| String::from("info"));

        let log_format = std::env::var("COMET_LOG_FORMAT").unwrap_or_else(|_| String::from("text"));

        Ok(Self {
            server: ServerConfig {
                host,
                port,
                enable_cors,
                enable_request_logging,
            },
            database: DatabaseConfig {
                backend,
                url,
                pool_size,
            },
            scraper: ScraperConfig {
                schema_path,
                time_budget_secs,
            },
            logging: LoggingConfig {
                level: log_level,
                format: log_format,
            },
        })
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        if self.database.pool_size == 0 {
            anyhow::bail!("pool_size must be greater than 0");
        }

        if self.scraper.time_budget_secs == 0 {
            anyhow::bail!("time_budget_secs must be greater than 0");
        }

        if self.server.host.parse::<std::net::IpAddr>().is_err() {
            anyhow::bail!("host must be a valid IP address: {}", self.server.host);
        }

        Ok(())
    }

    /// Get the per-session time budget as Duration
    #[must_use]
    pub fn time_budget(&self) -> Duration {
        Duration::from_secs(self.scraper.time_budget_secs)
    }
}

impl ServerConfig {
    /// Get the socket address to bind
    pub fn bind_address(&self) -> SocketAddr {
        let ip = self
            .host
            .parse()
            .unwrap_or(std::net::IpAddr::from([0, 0, 0, 0]));
        SocketAddr::new(ip, self.port)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: String::from("0.0.0.0"),
            port: 8080,
            enable_cors: true,
            enable_request_logging: true,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            database: DatabaseConfig {
                backend: StoreBackend::Postgres,
                url: String::from("postgresql://localhost/comet"),
                pool_size: 10,
            },
            scraper: ScraperConfig {
                schema_path: PathBuf::from("selectors.json"),
                time_budget_secs: DEFAULT_TIME_BUDGET.as_secs(),
            },
            logging: LoggingConfig {
                level: String::from("info"),
                format: String::from("text"),
            },
        }
    }
}
