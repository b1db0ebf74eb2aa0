//! Configuration management for the Gistio server

use serde::Deserialize;
use std::env;
use std::time::Duration;

/// Configuration loading errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {name}: {value:?}")]
    InvalidValue { name: &'static str, value: String },
}

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub github: GitHubConfig,
    pub database: DatabaseConfig,
    pub cache: CacheConfig,
    pub mode: RunMode,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Upper bound for producing one response, upstream calls included
    pub request_timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GitHubConfig {
    pub api_url: String,
    pub client_id: String,
    pub client_secret: String,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CacheConfig {
    pub capacity: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunMode {
    Development,
    Production,
}

impl RunMode {
    pub fn is_production(self) -> bool {
        self == RunMode::Production
    }

    /// Default log filter when `RUST_LOG` is not set
    pub fn default_log_filter(self) -> &'static str {
        match self {
            RunMode::Development => "gistio_server=debug,tower_http=debug",
            RunMode::Production => "gistio_server=info,tower_http=info",
        }
    }

    fn from_env() -> Self {
        match env::var("APP_ENV").ok().as_deref() {
            Some("production") => RunMode::Production,
            Some("development") => RunMode::Development,
            _ if env::var_os("HEROKU").is_some() => RunMode::Production,
            _ => RunMode::Development,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 5000,
                request_timeout_secs: 30,
            },
            github: GitHubConfig {
                api_url: "https://api.github.com".to_string(),
                client_id: String::new(),
                client_secret: String::new(),
                timeout_secs: 10,
            },
            database: DatabaseConfig {
                url: "sqlite:./gistio.db".to_string(),
            },
            cache: CacheConfig { capacity: 1024 },
            mode: RunMode::Development,
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Config::default();

        Ok(Config {
            server: ServerConfig {
                host: env::var("SERVER_HOST").unwrap_or(defaults.server.host),
                port: parse_var("PORT", defaults.server.port)?,
                request_timeout_secs: parse_var(
                    "REQUEST_TIMEOUT_SECS",
                    defaults.server.request_timeout_secs,
                )?,
            },
            github: GitHubConfig {
                api_url: env::var("GITHUB_API_URL").unwrap_or(defaults.github.api_url),
                client_id: env::var("GITHUB_CLIENT_ID").unwrap_or_default(),
                client_secret: env::var("GITHUB_CLIENT_SECRET").unwrap_or_default(),
                timeout_secs: parse_var("UPSTREAM_TIMEOUT_SECS", defaults.github.timeout_secs)?,
            },
            database: DatabaseConfig {
                url: env::var("DATABASE_URL").unwrap_or(defaults.database.url),
            },
            cache: CacheConfig {
                capacity: parse_var("CACHE_CAPACITY", defaults.cache.capacity)?,
            },
            mode: RunMode::from_env(),
        })
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.server.request_timeout_secs)
    }
}

fn parse_var<T: std::str::FromStr>(name: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(name) {
        Ok(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidValue { name, value }),
        Err(_) => Ok(default),
    }
}
