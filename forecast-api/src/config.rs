//! Server configuration loaded from environment variables

use std::env;
use std::fmt::Display;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use forecast_services::{CreationLimits, DEFAULT_MAX_PAYLOAD_BYTES, DEFAULT_READ_TIMEOUT_SECS};

/// Configuration for the API server
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Address to bind
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Directory served under `/static`
    pub static_dir: PathBuf,
    /// Largest accepted creation payload in bytes
    pub max_payload_bytes: usize,
    /// Bound on reading a request body
    pub read_timeout: Duration,
    /// SQLite database file; `None` keeps items in memory
    pub store_db_path: Option<PathBuf>,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            port: default_port(),
            static_dir: PathBuf::from("elm/dist"),
            max_payload_bytes: DEFAULT_MAX_PAYLOAD_BYTES,
            read_timeout: Duration::from_secs(DEFAULT_READ_TIMEOUT_SECS),
            store_db_path: None,
        }
    }
}

impl ApiConfig {
    /// Load configuration from environment variables
    ///
    /// Reads:
    /// - SERVER_HOST, SERVER_PORT
    /// - STATIC_DIR
    /// - MAX_PAYLOAD_BYTES
    /// - BODY_READ_TIMEOUT_SECS
    /// - STORE_DB_PATH (unset for the in-memory store)
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let max_payload_bytes = parse_var(&lookup, "MAX_PAYLOAD_BYTES", defaults.max_payload_bytes)?;
        if max_payload_bytes == 0 {
            return Err(ConfigError::ZeroPayloadLimit);
        }

        let read_timeout_secs = parse_var(
            &lookup,
            "BODY_READ_TIMEOUT_SECS",
            defaults.read_timeout.as_secs(),
        )?;

        Ok(Self {
            host: parse_var(&lookup, "SERVER_HOST", defaults.host)?,
            port: parse_var(&lookup, "SERVER_PORT", defaults.port)?,
            static_dir: lookup("STATIC_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.static_dir),
            max_payload_bytes,
            read_timeout: Duration::from_secs(read_timeout_secs),
            store_db_path: lookup("STORE_DB_PATH")
                .filter(|p| !p.trim().is_empty())
                .map(PathBuf::from),
        })
    }

    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    /// Body limits handed to the creation service
    pub fn limits(&self) -> CreationLimits {
        CreationLimits {
            max_payload_bytes: self.max_payload_bytes,
            read_timeout: self.read_timeout,
        }
    }
}

fn default_port() -> u16 {
    8080
}

fn parse_var<F, T>(lookup: &F, key: &str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: Display,
{
    match lookup(key) {
        Some(value) => value.trim().parse().map_err(|e: T::Err| ConfigError::InvalidValue {
            field: key.to_string(),
            value,
            error: e.to_string(),
        }),
        None => Ok(default),
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {field} ({value:?}): {error}")]
    InvalidValue {
        field: String,
        value: String,
        error: String,
    },

    #[error("MAX_PAYLOAD_BYTES must be greater than zero")]
    ZeroPayloadLimit,
}
