use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::error::ConfigError;

pub const DEFAULT_PORT: u16 = 8080;
pub const DEFAULT_MAX_MESSAGES: usize = 50;
pub const DEFAULT_RATE_WINDOW_SECS: f64 = 1.0;
pub const DEFAULT_RATE_CAPACITY: usize = 20;
pub const DEFAULT_MAX_REQUEST_BYTES: usize = 8192;
pub const DEFAULT_WEB_ROOT: &str = "wwwroot";
pub const DEFAULT_CONNECTION_TIMEOUT_SECS: u64 = 30;

/// Truncation bounds applied to request and message fields, in bytes.
pub mod limits {
    pub const METHOD: usize = 15;
    pub const PATH: usize = 255;
    pub const RAW_USERNAME: usize = 255;
    pub const RAW_MESSAGE: usize = 1023;
    pub const STORED_USER: usize = 63;
    pub const STORED_TEXT: usize = 299;
}

/// Startup configuration for the chat server.
#[derive(Debug, Clone, PartialEq)]
pub struct ServerConfig {
    pub port: u16,
    pub max_messages: usize,
    pub rate_window: Duration,
    pub rate_capacity: usize,
    /// Size of the single-receive request buffer. One byte is reserved, so
    /// at most `max_request_bytes - 1` bytes of a request are ever parsed.
    pub max_request_bytes: usize,
    pub web_root: PathBuf,
    pub connection_timeout: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            max_messages: DEFAULT_MAX_MESSAGES,
            rate_window: Duration::from_secs_f64(DEFAULT_RATE_WINDOW_SECS),
            rate_capacity: DEFAULT_RATE_CAPACITY,
            max_request_bytes: DEFAULT_MAX_REQUEST_BYTES,
            web_root: PathBuf::from(DEFAULT_WEB_ROOT),
            connection_timeout: Duration::from_secs(DEFAULT_CONNECTION_TIMEOUT_SECS),
        }
    }
}

impl ServerConfig {
    /// Build a configuration from `KISSCHAT_*` environment variables, falling
    /// back to the defaults for anything unset.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`ServerConfig::from_env`] but reads values through `lookup`.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let rate_window_secs: f64 =
            parse_var(&lookup, "KISSCHAT_RATE_WINDOW_SECS", DEFAULT_RATE_WINDOW_SECS)?;
        let rate_window = Duration::try_from_secs_f64(rate_window_secs)
            .ok()
            .filter(|window| !window.is_zero())
            .ok_or(ConfigError::OutOfRange {
                setting: "rate_window",
                reason: "must be a positive number of seconds",
            })?;

        let config = Self {
            port: parse_var(&lookup, "KISSCHAT_PORT", defaults.port)?,
            max_messages: parse_var(&lookup, "KISSCHAT_MAX_MESSAGES", defaults.max_messages)?,
            rate_window,
            rate_capacity: parse_var(&lookup, "KISSCHAT_RATE_CAPACITY", defaults.rate_capacity)?,
            max_request_bytes: parse_var(
                &lookup,
                "KISSCHAT_MAX_REQUEST_BYTES",
                defaults.max_request_bytes,
            )?,
            web_root: lookup("KISSCHAT_WEB_ROOT")
                .map(PathBuf::from)
                .unwrap_or(defaults.web_root),
            connection_timeout: Duration::from_secs(parse_var(
                &lookup,
                "KISSCHAT_CONNECTION_TIMEOUT_SECS",
                DEFAULT_CONNECTION_TIMEOUT_SECS,
            )?),
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_messages == 0 {
            return Err(ConfigError::OutOfRange {
                setting: "max_messages",
                reason: "must be at least 1",
            });
        }
        if self.rate_capacity == 0 {
            return Err(ConfigError::OutOfRange {
                setting: "rate_capacity",
                reason: "must be at least 1",
            });
        }
        if self.rate_window.is_zero() {
            return Err(ConfigError::OutOfRange {
                setting: "rate_window",
                reason: "must be a positive number of seconds",
            });
        }
        // Room for at least "GET / ..." after the reserved byte.
        if self.max_request_bytes < 16 {
            return Err(ConfigError::OutOfRange {
                setting: "max_request_bytes",
                reason: "must be at least 16",
            });
        }
        if self.connection_timeout.is_zero() {
            return Err(ConfigError::OutOfRange {
                setting: "connection_timeout",
                reason: "must be at least 1 second",
            });
        }
        Ok(())
    }

    /// Number of bytes read from a connection in its single receive.
    pub fn receive_limit(&self) -> usize {
        self.max_request_bytes - 1
    }
}

fn parse_var<F, T>(lookup: &F, key: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(key) {
        Some(raw) => raw.trim().parse::<T>().map_err(|_| ConfigError::InvalidValue {
            key,
            value: raw,
        }),
        None => Ok(default),
    }
}
