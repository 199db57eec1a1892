//! Service configuration loaded from environment variables.
//!
//! Follows 12-factor style: all settings come from environment variables
//! (or a `.env` file via `dotenvy`). Every setting has a default, so an
//! empty environment yields a working local configuration.
//!
//! | Variable                   | Default                  |
//! |----------------------------|--------------------------|
//! | `LISTEN_ADDR`              | `0.0.0.0:3000`           |
//! | `REDIS_URL`                | `redis://127.0.0.1:6379` |
//! | `REDIS_CONNECT_TIMEOUT_MS` | `500`                    |
//! | `FETCH_CONCURRENCY`        | `16`                     |
//! | `REQUEST_TIMEOUT_SECS`     | `15`                     |
//! | `PARTNER_DIRECTORY_KEY`    | `partners`               |
//! | `REWARD_CATALOG`           | built-in catalog         |
//! | `LOG_FORMAT`               | `text`                   |

use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

use crate::domain::RewardCatalog;
use crate::domain::keys::DEFAULT_PARTNER_DIRECTORY_KEY;
use crate::service::record_loader::DEFAULT_FETCH_CONCURRENCY;

/// Errors raised while reading the configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// `LISTEN_ADDR` is not a socket address.
    #[error("invalid LISTEN_ADDR {value:?}: {source}")]
    InvalidListenAddr {
        /// Value as found in the environment.
        value: String,
        /// Parse failure.
        #[source]
        source: std::net::AddrParseError,
    },

    /// `REWARD_CATALOG` is not a JSON array of rewards.
    #[error("invalid REWARD_CATALOG: {0}")]
    InvalidRewardCatalog(#[source] serde_json::Error),
}

/// Output format of the log subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// Human-readable lines.
    #[default]
    Text,
    /// One JSON object per event.
    Json,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "text" | "pretty" | "" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            other => Err(format!("unknown log format: {other}")),
        }
    }
}

/// Top-level service configuration.
///
/// Loaded once at startup via [`LedgerConfig::from_env`].
#[derive(Debug, Clone)]
pub struct LedgerConfig {
    /// Socket address to bind the HTTP server to (e.g. `0.0.0.0:3000`).
    pub listen_addr: SocketAddr,

    /// Redis connection URL.
    pub redis_url: String,

    /// Milliseconds to wait for each Redis connection attempt.
    pub redis_connect_timeout_ms: u64,

    /// Store reads kept in flight per request.
    pub fetch_concurrency: usize,

    /// Seconds before an HTTP request is aborted.
    pub request_timeout_secs: u64,

    /// Key of the set listing every partner id.
    pub partner_directory_key: String,

    /// Rewards customers can redeem points for.
    pub reward_catalog: RewardCatalog,

    /// Log output format.
    pub log_format: LogFormat,
}

impl LedgerConfig {
    /// Loads configuration from environment variables.
    ///
    /// Falls back to defaults when a variable is not set.
    /// Calls `dotenvy::dotenv().ok()` to optionally load a `.env` file.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if `LISTEN_ADDR` or `REWARD_CATALOG` is
    /// set but cannot be parsed.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary variable source.
    ///
    /// # Errors
    ///
    /// Same as [`LedgerConfig::from_env`].
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let listen_raw = lookup("LISTEN_ADDR").unwrap_or_else(|| "0.0.0.0:3000".to_string());
        let listen_addr = listen_raw
            .parse()
            .map_err(|source| ConfigError::InvalidListenAddr {
                value: listen_raw.clone(),
                source,
            })?;

        let redis_url =
            lookup("REDIS_URL").unwrap_or_else(|| "redis://127.0.0.1:6379".to_string());

        let reward_catalog = match lookup("REWARD_CATALOG").filter(|v| !v.trim().is_empty()) {
            Some(raw) => {
                RewardCatalog::from_json(&raw).map_err(ConfigError::InvalidRewardCatalog)?
            }
            None => RewardCatalog::default(),
        };

        let partner_directory_key = lookup("PARTNER_DIRECTORY_KEY")
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| DEFAULT_PARTNER_DIRECTORY_KEY.to_string());

        Ok(Self {
            listen_addr,
            redis_url,
            redis_connect_timeout_ms: parse_env(&lookup, "REDIS_CONNECT_TIMEOUT_MS", 500),
            fetch_concurrency: parse_env(&lookup, "FETCH_CONCURRENCY", DEFAULT_FETCH_CONCURRENCY)
                .max(1),
            request_timeout_secs: parse_env(&lookup, "REQUEST_TIMEOUT_SECS", 15),
            partner_directory_key,
            reward_catalog,
            log_format: parse_env(&lookup, "LOG_FORMAT", LogFormat::Text),
        })
    }

    /// Redis connection timeout as a [`Duration`].
    #[must_use]
    pub const fn redis_connect_timeout(&self) -> Duration {
        Duration::from_millis(self.redis_connect_timeout_ms)
    }

    /// HTTP request timeout as a [`Duration`].
    #[must_use]
    pub const fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

/// Parses a variable as `T`, returning `default` on missing or invalid
/// values.
fn parse_env<F, T>(lookup: &F, key: &str, default: T) -> T
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(key) {
        Some(raw) => raw.trim().parse().unwrap_or_else(|_| {
            tracing::warn!(key, value = %raw, "ignoring unparseable setting");
            default
        }),
        None => default,
    }
}
