//! Configuration Module
//!
//! Handles loading and managing service configuration from environment variables.

use std::env;
use std::str::FromStr;
use std::time::Duration;

// == Cache Config ==
/// Settings for the shared query cache.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheConfig {
    /// TTL applied when a call does not pass one
    pub default_ttl: Duration,
    /// Maximum number of entries the cache can hold
    pub max_entries: usize,
    /// Fixed follower wait; `None` derives it from the call's TTL
    pub follower_wait: Option<Duration>,
    /// Interval between expired-entry sweeps
    pub cleanup_interval: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            default_ttl: Duration::from_secs(30),
            max_entries: 256,
            follower_wait: None,
            cleanup_interval: Duration::from_secs(1),
        }
    }
}

// == Health Probe Config ==
/// Settings for the stale-if-error health indicator.
#[derive(Debug, Clone, PartialEq)]
pub struct HealthProbeConfig {
    /// How long a successful probe result is considered fresh
    pub ttl: Duration,
    /// How long a previous result keeps being served after a failed probe
    pub grace_period: Duration,
    /// Upper bound on a single probe
    pub probe_timeout: Duration,
}

impl Default for HealthProbeConfig {
    fn default() -> Self {
        Self {
            ttl: Duration::from_secs(15),
            grace_period: Duration::from_secs(5),
            probe_timeout: Duration::from_millis(2000),
        }
    }
}

// == Database Config ==
#[derive(Debug, Clone, PartialEq)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub connect_timeout: Duration,
    /// Timeout for statements that do not set their own
    pub statement_timeout: Duration,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "postgres://localhost/dashboard".to_string(),
            max_connections: 8,
            connect_timeout: Duration::from_secs(5),
            statement_timeout: Duration::from_millis(15_000),
        }
    }
}

// == Warmup Config ==
#[derive(Debug, Clone, PartialEq)]
pub struct WarmupConfig {
    pub enabled: bool,
    /// Stop starting new jobs once this much time has passed
    pub max_duration: Duration,
    /// `last_window` values to prime window-sensitive widgets with
    pub windows: Vec<String>,
}

impl Default for WarmupConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_duration: Duration::from_secs(30),
            windows: vec!["1h".to_string(), "24h".to_string(), "7d".to_string()],
        }
    }
}

// == Config ==
/// Service configuration.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub cache: CacheConfig,
    pub health: HealthProbeConfig,
    pub database: DatabaseConfig,
    pub warmup: WarmupConfig,
    /// HTTP server port
    pub server_port: u16,
    /// Widgets slower than this are logged; `None` disables the check
    pub slow_widget_threshold: Option<Duration>,
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `API_CACHE_TTL_SECONDS` - Default cache TTL (default: 30)
    /// - `API_CACHE_MAX_ENTRIES` - Maximum cache entries (default: 256)
    /// - `API_CACHE_FOLLOWER_WAIT_SECONDS` - Fixed follower wait (default: unset)
    /// - `CLEANUP_INTERVAL` - Expired-entry sweep interval in seconds (default: 1)
    /// - `HEALTH_STATUS_TTL_SECONDS` - Health indicator TTL (default: 15)
    /// - `HEALTH_STATUS_GRACE_SECONDS` - Stale health grace window (default: 5)
    /// - `HEALTH_STATUS_TIMEOUT_MS` - Health probe timeout (default: 2000)
    /// - `DATABASE_URL` - Postgres connection string
    /// - `DB_POOL_MAX` - Pool size (default: 8)
    /// - `DB_CONNECT_TIMEOUT_SECONDS` - Connection acquire timeout (default: 5)
    /// - `DB_STATEMENT_TIMEOUT_MS` - Default statement timeout (default: 15000)
    /// - `SERVER_PORT` - HTTP server port (default: 3000)
    /// - `API_PREWARM_ENABLED` - `1` to prime caches at startup (default: 1)
    /// - `API_PREWARM_MAX_SECONDS` - Warmup time budget (default: 30)
    /// - `API_PREWARM_WINDOWS` - Comma separated windows (default: `1h,24h,7d`)
    /// - `API_LOG_SLOW_WIDGETS` - `1` to log slow widgets (default: 0)
    /// - `API_SLOW_WIDGET_THRESHOLD_MS` - Slow widget threshold (default: 150)
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let cache = CacheConfig {
            default_ttl: env_secs("API_CACHE_TTL_SECONDS").unwrap_or(defaults.cache.default_ttl),
            max_entries: env_parse("API_CACHE_MAX_ENTRIES")
                .filter(|n: &usize| *n > 0)
                .unwrap_or(defaults.cache.max_entries),
            follower_wait: env_secs("API_CACHE_FOLLOWER_WAIT_SECONDS"),
            cleanup_interval: env_secs("CLEANUP_INTERVAL")
                .filter(|d| !d.is_zero())
                .unwrap_or(defaults.cache.cleanup_interval),
        };

        let health = HealthProbeConfig {
            ttl: env_secs("HEALTH_STATUS_TTL_SECONDS").unwrap_or(defaults.health.ttl),
            grace_period: env_secs("HEALTH_STATUS_GRACE_SECONDS")
                .unwrap_or(defaults.health.grace_period),
            probe_timeout: env_millis("HEALTH_STATUS_TIMEOUT_MS")
                .unwrap_or(defaults.health.probe_timeout),
        };

        let database = DatabaseConfig {
            url: env::var("DATABASE_URL").unwrap_or(defaults.database.url),
            max_connections: env_parse("DB_POOL_MAX").unwrap_or(defaults.database.max_connections),
            connect_timeout: env_secs("DB_CONNECT_TIMEOUT_SECONDS")
                .unwrap_or(defaults.database.connect_timeout),
            statement_timeout: env_millis("DB_STATEMENT_TIMEOUT_MS")
                .unwrap_or(defaults.database.statement_timeout),
        };

        let warmup = WarmupConfig {
            enabled: env_flag("API_PREWARM_ENABLED").unwrap_or(defaults.warmup.enabled),
            max_duration: env_secs("API_PREWARM_MAX_SECONDS")
                .unwrap_or(defaults.warmup.max_duration),
            windows: env::var("API_PREWARM_WINDOWS")
                .ok()
                .map(|raw| split_list(&raw))
                .filter(|windows| !windows.is_empty())
                .unwrap_or(defaults.warmup.windows),
        };

        let slow_widget_threshold = if env_flag("API_LOG_SLOW_WIDGETS").unwrap_or(false) {
            Some(env_millis("API_SLOW_WIDGET_THRESHOLD_MS").unwrap_or(Duration::from_millis(150)))
        } else {
            None
        };

        Self {
            cache,
            health,
            database,
            warmup,
            server_port: env_parse("SERVER_PORT").unwrap_or(3000),
            slow_widget_threshold,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            cache: CacheConfig::default(),
            health: HealthProbeConfig::default(),
            database: DatabaseConfig::default(),
            warmup: WarmupConfig::default(),
            server_port: 3000,
            slow_widget_threshold: None,
        }
    }
}

// == Env Helpers ==
fn env_parse<T: FromStr>(name: &str) -> Option<T> {
    env::var(name).ok().and_then(|v| v.trim().parse().ok())
}

/// Reads a (possibly fractional) number of seconds.
fn env_secs(name: &str) -> Option<Duration> {
    env_parse::<f64>(name).and_then(parse_secs)
}

/// Negative, non-finite and out-of-range values are rejected.
fn parse_secs(secs: f64) -> Option<Duration> {
    Duration::try_from_secs_f64(secs).ok()
}

fn env_millis(name: &str) -> Option<Duration> {
    env_parse::<u64>(name).map(Duration::from_millis)
}

fn env_flag(name: &str) -> Option<bool> {
    env::var(name).ok().map(|v| v.trim() == "1")
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect()
}
