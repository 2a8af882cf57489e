//! Configuration for the depth-sync service.
//!
//! This module provides the [`Config`] struct: which symbols to track, where
//! the exchange lives, and how the query endpoint and the engine behave.
//! Configuration is built in code with `with_*` methods or read from
//! `DEPTH_SYNC_*` environment variables via [`Config::from_env`].

use std::net::SocketAddr;
use std::time::Duration;

use url::Url;

use crate::error::Error;

/// Symbols tracked when none are configured
pub const DEFAULT_SYMBOLS: [&str; 3] = ["BTCUSDT", "ETHUSDT", "SOLUSDT"];

/// Exchange environment (production or testnet)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Environment {
    /// Production environment
    #[default]
    Production,
    /// Spot testnet
    Testnet,
}

impl Environment {
    /// Get the base URL for the REST API
    pub fn rest_base_url(&self) -> &'static str {
        match self {
            Environment::Production => "https://api.binance.com",
            Environment::Testnet => "https://testnet.binance.vision",
        }
    }

    /// Get the base URL for raw WebSocket streams
    pub fn websocket_url(&self) -> &'static str {
        match self {
            Environment::Production => "wss://stream.binance.com:9443",
            Environment::Testnet => "wss://stream.testnet.binance.vision",
        }
    }
}

/// Configuration for the depth-sync service
///
/// # Example
///
/// ```rust
/// use depth_sync::Config;
/// use depth_sync::config::Environment;
///
/// let config = Config::new(["btcusdt", "ethusdt"])
///     .with_environment(Environment::Testnet)
///     .with_view_depth(10);
///
/// assert_eq!(config.symbols(), ["BTCUSDT", "ETHUSDT"]);
/// assert!(config.rest_base_url().contains("testnet"));
/// ```
#[derive(Debug, Clone)]
pub struct Config {
    /// Tracked symbols, upper-case
    symbols: Vec<String>,

    /// REST base URL (snapshot endpoint host)
    rest_base_url: String,

    /// WebSocket base URL (raw depth streams)
    websocket_url: String,

    /// Address the query endpoint listens on
    listen_addr: SocketAddr,

    /// `limit` parameter sent with snapshot requests
    snapshot_limit: u32,

    /// Maximum levels per side returned by the query endpoint
    view_depth: usize,

    /// HTTP request timeout (bounds every snapshot fetch)
    timeout: Duration,

    /// Diffs kept per symbol while waiting for its first snapshot
    pending_capacity: usize,

    /// Interval of the book status log, `None` to disable
    status_interval: Option<Duration>,
}

impl Config {
    /// Create a configuration tracking the given symbols
    ///
    /// Symbols are normalized to upper case.
    pub fn new<I, S>(symbols: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let environment = Environment::default();
        Self {
            symbols: symbols
                .into_iter()
                .map(|s| s.as_ref().trim().to_uppercase())
                .filter(|s| !s.is_empty())
                .collect(),
            rest_base_url: environment.rest_base_url().to_string(),
            websocket_url: environment.websocket_url().to_string(),
            listen_addr: SocketAddr::from(([0, 0, 0, 0], 8081)),
            snapshot_limit: 1000,
            view_depth: 20,
            timeout: Duration::from_secs(10),
            pending_capacity: 1024,
            status_interval: Some(Duration::from_secs(5)),
        }
    }

    /// Read configuration from `DEPTH_SYNC_*` environment variables
    ///
    /// | Variable | Default |
    /// |---|---|
    /// | `DEPTH_SYNC_SYMBOLS` | `BTCUSDT,ETHUSDT,SOLUSDT` |
    /// | `DEPTH_SYNC_ENV` | `production` (or `testnet`) |
    /// | `DEPTH_SYNC_REST_URL` | per environment |
    /// | `DEPTH_SYNC_WS_URL` | per environment |
    /// | `DEPTH_SYNC_LISTEN` | `0.0.0.0:8081` |
    /// | `DEPTH_SYNC_SNAPSHOT_LIMIT` | `1000` |
    /// | `DEPTH_SYNC_VIEW_DEPTH` | `20` |
    /// | `DEPTH_SYNC_TIMEOUT_SECS` | `10` |
    /// | `DEPTH_SYNC_PENDING_CAPACITY` | `1024` |
    /// | `DEPTH_SYNC_STATUS_INTERVAL_SECS` | `5` (`0` disables) |
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if a variable is present but cannot be parsed,
    /// or if the resulting configuration fails [`Config::validate`].
    pub fn from_env() -> Result<Self, Error> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a configuration from an arbitrary key lookup
    ///
    /// This is what [`Config::from_env`] uses; tests pass a map instead of
    /// touching the process environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, Error>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = match lookup("DEPTH_SYNC_SYMBOLS") {
            Some(list) => Self::new(list.split(',')),
            None => Self::new(DEFAULT_SYMBOLS),
        };

        if let Some(env) = lookup("DEPTH_SYNC_ENV") {
            let environment = match env.to_lowercase().as_str() {
                "production" | "prod" => Environment::Production,
                "testnet" | "test" => Environment::Testnet,
                other => {
                    return Err(Error::Config(format!("unknown environment: {}", other)));
                }
            };
            config = config.with_environment(environment);
        }
        if let Some(url) = lookup("DEPTH_SYNC_REST_URL") {
            config = config.with_rest_base_url(url);
        }
        if let Some(url) = lookup("DEPTH_SYNC_WS_URL") {
            config = config.with_websocket_url(url);
        }
        if let Some(addr) = lookup("DEPTH_SYNC_LISTEN") {
            config = config.with_listen_addr(parse_var("DEPTH_SYNC_LISTEN", &addr)?);
        }
        if let Some(limit) = lookup("DEPTH_SYNC_SNAPSHOT_LIMIT") {
            config = config.with_snapshot_limit(parse_var("DEPTH_SYNC_SNAPSHOT_LIMIT", &limit)?);
        }
        if let Some(depth) = lookup("DEPTH_SYNC_VIEW_DEPTH") {
            config = config.with_view_depth(parse_var("DEPTH_SYNC_VIEW_DEPTH", &depth)?);
        }
        if let Some(secs) = lookup("DEPTH_SYNC_TIMEOUT_SECS") {
            let secs: u64 = parse_var("DEPTH_SYNC_TIMEOUT_SECS", &secs)?;
            config = config.with_timeout(Duration::from_secs(secs));
        }
        if let Some(capacity) = lookup("DEPTH_SYNC_PENDING_CAPACITY") {
            config =
                config.with_pending_capacity(parse_var("DEPTH_SYNC_PENDING_CAPACITY", &capacity)?);
        }
        if let Some(secs) = lookup("DEPTH_SYNC_STATUS_INTERVAL_SECS") {
            let secs: u64 = parse_var("DEPTH_SYNC_STATUS_INTERVAL_SECS", &secs)?;
            config = config.with_status_interval((secs > 0).then(|| Duration::from_secs(secs)));
        }

        config.validate()?;
        Ok(config)
    }

    /// Check the configuration for values the service cannot run with
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] for an empty symbol list, zero depth or
    /// timeout, or base URLs with the wrong scheme.
    pub fn validate(&self) -> Result<(), Error> {
        if self.symbols.is_empty() {
            return Err(Error::Config("no symbols configured".to_string()));
        }
        if self.view_depth == 0 {
            return Err(Error::Config("view depth must be positive".to_string()));
        }
        if self.snapshot_limit == 0 {
            return Err(Error::Config("snapshot limit must be positive".to_string()));
        }
        if self.timeout.is_zero() {
            return Err(Error::Config("timeout must be positive".to_string()));
        }

        let rest = Url::parse(&self.rest_base_url)?;
        if !matches!(rest.scheme(), "http" | "https") {
            return Err(Error::Config(format!(
                "REST URL must be http(s): {}",
                self.rest_base_url
            )));
        }
        let ws = Url::parse(&self.websocket_url)?;
        if !matches!(ws.scheme(), "ws" | "wss") {
            return Err(Error::Config(format!(
                "WebSocket URL must be ws(s): {}",
                self.websocket_url
            )));
        }
        Ok(())
    }

    /// Set the exchange environment (resets both base URLs)
    #[must_use]
    pub fn with_environment(mut self, environment: Environment) -> Self {
        self.rest_base_url = environment.rest_base_url().to_string();
        self.websocket_url = environment.websocket_url().to_string();
        self
    }

    /// Override the REST base URL
    #[must_use]
    pub fn with_rest_base_url(mut self, url: impl Into<String>) -> Self {
        self.rest_base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    /// Override the WebSocket base URL
    #[must_use]
    pub fn with_websocket_url(mut self, url: impl Into<String>) -> Self {
        self.websocket_url = url.into().trim_end_matches('/').to_string();
        self
    }

    /// Set the query endpoint listen address
    #[must_use]
    pub fn with_listen_addr(mut self, addr: SocketAddr) -> Self {
        self.listen_addr = addr;
        self
    }

    /// Set the snapshot `limit` parameter
    #[must_use]
    pub fn with_snapshot_limit(mut self, limit: u32) -> Self {
        self.snapshot_limit = limit;
        self
    }

    /// Set the maximum levels per side in a view
    #[must_use]
    pub fn with_view_depth(mut self, depth: usize) -> Self {
        self.view_depth = depth;
        self
    }

    /// Set the HTTP request timeout
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set how many early diffs are kept per symbol before its first snapshot
    #[must_use]
    pub fn with_pending_capacity(mut self, capacity: usize) -> Self {
        self.pending_capacity = capacity;
        self
    }

    /// Set the status log interval (`None` disables it)
    #[must_use]
    pub fn with_status_interval(mut self, interval: Option<Duration>) -> Self {
        self.status_interval = interval;
        self
    }

    /// Get the tracked symbols
    pub fn symbols(&self) -> &[String] {
        &self.symbols
    }

    /// Get the REST base URL
    pub fn rest_base_url(&self) -> &str {
        &self.rest_base_url
    }

    /// Get the WebSocket base URL
    pub fn websocket_url(&self) -> &str {
        &self.websocket_url
    }

    /// Get the listen address
    pub fn listen_addr(&self) -> SocketAddr {
        self.listen_addr
    }

    /// Get the snapshot `limit` parameter
    pub fn snapshot_limit(&self) -> u32 {
        self.snapshot_limit
    }

    /// Get the view depth
    pub fn view_depth(&self) -> usize {
        self.view_depth
    }

    /// Get the timeout duration
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Get the pending buffer capacity
    pub fn pending_capacity(&self) -> usize {
        self.pending_capacity
    }

    /// Get the status log interval
    pub fn status_interval(&self) -> Option<Duration> {
        self.status_interval
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new(DEFAULT_SYMBOLS)
    }
}

fn parse_var<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, Error> {
    value
        .trim()
        .parse()
        .map_err(|_| Error::Config(format!("invalid value for {}: {:?}", key, value)))
}
