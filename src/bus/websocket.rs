//! Bridge from exchange depth WebSocket streams to a [`Transport`].
//!
//! Each tracked symbol gets its own raw stream connection
//! (`<ws_base>/ws/<symbol>@depth`). Text frames are forwarded unchanged to
//! `depth.<symbol>`; decoding and sequencing are left to the subscriber.
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use depth_sync::bus::websocket::{DepthStreamBridge, ReconnectConfig};
//! use depth_sync::bus::LocalBus;
//! use depth_sync::Config;
//!
//! # async fn example() -> depth_sync::Result<()> {
//! let config = Config::new(["BTCUSDT"]);
//! let bus = Arc::new(LocalBus::default());
//!
//! let bridge = DepthStreamBridge::new(&config, "BTCUSDT", ReconnectConfig::default())?;
//! tokio::spawn(bridge.run(bus));
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;
use std::time::Duration;

use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use tracing::{debug, info, warn};
use url::Url;

use crate::config::Config;
use crate::error::Error;

use super::{depth_topic, Transport};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Build the raw depth stream URL for `symbol`
///
/// # Errors
///
/// Returns [`Error::Config`] if the base URL does not parse.
pub fn depth_stream_url(base: &str, symbol: &str) -> Result<Url, Error> {
    let url = format!(
        "{}/ws/{}@depth",
        base.trim_end_matches('/'),
        symbol.to_lowercase()
    );
    Ok(Url::parse(&url)?)
}

/// A single connection to one raw depth stream
#[derive(Debug)]
pub struct DepthStreamClient {
    write: SplitSink<WsStream, Message>,
    read: SplitStream<WsStream>,
}

impl DepthStreamClient {
    /// Connect to a raw stream URL
    ///
    /// # Errors
    ///
    /// Returns an error if the connection or the WebSocket handshake fails.
    pub async fn connect(url: &Url) -> Result<Self, Error> {
        let (ws_stream, _response) = tokio_tungstenite::connect_async(url.as_str()).await?;
        let (write, read) = ws_stream.split();
        Ok(Self { write, read })
    }

    /// Receive the next text frame
    ///
    /// Pings are answered automatically; binary and pong frames are skipped.
    ///
    /// # Returns
    ///
    /// The next payload, or `None` if the stream ended.
    pub async fn next(&mut self) -> Option<Result<String, Error>> {
        loop {
            match self.read.next().await? {
                Ok(Message::Text(text)) => return Some(Ok(text)),
                Ok(Message::Ping(data)) => {
                    if let Err(e) = self.write.send(Message::Pong(data)).await {
                        return Some(Err(e.into()));
                    }
                }
                Ok(Message::Close(_)) => {
                    return Some(Err(Error::ConnectionClosed));
                }
                Ok(_) => {
                    // Binary, Pong, Frame
                    continue;
                }
                Err(e) => {
                    return Some(Err(e.into()));
                }
            }
        }
    }

    /// Close the WebSocket connection
    pub async fn close(&mut self) -> Result<(), Error> {
        self.write.close().await?;
        Ok(())
    }
}

/// Configuration for reconnection behavior
#[derive(Debug, Clone)]
pub struct ReconnectConfig {
    /// Maximum number of reconnection attempts (0 = infinite)
    pub max_retries: u32,
    /// Initial delay between reconnection attempts
    pub initial_delay_ms: u64,
    /// Maximum delay between reconnection attempts
    pub max_delay_ms: u64,
    /// Multiplier for exponential backoff
    pub backoff_multiplier: f64,
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            max_retries: 0,
            initial_delay_ms: 100,
            max_delay_ms: 30_000,
            backoff_multiplier: 2.0,
        }
    }
}

impl ReconnectConfig {
    /// Create a new reconnect config with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Set maximum retries (0 = infinite)
    pub fn max_retries(mut self, retries: u32) -> Self {
        self.max_retries = retries;
        self
    }

    /// Set initial delay in milliseconds
    pub fn initial_delay_ms(mut self, ms: u64) -> Self {
        self.initial_delay_ms = ms;
        self
    }

    /// Set maximum delay in milliseconds
    pub fn max_delay_ms(mut self, ms: u64) -> Self {
        self.max_delay_ms = ms;
        self
    }

    /// Set backoff multiplier
    pub fn backoff_multiplier(mut self, multiplier: f64) -> Self {
        self.backoff_multiplier = multiplier;
        self
    }

    /// Calculate delay for a given retry attempt
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let delay = self.initial_delay_ms as f64 * self.backoff_multiplier.powi(attempt as i32);
        let delay_ms = delay.min(self.max_delay_ms as f64) as u64;
        Duration::from_millis(delay_ms)
    }

    /// Check whether `attempt` is past the retry budget
    pub fn exhausted(&self, attempt: u32) -> bool {
        self.max_retries > 0 && attempt >= self.max_retries
    }
}

/// Forwards one symbol's depth stream onto a transport, reconnecting with
/// exponential backoff whenever the connection drops.
#[derive(Debug, Clone)]
pub struct DepthStreamBridge {
    symbol: String,
    url: Url,
    topic: String,
    reconnect_config: ReconnectConfig,
}

impl DepthStreamBridge {
    /// Create a bridge for `symbol`
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the configured WebSocket URL is invalid.
    pub fn new(
        config: &Config,
        symbol: &str,
        reconnect_config: ReconnectConfig,
    ) -> Result<Self, Error> {
        Ok(Self {
            symbol: symbol.to_uppercase(),
            url: depth_stream_url(config.websocket_url(), symbol)?,
            topic: depth_topic(symbol),
            reconnect_config,
        })
    }

    /// Get the stream URL
    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Get the topic frames are published on
    pub fn topic(&self) -> &str {
        &self.topic
    }

    /// Run until the retry budget is exhausted
    ///
    /// With the default [`ReconnectConfig`] this never returns.
    pub async fn run<T>(self, transport: Arc<T>) -> Result<(), Error>
    where
        T: Transport + ?Sized,
    {
        let mut attempt = 0u32;

        loop {
            match DepthStreamClient::connect(&self.url).await {
                Ok(mut client) => {
                    info!(symbol = %self.symbol, url = %self.url, "depth stream connected");
                    attempt = 0;
                    self.forward(&mut client, transport.as_ref()).await;
                }
                Err(e) => {
                    warn!(symbol = %self.symbol, error = %e, "depth stream connect failed");
                }
            }

            if self.reconnect_config.exhausted(attempt) {
                warn!(symbol = %self.symbol, attempt, "giving up on depth stream");
                return Err(Error::ConnectionClosed);
            }

            let delay = self.reconnect_config.delay_for_attempt(attempt);
            debug!(symbol = %self.symbol, attempt, ?delay, "reconnecting depth stream");
            tokio::time::sleep(delay).await;
            attempt += 1;
        }
    }

    /// Publish frames until the connection fails
    async fn forward<T>(&self, client: &mut DepthStreamClient, transport: &T)
    where
        T: Transport + ?Sized,
    {
        while let Some(frame) = client.next().await {
            match frame {
                Ok(text) => {
                    if let Err(e) = transport.publish(&self.topic, text.as_bytes()) {
                        warn!(topic = %self.topic, error = %e, "publish failed");
                    }
                }
                Err(e) => {
                    warn!(symbol = %self.symbol, error = %e, "depth stream read failed");
                    break;
                }
            }
        }
        let _ = client.close().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reconnect_config_default() {
        let config = ReconnectConfig::default();
        assert_eq!(config.max_retries, 0);
        assert_eq!(config.initial_delay_ms, 100);
        assert_eq!(config.max_delay_ms, 30_000);
        assert!((config.backoff_multiplier - 2.0).abs() < f64::EPSILON);
        assert!(!config.exhausted(1_000));
    }

    #[test]
    fn test_reconnect_config_builder() {
        let config = ReconnectConfig::new()
            .max_retries(5)
            .initial_delay_ms(50)
            .max_delay_ms(10_000)
            .backoff_multiplier(1.5);

        assert_eq!(config.max_retries, 5);
        assert_eq!(config.initial_delay_ms, 50);
        assert_eq!(config.max_delay_ms, 10_000);
        assert!((config.backoff_multiplier - 1.5).abs() < f64::EPSILON);
        assert!(!config.exhausted(4));
        assert!(config.exhausted(5));
    }

    #[test]
    fn test_delay_calculation() {
        let config = ReconnectConfig::new()
            .initial_delay_ms(100)
            .backoff_multiplier(2.0)
            .max_delay_ms(1000);

        assert_eq!(config.delay_for_attempt(0), Duration::from_millis(100));
        assert_eq!(config.delay_for_attempt(1), Duration::from_millis(200));
        assert_eq!(config.delay_for_attempt(2), Duration::from_millis(400));
        assert_eq!(config.delay_for_attempt(3), Duration::from_millis(800));
        // Should cap at max_delay_ms
        assert_eq!(config.delay_for_attempt(4), Duration::from_millis(1000));
        assert_eq!(config.delay_for_attempt(10), Duration::from_millis(1000));
    }

    #[test]
    fn test_depth_stream_url() {
        let url = depth_stream_url("wss://stream.binance.com:9443/", "BTCUSDT").unwrap();
        assert_eq!(url.as_str(), "wss://stream.binance.com:9443/ws/btcusdt@depth");
        assert!(depth_stream_url("not a url", "BTCUSDT").is_err());
    }

    #[test]
    fn test_bridge_topic() {
        let config = Config::new(["BTCUSDT"]);
        let bridge = DepthStreamBridge::new(&config, "BTCUSDT", ReconnectConfig::default()).unwrap();
        assert_eq!(bridge.topic(), "depth.btcusdt");
        assert!(bridge.url().as_str().ends_with("/ws/btcusdt@depth"));
    }

    #[tokio::test]
    async fn test_bridge_gives_up_after_budget() {
        let config = Config::new(["BTCUSDT"]).with_websocket_url("ws://127.0.0.1:1");
        let reconnect = ReconnectConfig::new().max_retries(1).initial_delay_ms(1);
        let bridge = DepthStreamBridge::new(&config, "BTCUSDT", reconnect).unwrap();

        let bus = Arc::new(crate::bus::LocalBus::new(4));
        let result = bridge.run(bus).await;
        assert!(matches!(result, Err(Error::ConnectionClosed)));
    }
}
