//! Topic-addressed publish/subscribe transport.
//!
//! The engine only depends on the subscribe/receive half of [`Transport`].
//! Delivery is at-most-once: a subscriber that falls behind loses messages,
//! and the order book sequence checks turn that loss into a resync.
//!
//! Topics are dot-separated tokens (`depth.btcusdt`). Subscription patterns
//! use two wildcards:
//!
//! - `*` matches exactly one token (`depth.*`)
//! - `>` matches one or more trailing tokens (`klines.>`)
//!
//! - [`LocalBus`] - in-process implementation over `tokio::sync::broadcast`
//! - [`websocket`] - bridge publishing exchange depth streams onto a bus

use std::sync::Arc;

use futures_util::stream::{self, BoxStream};
use futures_util::StreamExt;
use tokio::sync::broadcast;
use tracing::warn;

use crate::error::Error;

pub mod websocket;

/// Default number of in-flight messages a [`LocalBus`] holds per subscriber
pub const DEFAULT_BUS_CAPACITY: usize = 4096;

/// Topic the depth stream of `symbol` is published on
pub fn depth_topic(symbol: &str) -> String {
    format!("depth.{}", symbol.to_lowercase())
}

/// A message delivered by a [`Transport`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BusMessage {
    /// Topic the message was published on
    pub topic: Arc<str>,
    /// Raw payload bytes
    pub payload: Arc<[u8]>,
}

/// A publish/subscribe transport.
pub trait Transport: Send + Sync {
    /// Publish `payload` on `topic`
    ///
    /// Returns the number of subscribers the message was handed to. Zero is
    /// not an error: nobody listening is a normal state.
    fn publish(&self, topic: &str, payload: &[u8]) -> Result<usize, Error>;

    /// Subscribe to every topic matching `pattern`
    fn subscribe(&self, pattern: &str) -> Result<Subscription, Error>;
}

/// A parsed subscription pattern
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pattern {
    raw: String,
    tokens: Vec<String>,
}

impl Pattern {
    /// Parse a pattern
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] for empty tokens or a `>` that is not the
    /// last token.
    pub fn parse(pattern: &str) -> Result<Self, Error> {
        let tokens: Vec<String> = pattern.split('.').map(str::to_string).collect();
        if tokens.iter().any(String::is_empty) {
            return Err(Error::Config(format!("empty token in pattern {:?}", pattern)));
        }
        if let Some(pos) = tokens.iter().position(|t| t == ">") {
            if pos != tokens.len() - 1 {
                return Err(Error::Config(format!(
                    "'>' must be the last token in pattern {:?}",
                    pattern
                )));
            }
        }
        Ok(Self {
            raw: pattern.to_string(),
            tokens,
        })
    }

    /// Check whether `topic` matches this pattern
    pub fn matches(&self, topic: &str) -> bool {
        let mut topic_tokens = topic.split('.');
        for token in &self.tokens {
            match (token.as_str(), topic_tokens.next()) {
                (_, None) | (_, Some("")) => return false,
                (">", Some(_)) => return true,
                ("*", Some(_)) => {}
                (literal, Some(t)) if literal == t => {}
                _ => return false,
            }
        }
        topic_tokens.next().is_none()
    }

    /// Get the pattern text
    pub fn as_str(&self) -> &str {
        &self.raw
    }
}

/// A stream of messages matching one pattern
pub struct Subscription {
    pattern: Pattern,
    messages: BoxStream<'static, BusMessage>,
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("pattern", &self.pattern.as_str())
            .finish()
    }
}

impl Subscription {
    /// Wrap a message stream; only messages matching `pattern` are yielded
    pub fn new(pattern: Pattern, messages: BoxStream<'static, BusMessage>) -> Self {
        Self { pattern, messages }
    }

    /// Get the pattern text
    pub fn pattern(&self) -> &str {
        self.pattern.as_str()
    }

    /// Receive the next matching message
    ///
    /// Returns `None` once the transport has shut down.
    pub async fn next(&mut self) -> Option<BusMessage> {
        loop {
            let message = self.messages.next().await?;
            if self.pattern.matches(&message.topic) {
                return Some(message);
            }
        }
    }
}

/// In-process [`Transport`].
///
/// Every subscriber sees every message published after it subscribed, as
/// long as it keeps up. A subscriber more than `capacity` messages behind
/// skips ahead and the skipped messages are lost.
#[derive(Debug, Clone)]
pub struct LocalBus {
    sender: broadcast::Sender<BusMessage>,
}

impl LocalBus {
    /// Create a bus buffering up to `capacity` messages per subscriber
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Get the number of live subscriptions
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for LocalBus {
    fn default() -> Self {
        Self::new(DEFAULT_BUS_CAPACITY)
    }
}

impl Transport for LocalBus {
    fn publish(&self, topic: &str, payload: &[u8]) -> Result<usize, Error> {
        let message = BusMessage {
            topic: Arc::from(topic),
            payload: Arc::from(payload),
        };
        // Err only means there are no receivers
        Ok(self.sender.send(message).unwrap_or(0))
    }

    fn subscribe(&self, pattern: &str) -> Result<Subscription, Error> {
        let pattern = Pattern::parse(pattern)?;
        let receiver = self.sender.subscribe();
        let label = pattern.as_str().to_string();

        let messages = stream::unfold(receiver, move |mut receiver| {
            let label = label.clone();
            async move {
                loop {
                    match receiver.recv().await {
                        Ok(message) => return Some((message, receiver)),
                        Err(broadcast::error::RecvError::Lagged(skipped)) => {
                            warn!(pattern = %label, skipped, "subscriber lagged, messages lost");
                        }
                        Err(broadcast::error::RecvError::Closed) => return None,
                    }
                }
            }
        })
        .boxed();

        Ok(Subscription::new(pattern, messages))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pattern_matching() {
        let star = Pattern::parse("depth.*").unwrap();
        assert!(star.matches("depth.btcusdt"));
        assert!(!star.matches("depth"));
        assert!(!star.matches("depth.btcusdt.extra"));
        assert!(!star.matches("trades.btcusdt"));

        let tail = Pattern::parse("klines.>").unwrap();
        assert!(tail.matches("klines.btcusdt.1m"));
        assert!(tail.matches("klines.btcusdt"));
        assert!(!tail.matches("klines"));

        let exact = Pattern::parse("depth.btcusdt").unwrap();
        assert!(exact.matches("depth.btcusdt"));
        assert!(!exact.matches("depth.ethusdt"));
    }

    #[test]
    fn test_pattern_rejects_bad_input() {
        assert!(Pattern::parse("depth..x").is_err());
        assert!(Pattern::parse("").is_err());
        assert!(Pattern::parse("a.>.b").is_err());
    }

    #[test]
    fn test_depth_topic() {
        assert_eq!(depth_topic("BTCUSDT"), "depth.btcusdt");
    }

    #[tokio::test]
    async fn test_publish_subscribe() {
        let bus = LocalBus::new(16);
        let mut depth = bus.subscribe("depth.*").unwrap();
        let mut trades = bus.subscribe("trades.>").unwrap();
        assert_eq!(bus.subscriber_count(), 2);

        assert_eq!(bus.publish("trades.btcusdt", b"t1").unwrap(), 2);
        bus.publish("depth.btcusdt", b"d1").unwrap();

        let message = depth.next().await.unwrap();
        assert_eq!(&*message.topic, "depth.btcusdt");
        assert_eq!(&*message.payload, b"d1");

        let message = trades.next().await.unwrap();
        assert_eq!(&*message.payload, b"t1");
    }

    #[test]
    fn test_publish_without_subscribers() {
        let bus = LocalBus::default();
        assert_eq!(bus.publish("depth.btcusdt", b"{}").unwrap(), 0);
    }

    #[tokio::test]
    async fn test_lagging_subscriber_loses_messages() {
        let bus = LocalBus::new(2);
        let mut sub = bus.subscribe("depth.*").unwrap();

        for i in 0..5u8 {
            bus.publish("depth.btcusdt", &[i]).unwrap();
        }

        // Only the newest `capacity` messages survive
        assert_eq!(&*sub.next().await.unwrap().payload, &[3u8]);
        assert_eq!(&*sub.next().await.unwrap().payload, &[4u8]);
    }

    #[tokio::test]
    async fn test_subscription_ends_when_bus_dropped() {
        let bus = LocalBus::new(4);
        let mut sub = bus.subscribe("depth.*").unwrap();
        drop(bus);
        assert!(sub.next().await.is_none());
    }
}
