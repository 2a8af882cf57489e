//! # depth-sync
//!
//! An order book reconstruction engine for exchange depth streams.
//!
//! ## Features
//!
//! - **Snapshot + diff sync** - REST snapshots kept current by sequenced diffs
//! - **Gap recovery** - missed updates trigger a background resnapshot
//! - **Per-symbol locking** - books for different symbols never contend
//! - **HTTP views** - bounded, sorted depth served over `/orderbook`
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use depth_sync::bus::{depth_topic, LocalBus, Transport};
//! use depth_sync::client::RestClient;
//! use depth_sync::orderbook::OrderBookManager;
//! use depth_sync::Config;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), depth_sync::Error> {
//!     let config = Config::new(["BTCUSDT"]);
//!     let source = Arc::new(RestClient::new(&config)?);
//!     let manager = Arc::new(OrderBookManager::new(source, &config));
//!
//!     let bus = LocalBus::default();
//!     let subscription = bus.subscribe("depth.*")?;
//!     tokio::spawn(Arc::clone(&manager).run_subscription(subscription));
//!
//!     manager.load_snapshot("BTCUSDT").await;
//!
//!     // Diffs published on the bus are applied in order
//!     bus.publish(&depth_topic("BTCUSDT"), br#"{"s":"BTCUSDT","U":1,"u":2,"b":[],"a":[]}"#)?;
//!
//!     if let Some(view) = manager.view("BTCUSDT") {
//!         println!("{} bids, {} asks", view.bids.len(), view.asks.len());
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! - [`bus`] - publish/subscribe transport and the exchange stream bridge
//! - [`client`] - snapshot sources (REST)
//! - [`orderbook`] - books, the registry and the sync manager
//! - [`api`] - HTTP read API
//! - [`types`] - wire formats and parsed levels
//! - [`config`] - runtime configuration
//! - [`error`] - error types for the crate

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]
#![deny(unsafe_code)]

pub mod api;
pub mod bus;
pub mod client;
pub mod config;
pub mod error;
pub mod orderbook;
pub mod types;

// Re-export main types at crate root for convenience
pub use config::Config;
pub use error::Error;
pub use orderbook::OrderBookManager;

/// Result type alias using the crate's Error type
pub type Result<T> = std::result::Result<T, Error>;
