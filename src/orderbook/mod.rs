//! Per-symbol order book reconstruction.
//!
//! A book starts from a REST snapshot and is kept current by applying
//! incremental diffs in sequence order:
//!
//! - [`book`] - the single-symbol [`OrderBook`] and the diff rules
//! - [`store`] - the registry of books, one lock per symbol
//! - [`loader`] - snapshot fetch, early-diff buffering and install
//! - [`manager`] - [`OrderBookManager`], routing diffs and scheduling resyncs
//! - [`view`] - bounded sorted [`DepthView`]s for readers
//!
//! # Example
//!
//! ```rust
//! use depth_sync::orderbook::{ApplyOutcome, OrderBook, Side};
//! use depth_sync::types::{DiffUpdate, PriceLevel, Snapshot};
//!
//! let snapshot = Snapshot {
//!     last_update_id: 100,
//!     bids: vec![PriceLevel::parse("50000.00", "1.5").unwrap()],
//!     asks: vec![PriceLevel::parse("50001.00", "2").unwrap()],
//! };
//! let mut book = OrderBook::from_snapshot("BTCUSDT", &snapshot);
//!
//! let diff = DiffUpdate {
//!     symbol: "BTCUSDT".to_string(),
//!     event_time: 0,
//!     first_update_id: 101,
//!     final_update_id: 102,
//!     bids: vec![PriceLevel::parse("50000.00", "0").unwrap()],
//!     asks: vec![],
//! };
//! assert_eq!(book.apply_diff(&diff), ApplyOutcome::Applied);
//! assert_eq!(book.quantity_at(Side::Bid, "50000.00"), None);
//! assert_eq!(book.last_update_id(), 102);
//! ```

pub mod book;
pub mod loader;
pub mod manager;
pub mod store;
pub mod view;

pub use book::{ApplyOutcome, OrderBook, Side};
pub use loader::{InstallReport, SnapshotLoader};
pub use manager::{LoadOutcome, OrderBookManager};
pub use store::{BookHandle, BookStore};
pub use view::{DepthView, LevelView};
