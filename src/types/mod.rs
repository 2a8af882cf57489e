//! Exchange data types.
//!
//! This module contains Rust types for the exchange's depth messages and
//! their validated, in-memory counterparts.
//!
//! - [`messages`] - Wire formats (depth stream events, REST snapshots)
//! - [`level`] - Parsed price levels

pub mod level;
pub mod messages;

pub use level::PriceLevel;
pub use messages::{DepthSnapshot, DepthUpdateEvent, DiffUpdate, Snapshot};

/// Order book sequence number
///
/// Snapshots carry `lastUpdateId`, diffs carry the `[U, u]` range they cover.
/// Sequence numbers only ever grow for a given symbol.
pub type UpdateId = u64;

/// Quantity resting at a price level
///
/// Always finite and non-negative; exactly zero on the wire means "remove".
pub type Quantity = f64;

/// Timestamp in milliseconds since Unix epoch
pub type TimestampMs = u64;
