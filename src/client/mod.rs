//! Clients for fetching data from the exchange.
//!
//! This module contains:
//!
//! - [`SnapshotSource`] - the request/response contract the engine loads
//!   snapshots through
//! - [`rest`] - the HTTP implementation against the exchange depth endpoint

use async_trait::async_trait;

use crate::error::Error;
use crate::types::Snapshot;

pub mod rest;

pub use rest::RestClient;

/// Source of authoritative order book snapshots.
///
/// Implementations return the full book for a symbol together with the
/// sequence number it is consistent with. They must not cache: every call
/// is expected to reflect the exchange's current state.
#[async_trait]
pub trait SnapshotSource: Send + Sync {
    /// Fetch a fresh snapshot for `symbol` (upper-case)
    async fn fetch_snapshot(&self, symbol: &str) -> Result<Snapshot, Error>;
}
