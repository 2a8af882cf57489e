//! Shared fixtures for integration tests.

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use depth_sync::client::SnapshotSource;
use depth_sync::types::{PriceLevel, Snapshot, UpdateId};
use depth_sync::Error;
use parking_lot::Mutex;
use rustc_hash::FxHashMap;

/// Snapshot source serving canned books per symbol and counting fetches
#[derive(Debug, Default)]
pub struct MockSource {
    books: Mutex<FxHashMap<String, Snapshot>>,
    calls: Mutex<FxHashMap<String, usize>>,
    total: AtomicUsize,
}

impl MockSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve `snapshot` for `symbol` from now on
    pub fn set(&self, symbol: &str, snapshot: Snapshot) {
        self.books.lock().insert(symbol.to_string(), snapshot);
    }

    pub fn calls(&self, symbol: &str) -> usize {
        self.calls.lock().get(symbol).copied().unwrap_or(0)
    }

    pub fn total_calls(&self) -> usize {
        self.total.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SnapshotSource for MockSource {
    async fn fetch_snapshot(&self, symbol: &str) -> Result<Snapshot, Error> {
        self.total.fetch_add(1, Ordering::SeqCst);
        *self.calls.lock().entry(symbol.to_string()).or_default() += 1;
        self.books
            .lock()
            .get(symbol)
            .cloned()
            .ok_or_else(|| Error::Config(format!("no snapshot for {}", symbol)))
    }
}

pub fn level(price: &str, qty: &str) -> PriceLevel {
    PriceLevel::parse(price, qty).unwrap()
}

pub fn snapshot(last_update_id: UpdateId, bids: &[(&str, &str)], asks: &[(&str, &str)]) -> Snapshot {
    Snapshot {
        last_update_id,
        bids: bids.iter().map(|(p, q)| level(p, q)).collect(),
        asks: asks.iter().map(|(p, q)| level(p, q)).collect(),
    }
}

/// Wire-format depth event as the exchange stream sends it
pub fn depth_event(symbol: &str, first: UpdateId, last: UpdateId, bids: &[(&str, &str)], asks: &[(&str, &str)]) -> String {
    serde_json::json!({
        "e": "depthUpdate",
        "E": 1_700_000_000_000u64,
        "s": symbol,
        "U": first,
        "u": last,
        "b": bids,
        "a": asks,
    })
    .to_string()
}
