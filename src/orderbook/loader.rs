//! Snapshot loading and installation.
//!
//! [`SnapshotLoader`] fetches a snapshot from a [`SnapshotSource`], builds a
//! fresh [`OrderBook`] from it and installs that book into the
//! [`BookStore`], discarding whatever the symbol had before.
//!
//! # Early diffs
//!
//! Diffs that arrive before a symbol's first snapshot has been installed are
//! kept in a bounded per-symbol buffer (oldest dropped first). When the
//! snapshot lands, the buffer is replayed into the new book before it
//! becomes visible, using the same stale/gap rules as live diffs. The buffer
//! lock is taken before the registry lock on both the buffering and the
//! install path, so a diff is either buffered and replayed, or sees the
//! installed book; it cannot fall between the two.

use std::collections::VecDeque;
use std::sync::Arc;

use parking_lot::Mutex;
use rustc_hash::{FxHashMap, FxHashSet};
use tracing::{debug, info};

use crate::client::SnapshotSource;
use crate::error::Error;
use crate::types::{DiffUpdate, UpdateId};

use super::book::ApplyOutcome;
use super::{BookHandle, BookStore, OrderBook};

/// Result of installing a snapshot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InstallReport {
    /// Sequence number of the snapshot itself
    pub snapshot_update_id: UpdateId,
    /// Sequence number of the installed book after replaying early diffs
    pub last_update_id: UpdateId,
    /// Number of buffered diffs that were applied on top of the snapshot
    pub replayed: usize,
    /// Set when the buffered diffs did not connect to the snapshot; the
    /// installed book is the bare snapshot plus whatever replayed before
    /// the gap, and another snapshot should be requested
    pub gap: Option<(UpdateId, UpdateId)>,
}

/// Marks a symbol as having a load in flight until dropped
#[derive(Debug)]
pub struct LoadGuard {
    in_flight: Arc<Mutex<FxHashSet<String>>>,
    symbol: String,
}

impl LoadGuard {
    /// Symbol being loaded
    pub fn symbol(&self) -> &str {
        &self.symbol
    }
}

impl Drop for LoadGuard {
    fn drop(&mut self) {
        self.in_flight.lock().remove(&self.symbol);
    }
}

/// Fetches snapshots and installs them into a [`BookStore`].
pub struct SnapshotLoader {
    store: Arc<BookStore>,
    source: Arc<dyn SnapshotSource>,
    /// Diffs received before the symbol's first install
    pending: Mutex<FxHashMap<String, VecDeque<DiffUpdate>>>,
    pending_capacity: usize,
    /// Symbols with a fetch in progress
    in_flight: Arc<Mutex<FxHashSet<String>>>,
}

impl std::fmt::Debug for SnapshotLoader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SnapshotLoader")
            .field("pending_symbols", &self.pending.lock().len())
            .field("pending_capacity", &self.pending_capacity)
            .field("in_flight", &self.in_flight.lock().len())
            .finish()
    }
}

impl SnapshotLoader {
    /// Create a loader installing into `store`
    ///
    /// `pending_capacity` bounds the early-diff buffer of each symbol; zero
    /// disables buffering.
    pub fn new(
        store: Arc<BookStore>,
        source: Arc<dyn SnapshotSource>,
        pending_capacity: usize,
    ) -> Self {
        Self {
            store,
            source,
            pending: Mutex::new(FxHashMap::default()),
            pending_capacity,
            in_flight: Arc::new(Mutex::new(FxHashSet::default())),
        }
    }

    /// Claim the right to load `symbol`
    ///
    /// Returns `None` if a load for the symbol is already running.
    pub fn begin(&self, symbol: &str) -> Option<LoadGuard> {
        let mut in_flight = self.in_flight.lock();
        if !in_flight.insert(symbol.to_string()) {
            return None;
        }
        Some(LoadGuard {
            in_flight: Arc::clone(&self.in_flight),
            symbol: symbol.to_string(),
        })
    }

    /// Check whether a load for `symbol` is running
    pub fn is_loading(&self, symbol: &str) -> bool {
        self.in_flight.lock().contains(symbol)
    }

    /// Fetch a snapshot for `symbol` and install it
    ///
    /// # Errors
    ///
    /// Returns the source's error if the fetch or decode fails. The store is
    /// left untouched in that case.
    pub async fn load(&self, symbol: &str) -> Result<InstallReport, Error> {
        debug!(symbol, "fetching snapshot");
        let snapshot = self.source.fetch_snapshot(symbol).await?;
        let book = OrderBook::from_snapshot(symbol, &snapshot);
        let (handle, report) = self.install(book);

        let (bids, asks) = handle.read().num_levels();
        info!(
            symbol,
            last_update_id = report.last_update_id,
            replayed = report.replayed,
            bids,
            asks,
            "snapshot installed"
        );
        Ok(report)
    }

    /// Install a book, replaying any diffs buffered for its symbol first
    pub fn install(&self, mut book: OrderBook) -> (BookHandle, InstallReport) {
        let snapshot_update_id = book.last_update_id();
        let mut replayed = 0;
        let mut gap = None;

        let mut pending = self.pending.lock();
        if let Some(queue) = pending.remove(book.symbol()) {
            for update in queue {
                match book.apply_diff(&update) {
                    ApplyOutcome::Applied => replayed += 1,
                    ApplyOutcome::Stale | ApplyOutcome::NotReady => {}
                    ApplyOutcome::Gap { expected, got } => {
                        gap = Some((expected, got));
                        break;
                    }
                }
            }
        }

        let last_update_id = book.last_update_id();
        let handle = self.store.install(book);
        drop(pending);

        (
            handle,
            InstallReport {
                snapshot_update_id,
                last_update_id,
                replayed,
                gap,
            },
        )
    }

    /// Buffer a diff for a symbol that has no book yet
    ///
    /// Hands the diff back if a book was installed in the meantime, in which
    /// case the caller should apply it directly.
    pub fn buffer(&self, update: DiffUpdate) -> Result<(), DiffUpdate> {
        let mut pending = self.pending.lock();
        if self.store.contains(&update.symbol) {
            return Err(update);
        }
        if self.pending_capacity == 0 {
            return Ok(());
        }

        let queue = pending.entry(update.symbol.clone()).or_default();
        if queue.len() >= self.pending_capacity {
            queue.pop_front();
        }
        queue.push_back(update);
        Ok(())
    }

    /// Number of diffs buffered for `symbol`
    pub fn pending_len(&self, symbol: &str) -> usize {
        self.pending.lock().get(symbol).map_or(0, VecDeque::len)
    }
}
