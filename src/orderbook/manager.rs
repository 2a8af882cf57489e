//! Order book manager: diff reconciliation and resynchronization.
//!
//! This module provides [`OrderBookManager`], the thread-safe entry point
//! that ties a [`BookStore`], a [`SnapshotLoader`] and the transport together.
//!
//! # Sequence Tracking
//!
//! Every diff carries the range `[U, u]` of sequence numbers it covers. For a
//! book at `last_update_id`:
//!
//! - `u <= last_update_id`: already reflected, dropped
//! - `U > last_update_id + 1`: updates were missed, the diff is dropped and a
//!   fresh snapshot is requested in the background
//! - otherwise the diff is applied and the book moves to `u`
//!
//! Missed updates are never buffered for replay; the book is rebuilt from a
//! new snapshot instead, which replaces the old book object wholesale. A
//! diff still being applied to the old object when the swap happens is
//! lost with it, and the next live diff is judged against the new baseline.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::bus::Subscription;
use crate::client::SnapshotSource;
use crate::config::Config;
use crate::types::{DiffUpdate, UpdateId};

use super::book::ApplyOutcome;
use super::loader::{LoadGuard, SnapshotLoader};
use super::view::DepthView;
use super::BookStore;

/// Result of a snapshot load request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    /// A snapshot was installed; the book is at `last_update_id`
    Installed {
        /// Sequence number of the installed book
        last_update_id: UpdateId,
    },
    /// Another load for the symbol was already running
    AlreadyLoading,
    /// The fetch failed; the symbol keeps its previous state
    Failed,
}

/// Manager for the order books of many symbols.
///
/// # Thread Safety
///
/// The manager is meant to be shared as `Arc<OrderBookManager>`. Methods that
/// may schedule a background snapshot load take `self: &Arc<Self>` so the
/// spawned task can keep the manager alive.
///
/// # Example
///
/// ```rust,no_run
/// use std::sync::Arc;
/// use depth_sync::client::RestClient;
/// use depth_sync::orderbook::OrderBookManager;
/// use depth_sync::Config;
///
/// # async fn example() -> depth_sync::Result<()> {
/// let config = Config::new(["BTCUSDT"]);
/// let source = Arc::new(RestClient::new(&config)?);
/// let manager = Arc::new(OrderBookManager::new(source, &config));
///
/// manager.load_snapshot("BTCUSDT").await;
///
/// // In your bus loop:
/// // manager.handle_message(&payload);
///
/// if let Some(view) = manager.view("BTCUSDT") {
///     println!("best bid: {:?}", view.bids.first());
/// }
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct OrderBookManager {
    store: Arc<BookStore>,
    loader: SnapshotLoader,
    view_depth: usize,
}

impl OrderBookManager {
    /// Create a manager loading snapshots from `source`
    pub fn new(source: Arc<dyn SnapshotSource>, config: &Config) -> Self {
        let store = Arc::new(BookStore::new());
        Self {
            loader: SnapshotLoader::new(Arc::clone(&store), source, config.pending_capacity()),
            store,
            view_depth: config.view_depth(),
        }
    }

    /// Create a manager with default settings
    pub fn with_source(source: Arc<dyn SnapshotSource>) -> Self {
        Self::new(source, &Config::default())
    }

    /// Get the underlying book store
    pub fn store(&self) -> &Arc<BookStore> {
        &self.store
    }

    /// Get the snapshot loader
    pub fn loader(&self) -> &SnapshotLoader {
        &self.loader
    }

    /// Get the configured view depth
    pub fn view_depth(&self) -> usize {
        self.view_depth
    }

    /// Decode a raw bus payload and apply it
    ///
    /// Undecodable payloads are dropped and `None` is returned.
    pub fn handle_message(self: &Arc<Self>, payload: &[u8]) -> Option<ApplyOutcome> {
        match DiffUpdate::from_slice(payload) {
            Ok(update) => Some(self.apply_update(update)),
            Err(e) => {
                debug!(error = %e, "dropping undecodable depth message");
                None
            }
        }
    }

    /// Apply one diff to its symbol's book
    ///
    /// The staleness check, the gap check and the level writes all happen
    /// under the book's write lock. On a gap the lock is released before a
    /// snapshot load is scheduled.
    pub fn apply_update(self: &Arc<Self>, update: DiffUpdate) -> ApplyOutcome {
        let handle = match self.store.get(&update.symbol) {
            Some(handle) => handle,
            None => match self.loader.buffer(update) {
                Ok(()) => return ApplyOutcome::NotReady,
                // Installed between the lookup and the buffer lock
                Err(update) => return self.apply_update(update),
            },
        };

        let outcome = handle.write().apply_diff(&update);

        match outcome {
            ApplyOutcome::Gap { expected, got } => {
                warn!(
                    symbol = %update.symbol,
                    expected,
                    got,
                    "sequence gap detected, resynchronizing"
                );
                self.request_resync(&update.symbol);
            }
            ApplyOutcome::Stale => {
                debug!(
                    symbol = %update.symbol,
                    final_update_id = update.final_update_id,
                    "dropping stale diff"
                );
            }
            ApplyOutcome::Applied | ApplyOutcome::NotReady => {}
        }

        outcome
    }

    /// Schedule a background snapshot load for `symbol`
    ///
    /// Returns `false` if a load is already running for the symbol (the
    /// running one will replace the book) or if there is no Tokio runtime to
    /// run it on.
    pub fn request_resync(self: &Arc<Self>, symbol: &str) -> bool {
        let Some(guard) = self.loader.begin(symbol) else {
            debug!(symbol, "snapshot load already in flight");
            return false;
        };

        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            warn!(symbol, "no runtime available for snapshot load");
            return false;
        };

        let manager = Arc::clone(self);
        runtime.spawn(async move {
            manager.run_load(guard).await;
        });
        true
    }

    /// Fetch and install a snapshot for `symbol`, waiting for the result
    ///
    /// Failures are logged and reported as [`LoadOutcome::Failed`]; the
    /// symbol keeps whatever state it had.
    pub async fn load_snapshot(self: &Arc<Self>, symbol: &str) -> LoadOutcome {
        match self.loader.begin(symbol) {
            Some(guard) => self.run_load(guard).await,
            None => LoadOutcome::AlreadyLoading,
        }
    }

    async fn run_load(self: &Arc<Self>, guard: LoadGuard) -> LoadOutcome {
        let symbol = guard.symbol().to_string();
        let result = self.loader.load(&symbol).await;
        drop(guard);

        match result {
            Ok(report) => {
                if let Some((expected, got)) = report.gap {
                    warn!(
                        symbol = %symbol,
                        expected,
                        got,
                        "buffered diffs do not connect to snapshot, resynchronizing"
                    );
                    self.request_resync(&symbol);
                }
                LoadOutcome::Installed {
                    last_update_id: report.last_update_id,
                }
            }
            Err(e) => {
                warn!(symbol = %symbol, error = %e, "snapshot load failed");
                LoadOutcome::Failed
            }
        }
    }

    /// Build a view of `symbol` with the configured depth
    pub fn view(&self, symbol: &str) -> Option<DepthView> {
        DepthView::capture(&self.store, symbol, self.view_depth)
    }

    /// Build a view of `symbol` with an explicit depth
    pub fn view_with_depth(&self, symbol: &str, depth: usize) -> Option<DepthView> {
        DepthView::capture(&self.store, symbol, depth)
    }

    /// Consume a bus subscription until it closes
    ///
    /// Each payload is decoded and applied in arrival order.
    pub async fn run_subscription(self: Arc<Self>, mut subscription: Subscription) {
        info!(pattern = %subscription.pattern(), "consuming depth updates");
        while let Some(message) = subscription.next().await {
            self.handle_message(&message.payload);
        }
        info!(pattern = %subscription.pattern(), "depth subscription closed");
    }

    /// Log the size and sequence number of every book at a fixed interval
    pub fn spawn_status_reporter(self: &Arc<Self>, every: Duration) -> JoinHandle<()> {
        let manager = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            ticker.tick().await;
            loop {
                ticker.tick().await;
                manager.log_status();
            }
        })
    }

    /// Log the state of every installed book once
    pub fn log_status(&self) {
        for symbol in self.store.symbols() {
            let Some(handle) = self.store.get(&symbol) else {
                continue;
            };
            let book = handle.read();
            let (bids, asks) = book.num_levels();
            info!(
                symbol = %symbol,
                bids,
                asks,
                last_update_id = book.last_update_id(),
                spread = ?book.spread(),
                "book status"
            );
        }
    }

    /// Get number of installed books
    pub fn len(&self) -> usize {
        self.store.len()
    }

    /// Check if no book has been installed yet
    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }

    /// Get all installed symbols
    pub fn symbols(&self) -> Vec<String> {
        self.store.symbols()
    }
}
