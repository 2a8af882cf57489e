//! Core order book data structure.
//!
//! Levels are keyed by the exact price text received from the exchange, so
//! an update always hits the level it names regardless of decimal
//! formatting. Each level also stores its parsed [`Decimal`] price, which is
//! what depth queries sort on:
//!
//! - O(1) average upsert, removal and lookup
//! - O(n + k log k) for the top `k` levels of a side with `n` levels

use rust_decimal::Decimal;
use rustc_hash::FxHashMap;

use crate::types::{DiffUpdate, PriceLevel, Quantity, Snapshot, UpdateId};

/// Side of the book
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Side {
    /// Buy orders
    Bid,
    /// Sell orders
    Ask,
}

/// Result of offering a diff to a book
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyOutcome {
    /// The diff was applied and the book advanced to its final update ID
    Applied,
    /// The diff is already reflected in the book and was ignored
    Stale,
    /// Updates between the book and the diff are missing; the book was left
    /// untouched and must be rebuilt from a snapshot
    Gap {
        /// First update ID the book could have accepted
        expected: UpdateId,
        /// First update ID the diff carried
        got: UpdateId,
    },
    /// No book is installed for the symbol yet
    NotReady,
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Level {
    value: Decimal,
    quantity: Quantity,
}

/// Order book for a single symbol.
///
/// # Invariants
///
/// 1. Every stored level has a strictly positive quantity. A zero quantity
///    from the exchange removes the level instead of being stored.
///
/// 2. `last_update_id` only moves forward, and only after every level of
///    the diff that carries it has been written.
///
/// # Thread Safety
///
/// This struct is `Send + Sync` but not internally synchronized. The
/// [`BookStore`](super::BookStore) wraps each book in a
/// `parking_lot::RwLock`.
#[derive(Debug, Clone)]
pub struct OrderBook {
    /// Symbol
    symbol: String,

    /// Bid levels: price text -> level
    bids: FxHashMap<String, Level>,

    /// Ask levels: price text -> level
    asks: FxHashMap<String, Level>,

    /// Sequence number of the last applied snapshot or diff
    last_update_id: UpdateId,
}

impl OrderBook {
    /// Create a new empty orderbook for the given symbol
    #[must_use]
    pub fn new(symbol: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into(),
            bids: FxHashMap::default(),
            asks: FxHashMap::default(),
            last_update_id: 0,
        }
    }

    /// Build a book from a full snapshot
    ///
    /// If the snapshot repeats a price, the last occurrence wins. Zero
    /// quantities in a snapshot are skipped.
    #[must_use]
    pub fn from_snapshot(symbol: impl Into<String>, snapshot: &Snapshot) -> Self {
        let mut book = Self::new(symbol);
        for level in &snapshot.bids {
            book.set_level(Side::Bid, level);
        }
        for level in &snapshot.asks {
            book.set_level(Side::Ask, level);
        }
        book.last_update_id = snapshot.last_update_id;
        book
    }

    /// Get the symbol
    #[must_use]
    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    /// Get the sequence number of the last applied update
    #[must_use]
    pub const fn last_update_id(&self) -> UpdateId {
        self.last_update_id
    }

    /// Offer an incremental update to the book
    ///
    /// - `u <= last_update_id`: already covered, [`ApplyOutcome::Stale`]
    /// - `U > last_update_id + 1`: missed updates, [`ApplyOutcome::Gap`]
    /// - otherwise every level is written and the book moves to `u`
    ///
    /// Stale and gapped diffs leave the book unchanged.
    pub fn apply_diff(&mut self, update: &DiffUpdate) -> ApplyOutcome {
        if update.final_update_id <= self.last_update_id {
            return ApplyOutcome::Stale;
        }

        let expected = self.last_update_id.saturating_add(1);
        if update.first_update_id > expected {
            return ApplyOutcome::Gap {
                expected,
                got: update.first_update_id,
            };
        }

        for level in &update.bids {
            self.set_level(Side::Bid, level);
        }
        for level in &update.asks {
            self.set_level(Side::Ask, level);
        }
        self.last_update_id = update.final_update_id;

        ApplyOutcome::Applied
    }

    /// Set a price level directly
    ///
    /// A zero quantity removes the level.
    pub fn set_level(&mut self, side: Side, level: &PriceLevel) {
        let levels = self.side_mut(side);
        if level.is_removal() {
            levels.remove(&level.price);
        } else if let Some(existing) = levels.get_mut(&level.price) {
            existing.quantity = level.quantity;
        } else {
            levels.insert(
                level.price.clone(),
                Level {
                    value: level.value,
                    quantity: level.quantity,
                },
            );
        }
    }

    /// Get the quantity resting at an exact price text
    #[must_use]
    pub fn quantity_at(&self, side: Side, price: &str) -> Option<Quantity> {
        self.side(side).get(price).map(|l| l.quantity)
    }

    /// Get the top `n` bid levels, sorted by price descending (best first)
    #[must_use]
    pub fn top_bids(&self, n: usize) -> Vec<(Decimal, Quantity)> {
        top_levels(&self.bids, n, |a, b| b.cmp(a))
    }

    /// Get the top `n` ask levels, sorted by price ascending (best first)
    #[must_use]
    pub fn top_asks(&self, n: usize) -> Vec<(Decimal, Quantity)> {
        top_levels(&self.asks, n, |a, b| a.cmp(b))
    }

    /// Get the best bid (highest price)
    #[must_use]
    pub fn best_bid(&self) -> Option<(Decimal, Quantity)> {
        self.bids
            .values()
            .max_by(|a, b| a.value.cmp(&b.value))
            .map(|l| (l.value, l.quantity))
    }

    /// Get the best ask (lowest price)
    #[must_use]
    pub fn best_ask(&self) -> Option<(Decimal, Quantity)> {
        self.asks
            .values()
            .min_by(|a, b| a.value.cmp(&b.value))
            .map(|l| (l.value, l.quantity))
    }

    /// Get the spread between best ask and best bid
    #[must_use]
    pub fn spread(&self) -> Option<Decimal> {
        match (self.best_bid(), self.best_ask()) {
            (Some((bid, _)), Some((ask, _))) => Some(ask - bid),
            _ => None,
        }
    }

    /// Check if the book is crossed (best bid >= best ask)
    ///
    /// A crossed book after applying diffs is a sign of a missed update
    /// that the sequence numbers did not reveal.
    #[must_use]
    pub fn is_crossed(&self) -> bool {
        match (self.best_bid(), self.best_ask()) {
            (Some((bid, _)), Some((ask, _))) => bid >= ask,
            _ => false,
        }
    }

    /// Check if the orderbook is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bids.is_empty() && self.asks.is_empty()
    }

    /// Get the number of price levels `(bids, asks)`
    #[must_use]
    pub fn num_levels(&self) -> (usize, usize) {
        (self.bids.len(), self.asks.len())
    }

    fn side(&self, side: Side) -> &FxHashMap<String, Level> {
        match side {
            Side::Bid => &self.bids,
            Side::Ask => &self.asks,
        }
    }

    fn side_mut(&mut self, side: Side) -> &mut FxHashMap<String, Level> {
        match side {
            Side::Bid => &mut self.bids,
            Side::Ask => &mut self.asks,
        }
    }
}

/// Pick the `n` best levels under `order` and return them sorted.
fn top_levels<F>(levels: &FxHashMap<String, Level>, n: usize, order: F) -> Vec<(Decimal, Quantity)>
where
    F: Fn(&Decimal, &Decimal) -> std::cmp::Ordering,
{
    if n == 0 {
        return Vec::new();
    }

    let mut out: Vec<(Decimal, Quantity)> =
        levels.values().map(|l| (l.value, l.quantity)).collect();
    if out.len() > n {
        out.select_nth_unstable_by(n - 1, |a, b| order(&a.0, &b.0));
        out.truncate(n);
    }
    out.sort_unstable_by(|a, b| order(&a.0, &b.0));
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn level(price: &str, qty: &str) -> PriceLevel {
        PriceLevel::parse(price, qty).unwrap()
    }

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn diff(first: UpdateId, last: UpdateId, bids: &[(&str, &str)], asks: &[(&str, &str)]) -> DiffUpdate {
        DiffUpdate {
            symbol: "TEST".to_string(),
            event_time: 0,
            first_update_id: first,
            final_update_id: last,
            bids: bids.iter().map(|(p, q)| level(p, q)).collect(),
            asks: asks.iter().map(|(p, q)| level(p, q)).collect(),
        }
    }

    fn snapshot(last: UpdateId, bids: &[(&str, &str)], asks: &[(&str, &str)]) -> Snapshot {
        Snapshot {
            last_update_id: last,
            bids: bids.iter().map(|(p, q)| level(p, q)).collect(),
            asks: asks.iter().map(|(p, q)| level(p, q)).collect(),
        }
    }

    #[test]
    fn test_new_orderbook() {
        let book = OrderBook::new("BTCUSDT");
        assert_eq!(book.symbol(), "BTCUSDT");
        assert!(book.is_empty());
        assert_eq!(book.last_update_id(), 0);
    }

    #[test]
    fn test_from_snapshot_last_write_wins() {
        let snap = snapshot(
            10,
            &[("100.5", "2.0"), ("100.5", "4.0"), ("99", "0")],
            &[("101", "1")],
        );
        let book = OrderBook::from_snapshot("TEST", &snap);

        assert_eq!(book.last_update_id(), 10);
        assert_eq!(book.quantity_at(Side::Bid, "100.5"), Some(4.0));
        assert_eq!(book.quantity_at(Side::Bid, "99"), None);
        assert_eq!(book.num_levels(), (1, 1));
    }

    #[test]
    fn test_level_upsert() {
        let mut book = OrderBook::from_snapshot("TEST", &snapshot(10, &[("100.5", "2.0")], &[]));

        let outcome = book.apply_diff(&diff(11, 11, &[("100.5", "3.0")], &[]));

        assert_eq!(outcome, ApplyOutcome::Applied);
        assert_eq!(book.quantity_at(Side::Bid, "100.5"), Some(3.0));
        assert_eq!(book.last_update_id(), 11);
    }

    #[test]
    fn test_zero_quantity_removes_level() {
        let mut book = OrderBook::from_snapshot(
            "TEST",
            &snapshot(10, &[("50000.00", "1.0"), ("49999.00", "2.0")], &[]),
        );

        book.apply_diff(&diff(11, 12, &[("50000.00", "0")], &[]));

        assert_eq!(book.quantity_at(Side::Bid, "50000.00"), None);
        assert_eq!(book.top_bids(20), vec![(dec("49999.00"), 2.0)]);
    }

    #[test]
    fn test_removing_missing_level_is_noop() {
        let mut book = OrderBook::from_snapshot("TEST", &snapshot(10, &[], &[("10", "1")]));
        book.apply_diff(&diff(11, 11, &[], &[("11", "0")]));
        assert_eq!(book.num_levels(), (0, 1));
    }

    #[test]
    fn test_stale_diff_ignored() {
        let mut book = OrderBook::from_snapshot("TEST", &snapshot(100, &[("10", "1")], &[]));

        let outcome = book.apply_diff(&diff(90, 100, &[("10", "5")], &[]));

        assert_eq!(outcome, ApplyOutcome::Stale);
        assert_eq!(book.quantity_at(Side::Bid, "10"), Some(1.0));
        assert_eq!(book.last_update_id(), 100);
    }

    #[test]
    fn test_duplicate_diff_is_idempotent() {
        let mut book = OrderBook::from_snapshot("TEST", &snapshot(100, &[("10", "1")], &[]));
        let update = diff(101, 103, &[("10", "2")], &[("11", "4")]);

        assert_eq!(book.apply_diff(&update), ApplyOutcome::Applied);
        let after_first = book.clone();
        assert_eq!(book.apply_diff(&update), ApplyOutcome::Stale);

        assert_eq!(book.last_update_id(), after_first.last_update_id());
        assert_eq!(book.top_bids(10), after_first.top_bids(10));
        assert_eq!(book.top_asks(10), after_first.top_asks(10));
    }

    #[test]
    fn test_gap_detected() {
        let mut book = OrderBook::from_snapshot("TEST", &snapshot(100, &[("10", "1")], &[]));

        let outcome = book.apply_diff(&diff(105, 110, &[("10", "9")], &[]));

        assert_eq!(
            outcome,
            ApplyOutcome::Gap {
                expected: 101,
                got: 105
            }
        );
        assert_eq!(book.quantity_at(Side::Bid, "10"), Some(1.0));
        assert_eq!(book.last_update_id(), 100);
    }

    #[test]
    fn test_overlapping_diff_applied() {
        // First diff after a snapshot usually straddles lastUpdateId
        let mut book = OrderBook::from_snapshot("TEST", &snapshot(100, &[], &[]));
        assert_eq!(
            book.apply_diff(&diff(95, 104, &[("10", "1")], &[])),
            ApplyOutcome::Applied
        );
        assert_eq!(book.last_update_id(), 104);
    }

    #[test]
    fn test_monotonic_sequence() {
        let mut book = OrderBook::from_snapshot("TEST", &snapshot(10, &[], &[]));
        let updates = [
            diff(11, 12, &[], &[]),
            diff(8, 9, &[], &[]),
            diff(13, 13, &[], &[]),
            diff(20, 21, &[], &[]),
            diff(12, 15, &[], &[]),
        ];

        let mut last = book.last_update_id();
        let mut last_accepted = last;
        for update in &updates {
            if book.apply_diff(update) == ApplyOutcome::Applied {
                last_accepted = update.final_update_id;
            }
            assert!(book.last_update_id() >= last);
            last = book.last_update_id();
        }
        assert_eq!(book.last_update_id(), last_accepted);
        assert_eq!(book.last_update_id(), 15);
    }

    #[test]
    fn test_top_levels_sorted_numerically() {
        let mut book = OrderBook::new("TEST");
        for p in ["9.5", "10", "100", "99.99"] {
            book.set_level(Side::Bid, &level(p, "1"));
            book.set_level(Side::Ask, &level(p, "1"));
        }

        let bids: Vec<Decimal> = book.top_bids(3).into_iter().map(|(p, _)| p).collect();
        assert_eq!(bids, vec![dec("100"), dec("99.99"), dec("10")]);

        let asks: Vec<Decimal> = book.top_asks(10).into_iter().map(|(p, _)| p).collect();
        assert_eq!(asks, vec![dec("9.5"), dec("10"), dec("99.99"), dec("100")]);

        assert!(book.top_bids(0).is_empty());
    }

    #[test]
    fn test_best_prices_and_spread() {
        let book = OrderBook::from_snapshot(
            "TEST",
            &snapshot(1, &[("99.5", "1"), ("99", "2")], &[("100.25", "3"), ("101", "1")]),
        );

        assert_eq!(book.best_bid(), Some((dec("99.5"), 1.0)));
        assert_eq!(book.best_ask(), Some((dec("100.25"), 3.0)));
        assert_eq!(book.spread(), Some(dec("0.75")));
        assert!(!book.is_crossed());
    }

    #[test]
    fn test_crossed_book() {
        let book = OrderBook::from_snapshot("TEST", &snapshot(1, &[("101", "1")], &[("100", "1")]));
        assert!(book.is_crossed());
    }
}
