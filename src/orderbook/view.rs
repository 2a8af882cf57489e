//! Bounded, sorted read views of a book.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::types::{Quantity, UpdateId};

use super::{BookStore, OrderBook};

/// Default number of levels per side in a view
pub const DEFAULT_VIEW_DEPTH: usize = 20;

/// One level of a view, as served to clients
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LevelView {
    /// Price
    pub price: f64,
    /// Quantity at that price
    pub amount: f64,
}

impl From<(Decimal, Quantity)> for LevelView {
    fn from((price, amount): (Decimal, Quantity)) -> Self {
        Self {
            price: price.to_f64().unwrap_or_default(),
            amount,
        }
    }
}

/// Point-in-time view of the top of a book
///
/// Serializes as `{"bids":[...],"asks":[...],"lastUpdateId":n}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DepthView {
    /// Best bids, price descending
    pub bids: Vec<LevelView>,
    /// Best asks, price ascending
    pub asks: Vec<LevelView>,
    /// Sequence number both sides were read at
    pub last_update_id: UpdateId,
}

impl DepthView {
    /// Build a view of at most `depth` levels per side
    #[must_use]
    pub fn from_book(book: &OrderBook, depth: usize) -> Self {
        Self {
            bids: book.top_bids(depth).into_iter().map(LevelView::from).collect(),
            asks: book.top_asks(depth).into_iter().map(LevelView::from).collect(),
            last_update_id: book.last_update_id(),
        }
    }

    /// Build a view of `symbol` from a store
    ///
    /// The book's read lock is held for the whole build, so both sides and
    /// the sequence number come from the same state. Returns `None` if the
    /// symbol has no installed book.
    pub fn capture(store: &BookStore, symbol: &str, depth: usize) -> Option<Self> {
        let handle = store.get(symbol)?;
        let book = handle.read();
        Some(Self::from_book(&book, depth))
    }
}
