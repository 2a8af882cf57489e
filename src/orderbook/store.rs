//! Registry of per-symbol order books.
//!
//! # Locking
//!
//! Two tiers, never nested the other way round:
//!
//! 1. The registry lock guards the symbol -> book map. It is held only to
//!    look up or swap an `Arc`, never across I/O or book work.
//! 2. Each book has its own `RwLock`. Diff application and installs take it
//!    for writing, view builds take it for reading.
//!
//! Books for different symbols therefore never contend, and a slow reader
//! on one symbol cannot delay writers on another.

use std::sync::Arc;

use parking_lot::RwLock;
use rustc_hash::FxHashMap;

use super::OrderBook;

/// Shared handle to one symbol's book
pub type BookHandle = Arc<RwLock<OrderBook>>;

/// Owner of one [`OrderBook`] per symbol.
///
/// A symbol only appears here once its first snapshot has been installed;
/// absence means "not initialized yet", which is different from an empty
/// book. Entries are replaced wholesale by later installs and never removed.
#[derive(Debug, Default)]
pub struct BookStore {
    books: RwLock<FxHashMap<String, BookHandle>>,
}

impl BookStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up a symbol's book
    ///
    /// The returned handle stays valid after a later [`install`](Self::install)
    /// but then refers to the replaced, unreachable book.
    pub fn get(&self, symbol: &str) -> Option<BookHandle> {
        self.books.read().get(symbol).cloned()
    }

    /// Install a book, replacing whatever the symbol had before
    ///
    /// Returns the handle of the newly installed book.
    pub fn install(&self, book: OrderBook) -> BookHandle {
        let symbol = book.symbol().to_string();
        let handle = Arc::new(RwLock::new(book));
        self.books.write().insert(symbol, Arc::clone(&handle));
        handle
    }

    /// Check whether a symbol has an installed book
    pub fn contains(&self, symbol: &str) -> bool {
        self.books.read().contains_key(symbol)
    }

    /// Get all installed symbols, sorted
    pub fn symbols(&self) -> Vec<String> {
        let mut symbols: Vec<String> = self.books.read().keys().cloned().collect();
        symbols.sort_unstable();
        symbols
    }

    /// Get number of installed books
    pub fn len(&self) -> usize {
        self.books.read().len()
    }

    /// Check if no book has been installed yet
    pub fn is_empty(&self) -> bool {
        self.books.read().is_empty()
    }
}
