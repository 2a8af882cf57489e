//! Handler state.

use std::sync::Arc;

use crate::orderbook::OrderBookManager;

/// Shared state handed to every handler
#[derive(Debug, Clone)]
pub struct ApiState {
    /// Books served by the API
    pub manager: Arc<OrderBookManager>,
}

impl ApiState {
    /// Wrap a manager
    pub fn new(manager: Arc<OrderBookManager>) -> Self {
        Self { manager }
    }
}
