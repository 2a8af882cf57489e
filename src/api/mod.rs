//! Read-only HTTP API over the managed books.
//!
//! | Route | Response |
//! |-------|----------|
//! | `GET /orderbook?symbol=BTCUSDT` | `200` [`DepthView`](crate::orderbook::DepthView), `400` without a symbol, `404` before the first snapshot |
//! | `GET /health` | `200 {"status":"ok","symbols":N}` |
//!
//! Error bodies are `{"error": CODE, "message": text}`. CORS is permissive.

use std::sync::Arc;

use axum::{routing::get, Router};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::orderbook::OrderBookManager;

pub mod error;
pub mod handlers;
pub mod state;

pub use error::ApiError;
pub use state::ApiState;

/// Build the router serving `manager`
pub fn create_router(manager: Arc<OrderBookManager>) -> Router {
    Router::new()
        .route("/orderbook", get(handlers::get_orderbook))
        .route("/health", get(handlers::health))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(ApiState::new(manager))
}
