//! Route handlers.

use axum::{
    extract::{Query, State},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::orderbook::DepthView;

use super::error::ApiError;
use super::state::ApiState;

/// Query string of `GET /orderbook`
#[derive(Debug, Default, Deserialize)]
pub struct OrderBookQuery {
    /// Symbol to look up, any case
    pub symbol: Option<String>,
}

/// Body of `GET /health`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthResponse {
    /// Always `"ok"` while the process is serving
    pub status: String,
    /// Number of installed books
    pub symbols: usize,
}

/// `GET /orderbook?symbol=<SYMBOL>`
pub async fn get_orderbook(
    State(state): State<ApiState>,
    Query(query): Query<OrderBookQuery>,
) -> Result<Json<DepthView>, ApiError> {
    let symbol = query
        .symbol
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| ApiError::BadRequest("Missing symbol parameter".into()))?
        .to_uppercase();

    state
        .manager
        .view(&symbol)
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("Orderbook not found for {}", symbol)))
}

/// `GET /health`
pub async fn health(State(state): State<ApiState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        symbols: state.manager.len(),
    })
}
