//! Exchange message types.
//!
//! This module contains the wire formats received from the exchange and
//! their validated counterparts:
//!
//! - [`DepthUpdateEvent`] / [`DiffUpdate`] - incremental depth stream events
//! - [`DepthSnapshot`] / [`Snapshot`] - full book from the REST depth endpoint

use serde::{Deserialize, Serialize};

use crate::error::Error;

use super::level::{parse_levels, PriceLevel, RawLevel};
use super::{TimestampMs, UpdateId};

/// Depth stream event, as published on `depth.<symbol>`
///
/// ```json
/// {"e":"depthUpdate","E":1700000000000,"s":"BTCUSDT","U":157,"u":160,
///  "b":[["50000.00","1.5"]],"a":[["50001.00","0"]]}
/// ```
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DepthUpdateEvent {
    /// Event type (`depthUpdate`)
    #[serde(rename = "e", default)]
    pub event_type: String,
    /// Event time (Unix ms)
    #[serde(rename = "E")]
    pub event_time: TimestampMs,
    /// Symbol
    #[serde(rename = "s")]
    pub symbol: String,
    /// First update ID in this event
    #[serde(rename = "U")]
    pub first_update_id: UpdateId,
    /// Final update ID in this event
    #[serde(rename = "u")]
    pub final_update_id: UpdateId,
    /// Bid changes
    #[serde(rename = "b", default)]
    pub bids: Vec<RawLevel>,
    /// Ask changes
    #[serde(rename = "a", default)]
    pub asks: Vec<RawLevel>,
}

/// Response of `GET /api/v3/depth`
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DepthSnapshot {
    /// Sequence number the snapshot is consistent with
    pub last_update_id: UpdateId,
    /// Bid levels, best first
    pub bids: Vec<RawLevel>,
    /// Ask levels, best first
    pub asks: Vec<RawLevel>,
}

/// A validated incremental update for one symbol
#[derive(Debug, Clone, PartialEq)]
pub struct DiffUpdate {
    /// Symbol, upper-case
    pub symbol: String,
    /// Event time (Unix ms)
    pub event_time: TimestampMs,
    /// First sequence number covered
    pub first_update_id: UpdateId,
    /// Last sequence number covered
    pub final_update_id: UpdateId,
    /// Bid changes in wire order
    pub bids: Vec<PriceLevel>,
    /// Ask changes in wire order
    pub asks: Vec<PriceLevel>,
}

impl DiffUpdate {
    /// Decode and validate a raw depth stream payload
    ///
    /// # Errors
    ///
    /// Returns [`Error::Json`] for undecodable payloads, [`Error::MalformedLevel`]
    /// for unparseable levels and [`Error::MalformedUpdate`] when `U > u`.
    pub fn from_slice(payload: &[u8]) -> Result<Self, Error> {
        let event: DepthUpdateEvent = serde_json::from_slice(payload)?;
        Self::try_from(event)
    }
}

impl TryFrom<DepthUpdateEvent> for DiffUpdate {
    type Error = Error;

    fn try_from(event: DepthUpdateEvent) -> Result<Self, Self::Error> {
        if event.first_update_id > event.final_update_id {
            return Err(Error::MalformedUpdate(format!(
                "first update id {} is past final update id {}",
                event.first_update_id, event.final_update_id
            )));
        }
        Ok(Self {
            symbol: event.symbol.to_uppercase(),
            event_time: event.event_time,
            first_update_id: event.first_update_id,
            final_update_id: event.final_update_id,
            bids: parse_levels(&event.bids)?,
            asks: parse_levels(&event.asks)?,
        })
    }
}

/// A validated full book state
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    /// Sequence number the snapshot is consistent with
    pub last_update_id: UpdateId,
    /// Bid levels
    pub bids: Vec<PriceLevel>,
    /// Ask levels
    pub asks: Vec<PriceLevel>,
}

impl TryFrom<DepthSnapshot> for Snapshot {
    type Error = Error;

    fn try_from(raw: DepthSnapshot) -> Result<Self, Self::Error> {
        Ok(Self {
            last_update_id: raw.last_update_id,
            bids: parse_levels(&raw.bids)?,
            asks: parse_levels(&raw.asks)?,
        })
    }
}
