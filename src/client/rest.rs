//! HTTP REST client for the exchange snapshot endpoint.
//!
//! This module provides the [`RestClient`], the production
//! [`SnapshotSource`](super::SnapshotSource).
//!
//! # Example
//!
//! ```rust,no_run
//! use depth_sync::client::RestClient;
//! use depth_sync::Config;
//!
//! # async fn example() -> depth_sync::Result<()> {
//! let config = Config::new(["BTCUSDT"]);
//! let rest = RestClient::new(&config)?;
//!
//! let snapshot = rest.get_depth("BTCUSDT", 1000).await?;
//! println!("lastUpdateId={}", snapshot.last_update_id);
//! # Ok(())
//! # }
//! ```

use async_trait::async_trait;
use reqwest::Client;

use crate::config::Config;
use crate::error::{ApiError, Error};
use crate::types::messages::DepthSnapshot;
use crate::types::Snapshot;

use super::SnapshotSource;

/// Path of the order book depth endpoint
pub const DEPTH_PATH: &str = "/api/v3/depth";

/// HTTP client for the exchange REST API
#[derive(Debug, Clone)]
pub struct RestClient {
    client: Client,
    base_url: String,
    snapshot_limit: u32,
}

impl RestClient {
    /// Create a new REST client
    ///
    /// Every request is bounded by [`Config::timeout`].
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be initialized.
    pub fn new(config: &Config) -> Result<Self, Error> {
        let client = Client::builder().timeout(config.timeout()).build()?;

        Ok(Self {
            client,
            base_url: config.rest_base_url().to_string(),
            snapshot_limit: config.snapshot_limit(),
        })
    }

    /// Make a GET request to the API
    ///
    /// # Arguments
    ///
    /// * `path` - API path (without base URL)
    /// * `query` - Query string parameters
    ///
    /// # Returns
    ///
    /// Deserialized response body
    pub async fn get<T>(&self, path: &str, query: &[(&str, String)]) -> Result<T, Error>
    where
        T: serde::de::DeserializeOwned,
    {
        let url = format!("{}{}", self.base_url, path);
        let response = self
            .client
            .get(&url)
            .query(query)
            .send()
            .await
            .map_err(map_send_error)?;

        self.handle_response(response).await
    }

    /// Fetch the order book snapshot for a symbol
    ///
    /// # Arguments
    ///
    /// * `symbol` - Symbol, upper-case
    /// * `limit` - Number of levels per side
    pub async fn get_depth(&self, symbol: &str, limit: u32) -> Result<DepthSnapshot, Error> {
        self.get(
            DEPTH_PATH,
            &[("symbol", symbol.to_string()), ("limit", limit.to_string())],
        )
        .await
    }

    /// Handle the HTTP response, checking for errors
    async fn handle_response<T>(&self, response: reqwest::Response) -> Result<T, Error>
    where
        T: serde::de::DeserializeOwned,
    {
        let status = response.status();

        // 418 is the exchange's "IP banned after ignoring 429s"
        if status.as_u16() == 429 || status.as_u16() == 418 {
            let retry_after = response
                .headers()
                .get("Retry-After")
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse().ok());

            return Err(Error::RateLimited {
                retry_after_secs: retry_after,
            });
        }

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();

            // Error bodies look like {"code":-1121,"msg":"Invalid symbol."}
            if let Ok(error_response) = serde_json::from_str::<serde_json::Value>(&body) {
                let message = error_response
                    .get("msg")
                    .or_else(|| error_response.get("message"))
                    .and_then(|v| v.as_str())
                    .unwrap_or(&body)
                    .to_string();

                let code = error_response.get("code").and_then(|v| v.as_i64());

                return Err(Error::Api(ApiError {
                    status: status.as_u16(),
                    code,
                    message,
                }));
            }

            return Err(Error::Api(ApiError::new(status.as_u16(), body)));
        }

        let body = response.text().await?;
        serde_json::from_str(&body).map_err(Error::from)
    }

    /// Get the base URL
    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

fn map_send_error(e: reqwest::Error) -> Error {
    if e.is_timeout() {
        Error::Timeout
    } else {
        Error::Http(e)
    }
}

#[async_trait]
impl SnapshotSource for RestClient {
    async fn fetch_snapshot(&self, symbol: &str) -> Result<Snapshot, Error> {
        let raw = self.get_depth(symbol, self.snapshot_limit).await?;
        Snapshot::try_from(raw)
    }
}
