//! Tests for the REST snapshot client against a local stand-in server.

use std::collections::HashMap;

use axum::extract::Query;
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use depth_sync::client::{RestClient, SnapshotSource};
use depth_sync::{Config, Error};
use serde_json::json;
use tokio::net::TcpListener;

async fn depth(Query(params): Query<HashMap<String, String>>) -> impl IntoResponse {
    match params.get("symbol").map(String::as_str) {
        Some("BTCUSDT") => {
            let limit: usize = params
                .get("limit")
                .and_then(|l| l.parse().ok())
                .unwrap_or(100);
            let bids: Vec<[String; 2]> = (0..limit.min(3))
                .map(|i| [format!("{}.10", 100 - i), "1.00000000".to_string()])
                .collect();
            (
                StatusCode::OK,
                HeaderMap::new(),
                Json(json!({"lastUpdateId": 1027024, "bids": bids, "asks": [["101.00", "4.5"]]})),
            )
        }
        Some("LIMITED") => {
            let mut headers = HeaderMap::new();
            headers.insert("Retry-After", "30".parse().unwrap());
            (StatusCode::TOO_MANY_REQUESTS, headers, Json(json!({})))
        }
        Some("BROKEN") => (
            StatusCode::OK,
            HeaderMap::new(),
            Json(json!({"lastUpdateId": 1, "bids": [["abc", "1"]], "asks": []})),
        ),
        _ => (
            StatusCode::BAD_REQUEST,
            HeaderMap::new(),
            Json(json!({"code": -1121, "msg": "Invalid symbol."})),
        ),
    }
}

async fn client() -> RestClient {
    let app = Router::new().route("/api/v3/depth", get(depth));
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    let config = Config::new(["BTCUSDT"])
        .with_rest_base_url(format!("http://{}", addr))
        .with_snapshot_limit(2);
    RestClient::new(&config).unwrap()
}

#[tokio::test]
async fn test_fetch_snapshot() {
    let client = client().await;
    let snapshot = client.fetch_snapshot("BTCUSDT").await.unwrap();

    assert_eq!(snapshot.last_update_id, 1027024);
    // limit=2 was passed through
    assert_eq!(snapshot.bids.len(), 2);
    assert_eq!(snapshot.bids[0].price, "100.10");
    assert_eq!(snapshot.asks[0].quantity, 4.5);
}

#[tokio::test]
async fn test_rate_limited() {
    let client = client().await;
    let result = client.fetch_snapshot("LIMITED").await;
    assert!(matches!(
        result,
        Err(Error::RateLimited {
            retry_after_secs: Some(30)
        })
    ));
}

#[tokio::test]
async fn test_api_error_body() {
    let client = client().await;
    match client.fetch_snapshot("NOPE").await {
        Err(Error::Api(e)) => {
            assert_eq!(e.status, 400);
            assert_eq!(e.code, Some(-1121));
            assert_eq!(e.message, "Invalid symbol.");
            assert!(e.is_client_error());
        }
        other => panic!("expected API error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_malformed_level_rejected() {
    let client = client().await;
    let result = client.fetch_snapshot("BROKEN").await;
    assert!(matches!(result, Err(Error::MalformedLevel { .. })));
}
