use std::sync::Arc;

use depth_sync::api::create_router;
use depth_sync::bus::websocket::{DepthStreamBridge, ReconnectConfig};
use depth_sync::bus::{LocalBus, Transport};
use depth_sync::client::RestClient;
use depth_sync::orderbook::OrderBookManager;
use depth_sync::Config;
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("depth_sync=info,tower_http=info")),
        )
        .init();

    let config = Config::from_env()?;
    tracing::info!(symbols = ?config.symbols(), "Starting order book service");

    let source = Arc::new(RestClient::new(&config)?);
    let manager = Arc::new(OrderBookManager::new(source, &config));

    // Subscribe before any bridge publishes so no diff is missed
    let bus = Arc::new(LocalBus::default());
    let subscription = bus.subscribe("depth.*")?;
    tokio::spawn(Arc::clone(&manager).run_subscription(subscription));

    for symbol in config.symbols() {
        let bridge = DepthStreamBridge::new(&config, symbol, ReconnectConfig::default())?;
        let bus = Arc::clone(&bus);
        tokio::spawn(async move {
            if let Err(e) = bridge.run(bus).await {
                tracing::error!(error = %e, "depth stream bridge stopped");
            }
        });

        let manager = Arc::clone(&manager);
        let symbol = symbol.clone();
        tokio::spawn(async move {
            manager.load_snapshot(&symbol).await;
        });
    }

    if let Some(every) = config.status_interval() {
        manager.spawn_status_reporter(every);
    }

    let app = create_router(Arc::clone(&manager));
    let listener = TcpListener::bind(config.listen_addr()).await?;

    tracing::info!("Listening on {}", config.listen_addr());
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("Shutting down");
        })
        .await?;

    Ok(())
}
