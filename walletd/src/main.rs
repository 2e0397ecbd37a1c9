//! Walletd Binary
//!
//! Boots the wallet service: ledger engine, idempotency guard, and
//! customer directory wired over in-memory stores.

use std::sync::Arc;

use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use walletd::{ServiceConfig, WalletService};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer().json())
        .init();

    info!("Starting walletd");

    // Load configuration
    let config = ServiceConfig::from_env();
    if let Err(e) = config.validate() {
        error!(error = %e, "Invalid configuration");
        return Err(anyhow::anyhow!("Configuration error: {}", e));
    }

    let service = Arc::new(WalletService::new(config));
    service.start();

    let chart = service.chart();
    info!(
        asset_wallet = %chart.asset,
        liability_wallet = %chart.liability,
        "Wallet service running"
    );

    // Keep running until shutdown
    tokio::signal::ctrl_c().await?;
    info!("Shutdown signal received");

    info!("Walletd shutdown complete");
    Ok(())
}
