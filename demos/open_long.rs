//! Open a small ETH long and watch it settle
//!
//! Run with: cargo run --example open_long
//!
//! Requires PRIVATE_KEY environment variable

use std::time::Duration;

use gmx_sdk::{
    constants::parse_units, price_store, spawn_price_poller, GmxClient, IncreaseOrderRequest,
    LocalSigner, NetworkConfig, PriceFeed, Side,
};

#[tokio::main]
async fn main() -> eyre::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt::init();

    let private_key = std::env::var("PRIVATE_KEY").expect("PRIVATE_KEY must be set");
    let collateral = std::env::var("COLLATERAL_USDC").unwrap_or_else(|_| "20".to_string());
    let size = std::env::var("SIZE_USD").unwrap_or_else(|_| "100".to_string());

    let config = NetworkConfig::from_env()?;
    let signer = LocalSigner::from_config(&private_key, &config).await?;

    let (writer, mut prices) = price_store();
    let feed = PriceFeed::new(&config.keeper_api_url, config.polling.request_timeout)?;
    let price_poller = spawn_price_poller(feed, writer, config.polling.price_interval);
    prices.changed().await;

    let mut client = GmxClient::new(signer, config.clone(), prices)?;
    println!("Connected wallet: {}", client.address());

    client.engine().refresh_markets().await?;
    let position_poller = client.engine_mut().spawn_position_poller()?;

    let usdc = config.contracts.usdc;
    let required = parse_units(&collateral, 6)?;
    if !client.check_approval(usdc, required).await?.is_approved() {
        println!("Approving USDC...");
        client.approve_collateral(usdc, required).await?;
    }

    println!("Opening ${} long with {} USDC...", size, collateral);
    let request =
        IncreaseOrderRequest::market(config.contracts.market, usdc, Side::Long, collateral, size);
    match client.submit_increase_order(request).await {
        Ok(order) => {
            println!("Order submitted: {}", config.tx_url(order.tx_hash));
            if let Some(position) = order.position {
                println!(
                    "Optimistic: entry ${:.2}, {:.2}x, liq ${:.2}",
                    position.entry_price, position.leverage, position.liquidation_price
                );
            }
        }
        Err(e) => {
            println!("Order failed: {}", e.user_message());
            return Ok(());
        }
    }

    // Give the keeper a few polls to execute
    for _ in 0..10 {
        tokio::time::sleep(Duration::from_secs(3)).await;
        for position in client.engine().positions().await {
            println!(
                "  {} {} ${:.2} pnl ${:.2} ({:?})",
                position.side,
                position.market,
                position.size_usd_f64(),
                position.pnl,
                position.source
            );
        }
    }

    position_poller.shutdown().await;
    price_poller.shutdown().await;
    Ok(())
}
