//! Stream keeper prices for every active market
//!
//! Run with: cargo run --example keeper_watch
//!
//! Reads GMX_* variables from the environment or `.env`

use gmx_sdk::{
    constants::price_to_f64, price_store, spawn_price_poller, MarketRegistry, NetworkConfig,
    PriceFeed, RpcChainReader,
};

#[tokio::main]
async fn main() -> eyre::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt::init();

    let config = NetworkConfig::from_env()?;
    let chain = RpcChainReader::new(&config.rpc_url, config.contracts.clone())?;

    let (writer, mut prices) = price_store();
    let feed = PriceFeed::new(&config.keeper_api_url, config.polling.request_timeout)?;
    let poller = spawn_price_poller(feed, writer, config.polling.listing_price_interval);

    // Pool values need prices, so wait for the first snapshot before resolving markets
    if !prices.changed().await {
        eyre::bail!("Price poller stopped before publishing");
    }
    let registry =
        MarketRegistry::resolve_markets(&chain, &prices.snapshot(), &config.risk).await?;

    println!("\n========================================");
    println!("         GMX Keeper Price Watch");
    println!("========================================");
    println!("Markets: {}", registry.markets().len());

    loop {
        let snapshot = prices.snapshot();
        println!("\n----------------------------------------");
        for market in registry.active_markets() {
            let Some(token) = registry.token(market.index_token) else {
                continue;
            };
            match snapshot.get(market.index_token) {
                Some(raw) => println!(
                    "  {:<12} ${:>12.4}   pool ${:.0}",
                    market.name,
                    price_to_f64(raw, token.decimals),
                    market.pool_value_usd
                ),
                None => println!("  {:<12} {:>13}", market.name, "no price"),
            }
        }

        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            changed = prices.changed() => {
                if !changed {
                    break;
                }
            }
        }
    }

    poller.shutdown().await;
    println!("\nGoodbye!");
    Ok(())
}
