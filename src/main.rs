//! Jar APY watcher
//!
//! Run with: cargo run -- [--once] [--json] [--config jar-apy.toml]
//!
//! Prices are polled from CoinGecko; every new price table (or jar list)
//! triggers a fresh Multicall3 read and APY derivation.

use clap::Parser;
use color_eyre::eyre::Result;
use console::style;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use jar_apy::config::Config;
use jar_apy::multicall::{ContractHandle, HttpMulticall, MulticallTransport};
use jar_apy::prices::{CoinGeckoPrices, PriceSource};
use jar_apy::{DerivedApy, JarApyOutput, RecomputeTrigger, YieldEngine};

#[derive(Parser)]
#[command(version, about)]
struct Cli {
    /// Derive once, print and exit
    #[arg(long)]
    once: bool,

    /// Print output as JSON
    #[arg(long)]
    json: bool,

    /// Path to a TOML configuration file (defaults to environment)
    #[arg(short, long)]
    config: Option<String>,
}

fn print_banner() {
    println!();
    println!(
        "{}",
        style("═══════════════════════════════════════════════════════════════").cyan()
    );
    println!(
        "{}",
        style(" 🥒 JAR APY - LDO rewards on Curve steCRV").cyan().bold()
    );
    println!(
        "{}",
        style("    Multicall3 reads | CoinGecko prices | Live recompute").cyan()
    );
    println!(
        "{}",
        style("═══════════════════════════════════════════════════════════════").cyan()
    );
    println!();
}

fn print_output(output: &JarApyOutput, json: bool) {
    if json {
        match serde_json::to_string(output) {
            Ok(line) => println!("{}", line),
            Err(e) => error!("Failed to serialize output: {}", e),
        }
        return;
    }

    for apy in &output.apys {
        println!(
            "{} {}",
            style("📈").green(),
            style(apy.to_string()).green().bold()
        );
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("jar_apy=info".parse()?),
        )
        .init();

    // Load configuration
    let config = match &cli.config {
        Some(path) => Config::from_file(path)?,
        None => Config::from_env()?,
    };

    if let Err(e) = config.validate() {
        error!("Configuration validation failed: {}", e);
        error!("Please check your .env file");
        return Err(e);
    }

    if !cli.json {
        print_banner();
        config.print_summary();
        println!();
    }

    let transport: Arc<dyn MulticallTransport> = Arc::new(HttpMulticall::with_address(
        config.rpc_url.clone(),
        config.multicall_address,
    ));
    let engine = Arc::new(
        YieldEngine::new(Some(transport)).with_symbols(&config.reward_token, &config.base_asset),
    );
    let pool = ContractHandle::pool(config.pool_address);
    let staking = ContractHandle::staking_rewards(config.staking_rewards_address);
    let prices = CoinGeckoPrices::new(&config.price_api_url)?;

    if cli.once {
        let table = prices.fetch_prices().await?;
        let apy = engine
            .derive_apy(Some(&pool), Some(&staking), Some(&table))
            .await
            .unwrap_or_else(|| DerivedApy::zero(engine.reward_token()));
        let output = JarApyOutput::single(apy);
        print_output(&output, cli.json);
        return Ok(());
    }

    let (feed, handle) = RecomputeTrigger::new(engine, Some(pool), Some(staking)).spawn();
    feed.publish_jars(Arc::new(config.jars.clone()));

    let mut outputs = handle.subscribe();
    let mut poll = tokio::time::interval(Duration::from_secs(config.refresh_interval_secs));

    info!(
        "Watching {} jar(s), refreshing prices every {}s",
        config.jars.len(),
        config.refresh_interval_secs
    );

    loop {
        tokio::select! {
            _ = poll.tick() => {
                match prices.fetch_prices().await {
                    Ok(table) => {
                        info!("Fetched {} prices", table.len());
                        feed.publish_prices(Arc::new(table));
                    }
                    // Previous table stays in place
                    Err(e) => warn!("Price refresh failed: {}", e),
                }
            }
            changed = outputs.changed() => {
                if changed.is_err() {
                    break;
                }
                let output = outputs.borrow_and_update().clone();
                print_output(&output, cli.json);
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Shutting down");
                break;
            }
        }
    }

    drop(feed);
    handle.join().await;

    Ok(())
}
