//! Multicall3 Check Script
//!
//! Run with: cargo run --bin multicall-check
//!
//! Reads the four staking inputs one eth_call at a time, then again through
//! the batcher, and checks that both paths agree.

use alloy_primitives::{Address, Bytes, U256};
use alloy_provider::{Provider, ProviderBuilder};
use alloy_rpc_types::TransactionRequest;
use eyre::Result;
use std::sync::Arc;
use std::time::Instant;

use jar_apy::config::Config;
use jar_apy::multicall::{
    ContractHandle, HttpMulticall, ICurvePool, IStakingRewards, MulticallBatcher, ReadRequest,
};

/// One individual eth_call decoded as uint256
async fn call_uint<P: Provider>(provider: &P, target: Address, calldata: Bytes) -> Result<U256> {
    let tx = TransactionRequest::default()
        .to(target)
        .input(calldata.into());
    let result = provider.call(tx).await?;
    Ok(U256::from_be_slice(&result[..32.min(result.len())]))
}

#[tokio::main]
async fn main() -> Result<()> {
    println!("🧪 Multicall3 Check Script");
    println!("==========================\n");

    let config = Config::from_env()?;
    let rpc_url = config.rpc_url.clone();

    println!("📡 RPC: {}\n", &rpc_url[..50.min(rpc_url.len())]);

    let pool = ContractHandle::pool(config.pool_address);
    let staking = ContractHandle::staking_rewards(config.staking_rewards_address);

    let requests: Vec<ReadRequest> = vec![
        staking.read(IStakingRewards::rewardsDurationCall {})?,
        staking.read(IStakingRewards::rewardRateCall {})?,
        staking.read(IStakingRewards::totalSupplyCall {})?,
        pool.read(ICurvePool::get_virtual_priceCall {})?,
    ];

    // ============================================
    // TEST 1: Individual Calls
    // ============================================
    println!("📊 Test 1: Individual RPC Calls");
    println!("--------------------------------");

    let provider = ProviderBuilder::new().connect_http(rpc_url.parse()?);

    let start = Instant::now();
    let individual = futures::future::try_join_all(
        requests
            .iter()
            .map(|r| call_uint(&provider, r.target, r.call_data.clone())),
    )
    .await?;
    let individual_time = start.elapsed();
    println!("   Fetched {} values in {:?}", individual.len(), individual_time);
    println!("   RPC calls: {}", requests.len());

    // ============================================
    // TEST 2: Batched Through Multicall3
    // ============================================
    println!("\n📊 Test 2: Multicall3 Batched Calls");
    println!("------------------------------------");

    let batcher = MulticallBatcher::new(Arc::new(HttpMulticall::with_address(
        rpc_url,
        config.multicall_address,
    )));

    let start = Instant::now();
    let batched = batcher.execute(&requests).await?;
    let multicall_time = start.elapsed();
    println!("   Fetched {} values in {:?}", batched.len(), multicall_time);
    println!("   RPC calls: 1");

    // ============================================
    // RESULTS COMPARISON
    // ============================================
    println!("\n✅ Data Verification");
    println!("--------------------");

    let mut all_match = true;
    for ((request, single), batch) in requests.iter().zip(&individual).zip(&batched) {
        // Blocks may advance between the individual calls
        let matches = *single == batch.raw;
        let status = if matches { "✓" } else { "✗" };
        println!(
            "   {:<20} {} individual={} batched={} ({} decimals → {})",
            request.signature, status, single, batch.raw, request.decimals, batch.value
        );
        all_match &= matches;
    }

    println!(
        "\n{}",
        if all_match {
            "✅ All data matches! Multicall3 batching is working correctly."
        } else {
            "❌ Some values differ. A new block may have landed between calls; rerun to confirm."
        }
    );

    Ok(())
}
