//! Yield Derivation Engine
//!
//! Reads a StakingRewards contract and its Curve pool in one Multicall3
//! batch and turns the reward emission into a price-denominated APY.
//!
//! CALCULATION:
//! reward = rewardRate * 365 * 86400
//! apr    = reward * price[reward] / (totalSupply * virtualPrice * price[base])
//! apr'   = apr * 0.8
//! output = { apr: apr' * 100, apy: compounding_apy(apr') }
//!
//! Any missing input, failed batch or zero denominator yields no result;
//! the caller keeps whatever it showed before.

use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, warn};

use crate::multicall::{
    BatchError, ContractHandle, ICurvePool, IStakingRewards, MulticallBatcher,
    MulticallTransport,
};
use crate::output::DerivedApy;
use crate::prices::PriceTable;
use crate::rates::{annualize_reward_rate, compounding_apy, discounted_apr};

/// Default reward token symbol
pub const DEFAULT_REWARD_TOKEN: &str = "ldo";

/// Default base asset symbol (pool denomination)
pub const DEFAULT_BASE_ASSET: &str = "eth";

// ============================================
// TYPES
// ============================================

/// Why a derivation produced nothing
#[derive(Debug, Error)]
pub enum DeriveError {
    #[error("missing dependency: {0}")]
    MissingDependency(String),

    #[error("batch failed: {0}")]
    BatchFailure(#[from] BatchError),

    #[error("degenerate stake value: {total_supply} * {virtual_price} * {base_price}")]
    DegenerateDenominator {
        total_supply: f64,
        virtual_price: f64,
        base_price: f64,
    },
}

/// On-chain values read in one batch
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StakingSnapshot {
    /// Reward period length, seconds
    pub rewards_duration: f64,
    /// Reward tokens emitted per second
    pub reward_rate: f64,
    /// LP tokens staked
    pub total_supply: f64,
    /// Curve LP virtual price
    pub virtual_price: f64,
}

// ============================================
// ENGINE
// ============================================

pub struct YieldEngine {
    batcher: Option<MulticallBatcher>,
    reward_token: String,
    base_asset: String,
}

impl YieldEngine {
    pub fn new(transport: Option<Arc<dyn MulticallTransport>>) -> Self {
        Self {
            batcher: transport.map(MulticallBatcher::new),
            reward_token: DEFAULT_REWARD_TOKEN.to_string(),
            base_asset: DEFAULT_BASE_ASSET.to_string(),
        }
    }

    /// Override the reward token and base asset symbols
    pub fn with_symbols(mut self, reward_token: &str, base_asset: &str) -> Self {
        self.reward_token = reward_token.to_lowercase();
        self.base_asset = base_asset.to_lowercase();
        self
    }

    pub fn reward_token(&self) -> &str {
        &self.reward_token
    }

    pub fn base_asset(&self) -> &str {
        &self.base_asset
    }

    /// Derive the APY, or nothing if any input is unusable
    pub async fn derive_apy(
        &self,
        pool: Option<&ContractHandle>,
        staking_rewards: Option<&ContractHandle>,
        prices: Option<&PriceTable>,
    ) -> Option<DerivedApy> {
        match self.try_derive(pool, staking_rewards, prices).await {
            Ok(apy) => Some(apy),
            Err(DeriveError::BatchFailure(e)) => {
                warn!("{} APY skipped, batch failed: {}", self.reward_token, e);
                None
            }
            Err(e) => {
                debug!("{} APY skipped: {}", self.reward_token, e);
                None
            }
        }
    }

    /// Same as `derive_apy` but reports why nothing was produced
    pub async fn try_derive(
        &self,
        pool: Option<&ContractHandle>,
        staking_rewards: Option<&ContractHandle>,
        prices: Option<&PriceTable>,
    ) -> Result<DerivedApy, DeriveError> {
        // Preconditions, checked before any network traffic
        let pool = pool.ok_or_else(|| missing("pool contract"))?;
        let staking = staking_rewards.ok_or_else(|| missing("staking rewards contract"))?;
        let batcher = self.batcher.as_ref().ok_or_else(|| missing("multicall transport"))?;
        let prices = prices.ok_or_else(|| missing("price table"))?;
        let base_price = prices
            .get(&self.base_asset)
            .ok_or_else(|| missing(&format!("{} price", self.base_asset)))?;
        let reward_price = prices
            .get(&self.reward_token)
            .ok_or_else(|| missing(&format!("{} price", self.reward_token)))?;

        let snapshot = read_snapshot(batcher, pool, staking).await?;
        debug!(
            "Staking snapshot: duration={}s rate={}/s supply={} virtual_price={}",
            snapshot.rewards_duration,
            snapshot.reward_rate,
            snapshot.total_supply,
            snapshot.virtual_price
        );

        self.derive_from_snapshot(&snapshot, reward_price, base_price)
    }

    /// Pure part of the derivation
    pub fn derive_from_snapshot(
        &self,
        snapshot: &StakingSnapshot,
        reward_price: f64,
        base_price: f64,
    ) -> Result<DerivedApy, DeriveError> {
        let denominator = snapshot.total_supply * snapshot.virtual_price * base_price;
        if denominator == 0.0 || !denominator.is_finite() {
            return Err(DeriveError::DegenerateDenominator {
                total_supply: snapshot.total_supply,
                virtual_price: snapshot.virtual_price,
                base_price,
            });
        }

        let reward = annualize_reward_rate(snapshot.reward_rate);
        let raw_apr = (reward * reward_price) / denominator;
        let apr = discounted_apr(raw_apr);

        Ok(DerivedApy {
            reward_token: self.reward_token.clone(),
            apr: apr * 100.0,
            apy: compounding_apy(apr),
        })
    }
}

/// Batch the four reads and destructure them by position
async fn read_snapshot(
    batcher: &MulticallBatcher,
    pool: &ContractHandle,
    staking: &ContractHandle,
) -> Result<StakingSnapshot, DeriveError> {
    let requests = [
        staking.read(IStakingRewards::rewardsDurationCall {})?,
        staking.read(IStakingRewards::rewardRateCall {})?,
        staking.read(IStakingRewards::totalSupplyCall {})?,
        pool.read(ICurvePool::get_virtual_priceCall {})?,
    ];

    let results = batcher.execute(&requests).await?;
    match results.as_slice() {
        [duration, rate, supply, virtual_price] => Ok(StakingSnapshot {
            rewards_duration: duration.value,
            reward_rate: rate.value,
            total_supply: supply.value,
            virtual_price: virtual_price.value,
        }),
        other => Err(BatchError::LengthMismatch {
            expected: requests.len(),
            got: other.len(),
        }
        .into()),
    }
}

fn missing(what: &str) -> DeriveError {
    DeriveError::MissingDependency(what.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::multicall::{CURVE_STETH_POOL, STECRV_LDO_REWARDS};
    use crate::test_support::{snapshot_values, Reply, SequencedTransport};

    fn handles() -> (ContractHandle, ContractHandle) {
        (
            ContractHandle::pool(CURVE_STETH_POOL),
            ContractHandle::staking_rewards(STECRV_LDO_REWARDS),
        )
    }

    fn reference_prices() -> PriceTable {
        PriceTable::new().with("ldo", 2.0).with("eth", 1800.0)
    }

    fn engine_with(transport: Arc<SequencedTransport>) -> YieldEngine {
        YieldEngine::new(Some(transport as Arc<dyn MulticallTransport>))
    }

    #[tokio::test]
    async fn test_reference_scenario() {
        let transport = Arc::new(SequencedTransport::repeating(Reply::Values(
            snapshot_values("604800", "1", "1000000", "1.02"),
        )));
        let engine = engine_with(transport.clone());
        let (pool, staking) = handles();

        let apy = engine
            .derive_apy(Some(&pool), Some(&staking), Some(&reference_prices()))
            .await
            .unwrap();

        let raw_apr = (31_536_000.0 * 2.0) / (1_000_000.0 * 1.02 * 1800.0);
        let apr = raw_apr * 0.8;

        assert_eq!(apy.reward_token, "ldo");
        assert!((apy.apr - apr * 100.0).abs() < 1e-9);
        assert!((apy.apy - compounding_apy(apr)).abs() < 1e-9);
        // Ballpark: ~2.75% APR, ~2.78% APY
        assert!((apy.apr - 2.745).abs() < 0.01);
        assert!((apy.apy - 2.782).abs() < 0.01);
        assert!(apy.apy > apy.apr);
        assert_eq!(transport.round_trips(), 1);
    }

    #[tokio::test]
    async fn test_missing_base_price_skips_network() {
        let transport = Arc::new(SequencedTransport::repeating(Reply::Values(
            snapshot_values("604800", "1", "1000000", "1.02"),
        )));
        let engine = engine_with(transport.clone());
        let (pool, staking) = handles();
        let prices = PriceTable::new().with("ldo", 2.0);

        let err = engine
            .try_derive(Some(&pool), Some(&staking), Some(&prices))
            .await
            .unwrap_err();

        assert!(matches!(err, DeriveError::MissingDependency(_)));
        assert_eq!(transport.round_trips(), 0);
    }

    #[tokio::test]
    async fn test_missing_inputs_yield_nothing() {
        let transport = Arc::new(SequencedTransport::repeating(Reply::Values(
            snapshot_values("604800", "1", "1000000", "1.02"),
        )));
        let engine = engine_with(transport.clone());
        let (pool, staking) = handles();
        let prices = reference_prices();

        assert!(engine.derive_apy(None, Some(&staking), Some(&prices)).await.is_none());
        assert!(engine.derive_apy(Some(&pool), None, Some(&prices)).await.is_none());
        assert!(engine.derive_apy(Some(&pool), Some(&staking), None).await.is_none());
        let no_reward = PriceTable::new().with("eth", 1800.0);
        assert!(engine
            .derive_apy(Some(&pool), Some(&staking), Some(&no_reward))
            .await
            .is_none());
        assert_eq!(transport.round_trips(), 0);

        let no_transport = YieldEngine::new(None);
        let err = no_transport
            .try_derive(Some(&pool), Some(&staking), Some(&prices))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            DeriveError::MissingDependency(ref what) if what.contains("transport")
        ));
    }

    #[tokio::test]
    async fn test_batch_failure_yields_nothing() {
        let engine = engine_with(Arc::new(SequencedTransport::repeating(Reply::Fail)));
        let (pool, staking) = handles();

        let err = engine
            .try_derive(Some(&pool), Some(&staking), Some(&reference_prices()))
            .await
            .unwrap_err();
        assert!(matches!(err, DeriveError::BatchFailure(BatchError::Transport(_))));
    }

    #[tokio::test]
    async fn test_reverted_read_yields_nothing() {
        let engine = engine_with(Arc::new(SequencedTransport::repeating(Reply::Revert(3))));
        let (pool, staking) = handles();

        let result = engine
            .derive_apy(Some(&pool), Some(&staking), Some(&reference_prices()))
            .await;
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn test_zero_supply_is_degenerate() {
        let engine = engine_with(Arc::new(SequencedTransport::repeating(Reply::Values(
            snapshot_values("604800", "1", "0", "1.02"),
        ))));
        let (pool, staking) = handles();

        let err = engine
            .try_derive(Some(&pool), Some(&staking), Some(&reference_prices()))
            .await
            .unwrap_err();
        assert!(matches!(err, DeriveError::DegenerateDenominator { .. }));
    }

    #[test]
    fn test_zero_virtual_price_or_base_price_is_degenerate() {
        let engine = YieldEngine::new(None);
        let snapshot = StakingSnapshot {
            rewards_duration: 604_800.0,
            reward_rate: 1.0,
            total_supply: 1_000_000.0,
            virtual_price: 0.0,
        };
        assert!(engine.derive_from_snapshot(&snapshot, 2.0, 1800.0).is_err());

        let snapshot = StakingSnapshot {
            virtual_price: 1.02,
            ..snapshot
        };
        assert!(engine.derive_from_snapshot(&snapshot, 2.0, 0.0).is_err());
        assert!(engine.derive_from_snapshot(&snapshot, 2.0, 1800.0).is_ok());
    }

    #[test]
    fn test_zero_reward_rate_is_zero_apy() {
        let engine = YieldEngine::new(None);
        let snapshot = StakingSnapshot {
            rewards_duration: 604_800.0,
            reward_rate: 0.0,
            total_supply: 1_000_000.0,
            virtual_price: 1.02,
        };

        let apy = engine.derive_from_snapshot(&snapshot, 2.0, 1800.0).unwrap();
        assert_eq!(apy.apr, 0.0);
        assert_eq!(apy.apy, 0.0);
    }

    #[tokio::test]
    async fn test_idempotent() {
        let engine = engine_with(Arc::new(SequencedTransport::repeating(Reply::Values(
            snapshot_values("604800", "0.0112", "97531.5", "1.0931"),
        ))));
        let (pool, staking) = handles();
        let prices = PriceTable::new().with("ldo", 1.37).with("eth", 2410.22);

        let first = engine
            .derive_apy(Some(&pool), Some(&staking), Some(&prices))
            .await
            .unwrap();
        let second = engine
            .derive_apy(Some(&pool), Some(&staking), Some(&prices))
            .await
            .unwrap();

        assert_eq!(first.apr.to_bits(), second.apr.to_bits());
        assert_eq!(first.apy.to_bits(), second.apy.to_bits());
    }

    #[tokio::test]
    async fn test_custom_symbols() {
        let engine = engine_with(Arc::new(SequencedTransport::repeating(Reply::Values(
            snapshot_values("604800", "1", "1000000", "1"),
        ))))
        .with_symbols("CRV", "USD");
        let (pool, staking) = handles();
        let prices = PriceTable::new().with("crv", 0.5).with("usd", 1.0);

        let apy = engine
            .derive_apy(Some(&pool), Some(&staking), Some(&prices))
            .await
            .unwrap();
        assert_eq!(apy.reward_token, "crv");
        // 31_536_000 * 0.5 / 1_000_000 * 0.8 = 12.6144
        assert!((apy.apr - 1261.44).abs() < 1e-6);
    }
}
