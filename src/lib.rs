//! LDO reward APY for Curve steCRV jars
//!
//! Reads a StakingRewards contract and its Curve pool through one Multicall3
//! batch, prices the reward stream and compounds it into an APY. The result
//! is recomputed whenever the jar list or the price table changes.

pub mod config;
pub mod engine;
pub mod jar;
pub mod multicall;
pub mod output;
pub mod prices;
pub mod rates;
pub mod trigger;

#[cfg(test)]
mod test_support;

pub use engine::{DeriveError, StakingSnapshot, YieldEngine};
pub use output::{DerivedApy, JarApyOutput};
pub use prices::PriceTable;
pub use trigger::{ApyHandle, DependencyFeed, RecomputeStatus, RecomputeTrigger};
