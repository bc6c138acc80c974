//! Multicall Batcher
//!
//! Groups independent read-only contract calls into ONE Multicall3
//! `aggregate3` eth_call. All reads execute inside a single call frame, so
//! they observe the same block.
//!
//! ## Guarantees
//!
//! - Results are positionally aligned with the requests
//! - Each result is decoded with the precision its handle declares
//! - The batch fails as a unit: no partial results are ever returned

mod batcher;
mod handle;
mod types;

use alloy_primitives::Address;
use thiserror::Error;

pub use batcher::{HttpMulticall, MulticallBatcher, MulticallTransport, RawCallResult};
pub use handle::{ContractHandle, ContractKind, MethodSchema, ReadRequest};
pub use types::{
    ICurvePool, IMulticall3, IStakingRewards, CURVE_STETH_POOL, MULTICALL3, PICKLE_STECRV_JAR,
    STECRV, STECRV_LDO_REWARDS,
};

/// Why a batch produced no results
#[derive(Debug, Error)]
pub enum BatchError {
    #[error("{signature} is not in the schema of {contract}")]
    UnknownMethod {
        contract: Address,
        signature: &'static str,
    },

    #[error("Multicall3 failed: {0}")]
    Transport(eyre::Report),

    #[error("Multicall3 returned {got} results for {expected} calls")]
    LengthMismatch { expected: usize, got: usize },

    #[error("call #{index} ({signature}) reverted")]
    Reverted { index: usize, signature: &'static str },

    #[error("call #{index} ({signature}) could not be decoded: {reason}")]
    Decode {
        index: usize,
        signature: &'static str,
        reason: String,
    },
}
