//! Contract handles
//!
//! A handle is an immutable (address, schema) pair. The schema lists the
//! read methods the pipeline may call on the contract and the fixed-point
//! precision each result is decoded with.

use alloy_primitives::{Address, Bytes, U256};
use alloy_sol_types::SolCall;
use std::fmt;

use super::types::{ICurvePool, IStakingRewards};
use super::BatchError;

/// Decoder from raw return data to a uint256
pub type ReturnDecoder = fn(&[u8]) -> alloy_sol_types::Result<U256>;

/// One callable read method and its result precision
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MethodSchema {
    pub signature: &'static str,
    pub decimals: u8,
}

/// Which contract a handle describes (for logging)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContractKind {
    Pool,
    StakingRewards,
}

impl fmt::Display for ContractKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ContractKind::Pool => write!(f, "Pool"),
            ContractKind::StakingRewards => write!(f, "StakingRewards"),
        }
    }
}

/// A deployed contract plus its readable methods
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContractHandle {
    pub address: Address,
    pub kind: ContractKind,
    methods: Vec<MethodSchema>,
}

impl ContractHandle {
    /// Curve pool: exposes the LP virtual price
    pub fn pool(address: Address) -> Self {
        Self {
            address,
            kind: ContractKind::Pool,
            methods: vec![MethodSchema {
                signature: ICurvePool::get_virtual_priceCall::SIGNATURE,
                decimals: 18,
            }],
        }
    }

    /// StakingRewards: duration is an integer, rate and supply are token amounts
    pub fn staking_rewards(address: Address) -> Self {
        Self {
            address,
            kind: ContractKind::StakingRewards,
            methods: vec![
                MethodSchema {
                    signature: IStakingRewards::rewardsDurationCall::SIGNATURE,
                    decimals: 0,
                },
                MethodSchema {
                    signature: IStakingRewards::rewardRateCall::SIGNATURE,
                    decimals: 18,
                },
                MethodSchema {
                    signature: IStakingRewards::totalSupplyCall::SIGNATURE,
                    decimals: 18,
                },
            ],
        }
    }

    pub fn methods(&self) -> &[MethodSchema] {
        &self.methods
    }

    /// Declared precision for a method, if the schema has it
    pub fn decimals_for(&self, signature: &str) -> Option<u8> {
        self.methods
            .iter()
            .find(|m| m.signature == signature)
            .map(|m| m.decimals)
    }

    /// Build a read request for `call`, checked against the schema
    pub fn read<C>(&self, call: C) -> Result<ReadRequest, BatchError>
    where
        C: SolCall<Return = U256>,
    {
        let decimals = self
            .decimals_for(C::SIGNATURE)
            .ok_or_else(|| BatchError::UnknownMethod {
                contract: self.address,
                signature: C::SIGNATURE,
            })?;

        Ok(ReadRequest {
            target: self.address,
            signature: C::SIGNATURE,
            call_data: call.abi_encode().into(),
            decimals,
            decode: C::abi_decode_returns,
        })
    }
}

/// A single encoded read, ready to be batched
#[derive(Clone)]
pub struct ReadRequest {
    pub target: Address,
    pub signature: &'static str,
    pub call_data: Bytes,
    pub decimals: u8,
    pub(crate) decode: ReturnDecoder,
}

impl fmt::Debug for ReadRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReadRequest")
            .field("target", &self.target)
            .field("signature", &self.signature)
            .field("decimals", &self.decimals)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::multicall::types::{CURVE_STETH_POOL, STECRV_LDO_REWARDS};

    #[test]
    fn test_pool_schema() {
        let pool = ContractHandle::pool(CURVE_STETH_POOL);
        assert_eq!(pool.methods().len(), 1);
        assert_eq!(pool.decimals_for("get_virtual_price()"), Some(18));
        assert_eq!(pool.decimals_for("rewardRate()"), None);
    }

    #[test]
    fn test_staking_schema_precisions() {
        let staking = ContractHandle::staking_rewards(STECRV_LDO_REWARDS);
        assert_eq!(staking.decimals_for("rewardsDuration()"), Some(0));
        assert_eq!(staking.decimals_for("rewardRate()"), Some(18));
        assert_eq!(staking.decimals_for("totalSupply()"), Some(18));
    }

    #[test]
    fn test_read_encodes_selector() {
        let staking = ContractHandle::staking_rewards(STECRV_LDO_REWARDS);
        let req = staking.read(IStakingRewards::rewardRateCall {}).unwrap();

        assert_eq!(req.target, STECRV_LDO_REWARDS);
        assert_eq!(req.decimals, 18);
        assert_eq!(&req.call_data[..], &IStakingRewards::rewardRateCall::SELECTOR[..]);
    }

    #[test]
    fn test_read_rejects_method_outside_schema() {
        let pool = ContractHandle::pool(CURVE_STETH_POOL);
        let err = pool.read(IStakingRewards::totalSupplyCall {}).unwrap_err();
        assert!(matches!(err, BatchError::UnknownMethod { .. }));
    }
}
