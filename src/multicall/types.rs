//! Contract Addresses and ABIs
//!
//! Interface definitions for the contracts read by the yield pipeline.
//!
//! CRITICAL: All addresses are for Ethereum Mainnet.

use alloy_primitives::{address, Address};
use alloy_sol_types::sol;

// ============================================
// CORE CONTRACTS
// ============================================

/// Multicall3 (same on all chains)
pub const MULTICALL3: Address = address!("cA11bde05977b3631167028862bE2a173976CA11");

/// Curve stETH/ETH pool (exposes get_virtual_price)
pub const CURVE_STETH_POOL: Address = address!("DC24316b9AE028F1497c275EB9192a3Ea0f67022");

/// steCRV LP token
pub const STECRV: Address = address!("06325440D014e39736583c165C2963BA99fAf14E");

/// LDO StakingRewards for steCRV stakers
pub const STECRV_LDO_REWARDS: Address = address!("99ac10631F69C753DDb595D074422a0922D9056B");

/// Pickle steCRV jar
pub const PICKLE_STECRV_JAR: Address = address!("77C8A58D940a322Aea02dBc8EE4A30350D4239AD");

// ============================================
// SOLIDITY INTERFACES
// ============================================

sol! {
    /// Curve StableSwap pool, read side only
    #[allow(missing_docs)]
    interface ICurvePool {
        /// Virtual price of the LP token (18 decimals, only increases)
        function get_virtual_price() external view returns (uint256);
    }

    /// Synthetix-style StakingRewards
    #[allow(missing_docs)]
    interface IStakingRewards {
        /// Length of a reward period in seconds
        function rewardsDuration() external view returns (uint256);

        /// Reward token emitted per second (18 decimals)
        function rewardRate() external view returns (uint256);

        /// Total LP tokens staked (18 decimals)
        function totalSupply() external view returns (uint256);
    }
}

// ============================================
// MULTICALL3 INTERFACE
// ============================================

sol! {
    #[allow(missing_docs)]
    interface IMulticall3 {
        struct Call3 {
            address target;
            bool allowFailure;
            bytes callData;
        }

        struct Result {
            bool success;
            bytes returnData;
        }

        function aggregate3(Call3[] calldata calls)
            external payable returns (Result[] memory returnData);
    }
}
