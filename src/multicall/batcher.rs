//! Multicall3 batch execution and per-field decoding

use alloy_primitives::utils::format_units;
use alloy_primitives::{Address, U256};
use alloy_provider::{Provider, ProviderBuilder};
use alloy_rpc_types::TransactionRequest;
use alloy_sol_types::SolCall;
use async_trait::async_trait;
use eyre::{eyre, Result};
use std::sync::Arc;
use tracing::{debug, trace};

use super::handle::ReadRequest;
use super::types::{IMulticall3, MULTICALL3};
use super::BatchError;

// ============================================
// TRANSPORT
// ============================================

/// Anything that can execute one `aggregate3` round trip
#[async_trait]
pub trait MulticallTransport: Send + Sync {
    async fn aggregate3(
        &self,
        calls: Vec<IMulticall3::Call3>,
    ) -> Result<Vec<IMulticall3::Result>>;
}

/// Multicall3 over an HTTP JSON-RPC endpoint
pub struct HttpMulticall {
    rpc_url: String,
    multicall: Address,
}

impl HttpMulticall {
    pub fn new(rpc_url: String) -> Self {
        Self::with_address(rpc_url, MULTICALL3)
    }

    pub fn with_address(rpc_url: String, multicall: Address) -> Self {
        Self { rpc_url, multicall }
    }
}

#[async_trait]
impl MulticallTransport for HttpMulticall {
    /// Execute Multicall3 batch - SINGLE RPC call
    async fn aggregate3(
        &self,
        calls: Vec<IMulticall3::Call3>,
    ) -> Result<Vec<IMulticall3::Result>> {
        let provider = ProviderBuilder::new().connect_http(self.rpc_url.parse()?);

        let calldata = IMulticall3::aggregate3Call { calls }.abi_encode();

        let tx = TransactionRequest::default()
            .to(self.multicall)
            .input(calldata.into());

        let result = provider
            .call(tx)
            .await
            .map_err(|e| eyre!("eth_call failed: {}", e))?;

        let decoded = IMulticall3::aggregate3Call::abi_decode_returns(&result)
            .map_err(|e| eyre!("Failed to decode multicall: {}", e))?;

        Ok(decoded)
    }
}

// ============================================
// RESULTS
// ============================================

/// One decoded read, aligned with its request
#[derive(Debug, Clone, PartialEq)]
pub struct RawCallResult {
    pub raw: U256,
    pub decimals: u8,
    /// `raw` formatted with `decimals` and parsed as a float
    pub value: f64,
}

impl RawCallResult {
    /// Fixed-point parse of a raw uint256
    pub fn decode(raw: U256, decimals: u8) -> std::result::Result<Self, String> {
        let formatted = format_units(raw, decimals).map_err(|e| e.to_string())?;
        let value = formatted
            .parse::<f64>()
            .map_err(|e| format!("{} ({})", e, formatted))?;

        Ok(Self {
            raw,
            decimals,
            value,
        })
    }
}

// ============================================
// BATCHER
// ============================================

/// Runs a list of reads as one Multicall3 batch
#[derive(Clone)]
pub struct MulticallBatcher {
    transport: Arc<dyn MulticallTransport>,
}

impl MulticallBatcher {
    pub fn new(transport: Arc<dyn MulticallTransport>) -> Self {
        Self { transport }
    }

    /// Execute all requests in one round trip.
    ///
    /// Sub-calls are sent with `allowFailure = false` so a revert anywhere
    /// reverts the batch. A short response, a failed entry or an
    /// undecodable return also fail the whole batch.
    pub async fn execute(
        &self,
        requests: &[ReadRequest],
    ) -> std::result::Result<Vec<RawCallResult>, BatchError> {
        if requests.is_empty() {
            return Ok(Vec::new());
        }

        let calls: Vec<IMulticall3::Call3> = requests
            .iter()
            .map(|req| IMulticall3::Call3 {
                target: req.target,
                allowFailure: false,
                callData: req.call_data.clone(),
            })
            .collect();

        debug!("Executing {} reads in 1 multicall", calls.len());
        let results = self
            .transport
            .aggregate3(calls)
            .await
            .map_err(BatchError::Transport)?;

        if results.len() != requests.len() {
            return Err(BatchError::LengthMismatch {
                expected: requests.len(),
                got: results.len(),
            });
        }

        let mut decoded = Vec::with_capacity(results.len());
        for (index, (req, result)) in requests.iter().zip(results.iter()).enumerate() {
            if !result.success {
                return Err(BatchError::Reverted {
                    index,
                    signature: req.signature,
                });
            }

            let raw = (req.decode)(&result.returnData).map_err(|e| BatchError::Decode {
                index,
                signature: req.signature,
                reason: e.to_string(),
            })?;

            let value = RawCallResult::decode(raw, req.decimals).map_err(|reason| {
                BatchError::Decode {
                    index,
                    signature: req.signature,
                    reason,
                }
            })?;

            trace!("{} @ {} = {}", req.signature, req.target, value.value);
            decoded.push(value);
        }

        Ok(decoded)
    }
}
