//! Scripted Multicall3 transport for engine and trigger tests

use alloy_primitives::{Bytes, U256};
use async_trait::async_trait;
use eyre::{eyre, Result};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::Notify;

use crate::multicall::{IMulticall3, MulticallTransport};

/// What one round trip answers
#[derive(Debug, Clone)]
pub enum Reply {
    /// uint256 per call, in call order
    Values(Vec<U256>),
    /// Whole round trip errors
    Fail,
    /// Entry at this index reports success = false
    Revert(usize),
}

struct Step {
    gate: Option<Arc<Notify>>,
    reply: Reply,
}

/// Pops one scripted step per round trip, then repeats `fallback`
pub struct SequencedTransport {
    steps: Mutex<VecDeque<Step>>,
    fallback: Reply,
    round_trips: AtomicUsize,
}

impl SequencedTransport {
    pub fn repeating(reply: Reply) -> Self {
        Self {
            steps: Mutex::new(VecDeque::new()),
            fallback: reply,
            round_trips: AtomicUsize::new(0),
        }
    }

    /// Queue a reply for the next round trip
    pub fn then(self, reply: Reply) -> Self {
        self.push(None, reply);
        self
    }

    /// Queue a reply that is held back until `gate` is notified
    pub fn then_gated(self, gate: Arc<Notify>, reply: Reply) -> Self {
        self.push(Some(gate), reply);
        self
    }

    fn push(&self, gate: Option<Arc<Notify>>, reply: Reply) {
        self.steps.lock().unwrap().push_back(Step { gate, reply });
    }

    pub fn round_trips(&self) -> usize {
        self.round_trips.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MulticallTransport for SequencedTransport {
    async fn aggregate3(
        &self,
        calls: Vec<IMulticall3::Call3>,
    ) -> Result<Vec<IMulticall3::Result>> {
        self.round_trips.fetch_add(1, Ordering::SeqCst);

        let step = self.steps.lock().unwrap().pop_front();
        let reply = match step {
            Some(Step { gate, reply }) => {
                if let Some(gate) = gate {
                    gate.notified().await;
                }
                reply
            }
            None => self.fallback.clone(),
        };

        match reply {
            Reply::Fail => Err(eyre!("connection reset")),
            Reply::Values(values) => Ok(calls
                .iter()
                .zip(values.iter().chain(std::iter::repeat(&U256::ZERO)))
                .map(|(_, v)| ok_word(*v))
                .collect()),
            Reply::Revert(bad) => Ok((0..calls.len())
                .map(|i| {
                    if i == bad {
                        IMulticall3::Result {
                            success: false,
                            returnData: Bytes::new(),
                        }
                    } else {
                        ok_word(U256::from(1u64))
                    }
                })
                .collect()),
        }
    }
}

fn ok_word(v: U256) -> IMulticall3::Result {
    IMulticall3::Result {
        success: true,
        returnData: v.to_be_bytes::<32>().to_vec().into(),
    }
}

/// Decimal string -> fixed point uint256
pub fn fixed(value: &str, decimals: usize) -> U256 {
    let (int_part, frac_part) = value.split_once('.').unwrap_or((value, ""));
    assert!(frac_part.len() <= decimals, "too many decimals in {value}");
    let digits = format!("{}{:0<width$}", int_part, frac_part, width = decimals);
    U256::from_str_radix(&digits, 10).unwrap()
}

/// Positional replies for (rewardsDuration, rewardRate, totalSupply, get_virtual_price)
pub fn snapshot_values(
    duration: &str,
    rate: &str,
    supply: &str,
    virtual_price: &str,
) -> Vec<U256> {
    vec![
        fixed(duration, 0),
        fixed(rate, 18),
        fixed(supply, 18),
        fixed(virtual_price, 18),
    ]
}
