//! Jar descriptors
//!
//! The recompute trigger only watches the jar list for changes; it never
//! reads which jars are in it.

use alloy_primitives::Address;
use serde::{Deserialize, Serialize};

use crate::multicall::{PICKLE_STECRV_JAR, STECRV};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Jar {
    pub name: String,
    pub address: Address,
    /// Token deposited into the jar
    pub deposit_token: Address,
}

impl Jar {
    pub fn new(name: &str, address: Address, deposit_token: Address) -> Self {
        Self {
            name: name.to_string(),
            address,
            deposit_token,
        }
    }
}

/// Jars earning LDO on Curve steCRV
pub fn default_jars() -> Vec<Jar> {
    vec![Jar::new("pJar 0.69b (steCRV)", PICKLE_STECRV_JAR, STECRV)]
}
