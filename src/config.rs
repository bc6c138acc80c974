//! Configuration for the APY watcher
//!
//! Loaded from environment variables (with `.env` support) or a TOML file.

use alloy_primitives::Address;
use eyre::{eyre, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::Path;
use std::str::FromStr;

use crate::engine::{DEFAULT_BASE_ASSET, DEFAULT_REWARD_TOKEN};
use crate::jar::{default_jars, Jar};
use crate::multicall::{CURVE_STETH_POOL, MULTICALL3, STECRV, STECRV_LDO_REWARDS};
use crate::prices::COINGECKO_API_URL;

/// Main configuration struct
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    // ========== Network Settings ==========
    /// RPC URL used for the Multicall3 eth_call
    pub rpc_url: String,

    /// Chain ID (1 = Ethereum Mainnet)
    pub chain_id: u64,

    /// Multicall3 deployment
    pub multicall_address: Address,

    // ========== Contracts ==========
    /// Curve pool exposing get_virtual_price
    pub pool_address: Address,

    /// StakingRewards distributing the reward token
    pub staking_rewards_address: Address,

    // ========== Pricing ==========
    /// Reward token symbol (price table key)
    pub reward_token: String,

    /// Pool denomination symbol (price table key)
    pub base_asset: String,

    /// CoinGecko-compatible price API base URL
    pub price_api_url: String,

    /// Seconds between price polls
    pub refresh_interval_secs: u64,

    // ========== Jars ==========
    /// Jars watched for list changes
    pub jars: Vec<Jar>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            rpc_url: "https://eth.llamarpc.com".to_string(),
            chain_id: 1,
            multicall_address: MULTICALL3,
            pool_address: CURVE_STETH_POOL,
            staking_rewards_address: STECRV_LDO_REWARDS,
            reward_token: DEFAULT_REWARD_TOKEN.to_string(),
            base_asset: DEFAULT_BASE_ASSET.to_string(),
            price_api_url: COINGECKO_API_URL.to_string(),
            refresh_interval_secs: 60,
            jars: default_jars(),
        }
    }
}

impl Config {
    /// Load configuration from environment variables and .env file
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        let defaults = Self::default();

        Ok(Self {
            rpc_url: env::var("RPC_URL").unwrap_or(defaults.rpc_url),
            chain_id: env::var("CHAIN_ID")
                .unwrap_or_else(|_| "1".to_string())
                .parse()
                .unwrap_or(1),
            multicall_address: address_var("MULTICALL_ADDRESS", defaults.multicall_address)?,
            pool_address: address_var("POOL_ADDRESS", defaults.pool_address)?,
            staking_rewards_address: address_var(
                "STAKING_REWARDS_ADDRESS",
                defaults.staking_rewards_address,
            )?,
            reward_token: env::var("REWARD_TOKEN")
                .map(|s| s.to_lowercase())
                .unwrap_or(defaults.reward_token),
            base_asset: env::var("BASE_ASSET")
                .map(|s| s.to_lowercase())
                .unwrap_or(defaults.base_asset),
            price_api_url: env::var("PRICE_API_URL").unwrap_or(defaults.price_api_url),
            refresh_interval_secs: env::var("REFRESH_INTERVAL_SECS")
                .unwrap_or_else(|_| "60".to_string())
                .parse()
                .unwrap_or(60),
            jars: match env::var("JAR_ADDRESSES") {
                Ok(list) => parse_jar_list(&list)?,
                Err(_) => defaults.jars,
            },
        })
    }

    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        let mut config: Self = toml::from_str(&content)?;
        config.reward_token = config.reward_token.to_lowercase();
        config.base_asset = config.base_asset.to_lowercase();
        Ok(config)
    }

    /// Save configuration to a TOML file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }

    /// Validate configuration before starting
    pub fn validate(&self) -> Result<()> {
        if self.rpc_url.is_empty() || self.rpc_url.contains("YOUR_API_KEY") {
            return Err(eyre!("Invalid RPC_URL - please set a valid Ethereum RPC URL"));
        }
        if self.pool_address == Address::ZERO {
            return Err(eyre!("POOL_ADDRESS must not be the zero address"));
        }
        if self.staking_rewards_address == Address::ZERO {
            return Err(eyre!("STAKING_REWARDS_ADDRESS must not be the zero address"));
        }
        if self.reward_token.is_empty() || self.base_asset.is_empty() {
            return Err(eyre!("REWARD_TOKEN and BASE_ASSET must be set"));
        }
        if self.reward_token.eq_ignore_ascii_case(&self.base_asset) {
            return Err(eyre!(
                "REWARD_TOKEN and BASE_ASSET are both '{}'",
                self.reward_token
            ));
        }
        // Output entries are keyed by the reward token next to "apr"
        if self.reward_token.eq_ignore_ascii_case("apr") {
            return Err(eyre!("REWARD_TOKEN cannot be 'apr'"));
        }
        if self.refresh_interval_secs == 0 {
            return Err(eyre!("REFRESH_INTERVAL_SECS must be at least 1"));
        }
        Ok(())
    }

    /// Print configuration summary
    pub fn print_summary(&self) {
        println!("╔════════════════════════════════════════════════════════════╗");
        println!("║                 JAR APY - CONFIGURATION                    ║");
        println!("╠════════════════════════════════════════════════════════════╣");
        println!("║ Chain ID:          {:^40} ║", self.chain_id);
        println!("║ Pool:              {:^40} ║", short_address(&self.pool_address));
        println!("║ Staking Rewards:   {:^40} ║", short_address(&self.staking_rewards_address));
        println!("║ Jars:              {:^40} ║", self.jars.len());
        println!("╠════════════════════════════════════════════════════════════╣");
        println!("║ Reward Token:      {:^40} ║", self.reward_token.to_uppercase());
        println!("║ Base Asset:        {:^40} ║", self.base_asset.to_uppercase());
        println!("║ Price Refresh:     {:>38}s ║", self.refresh_interval_secs);
        println!("╚════════════════════════════════════════════════════════════╝");
    }
}

fn short_address(address: &Address) -> String {
    let s = format!("{:?}", address);
    format!("{}...{}", &s[..8], &s[s.len() - 4..])
}

fn address_var(key: &str, default: Address) -> Result<Address> {
    match env::var(key) {
        Ok(s) => Address::from_str(s.trim()).map_err(|e| eyre!("Invalid {}: {}", key, e)),
        Err(_) => Ok(default),
    }
}

/// `JAR_ADDRESSES=0xabc...,0xdef...` (deposit token assumed steCRV)
fn parse_jar_list(list: &str) -> Result<Vec<Jar>> {
    list.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .enumerate()
        .map(|(i, s)| {
            let address =
                Address::from_str(s).map_err(|e| eyre!("Invalid jar address {}: {}", s, e))?;
            Ok(Jar::new(&format!("jar-{}", i), address, STECRV))
        })
        .collect()
}
