//! Price table and price feed
//!
//! The yield engine only ever sees a `PriceTable`: token symbol -> price in
//! a common unit. Any entry may be missing. `CoinGeckoPrices` is the feed the
//! binary polls to produce fresh tables.

use async_trait::async_trait;
use eyre::{eyre, Result};
use reqwest::Client;
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, warn};

// ============================================
// CONSTANTS
// ============================================

/// CoinGecko public API base URL
pub const COINGECKO_API_URL: &str = "https://api.coingecko.com/api/v3";

/// Timeout for price API calls
const API_TIMEOUT_SECS: u64 = 10;

/// CoinGecko id -> symbol used as a PriceTable key
pub const DEFAULT_COIN_IDS: &[(&str, &str)] = &[("lido-dao", "ldo"), ("ethereum", "eth")];

// ============================================
// PRICE TABLE
// ============================================

/// Symbol -> price. Keys are stored lowercase.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PriceTable {
    prices: HashMap<String, f64>,
}

impl PriceTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, symbol: &str, price: f64) {
        self.prices.insert(symbol.to_lowercase(), price);
    }

    pub fn with(mut self, symbol: &str, price: f64) -> Self {
        self.insert(symbol, price);
        self
    }

    /// Usable price for `symbol`. NaN, infinite and negative entries count as missing.
    pub fn get(&self, symbol: &str) -> Option<f64> {
        self.prices
            .get(&symbol.to_lowercase())
            .copied()
            .filter(|p| p.is_finite() && *p >= 0.0)
    }

    pub fn len(&self) -> usize {
        self.prices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.prices.is_empty()
    }
}

impl FromIterator<(String, f64)> for PriceTable {
    fn from_iter<I: IntoIterator<Item = (String, f64)>>(iter: I) -> Self {
        let mut table = PriceTable::new();
        for (symbol, price) in iter {
            table.insert(&symbol, price);
        }
        table
    }
}

// ============================================
// PRICE FEED
// ============================================

#[async_trait]
pub trait PriceSource: Send + Sync {
    async fn fetch_prices(&self) -> Result<PriceTable>;
}

/// `/simple/price` response: id -> currency -> price
type SimplePriceResponse = HashMap<String, HashMap<String, f64>>;

#[derive(Debug, Deserialize)]
struct CoinGeckoError {
    error: String,
}

pub struct CoinGeckoPrices {
    http_client: Client,
    base_url: String,
    vs_currency: String,
    /// (coingecko id, symbol)
    coins: Vec<(String, String)>,
}

impl CoinGeckoPrices {
    pub fn new(base_url: &str) -> Result<Self> {
        let http_client = Client::builder()
            .timeout(Duration::from_secs(API_TIMEOUT_SECS))
            .build()
            .map_err(|e| eyre!("Failed to create HTTP client: {}", e))?;

        Ok(Self {
            http_client,
            base_url: base_url.trim_end_matches('/').to_string(),
            vs_currency: "usd".to_string(),
            coins: DEFAULT_COIN_IDS
                .iter()
                .map(|(id, sym)| (id.to_string(), sym.to_string()))
                .collect(),
        })
    }

    /// Track an extra coin under `symbol`
    pub fn with_coin(mut self, id: &str, symbol: &str) -> Self {
        self.coins.push((id.to_string(), symbol.to_lowercase()));
        self
    }

    fn url(&self) -> String {
        let ids = self
            .coins
            .iter()
            .map(|(id, _)| id.as_str())
            .collect::<Vec<_>>()
            .join(",");
        format!(
            "{}/simple/price?ids={}&vs_currencies={}",
            self.base_url, ids, self.vs_currency
        )
    }
}

#[async_trait]
impl PriceSource for CoinGeckoPrices {
    async fn fetch_prices(&self) -> Result<PriceTable> {
        let response = self.http_client.get(self.url()).send().await?;
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            let message = serde_json::from_str::<CoinGeckoError>(&body)
                .map(|e| e.error)
                .unwrap_or(body);
            return Err(eyre!("CoinGecko error {}: {}", status, message));
        }

        let parsed: SimplePriceResponse = serde_json::from_str(&body)
            .map_err(|e| eyre!("Failed to parse CoinGecko response: {}", e))?;

        let mut table = PriceTable::new();
        for (id, symbol) in &self.coins {
            match parsed.get(id).and_then(|m| m.get(&self.vs_currency)) {
                Some(price) => table.insert(symbol, *price),
                None => warn!("No {} price for {} in CoinGecko response", self.vs_currency, id),
            }
        }

        debug!("Fetched {} prices from CoinGecko", table.len());
        Ok(table)
    }
}
