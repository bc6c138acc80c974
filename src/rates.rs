//! Rate Normalizer
//!
//! Converts per-second reward emission into an annual reward total and
//! turns a simple APR into a compounding APY.
//!
//! COMPOUNDING CONVENTION:
//! APY = 100 * ((1 + apr/365)^365 - 1)
//!
//! The 365-period year is the usual daily-compounding approximation, not an
//! on-chain day count. `apr` is a fraction (0.05 = 5%), the APY is a percent.

// ============================================
// CONSTANTS
// ============================================

/// Seconds in one day
pub const SECONDS_PER_DAY: f64 = 86_400.0;

/// Days in the compounding year
pub const DAYS_PER_YEAR: f64 = 365.0;

/// Seconds in a 365-day year
pub const SECONDS_PER_YEAR: f64 = DAYS_PER_YEAR * SECONDS_PER_DAY;

/// Number of compounding periods per year
pub const COMPOUNDING_PERIODS: i32 = 365;

/// Haircut applied to the raw reward APR before it is exposed
pub const DISCOUNT_FACTOR: f64 = 0.8;

// ============================================
// NORMALIZATION
// ============================================

/// Annual reward total for a per-second emission rate
pub fn annualize_reward_rate(reward_rate_per_sec: f64) -> f64 {
    reward_rate_per_sec * SECONDS_PER_YEAR
}

/// Compounding APY (percent) for a simple APR (fraction).
///
/// Total over all reals; no clamping is applied, so callers wanting sanity
/// bounds must apply them themselves.
pub fn compounding_apy(apr: f64) -> f64 {
    100.0 * ((1.0 + apr / DAYS_PER_YEAR).powi(COMPOUNDING_PERIODS) - 1.0)
}

/// Apply the fixed discount to a raw APR
pub fn discounted_apr(raw_apr: f64) -> f64 {
    raw_apr * DISCOUNT_FACTOR
}
