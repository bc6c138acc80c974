//! Output surface
//!
//! `{ "APYs": [ { "<reward symbol>": apy, "apr": apr } ] }`
//!
//! One entry per reward stream; the pipeline currently produces a single
//! LDO entry. Both numbers are percentages.

use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use std::fmt;

/// APY/APR derived for one reward token
#[derive(Debug, Clone, PartialEq)]
pub struct DerivedApy {
    pub reward_token: String,
    /// Discounted APR, percent
    pub apr: f64,
    /// Compounded APY, percent
    pub apy: f64,
}

impl DerivedApy {
    /// Zero value exposed before the first successful derivation
    pub fn zero(reward_token: &str) -> Self {
        Self {
            reward_token: reward_token.to_string(),
            apr: 0.0,
            apy: 0.0,
        }
    }
}

impl Serialize for DerivedApy {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(2))?;
        map.serialize_entry(&self.reward_token, &self.apy)?;
        map.serialize_entry("apr", &self.apr)?;
        map.end()
    }
}

impl fmt::Display for DerivedApy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: APY {:.3}% (APR {:.3}%)",
            self.reward_token.to_uppercase(),
            self.apy,
            self.apr
        )
    }
}

/// All reward-stream yields for a jar
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JarApyOutput {
    #[serde(rename = "APYs")]
    pub apys: Vec<DerivedApy>,
}

impl JarApyOutput {
    pub fn single(apy: DerivedApy) -> Self {
        Self { apys: vec![apy] }
    }

    /// Sum of all stream APYs
    pub fn total_apy(&self) -> f64 {
        self.apys.iter().map(|a| a.apy).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_json_shape() {
        let out = JarApyOutput::single(DerivedApy {
            reward_token: "ldo".to_string(),
            apr: 2.5,
            apy: 2.75,
        });

        let json = serde_json::to_value(&out).unwrap();
        assert_eq!(json, serde_json::json!({ "APYs": [ { "ldo": 2.75, "apr": 2.5 } ] }));
    }

    #[test]
    fn test_zero_default() {
        let out = JarApyOutput::single(DerivedApy::zero("ldo"));
        let json = serde_json::to_string(&out).unwrap();
        assert_eq!(json, r#"{"APYs":[{"ldo":0.0,"apr":0.0}]}"#);
        assert_eq!(out.total_apy(), 0.0);
    }

    #[test]
    fn test_display() {
        let apy = DerivedApy {
            reward_token: "ldo".to_string(),
            apr: 2.745,
            apy: 2.7823,
        };
        assert_eq!(apy.to_string(), "LDO: APY 2.782% (APR 2.745%)");
    }
}
