//! Delay Policy Records
//!
//! A delay policy is a named rule describing simulated response latency:
//! `fixed` (constant milliseconds), `normalvariate` (mean/stddev), or
//! `weighted` (a composite spec string). Policies are stored in the per-host
//! cache and referenced by name from stubs.
//!
//! Parameter validation (which fields each type requires and rejects) is
//! domain logic and lives in the server's delay-policy handler; this module
//! only carries the data.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Kind of latency rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DelayType {
    Fixed,
    Normalvariate,
    Weighted,
}

impl fmt::Display for DelayType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DelayType::Fixed => "fixed",
            DelayType::Normalvariate => "normalvariate",
            DelayType::Weighted => "weighted",
        };
        f.write_str(name)
    }
}

impl FromStr for DelayType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "fixed" => Ok(DelayType::Fixed),
            "normalvariate" => Ok(DelayType::Normalvariate),
            "weighted" => Ok(DelayType::Weighted),
            other => Err(format!("unknown delay type: {}", other)),
        }
    }
}

/// Named latency rule. Which optional fields are populated depends on the
/// type; the handler validates the combination before storing.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DelayPolicy {
    pub name: String,
    pub delay_type: DelayType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub milliseconds: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mean: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stddev: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delays: Option<String>,
}

impl DelayPolicy {
    /// The delay hint (milliseconds) this policy contributes during playback.
    ///
    /// Sampling math is out of scope for this server: `fixed` yields its
    /// constant, `normalvariate` yields its mean, `weighted` contributes
    /// nothing.
    pub fn delay_hint_ms(&self) -> u64 {
        match self.delay_type {
            DelayType::Fixed => self.milliseconds.unwrap_or(0),
            DelayType::Normalvariate => self.mean.unwrap_or(0),
            DelayType::Weighted => 0,
        }
    }
}
