//! Coder state extracted from trace payloads.
//!
//! Payloads are free text; only a few `key=value` fields are recognised.
//! Anything that does not match is reported as absent rather than as an
//! error.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

static STATE_FIELDS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"newState=(\d+) newMPS=(\d+)").expect("state pattern is valid")
});

static REGISTER_FIELDS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?:bit=(\d+) )?ctx=(\d+) state=(\d+) mps=(\d+) A=0x([0-9a-fA-F]+) C=0x([0-9a-fA-F]+) ct=(-?\d+)",
    )
    .expect("register pattern is valid")
});

static BIT_FIELD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\bbit=(\d+)").expect("bit pattern is valid"));

/// Probability state after a coding operation.
///
/// Both fields hold the decimal digits as printed, minus leading zeros, so
/// a corrupt value of any width still compares exactly against the other
/// side.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StateSnapshot {
    /// Index into the probability estimation table.
    pub state: String,
    /// Most probable symbol.
    pub mps: String,
}

impl StateSnapshot {
    pub fn new(state: u64, mps: u64) -> Self {
        Self {
            state: state.to_string(),
            mps: mps.to_string(),
        }
    }

    /// Find `newState=<n> newMPS=<n>` anywhere in an AFTER payload.
    pub fn extract(payload: &str) -> Option<Self> {
        let caps = STATE_FIELDS.captures(payload)?;
        Some(Self {
            state: canonical_digits(&caps[1]),
            mps: canonical_digits(&caps[2]),
        })
    }
}

fn canonical_digits(digits: &str) -> String {
    match digits.trim_start_matches('0') {
        "" => "0".to_string(),
        rest => rest.to_string(),
    }
}

impl core::fmt::Display for StateSnapshot {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "(state={}, mps={})", self.state, self.mps)
    }
}

/// Full register dump carried by a BEFORE payload.
///
/// Encoder lines carry the bit being coded; decoder lines do not know the
/// bit until the operation finishes, so `bit` is `None` for them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisterState {
    pub bit: Option<u8>,
    pub context: u64,
    pub state: u64,
    pub mps: u64,
    /// Interval register.
    pub a: u32,
    /// Code register.
    pub c: u32,
    /// Bit counter, may go negative in some implementations.
    pub ct: i32,
}

impl RegisterState {
    pub fn extract(payload: &str) -> Option<Self> {
        let caps = REGISTER_FIELDS.captures(payload)?;
        let bit = match caps.get(1) {
            Some(m) => Some(m.as_str().parse().ok()?),
            None => None,
        };
        Some(Self {
            bit,
            context: caps[2].parse().ok()?,
            state: caps[3].parse().ok()?,
            mps: caps[4].parse().ok()?,
            a: u32::from_str_radix(&caps[5], 16).ok()?,
            c: u32::from_str_radix(&caps[6], 16).ok()?,
            ct: caps[7].parse().ok()?,
        })
    }
}

/// Bit reported in a decoder AFTER payload (`bit=<n>`).
pub fn decoded_bit(payload: &str) -> Option<u8> {
    BIT_FIELD.captures(payload)?[1].parse().ok()
}
