use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::codec::{impl_tagged_codec, TaggedEnum};
use crate::error::EncodeError;

/// Match result a participant predicts, or a creator resolves with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MatchOutcome {
    Home = 0,
    Draw = 1,
    Away = 2,
}

/// Lifecycle state of a market.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MarketStatus {
    Open = 0,
    Live = 1,
    Resolved = 2,
    Cancelled = 3,
}

/// Per-market result reported to the dashboard program.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MarketResult {
    Win = 0,
    Loss = 1,
}

impl TaggedEnum for MatchOutcome {
    const TYPE_NAME: &'static str = "MatchOutcome";
    const VARIANTS: &'static [Self] = &[Self::Home, Self::Draw, Self::Away];

    fn tag(self) -> u8 {
        self as u8
    }
}

impl TaggedEnum for MarketStatus {
    const TYPE_NAME: &'static str = "MarketStatus";
    const VARIANTS: &'static [Self] = &[Self::Open, Self::Live, Self::Resolved, Self::Cancelled];

    fn tag(self) -> u8 {
        self as u8
    }
}

impl TaggedEnum for MarketResult {
    const TYPE_NAME: &'static str = "MarketResult";
    const VARIANTS: &'static [Self] = &[Self::Win, Self::Loss];

    fn tag(self) -> u8 {
        self as u8
    }
}

impl_tagged_codec!(MatchOutcome, MarketStatus, MarketResult);

impl MatchOutcome {
    pub fn label(self) -> &'static str {
        match self {
            MatchOutcome::Home => "home",
            MatchOutcome::Draw => "draw",
            MatchOutcome::Away => "away",
        }
    }
}

impl MarketStatus {
    /// Whether the market still accepts pool growth.
    pub fn is_active(self) -> bool {
        matches!(self, MarketStatus::Open | MarketStatus::Live)
    }
}

impl fmt::Display for MatchOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for MatchOutcome {
    type Err = EncodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "home" | "1" => Ok(MatchOutcome::Home),
            "draw" | "x" => Ok(MatchOutcome::Draw),
            "away" | "2" => Ok(MatchOutcome::Away),
            other => Err(EncodeError::invalid(
                "outcome",
                format!("`{other}` is not one of home, draw, away"),
            )),
        }
    }
}
