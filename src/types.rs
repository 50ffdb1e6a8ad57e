// =============================================================================
// Shared types used across the regime / scoring / signal pipeline
// =============================================================================

use serde::{Deserialize, Serialize};

/// Prevailing market behaviour used to bias scoring.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum RegimeLabel {
    /// Persistent directional move.
    #[default]
    Trend,
    /// Sideways chop that tends to revert to the mean.
    Reversion,
    /// Compression that is resolving (or about to resolve) into a move.
    Breakout,
}

impl RegimeLabel {
    pub const ALL: [RegimeLabel; 3] = [Self::Trend, Self::Reversion, Self::Breakout];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Trend => "trend",
            Self::Reversion => "reversion",
            Self::Breakout => "breakout",
        }
    }
}

impl std::fmt::Display for RegimeLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for RegimeLabel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "trend" | "trending" => Ok(Self::Trend),
            "reversion" | "mean_reversion" | "ranging" => Ok(Self::Reversion),
            "breakout" => Ok(Self::Breakout),
            other => Err(format!("unknown regime label '{other}'")),
        }
    }
}

/// Discrete per-date trading signal.  Serialised as `-1 / 0 / 1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(into = "i8", try_from = "i8")]
pub enum Signal {
    Buy,
    #[default]
    Hold,
    Sell,
}

impl Signal {
    pub fn value(self) -> i8 {
        match self {
            Self::Buy => 1,
            Self::Hold => 0,
            Self::Sell => -1,
        }
    }
}

impl From<Signal> for i8 {
    fn from(signal: Signal) -> Self {
        signal.value()
    }
}

impl TryFrom<i8> for Signal {
    type Error = String;

    fn try_from(value: i8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Self::Buy),
            0 => Ok(Self::Hold),
            -1 => Ok(Self::Sell),
            other => Err(format!("invalid signal value {other}")),
        }
    }
}

impl std::fmt::Display for Signal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Buy => write!(f, "BUY"),
            Self::Hold => write!(f, "HOLD"),
            Self::Sell => write!(f, "SELL"),
        }
    }
}

/// Position held by the signal generator.  Long-only: at most one open
/// position at a time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum PositionState {
    #[default]
    Flat,
    Long,
}

/// Direction of the last executed trade, used by the cooldown rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TradeDirection {
    Buy,
    Sell,
}

impl TradeDirection {
    pub fn opposite(self) -> Self {
        match self {
            Self::Buy => Self::Sell,
            Self::Sell => Self::Buy,
        }
    }
}
