// =============================================================================
// Error taxonomy for the scoring core
// =============================================================================
//
// Every failure inside the core maps onto one of four kinds.  Regime detection
// never propagates these to the caller's batch loop: it converts them into an
// `AssessmentKind` on a well-formed (degraded) result instead.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Failures the core can observe while classifying or scoring.
#[derive(Debug, Error)]
pub enum CoreError {
    /// The data source itself is absent (no bars, no series).
    #[error("missing input: {0}")]
    MissingInput(String),

    /// Not enough bars for the requested window.
    #[error("insufficient history: need {needed} bars, have {available}")]
    InsufficientHistory { needed: usize, available: usize },

    /// A feature could not be computed (non-finite value, warm-up gap).
    #[error("compute error: {0}")]
    Compute(String),

    /// The regime history store could not be read or written.
    #[error("persistence failure: {0}")]
    Persistence(String),
}

impl CoreError {
    /// Outcome tag a degraded result should carry for this error.
    pub fn kind(&self) -> AssessmentKind {
        match self {
            Self::MissingInput(_) => AssessmentKind::MissingInput,
            Self::InsufficientHistory { .. } => AssessmentKind::InsufficientData,
            Self::Compute(_) | Self::Persistence(_) => AssessmentKind::ComputeError,
        }
    }
}

/// Outcome tag attached to every regime assessment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssessmentKind {
    Ok,
    InsufficientData,
    MissingInput,
    ComputeError,
}

impl AssessmentKind {
    pub fn is_ok(self) -> bool {
        self == Self::Ok
    }
}

impl std::fmt::Display for AssessmentKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Ok => write!(f, "ok"),
            Self::InsufficientData => write!(f, "insufficient_data"),
            Self::MissingInput => write!(f, "missing_input"),
            Self::ComputeError => write!(f, "compute_error"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_kinds_map_to_assessment() {
        assert_eq!(
            CoreError::MissingInput("index".into()).kind(),
            AssessmentKind::MissingInput
        );
        assert_eq!(
            CoreError::InsufficientHistory {
                needed: 60,
                available: 12
            }
            .kind(),
            AssessmentKind::InsufficientData
        );
        assert_eq!(
            CoreError::Compute("adx".into()).kind(),
            AssessmentKind::ComputeError
        );
    }

    #[test]
    fn error_messages_are_descriptive() {
        let err = CoreError::InsufficientHistory {
            needed: 60,
            available: 12,
        };
        assert_eq!(err.to_string(), "insufficient history: need 60 bars, have 12");
    }
}
