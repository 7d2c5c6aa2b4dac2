//! Lifecycle stage of a component run.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Which lifecycle operation a component run performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    /// Train on the supplied data.
    Fit,
    /// Apply a previously trained model.
    Transform,
    /// Hand the training data to the component's cross-validation routine.
    CrossValidation,
    /// No data was supplied; nothing executed.
    Skip,
}

impl Stage {
    /// Selects the stage for a run.
    ///
    /// Priority: cross validation, then a trained model, then the default.
    /// An isometric model alone still selects [`Stage::Fit`]; it only warm
    /// starts training. Never returns [`Stage::Skip`]; skipping is decided
    /// later from the data inputs.
    #[must_use]
    pub fn select(need_cv: bool, has_model: bool, _has_isometric_model: bool) -> Self {
        match (need_cv, has_model) {
            (true, _) => Self::CrossValidation,
            (false, true) => Self::Transform,
            (false, false) => Self::Fit,
        }
    }

    /// Returns true if the stage trains a model.
    #[must_use]
    pub fn is_fit(&self) -> bool {
        matches!(self, Self::Fit)
    }

    /// Returns true if nothing was executed.
    #[must_use]
    pub fn is_skip(&self) -> bool {
        matches!(self, Self::Skip)
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Fit => write!(f, "fit"),
            Self::Transform => write!(f, "transform"),
            Self::CrossValidation => write!(f, "cross_validation"),
            Self::Skip => write!(f, "skip"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transition_table() {
        let cases = [
            // (need_cv, model, isometric) -> stage
            ((true, true, true), Stage::CrossValidation),
            ((true, true, false), Stage::CrossValidation),
            ((true, false, true), Stage::CrossValidation),
            ((true, false, false), Stage::CrossValidation),
            ((false, true, true), Stage::Transform),
            ((false, true, false), Stage::Transform),
            ((false, false, true), Stage::Fit),
            ((false, false, false), Stage::Fit),
        ];

        for ((need_cv, model, iso), expected) in cases {
            assert_eq!(
                Stage::select(need_cv, model, iso),
                expected,
                "need_cv={need_cv} model={model} isometric={iso}"
            );
        }
    }

    #[test]
    fn test_select_never_skips() {
        for bits in 0..8u8 {
            let stage = Stage::select(bits & 1 != 0, bits & 2 != 0, bits & 4 != 0);
            assert!(!stage.is_skip());
        }
    }

    #[test]
    fn test_stage_display_and_serde() {
        assert_eq!(Stage::CrossValidation.to_string(), "cross_validation");
        let json = serde_json::to_string(&Stage::Transform).unwrap();
        assert_eq!(json, r#""transform""#);
    }
}
