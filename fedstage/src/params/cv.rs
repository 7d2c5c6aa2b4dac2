//! Cross-validation sub-configuration.

use crate::errors::ValidationError;
use serde::{Deserialize, Serialize};

/// Cross-validation settings nested inside a component's parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrossValidationParam {
    /// Whether the run should cross-validate instead of fit/transform.
    #[serde(default)]
    pub need_cv: bool,
    /// Number of folds.
    #[serde(default = "default_n_splits")]
    pub n_splits: u32,
    /// Shuffle samples before splitting.
    #[serde(default = "default_shuffle")]
    pub shuffle: bool,
    /// Seed used when shuffling.
    #[serde(default = "default_random_seed")]
    pub random_seed: u64,
}

fn default_n_splits() -> u32 {
    5
}

fn default_shuffle() -> bool {
    true
}

fn default_random_seed() -> u64 {
    1
}

impl Default for CrossValidationParam {
    fn default() -> Self {
        Self {
            need_cv: false,
            n_splits: default_n_splits(),
            shuffle: default_shuffle(),
            random_seed: default_random_seed(),
        }
    }
}

impl CrossValidationParam {
    /// Enabled cross validation with default folds.
    #[must_use]
    pub fn enabled() -> Self {
        Self {
            need_cv: true,
            ..Self::default()
        }
    }

    /// Sets the number of folds.
    #[must_use]
    pub fn with_n_splits(mut self, n_splits: u32) -> Self {
        self.n_splits = n_splits;
        self
    }

    /// Validates the settings.
    pub fn check(&self) -> Result<(), ValidationError> {
        if self.n_splits < 2 {
            return Err(ValidationError::out_of_range(
                "cv_param.n_splits",
                format_args!("must be at least 2, got {}", self.n_splits),
            ));
        }
        Ok(())
    }
}
