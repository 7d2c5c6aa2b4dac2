//! Data artifacts supplied to a run.

use crate::data::Dataset;
use std::collections::BTreeMap;

/// The three data slots a run may receive.
#[derive(Debug, Clone, Default)]
pub struct DataInputs {
    /// Training split.
    pub train_data: Option<Dataset>,
    /// Evaluation split.
    pub eval_data: Option<Dataset>,
    /// Generic data (transform / feature-engineering input).
    pub data: Option<Dataset>,
}

impl DataInputs {
    /// No data at all.
    #[must_use]
    pub fn none() -> Self {
        Self::default()
    }

    /// Only generic data.
    #[must_use]
    pub fn plain(data: Dataset) -> Self {
        Self {
            data: Some(data),
            ..Self::default()
        }
    }

    /// Sets the training split.
    #[must_use]
    pub fn with_train(mut self, data: Dataset) -> Self {
        self.train_data = Some(data);
        self
    }

    /// Sets the evaluation split.
    #[must_use]
    pub fn with_eval(mut self, data: Dataset) -> Self {
        self.eval_data = Some(data);
        self
    }

    /// Collapses the inputs of several upstream components into one.
    ///
    /// Upstreams are visited in name order; for each slot the last upstream
    /// that fills it wins.
    #[must_use]
    pub fn from_upstreams(upstreams: BTreeMap<String, Self>) -> Self {
        upstreams
            .into_values()
            .fold(Self::default(), |mut acc, next| {
                if next.train_data.is_some() {
                    acc.train_data = next.train_data;
                }
                if next.eval_data.is_some() {
                    acc.eval_data = next.eval_data;
                }
                if next.data.is_some() {
                    acc.data = next.data;
                }
                acc
            })
    }

    /// Returns true if no slot is filled.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.train_data.is_none() && self.eval_data.is_none() && self.data.is_none()
    }
}
