//! Model artifacts exported by components.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Name suffix marking a parameter block.
pub const PARAM_SUFFIX: &str = "Param";

/// Name suffix marking a metadata block.
pub const META_SUFFIX: &str = "Meta";

/// A named bundle of serialized sub-artifacts.
///
/// Sub-artifact names carry a type suffix (`...Param`, `...Meta`) that the
/// query side uses to pick what to render. Payloads are opaque to the core.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ModelArtifact {
    /// Sub-artifact name to payload, in name order.
    #[serde(default)]
    pub buffers: BTreeMap<String, serde_json::Value>,
}

impl ModelArtifact {
    /// Creates an empty artifact.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a sub-artifact.
    #[must_use]
    pub fn with_buffer(mut self, name: impl Into<String>, payload: serde_json::Value) -> Self {
        self.buffers.insert(name.into(), payload);
        self
    }

    /// Returns a sub-artifact by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&serde_json::Value> {
        self.buffers.get(name)
    }

    /// Iterates over sub-artifacts whose name ends with `suffix`.
    pub fn with_suffix<'a>(
        &'a self,
        suffix: &'a str,
    ) -> impl Iterator<Item = (&'a String, &'a serde_json::Value)> + 'a {
        self.buffers
            .iter()
            .filter(move |(name, _)| name.ends_with(suffix))
    }

    /// Iterates over parameter blocks.
    pub fn params(&self) -> impl Iterator<Item = (&String, &serde_json::Value)> {
        self.with_suffix(PARAM_SUFFIX)
    }

    /// Iterates over metadata blocks.
    pub fn metas(&self) -> impl Iterator<Item = (&String, &serde_json::Value)> {
        self.with_suffix(META_SUFFIX)
    }

    /// Reads `need_run` from the first metadata block that carries it.
    #[must_use]
    pub fn need_run(&self) -> Option<bool> {
        self.metas()
            .find_map(|(_, meta)| meta.get("need_run").and_then(serde_json::Value::as_bool))
    }

    /// Returns the number of sub-artifacts.
    #[must_use]
    pub fn len(&self) -> usize {
        self.buffers.len()
    }

    /// Returns true if there are no sub-artifacts.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.buffers.is_empty()
    }
}

/// Model handles supplied to a run.
#[derive(Debug, Clone, Default)]
pub struct ModelInputs {
    /// A model trained by this same component (previous fit).
    pub model: Option<ModelArtifact>,
    /// A model trained by a different component with the same structure.
    pub isometric_model: Option<ModelArtifact>,
}

impl ModelInputs {
    /// No models.
    #[must_use]
    pub fn none() -> Self {
        Self::default()
    }

    /// Sets the trained model.
    #[must_use]
    pub fn with_model(mut self, model: ModelArtifact) -> Self {
        self.model = Some(model);
        self
    }

    /// Sets the isometric model.
    #[must_use]
    pub fn with_isometric_model(mut self, model: ModelArtifact) -> Self {
        self.isometric_model = Some(model);
        self
    }

    /// The model to load before running, trained model first.
    #[must_use]
    pub fn to_load(&self) -> Option<&ModelArtifact> {
        self.model.as_ref().or(self.isometric_model.as_ref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample() -> ModelArtifact {
        ModelArtifact::new()
            .with_buffer("HeteroLogisticRegressionMeta", json!({"need_run": false, "penalty": "L2"}))
            .with_buffer("HeteroLogisticRegressionParam", json!({"weight": {"x0": 0.5}}))
    }

    #[test]
    fn test_suffix_selection() {
        let artifact = sample();
        assert_eq!(artifact.params().count(), 1);
        assert_eq!(artifact.metas().count(), 1);
        assert_eq!(artifact.len(), 2);
    }

    #[test]
    fn test_need_run_from_meta() {
        assert_eq!(sample().need_run(), Some(false));
        assert_eq!(ModelArtifact::new().need_run(), None);
    }

    #[test]
    fn test_model_inputs_prefers_trained_model() {
        let trained = ModelArtifact::new().with_buffer("AMeta", json!({}));
        let iso = ModelArtifact::new().with_buffer("BMeta", json!({}));
        let inputs = ModelInputs::none()
            .with_isometric_model(iso.clone())
            .with_model(trained.clone());
        assert_eq!(inputs.to_load(), Some(&trained));

        let inputs = ModelInputs::none().with_isometric_model(iso.clone());
        assert_eq!(inputs.to_load(), Some(&iso));
        assert!(ModelInputs::none().to_load().is_none());
    }
}
