//! Persistence of exported models.

use crate::core::{ComponentScope, JobScope, ModelArtifact};
use crate::errors::StorageError;
use async_trait::async_trait;
use dashmap::DashMap;
use serde_json::Value;
use std::collections::BTreeMap;

/// Storage for component models, grouped by model key.
#[async_trait]
pub trait ModelStore: Send + Sync {
    /// Saves a component's exported model.
    ///
    /// Also records the pipeline model meta entries for the component:
    /// `<component>_module_name` and one `<component>.<buffer>` per
    /// sub-artifact.
    async fn save_model(
        &self,
        model_key: &str,
        scope: &ComponentScope,
        module_name: &str,
        artifact: &ModelArtifact,
    ) -> Result<(), StorageError>;

    /// Loads a component's model.
    async fn output_model(
        &self,
        model_key: &str,
        scope: &ComponentScope,
    ) -> Result<Option<ModelArtifact>, StorageError>;

    /// Returns the pipeline model meta of one role/party.
    async fn pipeline_model_meta(
        &self,
        model_key: &str,
        job: &JobScope,
    ) -> Result<BTreeMap<String, Value>, StorageError>;
}

/// In-memory model store.
#[derive(Debug, Default)]
pub struct InMemoryModelStore {
    models: DashMap<(String, ComponentScope), ModelArtifact>,
    pipeline_meta: DashMap<(String, JobScope), BTreeMap<String, Value>>,
}

impl InMemoryModelStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored component models.
    #[must_use]
    pub fn len(&self) -> usize {
        self.models.len()
    }

    /// Returns true if no model is stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }
}

#[async_trait]
impl ModelStore for InMemoryModelStore {
    async fn save_model(
        &self,
        model_key: &str,
        scope: &ComponentScope,
        module_name: &str,
        artifact: &ModelArtifact,
    ) -> Result<(), StorageError> {
        self.models
            .insert((model_key.to_string(), scope.clone()), artifact.clone());

        let component = &scope.component_name;
        let mut meta = self
            .pipeline_meta
            .entry((model_key.to_string(), scope.job()))
            .or_default();
        meta.insert(
            format!("{component}_module_name"),
            Value::String(module_name.to_string()),
        );
        for name in artifact.buffers.keys() {
            meta.insert(format!("{component}.{name}"), Value::String(name.clone()));
        }
        Ok(())
    }

    async fn output_model(
        &self,
        model_key: &str,
        scope: &ComponentScope,
    ) -> Result<Option<ModelArtifact>, StorageError> {
        Ok(self
            .models
            .get(&(model_key.to_string(), scope.clone()))
            .map(|entry| entry.value().clone()))
    }

    async fn pipeline_model_meta(
        &self,
        model_key: &str,
        job: &JobScope,
    ) -> Result<BTreeMap<String, Value>, StorageError> {
        Ok(self
            .pipeline_meta
            .get(&(model_key.to_string(), job.clone()))
            .map(|entry| entry.value().clone())
            .unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_save_records_pipeline_meta() {
        let store = InMemoryModelStore::new();
        let scope = ComponentScope::new("job_1", "hetero_lr_0", "guest", 9999);
        let artifact = ModelArtifact::new()
            .with_buffer("HeteroLRMeta", json!({"penalty": "L2"}))
            .with_buffer("HeteroLRParam", json!({"iters": 10}));

        store
            .save_model("m1", &scope, "HeteroLR", &artifact)
            .await
            .unwrap();

        assert_eq!(store.len(), 1);
        assert_eq!(
            store.output_model("m1", &scope).await.unwrap(),
            Some(artifact)
        );
        let meta = store.pipeline_model_meta("m1", &scope.job()).await.unwrap();
        assert_eq!(meta["hetero_lr_0_module_name"], json!("HeteroLR"));
        assert!(meta.contains_key("hetero_lr_0.HeteroLRParam"));
        assert!(store
            .output_model("m2", &scope)
            .await
            .unwrap()
            .is_none());
    }
}
