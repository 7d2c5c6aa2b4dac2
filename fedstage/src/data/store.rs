//! Durable dataset storage protocol.

use super::{DataValue, Dataset, Schema};
use crate::core::ComponentScope;
use crate::errors::StorageError;
use async_trait::async_trait;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Reference to a stored table.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DataRef {
    /// Table namespace.
    pub namespace: String,
    /// Table name.
    pub name: String,
}

impl DataRef {
    /// Creates a new reference.
    #[must_use]
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
        }
    }

    /// The table a component run writes its output `data_name` to.
    #[must_use]
    pub fn output(scope: &ComponentScope, data_name: &str) -> Self {
        Self {
            namespace: format!("output_data_{}", scope.job_id),
            name: format!(
                "{}_{}_{}_{}",
                scope.component_name,
                scope.role(),
                scope.party_id(),
                data_name
            ),
        }
    }
}

impl fmt::Display for DataRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.namespace, self.name)
    }
}

/// Protocol for the distributed table store.
#[async_trait]
pub trait DatasetStore: Send + Sync {
    /// Writes a dataset, replacing any table under the same reference.
    async fn write(&self, data_ref: &DataRef, dataset: &Dataset) -> Result<(), StorageError>;

    /// Reads up to `limit` records in storage order. `None` if no such table.
    async fn read(
        &self,
        data_ref: &DataRef,
        limit: Option<usize>,
    ) -> Result<Option<Vec<(String, DataValue)>>, StorageError>;

    /// Returns the table's schema. `None` if no such table.
    async fn get_schema(&self, data_ref: &DataRef) -> Result<Option<Schema>, StorageError>;
}

/// In-memory dataset store. Storage order is record insertion order.
#[derive(Debug, Default)]
pub struct InMemoryDatasetStore {
    tables: DashMap<DataRef, Dataset>,
}

impl InMemoryDatasetStore {
    /// Creates a new in-memory store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy of a stored table.
    #[must_use]
    pub fn table(&self, data_ref: &DataRef) -> Option<Dataset> {
        self.tables.get(data_ref).map(|t| t.clone())
    }

    /// Returns the number of stored tables.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tables.len()
    }

    /// Returns true if no table is stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }
}

#[async_trait]
impl DatasetStore for InMemoryDatasetStore {
    async fn write(&self, data_ref: &DataRef, dataset: &Dataset) -> Result<(), StorageError> {
        self.tables.insert(data_ref.clone(), dataset.clone());
        Ok(())
    }

    async fn read(
        &self,
        data_ref: &DataRef,
        limit: Option<usize>,
    ) -> Result<Option<Vec<(String, DataValue)>>, StorageError> {
        Ok(self.tables.get(data_ref).map(|table| {
            let take = limit.unwrap_or(usize::MAX);
            table.records().iter().take(take).cloned().collect()
        }))
    }

    async fn get_schema(&self, data_ref: &DataRef) -> Result<Option<Schema>, StorageError> {
        Ok(self.tables.get(data_ref).map(|table| table.schema().clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_output_ref_naming() {
        let scope = ComponentScope::new("job_1", "lr_0", "guest", 9999);
        let data_ref = DataRef::output(&scope, "train");
        assert_eq!(data_ref.to_string(), "output_data_job_1.lr_0_guest_9999_train");
    }

    #[tokio::test]
    async fn test_read_respects_limit_and_order() {
        let store = InMemoryDatasetStore::new();
        let data_ref = DataRef::new("ns", "t");
        let ds: Dataset = (0..5)
            .map(|i| (format!("id{i}"), DataValue::Row(vec![json!(i)])))
            .collect();
        store.write(&data_ref, &ds).await.unwrap();

        let rows = store.read(&data_ref, Some(3)).await.unwrap().unwrap();
        let keys: Vec<&str> = rows.iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(keys, vec!["id0", "id1", "id2"]);
    }

    #[tokio::test]
    async fn test_missing_table() {
        let store = InMemoryDatasetStore::new();
        let data_ref = DataRef::new("ns", "missing");
        assert!(store.read(&data_ref, None).await.unwrap().is_none());
        assert!(store.get_schema(&data_ref).await.unwrap().is_none());
    }
}
