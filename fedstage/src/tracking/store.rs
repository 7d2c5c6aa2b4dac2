//! Metric storage backend.

use super::{Metric, MetricKey, MetricMeta};
use crate::core::{ComponentScope, JobScope};
use crate::errors::StorageError;
use async_trait::async_trait;
use dashmap::DashMap;
use std::collections::{BTreeSet, HashMap};

/// Protocol for metric storage backends.
///
/// Implementations must make each point write individually atomic. Nothing
/// beyond that is promised: a reader may see some points of a batch and not
/// others, and `points` may return them in any order.
#[async_trait]
pub trait MetricStore: Send + Sync {
    /// Inserts points, replacing any existing point with the same key.
    async fn upsert_points(
        &self,
        scope: &ComponentScope,
        namespace: &str,
        name: &str,
        points: &[Metric],
    ) -> Result<(), StorageError>;

    /// Replaces the metadata of a series.
    async fn put_meta(
        &self,
        scope: &ComponentScope,
        namespace: &str,
        name: &str,
        meta: &MetricMeta,
    ) -> Result<(), StorageError>;

    /// Returns every point of a series, in storage order.
    async fn points(
        &self,
        scope: &ComponentScope,
        namespace: &str,
        name: &str,
    ) -> Result<Vec<Metric>, StorageError>;

    /// Returns the metadata of a series, if any.
    async fn meta(
        &self,
        scope: &ComponentScope,
        namespace: &str,
        name: &str,
    ) -> Result<Option<MetricMeta>, StorageError>;

    /// Lists (namespace, name) pairs that hold at least one point.
    async fn metric_names(&self, scope: &ComponentScope) -> Result<Vec<(String, String)>, StorageError>;

    /// Lists component names of a job that hold at least one point.
    async fn components(&self, job: &JobScope) -> Result<Vec<String>, StorageError>;
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct SeriesKey {
    scope: ComponentScope,
    namespace: String,
    name: String,
}

impl SeriesKey {
    fn new(scope: &ComponentScope, namespace: &str, name: &str) -> Self {
        Self {
            scope: scope.clone(),
            namespace: namespace.to_string(),
            name: name.to_string(),
        }
    }
}

/// In-memory metric store.
#[derive(Debug, Default)]
pub struct InMemoryMetricStore {
    series: DashMap<SeriesKey, HashMap<MetricKey, serde_json::Value>>,
    metas: DashMap<SeriesKey, MetricMeta>,
}

impl InMemoryMetricStore {
    /// Creates a new in-memory store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of stored series.
    #[must_use]
    pub fn series_count(&self) -> usize {
        self.series.len()
    }
}

#[async_trait]
impl MetricStore for InMemoryMetricStore {
    async fn upsert_points(
        &self,
        scope: &ComponentScope,
        namespace: &str,
        name: &str,
        points: &[Metric],
    ) -> Result<(), StorageError> {
        let mut series = self
            .series
            .entry(SeriesKey::new(scope, namespace, name))
            .or_default();
        for point in points {
            series.insert(point.key.clone(), point.value.clone());
        }
        Ok(())
    }

    async fn put_meta(
        &self,
        scope: &ComponentScope,
        namespace: &str,
        name: &str,
        meta: &MetricMeta,
    ) -> Result<(), StorageError> {
        self.metas
            .insert(SeriesKey::new(scope, namespace, name), meta.clone());
        Ok(())
    }

    async fn points(
        &self,
        scope: &ComponentScope,
        namespace: &str,
        name: &str,
    ) -> Result<Vec<Metric>, StorageError> {
        Ok(self
            .series
            .get(&SeriesKey::new(scope, namespace, name))
            .map(|series| {
                series
                    .iter()
                    .map(|(key, value)| Metric {
                        key: key.clone(),
                        value: value.clone(),
                    })
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn meta(
        &self,
        scope: &ComponentScope,
        namespace: &str,
        name: &str,
    ) -> Result<Option<MetricMeta>, StorageError> {
        Ok(self
            .metas
            .get(&SeriesKey::new(scope, namespace, name))
            .map(|meta| meta.clone()))
    }

    async fn metric_names(&self, scope: &ComponentScope) -> Result<Vec<(String, String)>, StorageError> {
        Ok(self
            .series
            .iter()
            .filter(|entry| &entry.key().scope == scope && !entry.value().is_empty())
            .map(|entry| (entry.key().namespace.clone(), entry.key().name.clone()))
            .collect())
    }

    async fn components(&self, job: &JobScope) -> Result<Vec<String>, StorageError> {
        let names: BTreeSet<String> = self
            .series
            .iter()
            .filter(|entry| entry.key().scope.job() == *job && !entry.value().is_empty())
            .map(|entry| entry.key().scope.component_name.clone())
            .collect();
        Ok(names.into_iter().collect())
    }
}
