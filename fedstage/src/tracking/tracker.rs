//! Write path for component metrics.

use super::{Metric, MetricMeta, MetricStore};
use crate::core::ComponentScope;
use crate::errors::FedstageResult;
use std::sync::Arc;

/// Records metric series and metadata for exactly one component run.
///
/// The scope is fixed at construction; there is no way to write under a
/// different job/component/role/party through the same tracker.
#[derive(Clone)]
pub struct MetricsTracker {
    scope: ComponentScope,
    store: Arc<dyn MetricStore>,
}

impl std::fmt::Debug for MetricsTracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MetricsTracker")
            .field("scope", &self.scope)
            .finish_non_exhaustive()
    }
}

impl MetricsTracker {
    /// Creates a tracker bound to `scope`.
    #[must_use]
    pub fn new(scope: ComponentScope, store: Arc<dyn MetricStore>) -> Self {
        Self { scope, store }
    }

    /// Returns the bound scope.
    #[must_use]
    pub fn scope(&self) -> &ComponentScope {
        &self.scope
    }

    /// Appends points to `(namespace, name)`.
    ///
    /// A point whose key already exists replaces the stored value. Within one
    /// call, later points win over earlier points with the same key.
    pub async fn log_metric(
        &self,
        namespace: &str,
        name: &str,
        points: Vec<Metric>,
    ) -> FedstageResult<()> {
        tracing::debug!(
            job_id = %self.scope.job_id,
            component = %self.scope.component_name,
            namespace,
            name,
            count = points.len(),
            "Logging metric points"
        );
        self.store
            .upsert_points(&self.scope, namespace, name, &points)
            .await?;
        Ok(())
    }

    /// Replaces the metadata of `(namespace, name)`.
    pub async fn set_metric_meta(
        &self,
        namespace: &str,
        name: &str,
        meta: MetricMeta,
    ) -> FedstageResult<()> {
        tracing::debug!(
            job_id = %self.scope.job_id,
            component = %self.scope.component_name,
            namespace,
            name,
            metric_type = %meta.metric_type,
            "Setting metric meta"
        );
        self.store.put_meta(&self.scope, namespace, name, &meta).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tracking::InMemoryMetricStore;

    fn tracker() -> (MetricsTracker, Arc<InMemoryMetricStore>) {
        let store = Arc::new(InMemoryMetricStore::new());
        let scope = ComponentScope::new("job_1", "lr_0", "guest", 9999);
        (MetricsTracker::new(scope, store.clone()), store)
    }

    #[tokio::test]
    async fn test_relogging_key_overwrites() {
        let (tracker, store) = tracker();
        tracker
            .log_metric("loss", "curve", vec![Metric::new(1, 0.5)])
            .await
            .unwrap();
        tracker
            .log_metric("loss", "curve", vec![Metric::new(1, 0.3)])
            .await
            .unwrap();

        let points = store.points(tracker.scope(), "loss", "curve").await.unwrap();
        assert_eq!(points, vec![Metric::new(1, 0.3)]);
    }

    #[tokio::test]
    async fn test_duplicate_keys_in_one_batch() {
        let (tracker, store) = tracker();
        tracker
            .log_metric("loss", "curve", vec![Metric::new(1, 0.9), Metric::new(1, 0.1)])
            .await
            .unwrap();

        let points = store.points(tracker.scope(), "loss", "curve").await.unwrap();
        assert_eq!(points, vec![Metric::new(1, 0.1)]);
    }

    #[tokio::test]
    async fn test_meta_replaced_wholesale() {
        let (tracker, store) = tracker();
        tracker
            .set_metric_meta(
                "train",
                "loss",
                MetricMeta::new("loss", "LOSS").with_extra("unit_name", "iters"),
            )
            .await
            .unwrap();
        tracker
            .set_metric_meta("train", "loss", MetricMeta::new("loss", "CURVE"))
            .await
            .unwrap();

        let meta = store.meta(tracker.scope(), "train", "loss").await.unwrap().unwrap();
        assert_eq!(meta.metric_type, "CURVE");
        assert!(meta.extra.is_empty());
    }
}
