//! Read path over metrics, output models and output data.

use crate::config::FedstageConfig;
use crate::core::{ComponentScope, JobScope, ModelArtifact};
use crate::data::{DataRef, DataValue, DatasetStore};
use crate::errors::{FedstageResult, NotFoundError, ResourceKind};
use crate::registry::ModelStore;
use crate::tracking::{Metric, MetricKey, MetricMeta, MetricStore};
use futures::future::try_join_all;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::debug;

/// `namespace -> name -> key -> value` across the components of a job.
pub type JobSummary = BTreeMap<String, BTreeMap<String, BTreeMap<MetricKey, Value>>>;

/// Renders a [`JobSummary`] as JSON. Metric keys become strings.
#[must_use]
pub fn summary_to_json(summary: &JobSummary) -> Value {
    let namespaces = summary
        .iter()
        .map(|(namespace, names)| {
            let names = names
                .iter()
                .map(|(name, points)| {
                    let points = points
                        .iter()
                        .map(|(key, value)| (key.to_string(), value.clone()))
                        .collect::<Map<_, _>>();
                    (name.clone(), Value::Object(points))
                })
                .collect::<Map<_, _>>();
            (namespace.clone(), Value::Object(names))
        })
        .collect::<Map<_, _>>();
    Value::Object(namespaces)
}

/// A component's trained parameters plus its pipeline meta entries.
#[derive(Debug, Clone, PartialEq)]
pub struct OutputModelView {
    /// The rendered parameter block.
    pub params: Value,
    /// Pipeline model meta entries belonging to the component.
    pub meta: Map<String, Value>,
}

/// First rows of a component's output table.
#[derive(Debug, Clone, PartialEq)]
pub struct OutputDataPreview {
    /// Rows as `[sid, label?, ...values]`.
    pub rows: Vec<Vec<Value>>,
    /// Column names matching the rows.
    pub header: Vec<String>,
}

/// Aggregates stored metrics and outputs for display.
#[derive(Clone)]
pub struct MetricsQueryService {
    metrics: Arc<dyn MetricStore>,
    datasets: Arc<dyn DatasetStore>,
    models: Arc<dyn ModelStore>,
    config: FedstageConfig,
}

impl std::fmt::Debug for MetricsQueryService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MetricsQueryService")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl MetricsQueryService {
    /// Creates a service over the given stores with default configuration.
    #[must_use]
    pub fn new(
        metrics: Arc<dyn MetricStore>,
        datasets: Arc<dyn DatasetStore>,
        models: Arc<dyn ModelStore>,
    ) -> Self {
        Self {
            metrics,
            datasets,
            models,
            config: FedstageConfig::default(),
        }
    }

    /// Sets the configuration.
    #[must_use]
    pub fn with_config(mut self, config: FedstageConfig) -> Self {
        self.config = config;
        self
    }

    /// Returns the configuration.
    #[must_use]
    pub fn config(&self) -> &FedstageConfig {
        &self.config
    }

    /// Lists the `(namespace, name)` pairs logged for a component, sorted.
    pub async fn list_metric_names(
        &self,
        scope: &ComponentScope,
    ) -> FedstageResult<Vec<(String, String)>> {
        let mut names = self.metrics.metric_names(scope).await?;
        names.sort();
        Ok(names)
    }

    /// Returns a series' points in ascending key order.
    pub async fn get_metric_points(
        &self,
        scope: &ComponentScope,
        namespace: &str,
        name: &str,
    ) -> FedstageResult<Vec<Metric>> {
        let mut points = self.metrics.points(scope, namespace, name).await?;
        points.sort_by(|a, b| a.key.cmp(&b.key));
        Ok(points)
    }

    /// Returns a series' metadata.
    pub async fn get_metric_meta(
        &self,
        scope: &ComponentScope,
        namespace: &str,
        name: &str,
    ) -> FedstageResult<Option<MetricMeta>> {
        Ok(self.metrics.meta(scope, namespace, name).await?)
    }

    /// Collects every series of every component of a job for one role/party.
    ///
    /// Components without metrics contribute nothing. Two components logging
    /// the same `(namespace, name)` share one entry; later components (name
    /// order) win on equal keys.
    pub async fn get_job_summary(&self, job: &JobScope) -> FedstageResult<JobSummary> {
        let components = self.metrics.components(job).await?;
        debug!(job_id = %job.job_id, components = components.len(), "Building job summary");

        let per_component = try_join_all(
            components
                .iter()
                .map(|component| self.component_series(job.component(component.clone()))),
        )
        .await?;

        let mut summary = JobSummary::new();
        for series in per_component {
            for (namespace, name, points) in series {
                let entry = summary
                    .entry(namespace)
                    .or_default()
                    .entry(name)
                    .or_default();
                for point in points {
                    entry.insert(point.key, point.value);
                }
            }
        }
        Ok(summary)
    }

    async fn component_series(
        &self,
        scope: ComponentScope,
    ) -> FedstageResult<Vec<(String, String, Vec<Metric>)>> {
        let names = self.metrics.metric_names(&scope).await?;
        let mut series = Vec::with_capacity(names.len());
        for (namespace, name) in names {
            let points = self.metrics.points(&scope, &namespace, &name).await?;
            series.push((namespace, name, points));
        }
        Ok(series)
    }

    /// Returns a component's trained parameters and scoped pipeline meta.
    ///
    /// Fails with a not-found error when no model is stored under
    /// `model_key` for the component, and returns `None` when its parameter
    /// block is empty.
    pub async fn get_output_model(
        &self,
        scope: &ComponentScope,
        model_key: &str,
    ) -> FedstageResult<Option<OutputModelView>> {
        let Some(artifact) = self.models.output_model(model_key, scope).await? else {
            let id = format!("{model_key}:{scope}");
            return Err(NotFoundError::new(ResourceKind::Model, id).into());
        };
        let Some(params) = render_output_model(&artifact) else {
            return Ok(None);
        };

        let pipeline_meta = self
            .models
            .pipeline_model_meta(model_key, &scope.job())
            .await?;
        let meta = component_model_meta(&scope.component_name, pipeline_meta);
        Ok(Some(OutputModelView { params, meta }))
    }

    /// Returns up to `limit` rows of a component's output table.
    ///
    /// `limit` defaults to the configured preview limit. `None` when the table
    /// is missing or empty. The label column is present iff some sampled row
    /// carries a label.
    pub async fn get_output_data(
        &self,
        scope: &ComponentScope,
        data_name: &str,
        limit: Option<usize>,
    ) -> FedstageResult<Option<OutputDataPreview>> {
        let data_ref = DataRef::output(scope, data_name);
        let limit = limit.unwrap_or(self.config.preview_limit);
        let Some(records) = self.datasets.read(&data_ref, Some(limit)).await? else {
            return Ok(None);
        };
        if records.is_empty() {
            return Ok(None);
        }

        let mut has_label = false;
        let rows = records
            .into_iter()
            .map(|(key, value)| {
                let mut row = vec![Value::String(key)];
                if let DataValue::Instance(inst) = &value {
                    if let Some(label) = inst.present_label() {
                        row.push(label.clone());
                        has_label = true;
                    }
                }
                row.extend(value.values().iter().cloned());
                row
            })
            .collect();

        let schema = self
            .datasets
            .get_schema(&data_ref)
            .await?
            .unwrap_or_default();
        let mut header = vec![schema
            .sid_name
            .unwrap_or_else(|| self.config.default_sid_name.clone())];
        if has_label {
            header.push(schema.label_name.unwrap_or_else(|| "label".to_string()));
        }
        header.extend(schema.header);

        Ok(Some(OutputDataPreview { rows, header }))
    }
}

/// Renders the parameter block of an artifact.
///
/// The last `*Param` sub-artifact in name order wins. `None` if there is none
/// or it is empty.
#[must_use]
pub fn render_output_model(artifact: &ModelArtifact) -> Option<Value> {
    let (_, params) = artifact.params().last()?;
    let empty = match params {
        Value::Null => true,
        Value::Object(fields) => fields.is_empty(),
        _ => false,
    };
    (!empty).then(|| params.clone())
}

fn component_model_meta(
    component: &str,
    pipeline_meta: BTreeMap<String, Value>,
) -> Map<String, Value> {
    let module_key = format!("{component}_module_name");
    let mut meta = Map::new();
    for (key, value) in pipeline_meta {
        if key.ends_with("_module_name") {
            if key == module_key {
                meta.insert("module_name".to_string(), value);
            }
        } else if key.rsplit_once('.').map(|(owner, _)| owner) == Some(component) {
            meta.insert(key, value);
        }
    }
    meta
}
