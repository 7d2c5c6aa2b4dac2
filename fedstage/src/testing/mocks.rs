//! Mock components and stores for testing.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

use super::fixtures;
use crate::component::{Component, RunContext};
use crate::core::{ComponentScope, JobScope, ModelArtifact};
use crate::data::Dataset;
use crate::errors::{FedstageError, FedstageResult, StorageError, ValidationError};
use crate::params::{ComponentParam, CrossValidationParam};
use crate::tracking::{Metric, MetricMeta, MetricStore};

/// Parameters of [`RecordingComponent`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordingParam {
    /// Iterations; one loss point is logged per iteration. Must be positive.
    pub max_iter: u32,
    /// Explicit `need_run`, if configured.
    #[serde(default)]
    pub need_run: Option<bool>,
    /// Cross-validation settings.
    #[serde(default)]
    pub cv_param: CrossValidationParam,
}

impl Default for RecordingParam {
    fn default() -> Self {
        Self {
            max_iter: 3,
            need_run: None,
            cv_param: CrossValidationParam::default(),
        }
    }
}

impl ComponentParam for RecordingParam {
    fn check(&self) -> Result<(), ValidationError> {
        if self.max_iter == 0 {
            return Err(ValidationError::out_of_range("max_iter", "must be positive"));
        }
        Ok(())
    }

    fn need_run(&self) -> Option<bool> {
        self.need_run
    }

    fn cv_param(&self) -> Option<&CrossValidationParam> {
        Some(&self.cv_param)
    }
}

/// A component that records which capabilities were called.
///
/// `fit` echoes its input and logs a loss curve, `predict` answers every
/// record with a prediction row, `transform` echoes its input, and
/// `cross_validation` logs one loss point per fold.
#[derive(Debug, Default)]
pub struct RecordingComponent {
    calls: Vec<&'static str>,
    params: Option<RecordingParam>,
    loaded: Option<ModelArtifact>,
    predict_outputs: VecDeque<Option<Dataset>>,
    export: Option<ModelArtifact>,
    fail_on: Option<&'static str>,
}

impl RecordingComponent {
    /// Creates a component with default behavior.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues outputs for successive `predict` calls.
    ///
    /// Once the queue is drained, `predict` falls back to its default.
    #[must_use]
    pub fn with_predict_outputs(mut self, outputs: Vec<Option<Dataset>>) -> Self {
        self.predict_outputs = outputs.into();
        self
    }

    /// Sets the model returned by `export_model`.
    #[must_use]
    pub fn with_export(mut self, artifact: ModelArtifact) -> Self {
        self.export = Some(artifact);
        self
    }

    /// Makes the named capability fail.
    #[must_use]
    pub fn failing_on(mut self, capability: &'static str) -> Self {
        self.fail_on = Some(capability);
        self
    }

    /// Capabilities called so far, in order.
    #[must_use]
    pub fn calls(&self) -> Vec<&'static str> {
        self.calls.clone()
    }

    /// The parameters received by `init_model`.
    #[must_use]
    pub fn params(&self) -> Option<&RecordingParam> {
        self.params.as_ref()
    }

    /// The model received by `load_model`.
    #[must_use]
    pub fn loaded_model(&self) -> Option<&ModelArtifact> {
        self.loaded.as_ref()
    }

    fn record(&mut self, capability: &'static str) -> FedstageResult<()> {
        self.calls.push(capability);
        if self.fail_on == Some(capability) {
            return Err(FedstageError::component(
                self.module_name(),
                capability,
                "injected failure",
            ));
        }
        Ok(())
    }

    fn max_iter(&self) -> u32 {
        self.params.as_ref().map_or(1, |p| p.max_iter)
    }
}

#[async_trait]
impl Component for RecordingComponent {
    type Param = RecordingParam;

    fn module_name(&self) -> &str {
        "Recording"
    }

    fn default_param(&self) -> RecordingParam {
        RecordingParam::default()
    }

    fn init_model(&mut self, params: &RecordingParam) -> FedstageResult<()> {
        self.record("init_model")?;
        self.params = Some(params.clone());
        Ok(())
    }

    async fn load_model(&mut self, model: &ModelArtifact) -> FedstageResult<()> {
        self.record("load_model")?;
        self.loaded = Some(model.clone());
        Ok(())
    }

    async fn fit(&mut self, ctx: &RunContext, data: &Dataset) -> FedstageResult<Option<Dataset>> {
        self.record("fit")?;
        let loss = (0..self.max_iter())
            .map(|iter| Metric::new(iter, 1.0 / f64::from(iter + 1)))
            .collect();
        let name = ctx.metric_name("loss");
        ctx.log_metric("train", &name, loss).await?;
        ctx.set_metric_meta("train", &name, MetricMeta::new(&name, "LOSS"))
            .await?;
        Ok(Some(data.clone()))
    }

    async fn predict(
        &mut self,
        _ctx: &RunContext,
        data: &Dataset,
    ) -> FedstageResult<Option<Dataset>> {
        self.record("predict")?;
        if let Some(queued) = self.predict_outputs.pop_front() {
            return Ok(queued);
        }
        let keys: Vec<&str> = data.records().iter().map(|(k, _)| k.as_str()).collect();
        Ok(Some(fixtures::prediction_rows(&keys)))
    }

    async fn transform(
        &mut self,
        _ctx: &RunContext,
        data: &Dataset,
    ) -> FedstageResult<Option<Dataset>> {
        self.record("transform")?;
        Ok(Some(data.clone()))
    }

    async fn cross_validation(
        &mut self,
        ctx: &mut RunContext,
        data: Option<&Dataset>,
    ) -> FedstageResult<()> {
        self.record("cross_validation")?;
        let n_splits = self.params.as_ref().map_or(0, |p| p.cv_param.n_splits);
        let records = data.map_or(0, Dataset::len);
        for fold in 0..n_splits {
            let mut fold_ctx = ctx.clone();
            fold_ctx.push_flow_id(fold);
            let name = fold_ctx.metric_name("loss");
            fold_ctx
                .log_metric("train", &name, vec![Metric::new(0, records)])
                .await?;
        }
        Ok(())
    }

    fn export_model(&self) -> Option<ModelArtifact> {
        self.export.clone()
    }
}

/// A metric store whose every operation fails.
#[derive(Debug, Clone, Default)]
pub struct FailingMetricStore;

impl FailingMetricStore {
    /// Creates a failing store.
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    fn fail<T>() -> Result<T, StorageError> {
        Err(StorageError::new("metric_store", "unavailable"))
    }
}

#[async_trait]
impl MetricStore for FailingMetricStore {
    async fn upsert_points(
        &self,
        _scope: &ComponentScope,
        _namespace: &str,
        _name: &str,
        _points: &[Metric],
    ) -> Result<(), StorageError> {
        Self::fail()
    }

    async fn put_meta(
        &self,
        _scope: &ComponentScope,
        _namespace: &str,
        _name: &str,
        _meta: &MetricMeta,
    ) -> Result<(), StorageError> {
        Self::fail()
    }

    async fn points(
        &self,
        _scope: &ComponentScope,
        _namespace: &str,
        _name: &str,
    ) -> Result<Vec<Metric>, StorageError> {
        Self::fail()
    }

    async fn meta(
        &self,
        _scope: &ComponentScope,
        _namespace: &str,
        _name: &str,
    ) -> Result<Option<MetricMeta>, StorageError> {
        Self::fail()
    }

    async fn metric_names(
        &self,
        _scope: &ComponentScope,
    ) -> Result<Vec<(String, String)>, StorageError> {
        Self::fail()
    }

    async fn components(&self, _job: &JobScope) -> Result<Vec<String>, StorageError> {
        Self::fail()
    }
}
