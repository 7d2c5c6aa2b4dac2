//! Drives a full component run and persists its outputs.

use super::{Component, DataInputs, RunContext, StageSelector};
use crate::core::{ComponentScope, ModelInputs, Stage};
use crate::data::{DataRef, Dataset, DatasetStore};
use crate::errors::FedstageResult;
use crate::events::{RunEvent, RunEventKind};
use crate::observability::SpanTimer;
use crate::registry::ModelStore;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::{error, info, Instrument};

/// Output data name used when a request names none.
pub const DEFAULT_OUTPUT_DATA_NAME: &str = "data";

/// What a run receives besides its component and context.
#[derive(Debug, Clone)]
pub struct RunRequest {
    /// Parameter overrides from the job configuration.
    pub overrides: serde_json::Value,
    /// Supplied models.
    pub models: ModelInputs,
    /// Supplied data.
    pub data: DataInputs,
    /// Name the output dataset is stored under.
    pub output_data_name: String,
    /// Model key to save the exported model under. Nothing is saved without it.
    pub model_key: Option<String>,
}

impl Default for RunRequest {
    fn default() -> Self {
        Self {
            overrides: serde_json::Value::Null,
            models: ModelInputs::none(),
            data: DataInputs::none(),
            output_data_name: DEFAULT_OUTPUT_DATA_NAME.to_string(),
            model_key: None,
        }
    }
}

impl RunRequest {
    /// Creates a request with no overrides, models or data.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the parameter overrides.
    #[must_use]
    pub fn with_overrides(mut self, overrides: serde_json::Value) -> Self {
        self.overrides = overrides;
        self
    }

    /// Sets the supplied models.
    #[must_use]
    pub fn with_models(mut self, models: ModelInputs) -> Self {
        self.models = models;
        self
    }

    /// Sets the supplied data.
    #[must_use]
    pub fn with_data(mut self, data: DataInputs) -> Self {
        self.data = data;
        self
    }

    /// Sets the output data name.
    #[must_use]
    pub fn with_output_data_name(mut self, name: impl Into<String>) -> Self {
        self.output_data_name = name.into();
        self
    }

    /// Sets the model key.
    #[must_use]
    pub fn with_model_key(mut self, model_key: impl Into<String>) -> Self {
        self.model_key = Some(model_key.into());
        self
    }
}

/// Summary of a finished run.
#[derive(Debug, Clone)]
pub struct RunReport {
    /// The run scope.
    pub scope: ComponentScope,
    /// The stage that ran.
    pub stage: Stage,
    /// The resolved `need_run` flag.
    pub need_run: bool,
    /// Where the output dataset was written, if one was produced.
    pub output_ref: Option<DataRef>,
    /// Number of output records.
    pub output_records: usize,
    /// Whether an exported model was saved.
    pub model_saved: bool,
    /// When the run started.
    pub started_at: DateTime<Utc>,
    /// Wall time in milliseconds.
    pub duration_ms: f64,
    /// The output dataset.
    pub output: Option<Dataset>,
}

impl RunReport {
    /// Converts to a dictionary representation.
    #[must_use]
    pub fn to_dict(&self) -> serde_json::Map<String, serde_json::Value> {
        let mut map = serde_json::Map::new();
        map.insert("scope".to_string(), serde_json::json!(self.scope.to_string()));
        map.insert("stage".to_string(), serde_json::json!(self.stage));
        map.insert("need_run".to_string(), serde_json::json!(self.need_run));
        map.insert(
            "output_ref".to_string(),
            serde_json::json!(self.output_ref.as_ref().map(ToString::to_string)),
        );
        map.insert("output_records".to_string(), serde_json::json!(self.output_records));
        map.insert("model_saved".to_string(), serde_json::json!(self.model_saved));
        map.insert("started_at".to_string(), serde_json::json!(self.started_at.to_rfc3339()));
        map.insert("duration_ms".to_string(), serde_json::json!(self.duration_ms));
        map
    }
}

/// Runs components end to end: stage selection, output persistence and
/// model export.
#[derive(Clone)]
pub struct ComponentRunner {
    selector: StageSelector,
    datasets: Arc<dyn DatasetStore>,
    models: Arc<dyn ModelStore>,
}

impl std::fmt::Debug for ComponentRunner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ComponentRunner")
            .field("selector", &self.selector)
            .finish_non_exhaustive()
    }
}

impl ComponentRunner {
    /// Creates a runner writing to the given stores.
    #[must_use]
    pub fn new(datasets: Arc<dyn DatasetStore>, models: Arc<dyn ModelStore>) -> Self {
        Self {
            selector: StageSelector::new(),
            datasets,
            models,
        }
    }

    /// Runs `component` inside the context's span.
    ///
    /// Emits `component.completed` or `component.failed` when done. A failure
    /// leaves whatever the component already wrote to the metric store.
    pub async fn run<C>(
        &self,
        component: &mut C,
        mut ctx: RunContext,
        request: RunRequest,
    ) -> FedstageResult<RunReport>
    where
        C: Component + ?Sized,
    {
        let span = ctx.span().clone();
        let started_at = Utc::now();
        let timer = SpanTimer::start(ctx.scope().to_string());

        let result = self
            .execute(component, &mut ctx, request, started_at)
            .instrument(span.clone())
            .await;
        let duration_ms = timer.finish();
        let _entered = span.enter();

        match result {
            Ok(mut report) => {
                report.duration_ms = duration_ms;
                info!(
                    stage = %report.stage,
                    output_records = report.output_records,
                    model_saved = report.model_saved,
                    duration_ms,
                    "Component run completed"
                );
                ctx.emit(
                    &RunEvent::new(RunEventKind::Completed, ctx.scope().clone())
                        .with_stage(report.stage)
                        .with_detail(serde_json::Value::Object(report.to_dict())),
                );
                Ok(report)
            }
            Err(err) => {
                error!(error = %err, kind = err.kind(), duration_ms, "Component run failed");
                ctx.emit(
                    &RunEvent::new(RunEventKind::Failed, ctx.scope().clone()).with_detail(
                        serde_json::to_value(err.to_dict()).unwrap_or(serde_json::Value::Null),
                    ),
                );
                Err(err)
            }
        }
    }

    async fn execute<C>(
        &self,
        component: &mut C,
        ctx: &mut RunContext,
        request: RunRequest,
        started_at: DateTime<Utc>,
    ) -> FedstageResult<RunReport>
    where
        C: Component + ?Sized,
    {
        let run = self
            .selector
            .select_and_run(
                component,
                ctx,
                &request.overrides,
                &request.models,
                &request.data,
            )
            .await?;

        let scope = ctx.scope().clone();
        let mut output_ref = None;
        if let Some(output) = &run.output {
            let data_ref = DataRef::output(&scope, &request.output_data_name);
            self.datasets.write(&data_ref, output).await?;
            info!(table = %data_ref, records = output.len(), "Saved output data");
            output_ref = Some(data_ref);
        }

        let mut model_saved = false;
        if let (Some(model_key), false) = (&request.model_key, run.stage.is_skip()) {
            if let Some(artifact) = component.export_model() {
                self.models
                    .save_model(model_key, &scope, component.module_name(), &artifact)
                    .await?;
                info!(model_key = %model_key, buffers = artifact.len(), "Saved output model");
                model_saved = true;
            }
        }

        Ok(RunReport {
            scope,
            stage: run.stage,
            need_run: run.need_run,
            output_ref,
            output_records: run.output.as_ref().map_or(0, Dataset::len),
            model_saved,
            started_at,
            duration_ms: 0.0,
            output: run.output,
        })
    }
}
