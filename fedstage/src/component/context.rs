//! Per-run context handed to component capabilities.

use crate::core::ComponentScope;
use crate::errors::FedstageResult;
use crate::events::{EventSink, NoOpEventSink, RunEvent};
use crate::observability::component_span;
use crate::tracking::{Metric, MetricMeta, MetricStore, MetricsTracker};
use std::sync::Arc;
use uuid::Uuid;

/// Everything scoped to one component run.
///
/// The logging span, the metrics tracker and the event sink all live as long
/// as the run and are dropped with it.
#[derive(Clone)]
pub struct RunContext {
    tracker: MetricsTracker,
    events: Arc<dyn EventSink>,
    span: tracing::Span,
    flow_id: String,
    task_id: String,
    need_cv: bool,
}

impl std::fmt::Debug for RunContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RunContext")
            .field("scope", self.tracker.scope())
            .field("flow_id", &self.flow_id)
            .field("task_id", &self.task_id)
            .field("need_cv", &self.need_cv)
            .finish_non_exhaustive()
    }
}

impl RunContext {
    /// Creates a context whose tracker writes to `metrics`.
    #[must_use]
    pub fn new(scope: ComponentScope, metrics: Arc<dyn MetricStore>) -> Self {
        let span = component_span(&scope);
        Self {
            tracker: MetricsTracker::new(scope, metrics),
            events: Arc::new(NoOpEventSink),
            span,
            flow_id: String::new(),
            task_id: Uuid::new_v4().to_string(),
            need_cv: false,
        }
    }

    /// Sets the event sink.
    #[must_use]
    pub fn with_event_sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.events = sink;
        self
    }

    /// Sets the flow id.
    #[must_use]
    pub fn with_flow_id(mut self, flow_id: impl Into<String>) -> Self {
        self.flow_id = flow_id.into();
        self
    }

    /// Sets the task id.
    #[must_use]
    pub fn with_task_id(mut self, task_id: impl Into<String>) -> Self {
        self.task_id = task_id.into();
        self
    }

    /// Returns the run scope.
    #[must_use]
    pub fn scope(&self) -> &ComponentScope {
        self.tracker.scope()
    }

    /// Returns the metrics tracker.
    #[must_use]
    pub fn tracker(&self) -> &MetricsTracker {
        &self.tracker
    }

    /// Returns the run's logging span.
    #[must_use]
    pub fn span(&self) -> &tracing::Span {
        &self.span
    }

    /// Returns the flow id.
    #[must_use]
    pub fn flow_id(&self) -> &str {
        &self.flow_id
    }

    /// Returns the task id.
    #[must_use]
    pub fn task_id(&self) -> &str {
        &self.task_id
    }

    /// Returns true if this run cross-validates.
    #[must_use]
    pub fn need_cv(&self) -> bool {
        self.need_cv
    }

    pub(crate) fn set_need_cv(&mut self, need_cv: bool) {
        self.need_cv = need_cv;
    }

    /// Extends the flow id with `suffix` (`flow` becomes `flow_suffix`).
    ///
    /// Cross-validation routines call this once per fold so that each fold
    /// writes its metrics under a distinct name.
    pub fn push_flow_id(&mut self, suffix: impl std::fmt::Display) {
        self.flow_id = format!("{}_{}", self.flow_id, suffix);
    }

    /// Metric name for `prefix`, suffixed with the flow id under cross validation.
    #[must_use]
    pub fn metric_name(&self, prefix: &str) -> String {
        if self.need_cv {
            format!("{prefix}_{}", self.flow_id)
        } else {
            prefix.to_string()
        }
    }

    /// Logs metric points through the run's tracker.
    pub async fn log_metric(
        &self,
        namespace: &str,
        name: &str,
        points: Vec<Metric>,
    ) -> FedstageResult<()> {
        self.tracker.log_metric(namespace, name, points).await
    }

    /// Sets metric metadata through the run's tracker.
    pub async fn set_metric_meta(
        &self,
        namespace: &str,
        name: &str,
        meta: MetricMeta,
    ) -> FedstageResult<()> {
        self.tracker.set_metric_meta(namespace, name, meta).await
    }

    /// Emits a lifecycle event.
    pub fn emit(&self, event: &RunEvent) {
        self.events.emit(event);
    }
}
