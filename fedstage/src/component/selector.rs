//! Stage selection and execution for one component run.

use super::{Component, DataInputs, DataSetRouter, RunContext};
use crate::core::{ModelInputs, Stage};
use crate::data::Dataset;
use crate::errors::FedstageResult;
use crate::events::{RunEvent, RunEventKind};
use crate::params::ParameterBinder;
use tracing::{debug, info};

/// Outcome of [`StageSelector::select_and_run`].
#[derive(Debug, Clone, PartialEq)]
pub struct StageRun {
    /// The stage that ran.
    pub stage: Stage,
    /// The resolved `need_run` flag.
    pub need_run: bool,
    /// The produced dataset, if any.
    pub output: Option<Dataset>,
}

/// Binds parameters, picks the stage and drives the component through it.
#[derive(Debug, Clone, Copy, Default)]
pub struct StageSelector {
    binder: ParameterBinder,
    router: DataSetRouter,
}

impl StageSelector {
    /// Creates a selector.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Runs `component` once.
    ///
    /// Order: bind `overrides`, hand the parameters to the component, select
    /// the stage, load a supplied model, then either skip (no data), cross
    /// validate over the training data, or route the data inputs. A loaded
    /// model whose meta block sets `need_run` overrides the bound flag. A
    /// binding failure returns before any component capability is called.
    pub async fn select_and_run<C>(
        &self,
        component: &mut C,
        ctx: &mut RunContext,
        overrides: &serde_json::Value,
        models: &ModelInputs,
        data: &DataInputs,
    ) -> FedstageResult<StageRun>
    where
        C: Component + ?Sized,
    {
        let bound = self.binder.bind(&component.default_param(), overrides)?;
        component.init_model(&bound.params)?;
        ctx.set_need_cv(bound.need_cv);

        let stage = Stage::select(
            bound.need_cv,
            models.model.is_some(),
            models.isometric_model.is_some(),
        );
        info!(
            stage = %stage,
            module = component.module_name(),
            need_run = bound.need_run,
            "Selected component stage"
        );
        ctx.emit(
            &RunEvent::new(RunEventKind::StageSelected, ctx.scope().clone()).with_stage(stage),
        );

        let mut need_run = bound.need_run;
        if !bound.need_cv {
            if let Some(model) = models.to_load() {
                debug!(buffers = model.len(), "Loading model");
                component.load_model(model).await?;
                if let Some(model_need_run) = model.need_run() {
                    debug!(need_run = model_need_run, "need_run taken from model meta");
                    need_run = model_need_run;
                }
            }
        }

        if data.is_empty() {
            info!("No data supplied, skipping component");
            ctx.emit(
                &RunEvent::new(RunEventKind::Skipped, ctx.scope().clone())
                    .with_stage(Stage::Skip),
            );
            return Ok(StageRun {
                stage: Stage::Skip,
                need_run,
                output: None,
            });
        }

        let output = if stage == Stage::CrossValidation {
            info!("Running cross validation");
            component
                .cross_validation(ctx, data.train_data.as_ref())
                .await?;
            None
        } else {
            self.router.route(component, ctx, stage, data).await?
        };

        Ok(StageRun {
            stage,
            need_run,
            output,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::ModelArtifact;
    use crate::events::CollectingEventSink;
    use crate::testing::{fixtures, RecordingComponent};
    use crate::tracking::InMemoryMetricStore;
    use serde_json::json;
    use std::sync::Arc;

    fn ctx_with_events() -> (RunContext, Arc<CollectingEventSink>) {
        let events = Arc::new(CollectingEventSink::new());
        let ctx = RunContext::new(
            fixtures::guest_scope("hetero_lr_0"),
            Arc::new(InMemoryMetricStore::new()),
        )
        .with_event_sink(events.clone());
        (ctx, events)
    }

    fn model() -> ModelArtifact {
        ModelArtifact::new().with_buffer("HeteroLRParam", json!({"weight": {"x0": 0.3}}))
    }

    #[tokio::test]
    async fn test_cv_bypasses_router() {
        let (mut ctx, _) = ctx_with_events();
        let mut component = RecordingComponent::new();
        let data = DataInputs::none().with_train(fixtures::instances(&["A", "B"]));

        let run = StageSelector::new()
            .select_and_run(
                &mut component,
                &mut ctx,
                &json!({"cv_param": {"need_cv": true}}),
                &ModelInputs::none().with_model(model()),
                &data,
            )
            .await
            .unwrap();

        assert_eq!(run.stage, Stage::CrossValidation);
        assert!(run.output.is_none());
        assert_eq!(component.calls(), vec!["init_model", "cross_validation"]);
        assert!(ctx.need_cv());
    }

    #[tokio::test]
    async fn test_model_selects_transform_and_loads_first() {
        let (mut ctx, _) = ctx_with_events();
        let mut component = RecordingComponent::new();
        let data = DataInputs::plain(fixtures::instances(&["A"]));

        let run = StageSelector::new()
            .select_and_run(
                &mut component,
                &mut ctx,
                &serde_json::Value::Null,
                &ModelInputs::none().with_model(model()),
                &data,
            )
            .await
            .unwrap();

        assert_eq!(run.stage, Stage::Transform);
        assert!(run.need_run);
        assert_eq!(component.calls(), vec!["init_model", "load_model", "transform"]);
    }

    #[tokio::test]
    async fn test_loaded_model_meta_overrides_need_run() {
        let (mut ctx, events) = ctx_with_events();
        let mut component = RecordingComponent::new();
        let trained = model().with_buffer("HeteroLRMeta", json!({"need_run": false}));

        let run = StageSelector::new()
            .select_and_run(
                &mut component,
                &mut ctx,
                &json!({"need_run": true}),
                &ModelInputs::none().with_model(trained),
                &DataInputs::plain(fixtures::instances(&["A"])),
            )
            .await
            .unwrap();

        assert_eq!(run.stage, Stage::Transform);
        assert!(!run.need_run);
        let selected = events.events();
        assert_eq!(selected.len(), 1);
        assert_eq!(selected[0].stage, Some(Stage::Transform));
    }

    #[tokio::test]
    async fn test_model_without_meta_keeps_bound_need_run() {
        let (mut ctx, _) = ctx_with_events();
        let mut component = RecordingComponent::new();

        let run = StageSelector::new()
            .select_and_run(
                &mut component,
                &mut ctx,
                &json!({"need_run": false}),
                &ModelInputs::none().with_model(model()),
                &DataInputs::plain(fixtures::instances(&["A"])),
            )
            .await
            .unwrap();

        assert!(!run.need_run);
    }

    #[tokio::test]
    async fn test_cv_ignores_model_meta_need_run() {
        let (mut ctx, _) = ctx_with_events();
        let mut component = RecordingComponent::new();
        let trained = model().with_buffer("HeteroLRMeta", json!({"need_run": false}));

        let run = StageSelector::new()
            .select_and_run(
                &mut component,
                &mut ctx,
                &json!({"cv_param": {"need_cv": true}}),
                &ModelInputs::none().with_model(trained),
                &DataInputs::none().with_train(fixtures::instances(&["A", "B"])),
            )
            .await
            .unwrap();

        assert_eq!(run.stage, Stage::CrossValidation);
        assert!(run.need_run);
        assert!(!component.calls().contains(&"load_model"));
    }

    #[tokio::test]
    async fn test_isometric_model_still_fits() {
        let (mut ctx, _) = ctx_with_events();
        let mut component = RecordingComponent::new();
        let data = DataInputs::plain(fixtures::instances(&["A"]));

        let run = StageSelector::new()
            .select_and_run(
                &mut component,
                &mut ctx,
                &json!({}),
                &ModelInputs::none().with_isometric_model(model()),
                &data,
            )
            .await
            .unwrap();

        assert_eq!(run.stage, Stage::Fit);
        assert_eq!(component.calls(), vec!["init_model", "load_model", "fit"]);
    }

    #[tokio::test]
    async fn test_no_data_skips_after_loading() {
        let (mut ctx, events) = ctx_with_events();
        let mut component = RecordingComponent::new();

        let run = StageSelector::new()
            .select_and_run(
                &mut component,
                &mut ctx,
                &json!({"need_run": false}),
                &ModelInputs::none().with_model(model()),
                &DataInputs::none(),
            )
            .await
            .unwrap();

        assert_eq!(run.stage, Stage::Skip);
        assert!(!run.need_run);
        assert!(run.output.is_none());
        assert_eq!(component.calls(), vec!["init_model", "load_model"]);
        assert_eq!(
            events.kinds(),
            vec!["component.stage_selected", "component.skipped"]
        );
    }

    #[tokio::test]
    async fn test_unknown_override_aborts_before_component() {
        let (mut ctx, events) = ctx_with_events();
        let mut component = RecordingComponent::new();

        let err = StageSelector::new()
            .select_and_run(
                &mut component,
                &mut ctx,
                &json!({"learning_rate": 0.1}),
                &ModelInputs::none(),
                &DataInputs::plain(fixtures::instances(&["A"])),
            )
            .await
            .unwrap_err();

        assert_eq!(err.kind(), "ValidationError");
        assert!(component.calls().is_empty());
        assert!(events.is_empty());
    }

    #[tokio::test]
    async fn test_check_failure_aborts_before_component() {
        let (mut ctx, _) = ctx_with_events();
        let mut component = RecordingComponent::new();

        let err = StageSelector::new()
            .select_and_run(
                &mut component,
                &mut ctx,
                &json!({"max_iter": 0}),
                &ModelInputs::none(),
                &DataInputs::plain(fixtures::instances(&["A"])),
            )
            .await
            .unwrap_err();

        assert!(err.to_string().contains("max_iter"));
        assert!(component.calls().is_empty());
    }
}
