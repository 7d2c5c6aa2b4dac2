//! Routing of a run's data inputs to the component's capabilities.

use super::{Component, DataInputs, RunContext};
use crate::core::Stage;
use crate::data::{Dataset, ProvenanceTag, Schema};
use crate::errors::FedstageResult;
use tracing::debug;

/// Decides which capabilities see which split and assembles the output.
///
/// Branches, first match wins:
///
/// 1. training data: fit on it, predict on it (tagged `train`), predict on
///    evaluation data if present (tagged `validation`), union both
/// 2. evaluation data only: predict on it (tagged `test`)
/// 3. generic data: fit's own output under [`Stage::Fit`], transform output
///    otherwise
///
/// Outputs of the first two branches always carry the prediction schema.
#[derive(Debug, Clone, Copy, Default)]
pub struct DataSetRouter;

impl DataSetRouter {
    /// Creates a router.
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Routes `inputs` through `component`.
    ///
    /// `Ok(None)` means there is nothing to persist.
    pub async fn route<C>(
        &self,
        component: &mut C,
        ctx: &RunContext,
        stage: Stage,
        inputs: &DataInputs,
    ) -> FedstageResult<Option<Dataset>>
    where
        C: Component + ?Sized,
    {
        if let Some(train) = &inputs.train_data {
            debug!(records = train.len(), "Routing training data");
            component.fit(ctx, train).await?;
            let train_out = component
                .predict(ctx, train)
                .await?
                .map(|out| out.tagged(ProvenanceTag::Train));

            let eval_out = match &inputs.eval_data {
                Some(eval) => component
                    .predict(ctx, eval)
                    .await?
                    .map(|out| out.tagged(ProvenanceTag::Validation)),
                None => None,
            };

            let output = match (train_out, eval_out) {
                (Some(train_out), Some(eval_out)) => Some(train_out.union(eval_out)),
                (Some(train_out), None) => Some(train_out),
                (None, eval_out) => eval_out,
            };
            return Ok(output.map(with_predict_schema));
        }

        if let Some(eval) = &inputs.eval_data {
            debug!(records = eval.len(), "Routing evaluation data");
            let output = component
                .predict(ctx, eval)
                .await?
                .map(|out| out.tagged(ProvenanceTag::Test).with_schema(Schema::predict()));
            return Ok(output);
        }

        match &inputs.data {
            Some(data) if stage.is_fit() => {
                debug!(records = data.len(), "Fitting on generic data");
                component.fit(ctx, data).await
            }
            Some(data) => {
                debug!(records = data.len(), "Transforming generic data");
                component.transform(ctx, data).await
            }
            None => Ok(None),
        }
    }
}

fn with_predict_schema(dataset: Dataset) -> Dataset {
    dataset.with_schema(Schema::predict())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{DataValue, PREDICT_HEADER};
    use crate::testing::{fixtures, RecordingComponent};
    use crate::tracking::InMemoryMetricStore;
    use serde_json::json;
    use std::sync::Arc;

    fn ctx() -> RunContext {
        RunContext::new(
            fixtures::guest_scope("hetero_lr_0"),
            Arc::new(InMemoryMetricStore::new()),
        )
    }

    fn tags(dataset: &Dataset) -> Vec<(String, String)> {
        dataset
            .records()
            .iter()
            .map(|(key, value)| {
                let tag = value
                    .values()
                    .last()
                    .and_then(|v| v.as_str())
                    .unwrap_or_default()
                    .to_string();
                (key.clone(), tag)
            })
            .collect()
    }

    #[tokio::test]
    async fn test_train_and_eval_are_unioned() {
        let mut component = RecordingComponent::new();
        let inputs = DataInputs::none()
            .with_train(fixtures::instances(&["A", "B"]))
            .with_eval(fixtures::instances(&["C"]));

        let out = DataSetRouter::new()
            .route(&mut component, &ctx(), Stage::Fit, &inputs)
            .await
            .unwrap()
            .unwrap();

        assert_eq!(out.len(), 3);
        let mut tagged = tags(&out);
        tagged.sort();
        assert_eq!(
            tagged,
            vec![
                ("A".to_string(), "train".to_string()),
                ("B".to_string(), "train".to_string()),
                ("C".to_string(), "validation".to_string()),
            ]
        );
        assert_eq!(out.schema().header, PREDICT_HEADER.to_vec());
        assert_eq!(component.calls(), vec!["fit", "predict", "predict"]);
    }

    #[tokio::test]
    async fn test_eval_only_is_tagged_test() {
        let mut component = RecordingComponent::new();
        let inputs = DataInputs::none().with_eval(fixtures::instances(&["C"]));

        let out = DataSetRouter::new()
            .route(&mut component, &ctx(), Stage::Transform, &inputs)
            .await
            .unwrap()
            .unwrap();

        assert_eq!(tags(&out), vec![("C".to_string(), "test".to_string())]);
        assert_eq!(out.schema().header, PREDICT_HEADER.to_vec());
        assert_eq!(component.calls(), vec!["predict"]);
    }

    #[tokio::test]
    async fn test_no_inputs_yield_nothing() {
        let mut component = RecordingComponent::new();
        let out = DataSetRouter::new()
            .route(&mut component, &ctx(), Stage::Fit, &DataInputs::none())
            .await
            .unwrap();

        assert!(out.is_none());
        assert!(component.calls().is_empty());
    }

    #[tokio::test]
    async fn test_eval_output_used_when_train_predict_is_empty() {
        let mut component = RecordingComponent::new().with_predict_outputs(vec![
            None,
            Some(fixtures::prediction_rows(&["C"])),
        ]);
        let inputs = DataInputs::none()
            .with_train(fixtures::instances(&["A"]))
            .with_eval(fixtures::instances(&["C"]));

        let out = DataSetRouter::new()
            .route(&mut component, &ctx(), Stage::Fit, &inputs)
            .await
            .unwrap()
            .unwrap();

        assert_eq!(tags(&out), vec![("C".to_string(), "validation".to_string())]);
    }

    #[tokio::test]
    async fn test_empty_prediction_still_gets_schema() {
        let mut component =
            RecordingComponent::new().with_predict_outputs(vec![Some(Dataset::new())]);
        let inputs = DataInputs::none().with_train(fixtures::instances(&["A"]));

        let out = DataSetRouter::new()
            .route(&mut component, &ctx(), Stage::Fit, &inputs)
            .await
            .unwrap()
            .unwrap();

        assert!(out.is_empty());
        assert_eq!(out.schema(), &Schema::predict());
    }

    #[tokio::test]
    async fn test_plain_data_follows_stage() {
        let data = Dataset::from_records(vec![("A".to_string(), DataValue::Row(vec![json!(1)]))]);

        let mut component = RecordingComponent::new();
        let fit_out = DataSetRouter::new()
            .route(&mut component, &ctx(), Stage::Fit, &DataInputs::plain(data.clone()))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(component.calls(), vec!["fit"]);
        assert_eq!(fit_out.schema(), data.schema());

        let mut component = RecordingComponent::new();
        DataSetRouter::new()
            .route(&mut component, &ctx(), Stage::Transform, &DataInputs::plain(data))
            .await
            .unwrap();
        assert_eq!(component.calls(), vec!["transform"]);
    }

    #[tokio::test]
    async fn test_union_keeps_duplicate_keys() {
        let mut component = RecordingComponent::new();
        let inputs = DataInputs::none()
            .with_train(fixtures::instances(&["A"]))
            .with_eval(fixtures::instances(&["A"]));

        let out = DataSetRouter::new()
            .route(&mut component, &ctx(), Stage::Fit, &inputs)
            .await
            .unwrap()
            .unwrap();

        assert_eq!(out.get("A").count(), 2);
    }
}
