//! Transport-independent query endpoints.
//!
//! Each endpoint takes a deserializable request and always answers with an
//! [`ApiResponse`]; failures become return codes instead of errors.

use super::{summary_to_json, MetricsQueryService};
use crate::component::DEFAULT_OUTPUT_DATA_NAME;
use crate::core::{ComponentScope, JobScope, PartyRef};
use crate::errors::{FedstageError, FedstageResult};
use crate::registry::{ComponentGraph, JobRegistry};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::sync::Arc;
use tracing::{debug, error};

/// Return codes carried by [`ApiResponse::retcode`].
#[derive(Debug, Clone, Copy)]
pub struct RetCode;

impl RetCode {
    /// Success, including "no data".
    pub const SUCCESS: i32 = 0;
    /// A backing store failed.
    pub const INTERNAL_ERROR: i32 = 100;
    /// The job (or its graph) is unknown.
    pub const JOB_NOT_FOUND: i32 = 101;
    /// The component or its parameters are unknown.
    pub const COMPONENT_NOT_FOUND: i32 = 102;
}

/// Envelope of every endpoint response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiResponse {
    /// Return code, see [`RetCode`].
    pub retcode: i32,
    /// Human-readable status.
    pub retmsg: String,
    /// Payload.
    #[serde(default)]
    pub data: Value,
    /// Optional payload metadata.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<Value>,
}

impl ApiResponse {
    /// A successful response.
    #[must_use]
    pub fn success(data: Value) -> Self {
        Self {
            retcode: RetCode::SUCCESS,
            retmsg: "success".to_string(),
            data,
            meta: None,
        }
    }

    /// A successful response that found nothing.
    #[must_use]
    pub fn no_data(data: Value) -> Self {
        Self {
            retcode: RetCode::SUCCESS,
            retmsg: "no data".to_string(),
            data,
            meta: None,
        }
    }

    /// An error response.
    #[must_use]
    pub fn error(retcode: i32, retmsg: impl Into<String>) -> Self {
        Self {
            retcode,
            retmsg: retmsg.into(),
            data: Value::Null,
            meta: None,
        }
    }

    /// Maps an error: not-found becomes "no data", anything else an internal
    /// error.
    #[must_use]
    pub fn from_error(err: &FedstageError) -> Self {
        if err.is_not_found() {
            return Self::no_data(json!({}));
        }
        error!(error = %err, kind = err.kind(), "Query failed");
        Self::error(RetCode::INTERNAL_ERROR, err.to_string())
    }

    /// Sets the payload.
    #[must_use]
    pub fn with_data(mut self, data: Value) -> Self {
        self.data = data;
        self
    }

    /// Sets the metadata.
    #[must_use]
    pub fn with_meta(mut self, meta: Value) -> Self {
        self.meta = Some(meta);
        self
    }

    /// Returns true for retcode 0.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.retcode == RetCode::SUCCESS
    }
}

/// Request addressing a job.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobQuery {
    /// The job id.
    pub job_id: String,
    /// Role; resolved from the initiator when both role and party are absent.
    #[serde(default)]
    pub role: Option<String>,
    /// Party id.
    #[serde(default)]
    pub party_id: Option<u64>,
}

impl JobQuery {
    /// Creates a query for the initiator's view of `job_id`.
    #[must_use]
    pub fn new(job_id: impl Into<String>) -> Self {
        Self {
            job_id: job_id.into(),
            ..Self::default()
        }
    }

    /// Sets the role and party.
    #[must_use]
    pub fn as_party(mut self, role: impl Into<String>, party_id: u64) -> Self {
        self.role = Some(role.into());
        self.party_id = Some(party_id);
        self
    }
}

/// Request addressing a component of a job.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComponentQuery {
    /// The job id.
    pub job_id: String,
    /// The component name.
    pub component_name: String,
    /// Role; resolved from the initiator when both role and party are absent.
    #[serde(default)]
    pub role: Option<String>,
    /// Party id.
    #[serde(default)]
    pub party_id: Option<u64>,
}

impl ComponentQuery {
    /// Creates a query for the initiator's view of a component.
    #[must_use]
    pub fn new(job_id: impl Into<String>, component_name: impl Into<String>) -> Self {
        Self {
            job_id: job_id.into(),
            component_name: component_name.into(),
            ..Self::default()
        }
    }

    /// Sets the role and party.
    #[must_use]
    pub fn as_party(mut self, role: impl Into<String>, party_id: u64) -> Self {
        self.role = Some(role.into());
        self.party_id = Some(party_id);
        self
    }

    fn job_query(&self) -> JobQuery {
        JobQuery {
            job_id: self.job_id.clone(),
            role: self.role.clone(),
            party_id: self.party_id,
        }
    }
}

/// Request addressing one metric series of a component.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricQuery {
    /// The component.
    #[serde(flatten)]
    pub component: ComponentQuery,
    /// Metric namespace.
    pub metric_namespace: String,
    /// Metric name.
    pub metric_name: String,
}

impl MetricQuery {
    /// Creates a query for `(namespace, name)` of a component.
    #[must_use]
    pub fn new(
        component: ComponentQuery,
        metric_namespace: impl Into<String>,
        metric_name: impl Into<String>,
    ) -> Self {
        Self {
            component,
            metric_namespace: metric_namespace.into(),
            metric_name: metric_name.into(),
        }
    }
}

/// The six query endpoints.
#[derive(Clone)]
pub struct QueryApi {
    jobs: Arc<dyn JobRegistry>,
    graph: Arc<dyn ComponentGraph>,
    service: MetricsQueryService,
}

impl std::fmt::Debug for QueryApi {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueryApi")
            .field("service", &self.service)
            .finish_non_exhaustive()
    }
}

impl QueryApi {
    /// Creates the API over a job registry, a graph store and the query service.
    #[must_use]
    pub fn new(
        jobs: Arc<dyn JobRegistry>,
        graph: Arc<dyn ComponentGraph>,
        service: MetricsQueryService,
    ) -> Self {
        Self {
            jobs,
            graph,
            service,
        }
    }

    /// Job data view plus `model_summary`. 101 if the job is unknown.
    pub async fn job_view(&self, query: &JobQuery) -> ApiResponse {
        self.try_job_view(query)
            .await
            .unwrap_or_else(|err| ApiResponse::from_error(&err))
    }

    /// `{namespace: [names]}` of a component.
    pub async fn component_metrics(&self, query: &ComponentQuery) -> ApiResponse {
        self.try_component_metrics(query)
            .await
            .unwrap_or_else(|err| ApiResponse::from_error(&err))
    }

    /// `[[key, value]]` of one series in key order, with its meta.
    pub async fn component_metric_data(&self, query: &MetricQuery) -> ApiResponse {
        self.try_component_metric_data(query)
            .await
            .unwrap_or_else(|err| ApiResponse::from_error(&err))
    }

    /// `{module, *Param}` as configured for the requesting party.
    pub async fn component_parameters(&self, query: &ComponentQuery) -> ApiResponse {
        self.try_component_parameters(query)
            .await
            .unwrap_or_else(|err| ApiResponse::from_error(&err))
    }

    /// The component's trained parameters with its pipeline meta.
    pub async fn component_output_model(&self, query: &ComponentQuery) -> ApiResponse {
        self.try_component_output_model(query)
            .await
            .unwrap_or_else(|err| ApiResponse::from_error(&err))
    }

    /// Preview rows of the component's primary output table.
    pub async fn component_output_data(&self, query: &ComponentQuery) -> ApiResponse {
        self.try_component_output_data(query)
            .await
            .unwrap_or_else(|err| ApiResponse::from_error(&err))
    }

    /// Fills in role and party when the request names neither.
    ///
    /// Falls back to the job initiator; if the job has no initiator record
    /// here, to an empty role and party 0.
    async fn resolve_party(&self, query: &JobQuery) -> FedstageResult<PartyRef> {
        if query.role.is_some() || query.party_id.is_some() {
            return Ok(PartyRef::new(
                query.role.clone().unwrap_or_default(),
                query.party_id.unwrap_or(0),
            ));
        }
        let party = self
            .jobs
            .find_initiating_job(&query.job_id)
            .await?
            .map(|record| record.initiator())
            .unwrap_or_else(|| PartyRef::new("", 0));
        debug!(job_id = %query.job_id, role = %party.role, party_id = party.party_id, "Resolved party from initiator");
        Ok(party)
    }

    async fn job_scope(&self, query: &JobQuery) -> FedstageResult<JobScope> {
        let party = self.resolve_party(query).await?;
        Ok(JobScope::new(query.job_id.clone(), party.role, party.party_id))
    }

    async fn component_scope(&self, query: &ComponentQuery) -> FedstageResult<ComponentScope> {
        Ok(self
            .job_scope(&query.job_query())
            .await?
            .component(query.component_name.clone()))
    }

    async fn try_job_view(&self, query: &JobQuery) -> FedstageResult<ApiResponse> {
        let job = self.job_scope(query).await?;
        let Some(mut view) = self.jobs.job_view(&job).await? else {
            return Ok(ApiResponse::error(RetCode::JOB_NOT_FOUND, "error"));
        };
        let summary = self.service.get_job_summary(&job).await?;
        view.insert("model_summary".to_string(), summary_to_json(&summary));
        Ok(ApiResponse::success(Value::Object(view)))
    }

    async fn try_component_metrics(&self, query: &ComponentQuery) -> FedstageResult<ApiResponse> {
        let scope = self.component_scope(query).await?;
        let names = self.service.list_metric_names(&scope).await?;
        if names.is_empty() {
            return Ok(ApiResponse::no_data(json!({})));
        }
        let mut grouped = Map::new();
        for (namespace, name) in names {
            if let Value::Array(list) = grouped
                .entry(namespace)
                .or_insert_with(|| Value::Array(Vec::new()))
            {
                list.push(Value::String(name));
            }
        }
        Ok(ApiResponse::success(Value::Object(grouped)))
    }

    async fn try_component_metric_data(&self, query: &MetricQuery) -> FedstageResult<ApiResponse> {
        let scope = self.component_scope(&query.component).await?;
        let points = self
            .service
            .get_metric_points(&scope, &query.metric_namespace, &query.metric_name)
            .await?;
        if points.is_empty() {
            return Ok(ApiResponse::no_data(json!([])));
        }
        let meta = self
            .service
            .get_metric_meta(&scope, &query.metric_namespace, &query.metric_name)
            .await?
            .map_or_else(Map::new, |meta| meta.to_dict());
        let data = points
            .into_iter()
            .map(|point| json!([point.key.to_json(), point.value]))
            .collect();
        Ok(ApiResponse::success(Value::Array(data)).with_meta(Value::Object(meta)))
    }

    async fn try_component_parameters(&self, query: &ComponentQuery) -> FedstageResult<ApiResponse> {
        if !self.graph.has_job(&query.job_id).await? {
            return Ok(ApiResponse::error(RetCode::JOB_NOT_FOUND, "can not found this job"));
        }
        let party = self.resolve_party(&query.job_query()).await?;
        let view = self
            .graph
            .resolve_component(&query.job_id, &query.component_name)
            .await?
            .and_then(|component| component.parameters_view(&party.role, party.party_id));
        Ok(match view {
            Some(view) => ApiResponse::success(Value::Object(view)),
            None => ApiResponse::error(
                RetCode::COMPONENT_NOT_FOUND,
                "can not found this component parameters",
            ),
        })
    }

    async fn try_component_output_model(
        &self,
        query: &ComponentQuery,
    ) -> FedstageResult<ApiResponse> {
        let scope = self.component_scope(query).await?;
        let Some(runtime_conf) = self.jobs.runtime_conf(&scope.job()).await? else {
            return Ok(ApiResponse::error(RetCode::JOB_NOT_FOUND, "can not found this job"));
        };
        let Some(model_key) = runtime_conf
            .pointer("/job_parameters/model_key")
            .and_then(Value::as_str)
        else {
            return Ok(ApiResponse::no_data(json!({})));
        };

        Ok(match self.service.get_output_model(&scope, model_key).await? {
            Some(view) => ApiResponse::success(view.params).with_meta(Value::Object(view.meta)),
            None => ApiResponse::no_data(json!({})),
        })
    }

    async fn try_component_output_data(
        &self,
        query: &ComponentQuery,
    ) -> FedstageResult<ApiResponse> {
        if !self.graph.has_job(&query.job_id).await? {
            return Ok(ApiResponse::error(RetCode::JOB_NOT_FOUND, "can not new parser")
                .with_data(json!([])));
        }
        let Some(component) = self
            .graph
            .resolve_component(&query.job_id, &query.component_name)
            .await?
        else {
            return Ok(ApiResponse::error(RetCode::COMPONENT_NOT_FOUND, "can not found component")
                .with_data(json!([])));
        };

        let scope = self.component_scope(query).await?;
        let data_name = component
            .primary_output_data()
            .unwrap_or(DEFAULT_OUTPUT_DATA_NAME);
        Ok(match self.service.get_output_data(&scope, data_name, None).await? {
            Some(preview) => ApiResponse::success(json!(preview.rows))
                .with_meta(json!({ "header": preview.header })),
            None => ApiResponse::no_data(json!([])),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::InMemoryDatasetStore;
    use crate::errors::{NotFoundError, ResourceKind, StorageError};
    use crate::registry::{
        InMemoryComponentGraph, InMemoryJobRegistry, InMemoryModelStore, InitiatorRecord,
        MockComponentGraph, MockJobRegistry,
    };
    use crate::testing::FailingMetricStore;
    use crate::tracking::{InMemoryMetricStore, Metric, MetricMeta, MetricsTracker};
    use pretty_assertions::assert_eq;

    fn service(metrics: Arc<dyn crate::tracking::MetricStore>) -> MetricsQueryService {
        MetricsQueryService::new(
            metrics,
            Arc::new(InMemoryDatasetStore::new()),
            Arc::new(InMemoryModelStore::new()),
        )
    }

    fn initiator_registry() -> MockJobRegistry {
        let mut jobs = MockJobRegistry::new();
        jobs.expect_find_initiating_job().returning(|job_id| {
            Ok(Some(InitiatorRecord::new(
                job_id,
                json!({"initiator": {"role": "guest", "party_id": 9999}}),
            )))
        });
        jobs
    }

    #[tokio::test]
    async fn test_role_and_party_resolved_from_initiator() {
        let metrics = Arc::new(InMemoryMetricStore::new());
        MetricsTracker::new(
            ComponentScope::new("job_1", "lr_0", "guest", 9999),
            metrics.clone(),
        )
        .log_metric("train", "loss", vec![Metric::new(0, 0.5)])
        .await
        .unwrap();

        let api = QueryApi::new(
            Arc::new(initiator_registry()),
            Arc::new(InMemoryComponentGraph::new()),
            service(metrics),
        );

        let response = api.component_metrics(&ComponentQuery::new("job_1", "lr_0")).await;
        assert_eq!(response, ApiResponse::success(json!({"train": ["loss"]})));
    }

    #[tokio::test]
    async fn test_explicit_party_skips_initiator_lookup() {
        let mut jobs = MockJobRegistry::new();
        jobs.expect_find_initiating_job().times(0);

        let api = QueryApi::new(
            Arc::new(jobs),
            Arc::new(InMemoryComponentGraph::new()),
            service(Arc::new(InMemoryMetricStore::new())),
        );

        let response = api
            .component_metrics(&ComponentQuery::new("job_1", "lr_0").as_party("host", 10000))
            .await;
        assert_eq!(response, ApiResponse::no_data(json!({})));
    }

    #[tokio::test]
    async fn test_unknown_job_view_is_101() {
        let mut jobs = initiator_registry();
        jobs.expect_job_view().returning(|_| Ok(None));

        let api = QueryApi::new(
            Arc::new(jobs),
            Arc::new(InMemoryComponentGraph::new()),
            service(Arc::new(InMemoryMetricStore::new())),
        );

        let response = api.job_view(&JobQuery::new("job_404")).await;
        assert_eq!(response.retcode, RetCode::JOB_NOT_FOUND);
    }

    #[tokio::test]
    async fn test_parameters_without_graph_is_101() {
        let mut graph = MockComponentGraph::new();
        graph.expect_has_job().returning(|_| Ok(false));
        graph.expect_resolve_component().times(0);

        let api = QueryApi::new(
            Arc::new(InMemoryJobRegistry::new()),
            Arc::new(graph),
            service(Arc::new(InMemoryMetricStore::new())),
        );

        let query = ComponentQuery::new("job_1", "lr_0").as_party("guest", 9999);
        assert_eq!(
            api.component_parameters(&query).await.retcode,
            RetCode::JOB_NOT_FOUND
        );
        assert_eq!(
            api.component_output_data(&query).await,
            ApiResponse::error(RetCode::JOB_NOT_FOUND, "can not new parser").with_data(json!([]))
        );
    }

    #[tokio::test]
    async fn test_missing_component_is_102() {
        let mut graph = MockComponentGraph::new();
        graph.expect_has_job().returning(|_| Ok(true));
        graph.expect_resolve_component().returning(|_, _| Ok(None));

        let api = QueryApi::new(
            Arc::new(InMemoryJobRegistry::new()),
            Arc::new(graph),
            service(Arc::new(InMemoryMetricStore::new())),
        );

        let query = ComponentQuery::new("job_1", "lr_9").as_party("guest", 9999);
        assert_eq!(
            api.component_parameters(&query).await.retcode,
            RetCode::COMPONENT_NOT_FOUND
        );
        assert_eq!(
            api.component_output_data(&query).await.retcode,
            RetCode::COMPONENT_NOT_FOUND
        );
    }

    #[tokio::test]
    async fn test_storage_failure_is_100() {
        let api = QueryApi::new(
            Arc::new(InMemoryJobRegistry::new()),
            Arc::new(InMemoryComponentGraph::new()),
            service(Arc::new(FailingMetricStore::new())),
        );

        let query = ComponentQuery::new("job_1", "lr_0").as_party("guest", 9999);
        let response = api.component_metrics(&query).await;
        assert_eq!(response.retcode, RetCode::INTERNAL_ERROR);
        assert!(response.retmsg.contains("metric_store"));

        let response = api
            .component_metric_data(&MetricQuery::new(query, "train", "loss"))
            .await;
        assert_eq!(response.retcode, RetCode::INTERNAL_ERROR);
    }

    #[tokio::test]
    async fn test_metric_data_sorted_with_meta() {
        let metrics = Arc::new(InMemoryMetricStore::new());
        let tracker = MetricsTracker::new(
            ComponentScope::new("job_1", "lr_0", "guest", 9999),
            metrics.clone(),
        );
        tracker
            .log_metric("train", "loss", vec![Metric::new(1, 0.4), Metric::new(0, 0.9)])
            .await
            .unwrap();
        tracker
            .set_metric_meta("train", "loss", MetricMeta::new("loss", "LOSS"))
            .await
            .unwrap();

        let api = QueryApi::new(
            Arc::new(InMemoryJobRegistry::new()),
            Arc::new(InMemoryComponentGraph::new()),
            service(metrics),
        );
        let query = MetricQuery::new(
            ComponentQuery::new("job_1", "lr_0").as_party("guest", 9999),
            "train",
            "loss",
        );

        let response = api.component_metric_data(&query).await;
        assert_eq!(response.data, json!([[0, 0.9], [1, 0.4]]));
        assert_eq!(
            response.meta,
            Some(json!({"name": "loss", "metric_type": "LOSS"}))
        );

        let missing = MetricQuery::new(query.component.clone(), "train", "auc");
        assert_eq!(
            api.component_metric_data(&missing).await,
            ApiResponse::no_data(json!([]))
        );
    }

    #[tokio::test]
    async fn test_missing_output_model_is_no_data() {
        let mut jobs = MockJobRegistry::new();
        jobs.expect_runtime_conf()
            .returning(|_| Ok(Some(json!({"job_parameters": {"model_key": "m1"}}))));

        let api = QueryApi::new(
            Arc::new(jobs),
            Arc::new(InMemoryComponentGraph::new()),
            service(Arc::new(InMemoryMetricStore::new())),
        );

        let query = ComponentQuery::new("job_1", "lr_0").as_party("guest", 9999);
        assert_eq!(
            api.component_output_model(&query).await,
            ApiResponse::no_data(json!({}))
        );
    }

    #[test]
    fn test_from_error_separates_not_found() {
        let missing = FedstageError::from(NotFoundError::new(ResourceKind::Dataset, "t1"));
        assert_eq!(ApiResponse::from_error(&missing), ApiResponse::no_data(json!({})));

        let broken = FedstageError::Storage(StorageError::new("model_store", "offline"));
        let response = ApiResponse::from_error(&broken);
        assert_eq!(response.retcode, RetCode::INTERNAL_ERROR);
        assert!(response.retmsg.contains("offline"));
    }

    #[test]
    fn test_metric_query_deserializes_flat() {
        let query: MetricQuery = serde_json::from_value(json!({
            "job_id": "job_1",
            "component_name": "lr_0",
            "metric_namespace": "train",
            "metric_name": "loss"
        }))
        .unwrap();
        assert_eq!(query.component.role, None);
        assert_eq!(query.metric_name, "loss");
    }
}
