//! Job lookup.

use crate::core::{JobScope, PartyRef};
use crate::errors::StorageError;
use async_trait::async_trait;
use dashmap::DashMap;
use serde_json::{Map, Value};

/// The initiating party's record of a job.
#[derive(Debug, Clone, PartialEq)]
pub struct InitiatorRecord {
    /// The job id.
    pub job_id: String,
    /// The job's runtime configuration as submitted by the initiator.
    pub runtime_conf: Value,
}

impl InitiatorRecord {
    /// Creates a record.
    #[must_use]
    pub fn new(job_id: impl Into<String>, runtime_conf: Value) -> Self {
        Self {
            job_id: job_id.into(),
            runtime_conf,
        }
    }

    /// The initiator named by `runtime_conf.initiator`.
    ///
    /// A missing role resolves to `""` and a missing or malformed party id
    /// to `0`.
    #[must_use]
    pub fn initiator(&self) -> PartyRef {
        let initiator = self.runtime_conf.get("initiator");
        let role = initiator
            .and_then(|i| i.get("role"))
            .and_then(Value::as_str)
            .unwrap_or_default();
        let party_id = initiator
            .and_then(|i| i.get("party_id"))
            .and_then(party_id_of)
            .unwrap_or(0);
        PartyRef::new(role, party_id)
    }
}

/// Reads a party id that may be stored as a number or a numeric string.
pub(crate) fn party_id_of(value: &Value) -> Option<u64> {
    match value {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.parse().ok(),
        _ => None,
    }
}

/// Read access to jobs.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait JobRegistry: Send + Sync {
    /// Returns the initiator's record of `job_id`, if this site initiated it.
    async fn find_initiating_job(&self, job_id: &str)
        -> Result<Option<InitiatorRecord>, StorageError>;

    /// Returns the job's data view as seen by one role/party.
    async fn job_view(&self, job: &JobScope) -> Result<Option<Map<String, Value>>, StorageError>;

    /// Returns the job's runtime configuration as seen by one role/party.
    async fn runtime_conf(&self, job: &JobScope) -> Result<Option<Value>, StorageError>;
}

#[derive(Debug, Clone)]
struct PartyJob {
    runtime_conf: Value,
    view: Map<String, Value>,
}

/// In-memory job registry.
#[derive(Debug, Default)]
pub struct InMemoryJobRegistry {
    initiated: DashMap<String, Value>,
    parties: DashMap<JobScope, PartyJob>,
}

impl InMemoryJobRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a job this site initiated.
    pub fn register_initiated(&self, job_id: impl Into<String>, runtime_conf: Value) {
        self.initiated.insert(job_id.into(), runtime_conf);
    }

    /// Records one party's view of a job.
    pub fn register_party(&self, job: JobScope, runtime_conf: Value, view: Map<String, Value>) {
        self.parties.insert(job, PartyJob { runtime_conf, view });
    }
}

#[async_trait]
impl JobRegistry for InMemoryJobRegistry {
    async fn find_initiating_job(
        &self,
        job_id: &str,
    ) -> Result<Option<InitiatorRecord>, StorageError> {
        Ok(self
            .initiated
            .get(job_id)
            .map(|conf| InitiatorRecord::new(job_id, conf.value().clone())))
    }

    async fn job_view(&self, job: &JobScope) -> Result<Option<Map<String, Value>>, StorageError> {
        Ok(self.parties.get(job).map(|entry| entry.view.clone()))
    }

    async fn runtime_conf(&self, job: &JobScope) -> Result<Option<Value>, StorageError> {
        Ok(self.parties.get(job).map(|entry| entry.runtime_conf.clone()))
    }
}
