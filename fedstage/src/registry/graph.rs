//! Declared component graphs of jobs.

use super::job::party_id_of;
use crate::core::PARAM_SUFFIX;
use crate::errors::StorageError;
use async_trait::async_trait;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Named outputs a component declares.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComponentOutputs {
    /// Output data names, first is the primary one.
    #[serde(default)]
    pub data: Vec<String>,
    /// Output model names.
    #[serde(default)]
    pub model: Vec<String>,
}

/// A component as declared in a job graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComponentInfo {
    /// Component name (e.g. "hetero_lr_0").
    pub name: String,
    /// Module identifier (e.g. "HeteroLR").
    pub module: String,
    /// Declared outputs.
    #[serde(default)]
    pub outputs: ComponentOutputs,
    /// Per role, the parameter document of each party.
    #[serde(default)]
    pub role_parameters: BTreeMap<String, Vec<Value>>,
}

impl ComponentInfo {
    /// Creates a component with no outputs or parameters.
    #[must_use]
    pub fn new(name: impl Into<String>, module: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            module: module.into(),
            outputs: ComponentOutputs::default(),
            role_parameters: BTreeMap::new(),
        }
    }

    /// Declares an output data name.
    #[must_use]
    pub fn with_output_data(mut self, name: impl Into<String>) -> Self {
        self.outputs.data.push(name.into());
        self
    }

    /// Declares an output model name.
    #[must_use]
    pub fn with_output_model(mut self, name: impl Into<String>) -> Self {
        self.outputs.model.push(name.into());
        self
    }

    /// Adds a party's parameter document under `role`.
    #[must_use]
    pub fn with_party_parameters(mut self, role: impl Into<String>, parameters: Value) -> Self {
        self.role_parameters
            .entry(role.into())
            .or_default()
            .push(parameters);
        self
    }

    /// The primary output data name.
    #[must_use]
    pub fn primary_output_data(&self) -> Option<&str> {
        self.outputs.data.first().map(String::as_str)
    }

    /// The parameter document whose `local.role` and `local.party_id` match.
    #[must_use]
    pub fn party_parameters(&self, role: &str, party_id: u64) -> Option<&Value> {
        self.role_parameters.values().flatten().find(|params| {
            let local = params.get("local");
            let local_role = local.and_then(|l| l.get("role")).and_then(Value::as_str);
            let local_party = local.and_then(|l| l.get("party_id")).and_then(party_id_of);
            local_role == Some(role) && local_party == Some(party_id)
        })
    }

    /// `{module, *Param}` view of the matching party's parameters.
    #[must_use]
    pub fn parameters_view(&self, role: &str, party_id: u64) -> Option<Map<String, Value>> {
        let params = self.party_parameters(role, party_id)?;
        let mut view = Map::new();
        view.insert(
            "module".to_string(),
            params.get("module").cloned().unwrap_or_else(|| Value::String(String::new())),
        );
        if let Some(fields) = params.as_object() {
            for (key, value) in fields {
                if key.ends_with(PARAM_SUFFIX) {
                    view.insert(key.clone(), value.clone());
                }
            }
        }
        Some(view)
    }
}

/// Read access to declared job graphs.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ComponentGraph: Send + Sync {
    /// Returns true if a graph is known for `job_id`.
    async fn has_job(&self, job_id: &str) -> Result<bool, StorageError>;

    /// Looks up one component of a job's graph.
    async fn resolve_component(
        &self,
        job_id: &str,
        component_name: &str,
    ) -> Result<Option<ComponentInfo>, StorageError>;
}

/// In-memory component graphs keyed by job id.
#[derive(Debug, Default)]
pub struct InMemoryComponentGraph {
    jobs: DashMap<String, BTreeMap<String, ComponentInfo>>,
}

impl InMemoryComponentGraph {
    /// Creates an empty graph store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a component under `job_id`, creating the job if needed.
    pub fn add_component(&self, job_id: impl Into<String>, component: ComponentInfo) {
        self.jobs
            .entry(job_id.into())
            .or_default()
            .insert(component.name.clone(), component);
    }
}

#[async_trait]
impl ComponentGraph for InMemoryComponentGraph {
    async fn has_job(&self, job_id: &str) -> Result<bool, StorageError> {
        Ok(self.jobs.contains_key(job_id))
    }

    async fn resolve_component(
        &self,
        job_id: &str,
        component_name: &str,
    ) -> Result<Option<ComponentInfo>, StorageError> {
        Ok(self
            .jobs
            .get(job_id)
            .and_then(|graph| graph.get(component_name).cloned()))
    }
}
