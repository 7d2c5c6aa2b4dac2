//! Identity of a component run and of a job-level view.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A party's position in a job: which role it plays and its party id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PartyRef {
    /// Role name (e.g. "guest", "host", "arbiter").
    pub role: String,
    /// Numeric party id.
    pub party_id: u64,
}

impl PartyRef {
    /// Creates a new party reference.
    #[must_use]
    pub fn new(role: impl Into<String>, party_id: u64) -> Self {
        Self {
            role: role.into(),
            party_id,
        }
    }
}

/// Job-level scope: one job seen from one role/party.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct JobScope {
    /// The job id.
    pub job_id: String,
    /// The role/party the view is taken from.
    #[serde(flatten)]
    pub party: PartyRef,
}

impl JobScope {
    /// Creates a new job scope.
    #[must_use]
    pub fn new(job_id: impl Into<String>, role: impl Into<String>, party_id: u64) -> Self {
        Self {
            job_id: job_id.into(),
            party: PartyRef::new(role, party_id),
        }
    }

    /// Narrows this job scope to one component.
    #[must_use]
    pub fn component(&self, component_name: impl Into<String>) -> ComponentScope {
        ComponentScope {
            job_id: self.job_id.clone(),
            component_name: component_name.into(),
            party: self.party.clone(),
        }
    }
}

/// Identifies one component run: (job id, component name, role, party id).
///
/// A tracker is bound to exactly one scope for its whole lifetime.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ComponentScope {
    /// The job id.
    pub job_id: String,
    /// The component name inside the job graph.
    pub component_name: String,
    /// The role/party executing the component.
    #[serde(flatten)]
    pub party: PartyRef,
}

impl ComponentScope {
    /// Creates a new component scope.
    #[must_use]
    pub fn new(
        job_id: impl Into<String>,
        component_name: impl Into<String>,
        role: impl Into<String>,
        party_id: u64,
    ) -> Self {
        Self {
            job_id: job_id.into(),
            component_name: component_name.into(),
            party: PartyRef::new(role, party_id),
        }
    }

    /// Returns the role.
    #[must_use]
    pub fn role(&self) -> &str {
        &self.party.role
    }

    /// Returns the party id.
    #[must_use]
    pub fn party_id(&self) -> u64 {
        self.party.party_id
    }

    /// Widens to the job-level scope for the same role/party.
    #[must_use]
    pub fn job(&self) -> JobScope {
        JobScope {
            job_id: self.job_id.clone(),
            party: self.party.clone(),
        }
    }
}

impl fmt::Display for ComponentScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{}/{}/{}",
            self.job_id, self.component_name, self.party.role, self.party.party_id
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scope_display() {
        let scope = ComponentScope::new("job_1", "hetero_lr_0", "guest", 9999);
        assert_eq!(scope.to_string(), "job_1/hetero_lr_0/guest/9999");
    }

    #[test]
    fn test_job_round_trip() {
        let job = JobScope::new("job_1", "host", 10000);
        let scope = job.component("intersect_0");
        assert_eq!(scope.role(), "host");
        assert_eq!(scope.job(), job);
    }

    #[test]
    fn test_scope_serializes_flat() {
        let scope = ComponentScope::new("job_1", "dataio_0", "guest", 9999);
        let json = serde_json::to_value(&scope).unwrap();
        assert_eq!(json["role"], "guest");
        assert_eq!(json["party_id"], 9999);
    }
}
