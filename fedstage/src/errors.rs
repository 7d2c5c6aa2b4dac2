//! Error types for the fedstage core.
//!
//! Every failure is local to one component run. Query endpoints translate
//! `NotFound` into empty "no data" responses; everything else carries a
//! distinct return code (see [`crate::query::RetCode`]).

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

/// Convenience alias used across the crate.
pub type FedstageResult<T> = Result<T, FedstageError>;

/// The main error type for fedstage operations.
#[derive(Debug, Error)]
pub enum FedstageError {
    /// A job, component, dataset, or metric is absent.
    #[error("{0}")]
    NotFound(#[from] NotFoundError),

    /// Parameter binding or the parameter self-check failed.
    #[error("{0}")]
    Validation(#[from] ValidationError),

    /// The underlying dataset, metric, or model store failed.
    #[error("{0}")]
    Storage(#[from] StorageError),

    /// A component's fit/transform/predict/cross-validation routine failed.
    #[error("Component '{component}' failed during {operation}: {reason}")]
    Component {
        /// The component name.
        component: String,
        /// The capability being executed (e.g. "fit").
        operation: String,
        /// The failure reason.
        reason: String,
    },

    /// Serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl FedstageError {
    /// Creates a component failure.
    #[must_use]
    pub fn component(
        component: impl Into<String>,
        operation: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::Component {
            component: component.into(),
            operation: operation.into(),
            reason: reason.into(),
        }
    }

    /// Returns true if this error means "the thing is not there".
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }

    /// Returns a short machine-readable name for the error kind.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "NotFound",
            Self::Validation(_) => "ValidationError",
            Self::Storage(_) => "StorageError",
            Self::Component { .. } => "ComponentError",
            Self::Serialization(_) => "SerializationError",
        }
    }

    /// Converts to a dictionary representation.
    #[must_use]
    pub fn to_dict(&self) -> HashMap<String, serde_json::Value> {
        let mut map = HashMap::new();
        map.insert("type".to_string(), serde_json::json!(self.kind()));
        map.insert("message".to_string(), serde_json::json!(self.to_string()));
        if let Self::Validation(err) = self {
            if let Some(ref field) = err.field {
                map.insert("field".to_string(), serde_json::json!(field));
            }
        }
        map
    }
}

/// What kind of entity was missing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    /// A job.
    Job,
    /// A component within a job graph.
    Component,
    /// A stored dataset.
    Dataset,
    /// A metric series.
    Metric,
    /// A stored model.
    Model,
}

impl std::fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Job => write!(f, "job"),
            Self::Component => write!(f, "component"),
            Self::Dataset => write!(f, "dataset"),
            Self::Metric => write!(f, "metric"),
            Self::Model => write!(f, "model"),
        }
    }
}

/// Error raised when a looked-up entity does not exist.
#[derive(Debug, Clone, Error)]
#[error("{kind} not found: {id}")]
pub struct NotFoundError {
    /// The kind of entity.
    pub kind: ResourceKind,
    /// Identifier used for the lookup.
    pub id: String,
}

impl NotFoundError {
    /// Creates a new not-found error.
    #[must_use]
    pub fn new(kind: ResourceKind, id: impl Into<String>) -> Self {
        Self { kind, id: id.into() }
    }
}

/// Error raised when parameters fail to bind or self-check.
#[derive(Debug, Clone, Error)]
#[error("Invalid parameters: {message}")]
pub struct ValidationError {
    /// The error message.
    pub message: String,
    /// Dotted path of the offending field, when known.
    pub field: Option<String>,
}

impl ValidationError {
    /// Creates a new validation error.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            field: None,
        }
    }

    /// Sets the offending field path.
    #[must_use]
    pub fn with_field(mut self, field: impl Into<String>) -> Self {
        self.field = Some(field.into());
        self
    }

    /// Creates an error for an override key the schema does not declare.
    #[must_use]
    pub fn unknown_field(path: impl Into<String>) -> Self {
        let path = path.into();
        Self::new(format!("unknown parameter field '{path}'")).with_field(path)
    }

    /// Creates an error for a value outside its allowed range.
    #[must_use]
    pub fn out_of_range(field: impl Into<String>, detail: impl std::fmt::Display) -> Self {
        let field = field.into();
        Self::new(format!("'{field}' {detail}")).with_field(field)
    }
}

/// Error raised when a backing store cannot serve a request.
///
/// Not retried here; retry policy belongs to the store.
#[derive(Debug, Clone, Error)]
#[error("Storage error in {store}: {reason}")]
pub struct StorageError {
    /// Which store failed (e.g. "metric_store").
    pub store: String,
    /// The failure reason.
    pub reason: String,
}

impl StorageError {
    /// Creates a new storage error.
    #[must_use]
    pub fn new(store: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            store: store.into(),
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_display() {
        let err = NotFoundError::new(ResourceKind::Job, "202401010000");
        assert_eq!(err.to_string(), "job not found: 202401010000");
    }

    #[test]
    fn test_validation_unknown_field() {
        let err = ValidationError::unknown_field("cv_param.folds");
        assert_eq!(err.field.as_deref(), Some("cv_param.folds"));
        assert!(err.to_string().contains("cv_param.folds"));
    }

    #[test]
    fn test_error_kind_and_dict() {
        let err: FedstageError = ValidationError::out_of_range("max_iter", "must be positive").into();
        assert_eq!(err.kind(), "ValidationError");

        let dict = err.to_dict();
        assert_eq!(dict.get("type").unwrap(), "ValidationError");
        assert_eq!(dict.get("field").unwrap(), "max_iter");
    }

    #[test]
    fn test_storage_error_conversion() {
        let err: FedstageError = StorageError::new("metric_store", "connection refused").into();
        assert!(!err.is_not_found());
        assert!(err.to_string().contains("metric_store"));
    }

    #[test]
    fn test_component_error() {
        let err = FedstageError::component("hetero_lr_0", "fit", "diverged");
        assert_eq!(
            err.to_string(),
            "Component 'hetero_lr_0' failed during fit: diverged"
        );
    }
}
