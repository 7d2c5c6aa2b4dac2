//! # Fedstage
//!
//! Component stage orchestration and metrics tracking for federated ML
//! pipelines.
//!
//! A pipeline job is split into components, each executed once per
//! role/party. Fedstage provides:
//!
//! - **Stage selection**: bind parameters, then fit, transform,
//!   cross-validate or skip depending on the supplied models and data
//! - **Dataset routing**: provenance-tagged, unioned prediction outputs
//! - **Metrics tracking**: namespaced metric series with metadata, scoped to
//!   one job/component/role/party
//! - **Query endpoints**: metric listings, job summaries, output model and
//!   output data previews with the platform's return codes
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use fedstage::prelude::*;
//!
//! let runner = ComponentRunner::new(datasets, models);
//! let ctx = RunContext::new(scope, metrics).with_event_sink(Arc::new(LoggingEventSink::default()));
//! let request = RunRequest::new()
//!     .with_overrides(serde_json::json!({"max_iter": 20}))
//!     .with_data(DataInputs::none().with_train(train).with_eval(eval))
//!     .with_model_key("model_1");
//!
//! let report = runner.run(&mut component, ctx, request).await?;
//! ```

#![forbid(unsafe_code)]
#![warn(
    clippy::all,
    clippy::pedantic,
    missing_docs,
    rust_2018_idioms
)]
#![allow(
    clippy::module_name_repetitions,
    clippy::must_use_candidate,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc
)]

pub mod component;
pub mod config;
pub mod core;
pub mod data;
pub mod errors;
pub mod events;
pub mod observability;
pub mod params;
pub mod query;
pub mod registry;
pub mod testing;
pub mod tracking;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::component::{
        Component, ComponentRunner, DataInputs, DataSetRouter, RunContext, RunReport,
        RunRequest, StageRun, StageSelector,
    };
    pub use crate::config::{FedstageConfig, LogConfig};
    pub use crate::core::{ComponentScope, JobScope, ModelArtifact, ModelInputs, PartyRef, Stage};
    pub use crate::data::{
        DataRef, DataValue, Dataset, DatasetStore, InMemoryDatasetStore, Instance,
        ProvenanceTag, Schema,
    };
    pub use crate::errors::{FedstageError, FedstageResult, StorageError, ValidationError};
    pub use crate::events::{CollectingEventSink, EventSink, LoggingEventSink, NoOpEventSink};
    pub use crate::observability::init_tracing;
    pub use crate::params::{ComponentParam, CrossValidationParam, ParameterBinder};
    pub use crate::query::{ApiResponse, MetricsQueryService, QueryApi, RetCode};
    pub use crate::registry::{
        ComponentGraph, InMemoryComponentGraph, InMemoryJobRegistry, InMemoryModelStore,
        JobRegistry, ModelStore,
    };
    pub use crate::tracking::{InMemoryMetricStore, Metric, MetricMeta, MetricStore, MetricsTracker};
}
