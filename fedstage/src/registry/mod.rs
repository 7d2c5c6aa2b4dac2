//! Job, component-graph and model collaborators.
//!
//! The core reads jobs and their declared component graphs and saves/loads
//! exported models only through these traits. The in-memory implementations
//! back the tests and single-process deployments.

mod graph;
mod job;
mod model;

pub use graph::{ComponentGraph, ComponentInfo, ComponentOutputs, InMemoryComponentGraph};
pub use job::{InMemoryJobRegistry, InitiatorRecord, JobRegistry};
pub use model::{InMemoryModelStore, ModelStore};

#[cfg(test)]
pub use graph::MockComponentGraph;
#[cfg(test)]
pub use job::MockJobRegistry;
