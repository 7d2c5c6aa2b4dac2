//! Datasets exchanged between components and their storage protocol.

mod dataset;
mod store;

pub use dataset::{DataValue, Dataset, Instance, ProvenanceTag, Schema, PREDICT_HEADER};
pub use store::{DataRef, DatasetStore, InMemoryDatasetStore};
