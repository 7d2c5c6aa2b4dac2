//! Testing utilities for fedstage components.
//!
//! This module provides:
//! - A recording mock component and a failing metric store
//! - Scope, dataset and job fixtures
//! - Assertions for datasets, run events and API responses

mod assertions;
pub mod fixtures;
mod mocks;

pub use assertions::{
    assert_events, assert_no_data, assert_predict_schema, assert_retcode, assert_tagged,
};
pub use mocks::{FailingMetricStore, RecordingComponent, RecordingParam};
