//! Component parameter binding.

mod binder;
mod cv;

pub use binder::{BoundParams, ComponentParam, ParameterBinder};
pub use cv::CrossValidationParam;
