//! Metric tracking: the write path and its storage protocol.
//!
//! Components record metric series keyed by `(namespace, name)` through a
//! [`MetricsTracker`] bound to their run. The read side lives in
//! [`crate::query`].

mod metric;
mod store;
mod tracker;

pub use metric::{Metric, MetricKey, MetricMeta};
pub use store::{InMemoryMetricStore, MetricStore};
pub use tracker::MetricsTracker;
