//! Observability utilities.

mod tracing;

pub use self::tracing::{component_span, init_tracing, SpanTimer};
