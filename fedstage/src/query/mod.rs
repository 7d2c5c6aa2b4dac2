//! Read side: metric aggregation and the query endpoints.

mod api;
mod service;

pub use api::{ApiResponse, ComponentQuery, JobQuery, MetricQuery, QueryApi, RetCode};
pub use service::{
    render_output_model, summary_to_json, JobSummary, MetricsQueryService, OutputDataPreview,
    OutputModelView,
};
