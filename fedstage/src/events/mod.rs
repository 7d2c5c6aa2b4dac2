//! Lifecycle events of component runs.
//!
//! Each run holds its own sink; there is no process-wide sink.

mod sink;

pub use sink::{CollectingEventSink, EventSink, LoggingEventSink, NoOpEventSink};

use crate::core::{ComponentScope, Stage};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// What happened to a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunEventKind {
    /// The stage was decided.
    StageSelected,
    /// No data was supplied; nothing ran.
    Skipped,
    /// The run finished.
    Completed,
    /// The run failed.
    Failed,
}

impl RunEventKind {
    /// Dotted event type name.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::StageSelected => "component.stage_selected",
            Self::Skipped => "component.skipped",
            Self::Completed => "component.completed",
            Self::Failed => "component.failed",
        }
    }

    /// Returns true for failure events.
    #[must_use]
    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Failed)
    }
}

/// A lifecycle event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunEvent {
    /// Event kind.
    pub kind: RunEventKind,
    /// The run the event belongs to.
    pub scope: ComponentScope,
    /// The stage, once decided.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stage: Option<Stage>,
    /// Free-form detail.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<serde_json::Value>,
    /// When the event was created.
    pub at: DateTime<Utc>,
}

impl RunEvent {
    /// Creates a new event.
    #[must_use]
    pub fn new(kind: RunEventKind, scope: ComponentScope) -> Self {
        Self {
            kind,
            scope,
            stage: None,
            detail: None,
            at: Utc::now(),
        }
    }

    /// Sets the stage.
    #[must_use]
    pub fn with_stage(mut self, stage: Stage) -> Self {
        self.stage = Some(stage);
        self
    }

    /// Sets the detail payload.
    #[must_use]
    pub fn with_detail(mut self, detail: serde_json::Value) -> Self {
        self.detail = Some(detail);
        self
    }
}
