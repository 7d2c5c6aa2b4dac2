//! Event sink trait and implementations.

use super::RunEvent;
use parking_lot::RwLock;
use tracing::{debug, info, warn, Level};

/// Receives lifecycle events of component runs.
///
/// Emitting must never fail the run: implementations swallow and log their
/// own errors.
pub trait EventSink: Send + Sync {
    /// Emits an event.
    fn emit(&self, event: &RunEvent);
}

/// A sink that discards all events.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpEventSink;

impl EventSink for NoOpEventSink {
    fn emit(&self, _event: &RunEvent) {}
}

/// A sink that logs events through `tracing`.
#[derive(Debug, Clone)]
pub struct LoggingEventSink {
    level: Level,
}

impl Default for LoggingEventSink {
    fn default() -> Self {
        Self { level: Level::INFO }
    }
}

impl LoggingEventSink {
    /// Creates a logging sink at the given level.
    #[must_use]
    pub fn new(level: Level) -> Self {
        Self { level }
    }

    /// Creates a debug-level logging sink.
    #[must_use]
    pub fn debug() -> Self {
        Self::new(Level::DEBUG)
    }
}

impl EventSink for LoggingEventSink {
    fn emit(&self, event: &RunEvent) {
        let scope = event.scope.to_string();
        let stage = event.stage.map(|s| s.to_string());
        if event.kind.is_failure() {
            warn!(
                event_type = event.kind.as_str(),
                scope = %scope,
                stage = ?stage,
                detail = ?event.detail,
                "Run event: {}", event.kind.as_str()
            );
        } else if self.level == Level::DEBUG {
            debug!(
                event_type = event.kind.as_str(),
                scope = %scope,
                stage = ?stage,
                detail = ?event.detail,
                "Run event: {}", event.kind.as_str()
            );
        } else {
            info!(
                event_type = event.kind.as_str(),
                scope = %scope,
                stage = ?stage,
                detail = ?event.detail,
                "Run event: {}", event.kind.as_str()
            );
        }
    }
}

/// A sink that keeps every event, for tests.
#[derive(Debug, Default)]
pub struct CollectingEventSink {
    events: RwLock<Vec<RunEvent>>,
}

impl CollectingEventSink {
    /// Creates a new collecting sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns all collected events.
    #[must_use]
    pub fn events(&self) -> Vec<RunEvent> {
        self.events.read().clone()
    }

    /// Returns the event type names in emission order.
    #[must_use]
    pub fn kinds(&self) -> Vec<&'static str> {
        self.events.read().iter().map(|e| e.kind.as_str()).collect()
    }

    /// Returns the number of collected events.
    #[must_use]
    pub fn len(&self) -> usize {
        self.events.read().len()
    }

    /// Returns true if no events have been collected.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.read().is_empty()
    }
}

impl EventSink for CollectingEventSink {
    fn emit(&self, event: &RunEvent) {
        self.events.write().push(event.clone());
    }
}
