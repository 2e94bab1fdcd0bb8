//! Event sink trait and implementations.

use super::{PIPELINE_FAILED, STAGE_FALLBACK};
use crate::utils::{now_utc, Timestamp};
use async_trait::async_trait;
use parking_lot::RwLock;
use serde_json::Value;
use tracing::{error, info, warn, Level};

/// Receives pipeline lifecycle events.
#[async_trait]
pub trait EventSink: Send + Sync {
    /// Emits an event.
    ///
    /// # Arguments
    ///
    /// * `event_type` - One of the event names in [`crate::events`]
    /// * `data` - Span attributes of the run or stage, if any
    async fn emit(&self, event_type: &str, data: Option<Value>);
}

/// The log level an event is reported at: degraded stages warn, failed
/// runs are errors, everything else is informational.
#[must_use]
pub fn event_level(event_type: &str) -> Level {
    match event_type {
        PIPELINE_FAILED => Level::ERROR,
        STAGE_FALLBACK => Level::WARN,
        _ => Level::INFO,
    }
}

/// Discards all events.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpEventSink;

#[async_trait]
impl EventSink for NoOpEventSink {
    async fn emit(&self, _event_type: &str, _data: Option<Value>) {}
}

/// Writes events to `tracing` at the level given by [`event_level`].
#[derive(Debug, Clone, Default)]
pub struct LoggingEventSink {
    skip_stage_events: bool,
}

impl LoggingEventSink {
    /// Creates a sink that logs every event.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Logs only run-level and broadcast events.
    #[must_use]
    pub fn runs_only() -> Self {
        Self {
            skip_stage_events: true,
        }
    }

    fn should_log(&self, event_type: &str) -> bool {
        !(self.skip_stage_events && event_type.starts_with("stage."))
    }
}

#[async_trait]
impl EventSink for LoggingEventSink {
    async fn emit(&self, event_type: &str, data: Option<Value>) {
        if !self.should_log(event_type) {
            return;
        }
        let data = data.as_ref();
        let level = event_level(event_type);
        if level == Level::ERROR {
            error!(event_type, event_data = ?data, "Pipeline event");
        } else if level == Level::WARN {
            warn!(event_type, event_data = ?data, "Pipeline event");
        } else {
            info!(event_type, event_data = ?data, "Pipeline event");
        }
    }
}

/// One event kept by a [`CollectingEventSink`].
#[derive(Debug, Clone, PartialEq)]
pub struct CollectedEvent {
    /// Event name.
    pub event_type: String,
    /// Attached data.
    pub data: Option<Value>,
    /// When the sink received it.
    pub received_at: Timestamp,
}

impl CollectedEvent {
    /// Reads one field of the attached data.
    #[must_use]
    pub fn field(&self, key: &str) -> Option<&Value> {
        self.data.as_ref().and_then(|d| d.get(key))
    }
}

/// Keeps every event in memory, in arrival order.
#[derive(Debug, Default)]
pub struct CollectingEventSink {
    events: RwLock<Vec<CollectedEvent>>,
}

impl CollectingEventSink {
    /// Creates an empty collecting sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// All collected events.
    #[must_use]
    pub fn events(&self) -> Vec<CollectedEvent> {
        self.events.read().clone()
    }

    /// The collected event names in order.
    #[must_use]
    pub fn event_types(&self) -> Vec<String> {
        self.events.read().iter().map(|e| e.event_type.clone()).collect()
    }

    /// Events whose name starts with `type_prefix`, so `"stage."` matches
    /// both completions and fallbacks.
    #[must_use]
    pub fn events_of_type(&self, type_prefix: &str) -> Vec<CollectedEvent> {
        self.events
            .read()
            .iter()
            .filter(|e| e.event_type.starts_with(type_prefix))
            .cloned()
            .collect()
    }

    /// The most recent event.
    #[must_use]
    pub fn last(&self) -> Option<CollectedEvent> {
        self.events.read().last().cloned()
    }

    /// Number of collected events.
    #[must_use]
    pub fn len(&self) -> usize {
        self.events.read().len()
    }

    /// Returns true if nothing was collected.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.read().is_empty()
    }

    /// Drops everything collected so far.
    pub fn clear(&self) {
        self.events.write().clear();
    }
}

#[async_trait]
impl EventSink for CollectingEventSink {
    async fn emit(&self, event_type: &str, data: Option<Value>) {
        self.events.write().push(CollectedEvent {
            event_type: event_type.to_string(),
            data,
            received_at: now_utc(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::{BROADCAST_COMPLETED, PIPELINE_COMPLETED, PIPELINE_STARTED, STAGE_COMPLETED};

    #[test]
    fn test_event_levels() {
        assert_eq!(event_level(PIPELINE_FAILED), Level::ERROR);
        assert_eq!(event_level(STAGE_FALLBACK), Level::WARN);
        assert_eq!(event_level(STAGE_COMPLETED), Level::INFO);
        assert_eq!(event_level(BROADCAST_COMPLETED), Level::INFO);
    }

    #[test]
    fn test_runs_only_skips_stage_events() {
        let sink = LoggingEventSink::runs_only();
        assert!(!sink.should_log(STAGE_FALLBACK));
        assert!(sink.should_log(PIPELINE_STARTED));
        assert!(LoggingEventSink::new().should_log(STAGE_COMPLETED));
    }

    #[tokio::test]
    async fn test_noop_and_logging_sinks_accept_events() {
        NoOpEventSink.emit(PIPELINE_STARTED, None).await;
        LoggingEventSink::new()
            .emit(STAGE_FALLBACK, Some(serde_json::json!({"stage": "intent"})))
            .await;
        LoggingEventSink::runs_only().emit(PIPELINE_FAILED, None).await;
    }

    #[tokio::test]
    async fn test_collecting_sink() {
        let sink = CollectingEventSink::new();
        assert!(sink.is_empty());

        sink.emit(STAGE_COMPLETED, None).await;
        sink.emit(STAGE_FALLBACK, Some(serde_json::json!({"stage": "design"})))
            .await;
        sink.emit(PIPELINE_COMPLETED, None).await;

        assert_eq!(sink.len(), 3);
        let stage_events = sink.events_of_type("stage.");
        assert_eq!(stage_events.len(), 2);
        assert_eq!(stage_events[1].field("stage"), Some(&serde_json::json!("design")));
        assert!(stage_events[0].received_at <= stage_events[1].received_at);
        assert_eq!(sink.last().unwrap().event_type, PIPELINE_COMPLETED);

        sink.clear();
        assert!(sink.is_empty());
    }
}
