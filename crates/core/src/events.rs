use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::rule::RuleId;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum EngineEventKind {
    RunStarted,
    RuleCompleted,
    SourceFailed,
    RunCompleted,
}

impl EngineEventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::RunStarted => "bulk.run_started",
            Self::RuleCompleted => "bulk.rule_completed",
            Self::SourceFailed => "bulk.source_failed",
            Self::RunCompleted => "bulk.run_completed",
        }
    }
}

/// Structured record of a milestone in a bulk run.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineEvent {
    pub event_id: String,
    pub run_id: String,
    pub kind: EngineEventKind,
    pub rule_id: Option<RuleId>,
    pub metadata: BTreeMap<String, String>,
    pub occurred_at: DateTime<Utc>,
}

impl EngineEvent {
    pub fn new(run_id: impl Into<String>, kind: EngineEventKind) -> Self {
        Self {
            event_id: Uuid::new_v4().to_string(),
            run_id: run_id.into(),
            kind,
            rule_id: None,
            metadata: BTreeMap::new(),
            occurred_at: Utc::now(),
        }
    }

    pub fn for_rule(mut self, rule_id: &RuleId) -> Self {
        self.rule_id = Some(rule_id.clone());
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.metadata.insert(key.into(), value.to_string());
        self
    }
}

pub trait EventSink: Send + Sync {
    fn emit(&self, event: EngineEvent);
}

#[derive(Clone, Copy, Debug, Default)]
pub struct NoopEventSink;

impl EventSink for NoopEventSink {
    fn emit(&self, _event: EngineEvent) {}
}

#[derive(Clone, Default)]
pub struct InMemoryEventSink {
    events: Arc<Mutex<Vec<EngineEvent>>>,
}

impl InMemoryEventSink {
    pub fn events(&self) -> Vec<EngineEvent> {
        match self.events.lock() {
            Ok(events) => events.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    pub fn kinds(&self) -> Vec<EngineEventKind> {
        self.events().into_iter().map(|event| event.kind).collect()
    }
}

impl EventSink for InMemoryEventSink {
    fn emit(&self, event: EngineEvent) {
        match self.events.lock() {
            Ok(mut events) => events.push(event),
            Err(poisoned) => poisoned.into_inner().push(event),
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::domain::rule::RuleId;
    use crate::events::{EngineEvent, EngineEventKind, EventSink, InMemoryEventSink};

    #[test]
    fn in_memory_sink_records_events_in_emission_order() {
        let sink = InMemoryEventSink::default();
        let rule = RuleId("lamps-to-bulbs".to_owned());

        sink.emit(EngineEvent::new("run-1", EngineEventKind::RunStarted));
        sink.emit(
            EngineEvent::new("run-1", EngineEventKind::RuleCompleted)
                .for_rule(&rule)
                .with_metadata("created", 3)
                .with_metadata("skipped", 0),
        );

        let events = sink.events();
        assert_eq!(sink.kinds(), vec![EngineEventKind::RunStarted, EngineEventKind::RuleCompleted]);
        assert_eq!(events[1].rule_id.as_ref(), Some(&rule));
        assert_eq!(events[1].metadata.get("created").map(String::as_str), Some("3"));
        assert_eq!(events[1].kind.as_str(), "bulk.rule_completed");
    }
}
