use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::rc::Rc;

use crate::timer::{SettingsPatch, TimerMode, TimerSettings};

/// Every state change in the engine produces an Event.
/// Hosts print them; notification sinks subscribe to them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Event {
    TimerStarted {
        mode: TimerMode,
        remaining_secs: u64,
        at: DateTime<Utc>,
    },
    TimerPaused {
        mode: TimerMode,
        remaining_secs: u64,
        at: DateTime<Utc>,
    },
    TimerReset {
        mode: TimerMode,
        remaining_secs: u64,
        at: DateTime<Utc>,
    },
    ModeSwitched {
        from: TimerMode,
        to: TimerMode,
        remaining_secs: u64,
        at: DateTime<Utc>,
    },
    /// A cycle ended, either by running out or by being skipped.
    /// Emitted exactly once per completion, never on replay.
    CycleCompleted {
        finished: TimerMode,
        next: TimerMode,
        /// Length the finished cycle started with.
        duration_secs: u64,
        /// Time actually spent in it; less than `duration_secs` for a skip.
        spent_secs: u64,
        completed_pomodoros: u64,
        auto_started: bool,
        skipped: bool,
        at: DateTime<Utc>,
    },
    SettingsUpdated {
        patch: SettingsPatch,
        settings: TimerSettings,
        /// Remaining time was re-synced to the new duration.
        resynced: bool,
        at: DateTime<Utc>,
    },
    StateSnapshot {
        mode: TimerMode,
        remaining_secs: u64,
        total_secs: u64,
        is_running: bool,
        completed_pomodoros: u64,
        last_finished_at: Option<DateTime<Utc>>,
        progress: f64,
        at: DateTime<Utc>,
    },
}

impl Event {
    pub fn at(&self) -> DateTime<Utc> {
        match self {
            Event::TimerStarted { at, .. }
            | Event::TimerPaused { at, .. }
            | Event::TimerReset { at, .. }
            | Event::ModeSwitched { at, .. }
            | Event::CycleCompleted { at, .. }
            | Event::SettingsUpdated { at, .. }
            | Event::StateSnapshot { at, .. } => *at,
        }
    }
}

/// Receives engine events as they happen.
pub trait EventSink {
    fn on_event(&mut self, event: &Event);
}

impl<F: FnMut(&Event)> EventSink for F {
    fn on_event(&mut self, event: &Event) {
        self(event)
    }
}

/// Shared in-memory record of emitted events.
///
/// Clones share the same buffer, so one clone can be handed to the engine
/// while another is inspected.
#[derive(Debug, Clone, Default)]
pub struct EventLog {
    events: Rc<RefCell<Vec<Event>>>,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<Event> {
        self.events.borrow().clone()
    }

    pub fn completions(&self) -> Vec<Event> {
        self.events
            .borrow()
            .iter()
            .filter(|e| matches!(e, Event::CycleCompleted { .. }))
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.events.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.borrow().is_empty()
    }
}

impl EventSink for EventLog {
    fn on_event(&mut self, event: &Event) {
        self.events.borrow_mut().push(event.clone());
    }
}

/// Convert epoch milliseconds to a UTC timestamp.
pub fn datetime_from_ms(ms: u64) -> DateTime<Utc> {
    i64::try_from(ms)
        .ok()
        .and_then(DateTime::from_timestamp_millis)
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn events_are_tagged_by_type() {
        let event = Event::TimerPaused {
            mode: TimerMode::Pomodoro,
            remaining_secs: 90,
            at: datetime_from_ms(0),
        };
        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["type"], "TimerPaused");
        assert_eq!(value["mode"], "pomodoro");
        assert_eq!(value["remaining_secs"], 90);
    }

    #[test]
    fn log_clones_share_buffer() {
        let log = EventLog::new();
        let mut sink = log.clone();
        sink.on_event(&Event::TimerReset {
            mode: TimerMode::ShortBreak,
            remaining_secs: 300,
            at: datetime_from_ms(1_000),
        });
        assert_eq!(log.len(), 1);
        assert!(log.completions().is_empty());
    }

    #[test]
    fn datetime_from_ms_keeps_millis() {
        let at = datetime_from_ms(1_700_000_000_123);
        assert_eq!(at.timestamp_millis(), 1_700_000_000_123);
    }
}
