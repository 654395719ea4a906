//! Notification sinks the CLI hangs off the engine.

use std::io::Write;
use std::rc::Rc;

use pomotick_core::storage::NotificationsConfig;
use pomotick_core::{Database, Event, EventSink};

/// Announces finished cycles on stderr, keeping stdout for JSON.
pub struct TerminalNotifier {
    config: NotificationsConfig,
}

impl TerminalNotifier {
    pub fn new(config: NotificationsConfig) -> Self {
        Self { config }
    }

    fn message(event: &Event) -> Option<String> {
        match event {
            Event::CycleCompleted {
                finished,
                next,
                auto_started,
                skipped,
                ..
            } => {
                let verb = if *skipped { "skipped" } else { "finished" };
                let then = if *auto_started { "started" } else { "up next" };
                Some(format!("{} {verb}. {} {then}.", finished.label(), next.label()))
            }
            _ => None,
        }
    }
}

impl EventSink for TerminalNotifier {
    fn on_event(&mut self, event: &Event) {
        if !self.config.enabled {
            return;
        }
        let Some(message) = Self::message(event) else {
            return;
        };
        let mut stderr = std::io::stderr();
        let bell = if self.config.bell { "\x07" } else { "" };
        // Nothing useful to do if the terminal is gone.
        let _ = writeln!(stderr, "{bell}{message}");
    }
}

/// Writes every completion into the cycle history.
pub struct HistoryRecorder {
    db: Rc<Database>,
}

impl HistoryRecorder {
    pub fn new(db: Rc<Database>) -> Self {
        Self { db }
    }
}

impl EventSink for HistoryRecorder {
    fn on_event(&mut self, event: &Event) {
        if let Err(e) = self.db.record_event(event) {
            tracing::warn!(error = %e, "failed to record cycle history");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use pomotick_core::TimerMode;

    #[test]
    fn message_describes_completion() {
        let event = Event::CycleCompleted {
            finished: TimerMode::Pomodoro,
            next: TimerMode::LongBreak,
            duration_secs: 1500,
            spent_secs: 1500,
            completed_pomodoros: 4,
            auto_started: true,
            skipped: false,
            at: Utc::now(),
        };
        assert_eq!(
            TerminalNotifier::message(&event).as_deref(),
            Some("Pomodoro finished. Long Break started.")
        );
    }

    #[test]
    fn other_events_are_silent() {
        let event = Event::TimerReset {
            mode: TimerMode::Pomodoro,
            remaining_secs: 1500,
            at: Utc::now(),
        };
        assert!(TerminalNotifier::message(&event).is_none());
    }

    #[test]
    fn recorder_writes_history() {
        let db = Rc::new(Database::open_memory().unwrap());
        let mut recorder = HistoryRecorder::new(Rc::clone(&db));
        recorder.on_event(&Event::CycleCompleted {
            finished: TimerMode::ShortBreak,
            next: TimerMode::Pomodoro,
            duration_secs: 300,
            spent_secs: 42,
            completed_pomodoros: 1,
            auto_started: false,
            skipped: true,
            at: Utc::now(),
        });
        assert_eq!(db.stats_all().unwrap().skipped_cycles, 1);
    }
}
