//! Timer engine implementation.
//!
//! The timer engine is a wall-clock-based state machine. It does not use
//! internal threads - the host is responsible for calling `tick()` about
//! once per [`TICK_INTERVAL`](super::TICK_INTERVAL) while the timer runs.
//!
//! ## State Transitions
//!
//! ```text
//! {pomodoro, short_break, long_break} x {running, paused}
//!
//! pomodoro    -> short_break   (completed count not a multiple of 4)
//! pomodoro    -> long_break    (completed count a multiple of 4)
//! short_break -> pomodoro
//! long_break  -> pomodoro
//! ```
//!
//! ## Usage
//!
//! ```ignore
//! let mut engine = TimerEngine::new(settings, Database::open()?, SystemClock);
//! engine.subscribe(Box::new(notifier));
//! engine.restore();
//! engine.start();
//! // Once a second:
//! engine.tick(); // Returns Some(Event::CycleCompleted) when a cycle ends
//! ```
//!
//! Every mutation is written to the store straight away. A failed write is
//! logged and otherwise ignored: the in-memory state stays authoritative and
//! the next mutation writes again.

use tracing::{debug, warn};

use super::clock::Clock;
use super::mode::TimerMode;
use super::settings::{SettingsPatch, TimerSettings};
use super::snapshot::TimerSnapshot;
use super::transition::{self, Completion, Transition};
use crate::events::{datetime_from_ms, Event, EventSink};
use crate::storage::{SnapshotStore, SNAPSHOT_KEY};

pub struct TimerEngine<S, C> {
    settings: TimerSettings,
    snapshot: TimerSnapshot,
    store: S,
    clock: C,
    sinks: Vec<Box<dyn EventSink>>,
}

impl<S: SnapshotStore, C: Clock> TimerEngine<S, C> {
    /// Create an engine holding a fresh snapshot. Nothing is read from or
    /// written to `store` until [`restore`](Self::restore) or the first action.
    pub fn new(settings: TimerSettings, store: S, clock: C) -> Self {
        let settings = settings.sanitized();
        Self {
            snapshot: TimerSnapshot::fresh(&settings),
            settings,
            store,
            clock,
            sinks: Vec::new(),
        }
    }

    pub fn subscribe(&mut self, sink: Box<dyn EventSink>) {
        self.sinks.push(sink);
    }

    /// Load the persisted snapshot and bring it up to date.
    ///
    /// Call once at startup, after subscribing. Returns the completion event
    /// if the time spent away finished the running cycle.
    pub fn restore(&mut self) -> Option<Event> {
        let persisted = match self.store.load(SNAPSHOT_KEY) {
            Ok(Some(text)) => TimerSnapshot::from_json_lenient(&text, &self.settings),
            Ok(None) => TimerSnapshot::fresh(&self.settings),
            Err(e) => {
                warn!(error = %e, "failed to read timer snapshot, starting fresh");
                TimerSnapshot::fresh(&self.settings)
            }
        };

        let now = self.clock.now_ms();
        let Transition {
            snapshot,
            completion,
        } = transition::rehydrate(&persisted, &self.settings, now);
        debug!(
            mode = %snapshot.mode,
            remaining = snapshot.remaining_seconds,
            running = snapshot.is_running,
            "timer restored"
        );
        self.snapshot = snapshot;
        self.persist();
        completion.map(|c| self.emit_completion(c))
    }

    /// Adopt whatever another process stored since the last read, then
    /// catch up.
    ///
    /// Long-lived hosts call this on each wake instead of [`tick`](Self::tick)
    /// so a pause or skip issued elsewhere is not overwritten by the next
    /// write. A missing or unreadable record keeps the in-memory state.
    pub fn reload(&mut self) -> Option<Event> {
        match self.store.load(SNAPSHOT_KEY) {
            Ok(Some(text)) => {
                let stored = TimerSnapshot::from_json_lenient(&text, &self.settings);
                if stored != self.snapshot {
                    debug!(
                        mode = %stored.mode,
                        remaining = stored.remaining_seconds,
                        running = stored.is_running,
                        "adopting externally stored snapshot"
                    );
                    self.snapshot = stored;
                }
            }
            Ok(None) => {}
            Err(e) => warn!(error = %e, "failed to re-read timer snapshot, keeping in-memory state"),
        }

        let now = self.clock.now_ms();
        let Transition {
            snapshot,
            completion,
        } = transition::rehydrate(&self.snapshot, &self.settings, now);
        self.commit(snapshot);
        completion.map(|c| self.emit_completion(c))
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn mode(&self) -> TimerMode {
        self.snapshot.mode
    }

    pub fn remaining_seconds(&self) -> u64 {
        self.snapshot.remaining_seconds
    }

    pub fn is_running(&self) -> bool {
        self.snapshot.is_running
    }

    pub fn completed_pomodoros(&self) -> u64 {
        self.snapshot.completed_pomodoros
    }

    /// Epoch milliseconds of the last completion.
    pub fn last_finished_at(&self) -> Option<u64> {
        self.snapshot.last_finished_at
    }

    pub fn settings(&self) -> &TimerSettings {
        &self.settings
    }

    pub fn snapshot(&self) -> &TimerSnapshot {
        &self.snapshot
    }

    pub fn total_seconds(&self) -> u64 {
        self.settings.duration_secs(self.snapshot.mode)
    }

    /// 0.0 .. 1.0 progress within the current cycle.
    pub fn progress(&self) -> f64 {
        let total = self.total_seconds();
        if total == 0 {
            return 0.0;
        }
        (1.0 - (self.snapshot.remaining_seconds as f64 / total as f64)).clamp(0.0, 1.0)
    }

    /// Build a full state snapshot event.
    pub fn status(&self) -> Event {
        Event::StateSnapshot {
            mode: self.snapshot.mode,
            remaining_secs: self.snapshot.remaining_seconds,
            total_secs: self.total_seconds(),
            is_running: self.snapshot.is_running,
            completed_pomodoros: self.snapshot.completed_pomodoros,
            last_finished_at: self.snapshot.last_finished_at.map(datetime_from_ms),
            progress: self.progress(),
            at: datetime_from_ms(self.clock.now_ms()),
        }
    }

    // ── Commands ─────────────────────────────────────────────────────

    pub fn start(&mut self) -> Option<Event> {
        if self.snapshot.is_running {
            return None;
        }
        let now = self.clock.now_ms();
        self.commit(TimerSnapshot {
            is_running: true,
            last_updated_at: Some(now),
            ..self.snapshot.clone()
        });
        debug!(mode = %self.snapshot.mode, remaining = self.snapshot.remaining_seconds, "timer started");
        Some(self.emit(Event::TimerStarted {
            mode: self.snapshot.mode,
            remaining_secs: self.snapshot.remaining_seconds,
            at: datetime_from_ms(now),
        }))
    }

    /// Stop the countdown.
    ///
    /// Elapsed time is flushed first, so a cycle that ran out before the
    /// pause completes (and notifies) before the timer stops. Returns `None`
    /// when the timer was not running afterwards.
    pub fn pause(&mut self) -> Option<Event> {
        if !self.snapshot.is_running {
            return None;
        }
        self.tick();
        if !self.snapshot.is_running {
            return None;
        }
        let now = self.clock.now_ms();
        self.commit(TimerSnapshot {
            is_running: false,
            last_updated_at: None,
            ..self.snapshot.clone()
        });
        debug!(mode = %self.snapshot.mode, remaining = self.snapshot.remaining_seconds, "timer paused");
        Some(self.emit(Event::TimerPaused {
            mode: self.snapshot.mode,
            remaining_secs: self.snapshot.remaining_seconds,
            at: datetime_from_ms(now),
        }))
    }

    pub fn toggle(&mut self) -> Option<Event> {
        if self.snapshot.is_running {
            self.pause()
        } else {
            self.start()
        }
    }

    /// Refill the current cycle and stop. The pomodoro count is kept.
    pub fn reset_current(&mut self) -> Option<Event> {
        let now = self.clock.now_ms();
        let remaining = self.total_seconds();
        self.commit(TimerSnapshot {
            remaining_seconds: remaining,
            is_running: false,
            last_updated_at: None,
            cycle_seconds: remaining,
            ..self.snapshot.clone()
        });
        debug!(mode = %self.snapshot.mode, "cycle reset");
        Some(self.emit(Event::TimerReset {
            mode: self.snapshot.mode,
            remaining_secs: remaining,
            at: datetime_from_ms(now),
        }))
    }

    /// Jump to `mode` with a full, paused cycle. The pomodoro count is kept.
    pub fn switch_mode(&mut self, mode: TimerMode) -> Option<Event> {
        let now = self.clock.now_ms();
        let from = self.snapshot.mode;
        let remaining = self.settings.duration_secs(mode);
        self.commit(TimerSnapshot {
            mode,
            remaining_seconds: remaining,
            is_running: false,
            last_updated_at: None,
            cycle_seconds: remaining,
            ..self.snapshot.clone()
        });
        debug!(%from, to = %mode, "mode switched");
        Some(self.emit(Event::ModeSwitched {
            from,
            to: mode,
            remaining_secs: remaining,
            at: datetime_from_ms(now),
        }))
    }

    /// Finish the current cycle now, as if it had run out, and stop.
    pub fn skip_to_next(&mut self) -> Option<Event> {
        let now = self.clock.now_ms();
        let Transition {
            snapshot,
            completion,
        } = transition::complete_cycle(&self.snapshot, &self.settings, now, true);
        self.commit(snapshot);
        completion.map(|c| self.emit_completion(c))
    }

    /// Merge new settings.
    ///
    /// A paused timer is re-synced to the new full duration of its mode. A
    /// running cycle keeps its remaining time until it completes or is reset.
    pub fn update_settings(&mut self, patch: SettingsPatch) -> Option<Event> {
        let now = self.clock.now_ms();
        self.settings = self.settings.merge(&patch);

        let full = self.total_seconds();
        let resynced = !self.snapshot.is_running && self.snapshot.remaining_seconds != full;
        if resynced {
            self.commit(TimerSnapshot {
                remaining_seconds: full,
                cycle_seconds: full,
                ..self.snapshot.clone()
            });
        }
        debug!(?patch, resynced, "settings updated");
        Some(self.emit(Event::SettingsUpdated {
            patch,
            settings: self.settings,
            resynced,
            at: datetime_from_ms(now),
        }))
    }

    /// Reconcile elapsed wall-clock time. Call about once a second.
    ///
    /// Returns `Some(Event::CycleCompleted)` when the running cycle ran out.
    pub fn tick(&mut self) -> Option<Event> {
        let now = self.clock.now_ms();
        let Transition {
            snapshot,
            completion,
        } = transition::catch_up(&self.snapshot, &self.settings, now);
        self.commit(snapshot);
        completion.map(|c| self.emit_completion(c))
    }

    // ── Internal ─────────────────────────────────────────────────────

    /// Replace the snapshot, persisting only if it changed.
    fn commit(&mut self, snapshot: TimerSnapshot) {
        if snapshot == self.snapshot {
            return;
        }
        self.snapshot = snapshot;
        self.persist();
    }

    fn persist(&self) {
        let json = match self.snapshot.to_json() {
            Ok(json) => json,
            Err(e) => {
                warn!(error = %e, "failed to serialize timer snapshot");
                return;
            }
        };
        if let Err(e) = self.store.save(SNAPSHOT_KEY, &json) {
            warn!(error = %e, "failed to persist timer snapshot, keeping in-memory state");
        }
    }

    fn emit_completion(&mut self, completion: Completion) -> Event {
        debug!(
            finished = %completion.finished,
            next = %completion.next,
            count = completion.completed_pomodoros,
            skipped = completion.skipped,
            spent = completion.spent_secs,
            "cycle completed"
        );
        self.emit(Event::CycleCompleted {
            finished: completion.finished,
            next: completion.next,
            duration_secs: completion.cycle_secs,
            spent_secs: completion.spent_secs,
            completed_pomodoros: completion.completed_pomodoros,
            auto_started: completion.auto_started,
            skipped: completion.skipped,
            at: datetime_from_ms(completion.at_ms),
        })
    }

    fn emit(&mut self, event: Event) -> Event {
        for sink in &mut self.sinks {
            sink.on_event(&event);
        }
        event
    }
}
