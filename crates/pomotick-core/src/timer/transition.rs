//! Pure state transitions.
//!
//! Nothing here reads the clock or touches storage: callers pass `now_ms`
//! in and get a new snapshot back. [`TimerEngine`](super::TimerEngine)
//! wraps these with persistence and event dispatch.
//!
//! ## Catch-up
//!
//! A running snapshot stores the remaining seconds as of `last_updated_at`.
//! Each wake computes the whole seconds elapsed since then and subtracts
//! them. When that reaches zero the cycle completes, and the new cycle
//! starts at its full duration. At most one boundary is crossed per wake;
//! any time beyond that boundary is dropped.

use serde::{Deserialize, Serialize};

use super::mode::{next_mode, TimerMode};
use super::settings::TimerSettings;
use super::snapshot::TimerSnapshot;

/// A finished cycle, produced at the moment of transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Completion {
    pub finished: TimerMode,
    pub next: TimerMode,
    /// Counter after the finished cycle was counted.
    pub completed_pomodoros: u64,
    /// The next cycle is already running.
    pub auto_started: bool,
    /// Completed by `skip_to_next` rather than by running out.
    pub skipped: bool,
    /// Length the finished cycle started with.
    pub cycle_secs: u64,
    /// Time actually spent in the finished cycle.
    pub spent_secs: u64,
    pub at_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    pub snapshot: TimerSnapshot,
    pub completion: Option<Completion>,
}

impl Transition {
    fn unchanged(snapshot: &TimerSnapshot) -> Self {
        Self {
            snapshot: snapshot.clone(),
            completion: None,
        }
    }
}

/// Finish the current cycle and set up the next one.
///
/// A natural completion honours `auto_start_next`; a skip always leaves the
/// timer paused.
pub fn complete_cycle(
    snapshot: &TimerSnapshot,
    settings: &TimerSettings,
    now_ms: u64,
    skipped: bool,
) -> Transition {
    let finished = snapshot.mode;
    let completed_pomodoros = if finished == TimerMode::Pomodoro {
        snapshot.completed_pomodoros.saturating_add(1)
    } else {
        snapshot.completed_pomodoros
    };
    let next = next_mode(finished, completed_pomodoros);
    let auto_started = !skipped && settings.auto_start_next;

    let remaining_now = snapshot
        .remaining_seconds
        .saturating_sub(elapsed_secs(snapshot, now_ms));
    let spent_secs = snapshot.cycle_seconds.saturating_sub(remaining_now);
    let full = settings.duration_secs(next);

    let next_snapshot = TimerSnapshot {
        mode: next,
        remaining_seconds: full,
        is_running: auto_started,
        last_updated_at: auto_started.then_some(now_ms),
        completed_pomodoros,
        last_finished_at: Some(now_ms),
        cycle_seconds: full,
    };

    Transition {
        snapshot: next_snapshot,
        completion: Some(Completion {
            finished,
            next,
            completed_pomodoros,
            auto_started,
            skipped,
            cycle_secs: snapshot.cycle_seconds,
            spent_secs,
            at_ms: now_ms,
        }),
    }
}

/// Whole seconds a running snapshot has counted down since it was last
/// accurate. A clock that stepped backwards counts as no time passing.
fn elapsed_secs(snapshot: &TimerSnapshot, now_ms: u64) -> u64 {
    match (snapshot.is_running, snapshot.last_updated_at) {
        (true, Some(last)) => now_ms.saturating_sub(last) / 1000,
        _ => 0,
    }
}

/// Bring a snapshot up to `now_ms`.
///
/// Paused snapshots are returned unchanged, as are running ones when less
/// than a whole second has passed, which makes repeated calls with the same
/// `now_ms` a no-op.
pub fn catch_up(snapshot: &TimerSnapshot, settings: &TimerSettings, now_ms: u64) -> Transition {
    if !snapshot.is_running || snapshot.last_updated_at.is_none() {
        return Transition::unchanged(snapshot);
    }

    let elapsed = elapsed_secs(snapshot, now_ms);
    if elapsed < snapshot.remaining_seconds {
        if elapsed == 0 {
            return Transition::unchanged(snapshot);
        }
        return Transition {
            snapshot: TimerSnapshot {
                remaining_seconds: snapshot.remaining_seconds - elapsed,
                last_updated_at: Some(now_ms),
                ..snapshot.clone()
            },
            completion: None,
        };
    }

    complete_cycle(snapshot, settings, now_ms, false)
}

/// Reconcile a snapshot loaded from storage with the present.
///
/// Paused snapshots have their remaining time clamped to the current
/// duration for their mode. Running snapshots get a single catch-up.
pub fn rehydrate(snapshot: &TimerSnapshot, settings: &TimerSettings, now_ms: u64) -> Transition {
    if snapshot.is_running {
        return catch_up(snapshot, settings, now_ms);
    }

    let full = settings.duration_secs(snapshot.mode);
    // Clamping refills the cycle at the new length.
    let cycle_seconds = if snapshot.remaining_seconds > full {
        full
    } else {
        snapshot.cycle_seconds
    };
    Transition {
        snapshot: TimerSnapshot {
            remaining_seconds: snapshot.remaining_seconds.min(full),
            last_updated_at: None,
            cycle_seconds,
            ..snapshot.clone()
        },
        completion: None,
    }
}
