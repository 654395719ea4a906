//! Persisted timer state.
//!
//! A snapshot is what survives a restart. Reading one back is deliberately
//! forgiving: each field is validated on its own and replaced with a safe
//! default when it is missing or has the wrong shape, so a corrupt record
//! degrades to a usable timer instead of an error.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

use super::mode::TimerMode;
use super::settings::TimerSettings;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimerSnapshot {
    pub mode: TimerMode,
    /// Seconds left in the cycle. While running, accurate as of `last_updated_at`.
    pub remaining_seconds: u64,
    pub is_running: bool,
    /// Epoch milliseconds at which `remaining_seconds` was last accurate.
    /// Always `Some` while running.
    pub last_updated_at: Option<u64>,
    pub completed_pomodoros: u64,
    /// Epoch milliseconds of the most recent cycle completion.
    pub last_finished_at: Option<u64>,
    /// Length the current cycle started with. Settings changed mid-cycle
    /// do not alter it, so time spent can be measured against it.
    pub cycle_seconds: u64,
}

impl TimerSnapshot {
    /// First-use state: a full, paused pomodoro.
    pub fn fresh(settings: &TimerSettings) -> Self {
        let full = settings.duration_secs(TimerMode::Pomodoro);
        Self {
            mode: TimerMode::Pomodoro,
            remaining_seconds: full,
            is_running: false,
            last_updated_at: None,
            completed_pomodoros: 0,
            last_finished_at: None,
            cycle_seconds: full,
        }
    }

    /// Seconds already spent in the current cycle as of `last_updated_at`.
    pub fn spent_seconds(&self) -> u64 {
        self.cycle_seconds.saturating_sub(self.remaining_seconds)
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Parse persisted JSON text, falling back field by field.
    ///
    /// Text that is not JSON at all yields [`TimerSnapshot::fresh`].
    pub fn from_json_lenient(text: &str, settings: &TimerSettings) -> Self {
        match serde_json::from_str::<Value>(text) {
            Ok(value) => Self::from_value_lenient(&value, settings),
            Err(e) => {
                warn!(error = %e, "persisted timer snapshot is not valid JSON, starting fresh");
                Self::fresh(settings)
            }
        }
    }

    pub fn from_value_lenient(value: &Value, settings: &TimerSettings) -> Self {
        let mode = match value.get("mode") {
            Some(Value::String(name)) => TimerMode::parse(name),
            _ => None,
        }
        .unwrap_or_else(|| {
            warn!(field = "mode", "invalid snapshot field, using default");
            TimerMode::Pomodoro
        });

        let remaining_seconds = value
            .get("remainingSeconds")
            .and_then(non_negative_int)
            .unwrap_or_else(|| {
                warn!(field = "remainingSeconds", "invalid snapshot field, using default");
                settings.duration_secs(mode)
            });

        let mut is_running = value
            .get("isRunning")
            .and_then(Value::as_bool)
            .unwrap_or(false);

        let last_updated_at = value.get("lastUpdatedAt").and_then(non_negative_int);
        if is_running && last_updated_at.is_none() {
            warn!("running snapshot has no lastUpdatedAt, treating it as paused");
            is_running = false;
        }

        let completed_pomodoros = value
            .get("completedPomodoros")
            .and_then(non_negative_int)
            .unwrap_or(0);

        let last_finished_at = value.get("lastFinishedAt").and_then(non_negative_int);

        // Older snapshots have no cycle length; assume the configured one.
        let cycle_seconds = value
            .get("cycleSeconds")
            .and_then(non_negative_int)
            .unwrap_or_else(|| settings.duration_secs(mode))
            .max(remaining_seconds);

        Self {
            mode,
            remaining_seconds,
            is_running,
            last_updated_at: if is_running { last_updated_at } else { None },
            completed_pomodoros,
            last_finished_at,
            cycle_seconds,
        }
    }
}

/// Accepts non-negative integers, and non-negative finite floats (floored).
fn non_negative_int(value: &Value) -> Option<u64> {
    match value {
        Value::Number(n) => n.as_u64().or_else(|| {
            n.as_f64()
                .filter(|f| f.is_finite() && *f >= 0.0)
                .map(|f| f.floor() as u64)
        }),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn wire_format_is_camel_case() {
        let snap = TimerSnapshot::fresh(&TimerSettings::default());
        let value = serde_json::to_value(&snap).unwrap();
        assert_eq!(
            value,
            json!({
                "mode": "pomodoro",
                "remainingSeconds": 1500,
                "isRunning": false,
                "lastUpdatedAt": null,
                "completedPomodoros": 0,
                "lastFinishedAt": null,
                "cycleSeconds": 1500
            })
        );
    }

    #[test]
    fn bogus_fields_fall_back_to_defaults() {
        let settings = TimerSettings::default();
        let snap =
            TimerSnapshot::from_value_lenient(&json!({"mode": "bogus", "remainingSeconds": "abc"}), &settings);
        assert_eq!(snap, TimerSnapshot::fresh(&settings));
    }

    #[test]
    fn remaining_defaults_to_resolved_mode_duration() {
        let settings = TimerSettings::default();
        let snap = TimerSnapshot::from_value_lenient(&json!({"mode": "long_break"}), &settings);
        assert_eq!(snap.mode, TimerMode::LongBreak);
        assert_eq!(snap.remaining_seconds, 900);
    }

    #[test]
    fn negative_numbers_are_rejected() {
        let settings = TimerSettings::default();
        let snap = TimerSnapshot::from_value_lenient(
            &json!({"remainingSeconds": -5, "completedPomodoros": -1}),
            &settings,
        );
        assert_eq!(snap.remaining_seconds, 1500);
        assert_eq!(snap.completed_pomodoros, 0);
    }

    #[test]
    fn fractional_seconds_are_floored() {
        let settings = TimerSettings::default();
        let snap =
            TimerSnapshot::from_value_lenient(&json!({"remainingSeconds": 12.9}), &settings);
        assert_eq!(snap.remaining_seconds, 12);
    }

    #[test]
    fn running_without_timestamp_is_demoted() {
        let settings = TimerSettings::default();
        let snap = TimerSnapshot::from_value_lenient(
            &json!({"mode": "pomodoro", "remainingSeconds": 60, "isRunning": true}),
            &settings,
        );
        assert!(!snap.is_running);
        assert_eq!(snap.last_updated_at, None);
        assert_eq!(snap.remaining_seconds, 60);
    }

    #[test]
    fn paused_snapshot_drops_stale_timestamp() {
        let settings = TimerSettings::default();
        let snap = TimerSnapshot::from_value_lenient(
            &json!({"isRunning": false, "lastUpdatedAt": 1_000}),
            &settings,
        );
        assert_eq!(snap.last_updated_at, None);
    }

    #[test]
    fn cycle_length_defaults_and_covers_remaining() {
        let settings = TimerSettings::default();
        let snap = TimerSnapshot::from_value_lenient(
            &json!({"mode": "short_break", "remainingSeconds": 120}),
            &settings,
        );
        assert_eq!(snap.cycle_seconds, 300);
        assert_eq!(snap.spent_seconds(), 180);

        let snap = TimerSnapshot::from_value_lenient(
            &json!({"remainingSeconds": 2000, "cycleSeconds": 60}),
            &settings,
        );
        assert_eq!(snap.cycle_seconds, 2000);
        assert_eq!(snap.spent_seconds(), 0);
    }

    #[test]
    fn garbage_text_starts_fresh() {
        let settings = TimerSettings::default();
        let snap = TimerSnapshot::from_json_lenient("{not json", &settings);
        assert_eq!(snap, TimerSnapshot::fresh(&settings));

        let snap = TimerSnapshot::from_json_lenient("[1, 2, 3]", &settings);
        assert_eq!(snap, TimerSnapshot::fresh(&settings));
    }
}
