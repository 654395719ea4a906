//! User-configurable cycle durations.
//!
//! Durations are whole minutes. Values outside
//! `MIN_DURATION_MINUTES..=MAX_DURATION_MINUTES` are clamped to the nearest
//! bound rather than rejected, so a bad config file never stops the timer.

use serde::{Deserialize, Serialize};

use super::mode::TimerMode;

pub const MIN_DURATION_MINUTES: u32 = 1;
pub const MAX_DURATION_MINUTES: u32 = 240;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimerSettings {
    #[serde(default = "default_pomodoro_minutes")]
    pub pomodoro_minutes: u32,
    #[serde(default = "default_short_break_minutes")]
    pub short_break_minutes: u32,
    #[serde(default = "default_long_break_minutes")]
    pub long_break_minutes: u32,
    /// Start the next cycle immediately when one finishes on its own.
    #[serde(default)]
    pub auto_start_next: bool,
}

fn default_pomodoro_minutes() -> u32 {
    25
}
fn default_short_break_minutes() -> u32 {
    5
}
fn default_long_break_minutes() -> u32 {
    15
}

impl Default for TimerSettings {
    fn default() -> Self {
        Self {
            pomodoro_minutes: default_pomodoro_minutes(),
            short_break_minutes: default_short_break_minutes(),
            long_break_minutes: default_long_break_minutes(),
            auto_start_next: false,
        }
    }
}

/// A partial settings update. `None` fields keep their current value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettingsPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pomodoro_minutes: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub short_break_minutes: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub long_break_minutes: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auto_start_next: Option<bool>,
}

impl From<TimerSettings> for SettingsPatch {
    fn from(settings: TimerSettings) -> Self {
        Self {
            pomodoro_minutes: Some(settings.pomodoro_minutes),
            short_break_minutes: Some(settings.short_break_minutes),
            long_break_minutes: Some(settings.long_break_minutes),
            auto_start_next: Some(settings.auto_start_next),
        }
    }
}

impl TimerSettings {
    /// Copy with every duration clamped into the valid range.
    pub fn sanitized(&self) -> Self {
        Self {
            pomodoro_minutes: clamp_minutes(self.pomodoro_minutes),
            short_break_minutes: clamp_minutes(self.short_break_minutes),
            long_break_minutes: clamp_minutes(self.long_break_minutes),
            auto_start_next: self.auto_start_next,
        }
    }

    /// Apply a patch and return the sanitized result.
    pub fn merge(&self, patch: &SettingsPatch) -> Self {
        Self {
            pomodoro_minutes: patch.pomodoro_minutes.unwrap_or(self.pomodoro_minutes),
            short_break_minutes: patch
                .short_break_minutes
                .unwrap_or(self.short_break_minutes),
            long_break_minutes: patch.long_break_minutes.unwrap_or(self.long_break_minutes),
            auto_start_next: patch.auto_start_next.unwrap_or(self.auto_start_next),
        }
        .sanitized()
    }

    pub fn minutes_for(&self, mode: TimerMode) -> u32 {
        let raw = match mode {
            TimerMode::Pomodoro => self.pomodoro_minutes,
            TimerMode::ShortBreak => self.short_break_minutes,
            TimerMode::LongBreak => self.long_break_minutes,
        };
        clamp_minutes(raw)
    }

    /// Full length of a `mode` cycle in seconds.
    pub fn duration_secs(&self, mode: TimerMode) -> u64 {
        u64::from(self.minutes_for(mode)) * 60
    }
}

fn clamp_minutes(minutes: u32) -> u32 {
    minutes.clamp(MIN_DURATION_MINUTES, MAX_DURATION_MINUTES)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_classic_pomodoro() {
        let s = TimerSettings::default();
        assert_eq!(s.duration_secs(TimerMode::Pomodoro), 1500);
        assert_eq!(s.duration_secs(TimerMode::ShortBreak), 300);
        assert_eq!(s.duration_secs(TimerMode::LongBreak), 900);
        assert!(!s.auto_start_next);
    }

    #[test]
    fn out_of_range_durations_clamp() {
        let s = TimerSettings {
            pomodoro_minutes: 0,
            short_break_minutes: 10_000,
            ..TimerSettings::default()
        };
        assert_eq!(s.minutes_for(TimerMode::Pomodoro), MIN_DURATION_MINUTES);
        assert_eq!(s.minutes_for(TimerMode::ShortBreak), MAX_DURATION_MINUTES);

        let clean = s.sanitized();
        assert_eq!(clean.pomodoro_minutes, 1);
        assert_eq!(clean.short_break_minutes, 240);
    }

    #[test]
    fn merge_only_touches_given_fields() {
        let s = TimerSettings::default();
        let merged = s.merge(&SettingsPatch {
            pomodoro_minutes: Some(30),
            ..SettingsPatch::default()
        });
        assert_eq!(merged.pomodoro_minutes, 30);
        assert_eq!(merged.short_break_minutes, 5);
        assert_eq!(merged.long_break_minutes, 15);
    }

    #[test]
    fn partial_toml_fills_defaults() {
        let s: TimerSettings = toml::from_str("pomodoro_minutes = 50").unwrap();
        assert_eq!(s.pomodoro_minutes, 50);
        assert_eq!(s.long_break_minutes, 15);
    }
}
