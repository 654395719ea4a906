use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Every fourth completed pomodoro is followed by a long break.
pub const LONG_BREAK_INTERVAL: u64 = 4;

/// The kind of cycle the timer is counting down.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimerMode {
    Pomodoro,
    #[serde(alias = "shortBreak")]
    ShortBreak,
    #[serde(alias = "longBreak")]
    LongBreak,
}

impl TimerMode {
    pub const ALL: [TimerMode; 3] = [
        TimerMode::Pomodoro,
        TimerMode::ShortBreak,
        TimerMode::LongBreak,
    ];

    /// Parse a persisted or user-supplied mode name.
    ///
    /// Accepts both the snake_case wire names and the camelCase spellings
    /// older snapshots were written with.
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "pomodoro" => Some(TimerMode::Pomodoro),
            "short_break" | "shortBreak" => Some(TimerMode::ShortBreak),
            "long_break" | "longBreak" => Some(TimerMode::LongBreak),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TimerMode::Pomodoro => "pomodoro",
            TimerMode::ShortBreak => "short_break",
            TimerMode::LongBreak => "long_break",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            TimerMode::Pomodoro => "Pomodoro",
            TimerMode::ShortBreak => "Short Break",
            TimerMode::LongBreak => "Long Break",
        }
    }

    pub fn is_break(&self) -> bool {
        !matches!(self, TimerMode::Pomodoro)
    }
}

impl fmt::Display for TimerMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TimerMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TimerMode::parse(s).ok_or_else(|| {
            format!("unknown mode '{s}' (expected pomodoro, short_break or long_break)")
        })
    }
}

/// Mode that follows `finished` once its cycle completes.
///
/// `completed_pomodoros` is the counter *after* the finished cycle has been
/// counted.
pub fn next_mode(finished: TimerMode, completed_pomodoros: u64) -> TimerMode {
    match finished {
        TimerMode::Pomodoro => {
            if completed_pomodoros > 0 && completed_pomodoros % LONG_BREAK_INTERVAL == 0 {
                TimerMode::LongBreak
            } else {
                TimerMode::ShortBreak
            }
        }
        TimerMode::ShortBreak | TimerMode::LongBreak => TimerMode::Pomodoro,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fourth_pomodoro_earns_long_break() {
        assert_eq!(next_mode(TimerMode::Pomodoro, 1), TimerMode::ShortBreak);
        assert_eq!(next_mode(TimerMode::Pomodoro, 3), TimerMode::ShortBreak);
        assert_eq!(next_mode(TimerMode::Pomodoro, 4), TimerMode::LongBreak);
        assert_eq!(next_mode(TimerMode::Pomodoro, 8), TimerMode::LongBreak);
    }

    #[test]
    fn zero_count_is_not_a_multiple() {
        assert_eq!(next_mode(TimerMode::Pomodoro, 0), TimerMode::ShortBreak);
    }

    #[test]
    fn breaks_always_return_to_pomodoro() {
        for count in 0..10 {
            assert_eq!(next_mode(TimerMode::ShortBreak, count), TimerMode::Pomodoro);
            assert_eq!(next_mode(TimerMode::LongBreak, count), TimerMode::Pomodoro);
        }
    }

    #[test]
    fn parse_accepts_both_spellings() {
        assert_eq!(TimerMode::parse("short_break"), Some(TimerMode::ShortBreak));
        assert_eq!(TimerMode::parse("longBreak"), Some(TimerMode::LongBreak));
        assert_eq!(TimerMode::parse("bogus"), None);
        assert!("nap".parse::<TimerMode>().is_err());
    }

    #[test]
    fn serde_uses_snake_case() {
        let json = serde_json::to_string(&TimerMode::LongBreak).unwrap();
        assert_eq!(json, "\"long_break\"");
        let mode: TimerMode = serde_json::from_str("\"shortBreak\"").unwrap();
        assert_eq!(mode, TimerMode::ShortBreak);
    }
}
