mod clock;
mod engine;
mod mode;
mod settings;
mod snapshot;
pub mod transition;

pub use clock::{Clock, ManualClock, SystemClock, TICK_INTERVAL};
pub use engine::TimerEngine;
pub use mode::{next_mode, TimerMode, LONG_BREAK_INTERVAL};
pub use settings::{SettingsPatch, TimerSettings, MAX_DURATION_MINUTES, MIN_DURATION_MINUTES};
pub use snapshot::TimerSnapshot;
pub use transition::{catch_up, complete_cycle, rehydrate, Completion, Transition};
