//! # Pomotick Core Library
//!
//! This library provides the core logic for the Pomotick Pomodoro timer.
//! The CLI binary is a thin host over the same library: it supplies the
//! clock, the once-a-second wake, the persistence sink and the notifier.
//!
//! ## Architecture
//!
//! - **Timer Engine**: A wall-clock-based state machine that requires the caller
//!   to periodically invoke `tick()` for progress updates
//! - **Transitions**: Pure functions (`catch_up`, `rehydrate`) the engine is
//!   built on, free of clock and storage access
//! - **Storage**: SQLite snapshot store and cycle history, TOML configuration
//!
//! ## Key Components
//!
//! - [`TimerEngine`]: Core timer state machine
//! - [`TimerSnapshot`]: Persisted engine state
//! - [`Database`]: Snapshot persistence and cycle statistics
//! - [`Config`]: Application configuration management

pub mod error;
pub mod events;
pub mod storage;
pub mod timer;

pub use error::{ConfigError, CoreError, StorageError};
pub use events::{Event, EventLog, EventSink};
pub use storage::{Config, Database, MemoryStore, SnapshotStore, Stats};
pub use timer::{
    Clock, ManualClock, SettingsPatch, SystemClock, TimerEngine, TimerMode, TimerSettings,
    TimerSnapshot,
};
