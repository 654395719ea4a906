//! SQLite-backed snapshot store and cycle history.
//!
//! Provides persistent storage for:
//! - The timer snapshot (key-value table)
//! - Completed cycles and the statistics derived from them

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection};
use serde::{Deserialize, Serialize};
use std::path::Path;

use super::{data_dir, SnapshotStore};
use crate::error::StorageError;
use crate::events::Event;
use crate::timer::TimerMode;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CycleRecord {
    pub id: i64,
    pub mode: TimerMode,
    /// Seconds actually spent in the cycle.
    pub duration_secs: u64,
    pub skipped: bool,
    pub completed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct Stats {
    pub total_cycles: u64,
    pub completed_pomodoros: u64,
    pub skipped_cycles: u64,
    pub total_focus_min: u64,
    pub total_break_min: u64,
    pub today_pomodoros: u64,
    pub today_focus_min: u64,
}

/// SQLite database for the snapshot and cycle history.
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Open the database at `<data_dir>/pomotick.db`.
    ///
    /// Creates the database file and schema if they don't exist.
    ///
    /// # Errors
    /// Returns an error if the database cannot be opened or migrated.
    pub fn open() -> Result<Self, StorageError> {
        Self::open_at(&data_dir()?.join("pomotick.db"))
    }

    pub fn open_at(path: &Path) -> Result<Self, StorageError> {
        let conn = Connection::open(path).map_err(|source| StorageError::OpenFailed {
            path: path.to_path_buf(),
            source,
        })?;
        let db = Self { conn };
        db.migrate()?;
        Ok(db)
    }

    /// Open an in-memory database.
    pub fn open_memory() -> Result<Self, StorageError> {
        let conn = Connection::open_in_memory()?;
        let db = Self { conn };
        db.migrate()?;
        Ok(db)
    }

    fn migrate(&self) -> Result<(), rusqlite::Error> {
        self.conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS cycles (
                id           INTEGER PRIMARY KEY AUTOINCREMENT,
                mode         TEXT NOT NULL,
                duration_secs INTEGER NOT NULL,
                skipped      INTEGER NOT NULL DEFAULT 0,
                completed_at TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS kv (
                key   TEXT PRIMARY KEY,
                value TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_cycles_completed_at ON cycles(completed_at);",
        )?;
        Ok(())
    }

    /// Record a completed cycle and the seconds spent in it.
    ///
    /// # Errors
    /// Returns an error if the insert fails.
    pub fn record_cycle(
        &self,
        mode: TimerMode,
        duration_secs: u64,
        skipped: bool,
        completed_at: DateTime<Utc>,
    ) -> Result<i64, StorageError> {
        self.conn.execute(
            "INSERT INTO cycles (mode, duration_secs, skipped, completed_at)
             VALUES (?1, ?2, ?3, ?4)",
            params![mode.as_str(), duration_secs, skipped, completed_at.to_rfc3339()],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    /// Record the cycle described by a `CycleCompleted` event. Other events
    /// are ignored and return `None`.
    pub fn record_event(&self, event: &Event) -> Result<Option<i64>, StorageError> {
        match event {
            Event::CycleCompleted {
                finished,
                spent_secs,
                skipped,
                at,
                ..
            } => self
                .record_cycle(*finished, *spent_secs, *skipped, *at)
                .map(Some),
            _ => Ok(None),
        }
    }

    pub fn recent_cycles(&self, limit: usize) -> Result<Vec<CycleRecord>, StorageError> {
        let mut stmt = self.conn.prepare(
            "SELECT id, mode, duration_secs, skipped, completed_at
             FROM cycles
             ORDER BY id DESC
             LIMIT ?1",
        )?;
        let rows = stmt.query_map(params![limit as i64], |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, u64>(2)?,
                row.get::<_, bool>(3)?,
                row.get::<_, String>(4)?,
            ))
        })?;

        let mut records = Vec::new();
        for row in rows {
            let (id, mode, duration_secs, skipped, completed_at) = row?;
            let Some(mode) = TimerMode::parse(&mode) else {
                continue;
            };
            let completed_at = DateTime::parse_from_rfc3339(&completed_at)
                .map(|dt| dt.with_timezone(&Utc))
                .map_err(|e| StorageError::QueryFailed(e.to_string()))?;
            records.push(CycleRecord {
                id,
                mode,
                duration_secs,
                skipped,
                completed_at,
            });
        }
        Ok(records)
    }

    pub fn stats_today(&self) -> Result<Stats, StorageError> {
        self.stats_since(Some(start_of_today()))
    }

    pub fn stats_all(&self) -> Result<Stats, StorageError> {
        let mut stats = self.stats_since(None)?;
        let today = self.stats_today()?;
        stats.today_pomodoros = today.completed_pomodoros;
        stats.today_focus_min = today.total_focus_min;
        Ok(stats)
    }

    fn stats_since(&self, since: Option<String>) -> Result<Stats, StorageError> {
        let mut stmt = self.conn.prepare(
            "SELECT mode, skipped, COUNT(*), COALESCE(SUM(duration_secs), 0)
             FROM cycles
             WHERE ?1 IS NULL OR completed_at >= ?1
             GROUP BY mode, skipped",
        )?;
        let rows = stmt.query_map(params![since], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, bool>(1)?,
                row.get::<_, u64>(2)?,
                row.get::<_, u64>(3)?,
            ))
        })?;

        let mut stats = Stats::default();
        let (mut focus_secs, mut break_secs) = (0u64, 0u64);
        for row in rows {
            let (mode, skipped, count, secs) = row?;
            stats.total_cycles += count;
            if skipped {
                stats.skipped_cycles += count;
            }
            match TimerMode::parse(&mode) {
                Some(mode) if mode.is_break() => break_secs += secs,
                Some(_) => {
                    stats.completed_pomodoros += count;
                    focus_secs += secs;
                }
                None => {}
            }
        }
        stats.total_focus_min = focus_secs / 60;
        stats.total_break_min = break_secs / 60;
        if since.is_some() {
            stats.today_pomodoros = stats.completed_pomodoros;
            stats.today_focus_min = stats.total_focus_min;
        }
        Ok(stats)
    }

    /// Get a value from the kv store.
    pub fn kv_get(&self, key: &str) -> Result<Option<String>, rusqlite::Error> {
        let mut stmt = self.conn.prepare("SELECT value FROM kv WHERE key = ?1")?;
        let result = stmt.query_row(params![key], |row| row.get::<_, String>(0));
        match result {
            Ok(v) => Ok(Some(v)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Set a value in the kv store.
    pub fn kv_set(&self, key: &str, value: &str) -> Result<(), rusqlite::Error> {
        self.conn.execute(
            "INSERT OR REPLACE INTO kv (key, value) VALUES (?1, ?2)",
            params![key, value],
        )?;
        Ok(())
    }
}

impl SnapshotStore for Database {
    fn load(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.kv_get(key)?)
    }

    fn save(&self, key: &str, value: &str) -> Result<(), StorageError> {
        Ok(self.kv_set(key, value)?)
    }
}

fn start_of_today() -> String {
    let today = Utc::now().format("%Y-%m-%d").to_string();
    format!("{today}T00:00:00+00:00")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::datetime_from_ms;

    #[test]
    fn record_and_query() {
        let db = Database::open_memory().unwrap();
        let now = Utc::now();
        db.record_cycle(TimerMode::Pomodoro, 1500, false, now).unwrap();
        db.record_cycle(TimerMode::ShortBreak, 300, false, now).unwrap();
        db.record_cycle(TimerMode::LongBreak, 150, true, now).unwrap();
        db.record_cycle(TimerMode::Pomodoro, 630, true, now).unwrap();

        let stats = db.stats_all().unwrap();
        assert_eq!(stats.total_cycles, 4);
        assert_eq!(stats.completed_pomodoros, 2);
        assert_eq!(stats.skipped_cycles, 2);
        assert_eq!(stats.total_focus_min, 35);
        assert_eq!(stats.total_break_min, 7);
        assert_eq!(stats.today_pomodoros, 2);
    }

    #[test]
    fn old_cycles_are_not_today() {
        let db = Database::open_memory().unwrap();
        db.record_cycle(TimerMode::Pomodoro, 1500, false, datetime_from_ms(0))
            .unwrap();
        let today = db.stats_today().unwrap();
        assert_eq!(today.completed_pomodoros, 0);
        let all = db.stats_all().unwrap();
        assert_eq!(all.completed_pomodoros, 1);
        assert_eq!(all.today_pomodoros, 0);
    }

    #[test]
    fn record_event_only_takes_completions() {
        let db = Database::open_memory().unwrap();
        let paused = Event::TimerPaused {
            mode: TimerMode::Pomodoro,
            remaining_secs: 10,
            at: Utc::now(),
        };
        assert!(db.record_event(&paused).unwrap().is_none());

        let done = Event::CycleCompleted {
            finished: TimerMode::LongBreak,
            next: TimerMode::Pomodoro,
            duration_secs: 900,
            spent_secs: 840,
            completed_pomodoros: 4,
            auto_started: false,
            skipped: false,
            at: Utc::now(),
        };
        assert!(db.record_event(&done).unwrap().is_some());

        let recent = db.recent_cycles(10).unwrap();
        assert_eq!(recent.len(), 1);
        assert_eq!(recent[0].mode, TimerMode::LongBreak);
        assert_eq!(recent[0].duration_secs, 840);
    }

    #[test]
    fn kv_store() {
        let db = Database::open_memory().unwrap();
        assert!(db.load("test").unwrap().is_none());
        db.save("test", "hello").unwrap();
        assert_eq!(db.load("test").unwrap().unwrap(), "hello");
        db.save("test", "again").unwrap();
        assert_eq!(db.kv_get("test").unwrap().unwrap(), "again");
    }
}
