pub mod config;
pub mod stats;
pub mod timer;

use std::rc::Rc;

use pomotick_core::{Config, Database, Event, SystemClock, TimerEngine};

use crate::notify::{HistoryRecorder, TerminalNotifier};

pub type Engine = TimerEngine<Rc<Database>, SystemClock>;

/// Open the store, attach the notifier and history sinks, and restore the
/// persisted timer.
pub fn open_engine(config: &Config) -> Result<Engine, Box<dyn std::error::Error>> {
    let db = Rc::new(Database::open()?);
    let mut engine = TimerEngine::new(config.timer_settings(), Rc::clone(&db), SystemClock);
    engine.subscribe(Box::new(TerminalNotifier::new(config.notifications.clone())));
    engine.subscribe(Box::new(HistoryRecorder::new(db)));
    engine.restore();
    Ok(engine)
}

pub fn print_event(event: &Event) -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", serde_json::to_string_pretty(event)?);
    Ok(())
}
