use std::io::Write;

use clap::Subcommand;
use pomotick_core::timer::TICK_INTERVAL;
use pomotick_core::{Config, TimerMode};
use tokio::time::MissedTickBehavior;

use super::{open_engine, print_event, Engine};

#[derive(Subcommand)]
pub enum TimerAction {
    /// Start the countdown
    Start,
    /// Pause the countdown
    Pause,
    /// Start if paused, pause if running
    Toggle,
    /// Refill the current cycle and stop
    Reset,
    /// Jump to another mode with a full cycle
    Switch {
        /// pomodoro, short_break or long_break
        mode: TimerMode,
    },
    /// Finish the current cycle now and move to the next
    Skip,
    /// Print current timer state as JSON
    Status,
    /// Keep the timer ticking in the foreground until it pauses or Ctrl-C
    Watch {
        /// Start the timer first if it is paused
        #[arg(long)]
        start: bool,
    },
}

pub fn run(action: TimerAction) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load()?;
    let mut engine = open_engine(&config)?;

    let event = match action {
        TimerAction::Start => engine.start(),
        TimerAction::Pause => engine.pause(),
        TimerAction::Toggle => engine.toggle(),
        TimerAction::Reset => engine.reset_current(),
        TimerAction::Switch { mode } => engine.switch_mode(mode),
        TimerAction::Skip => engine.skip_to_next(),
        TimerAction::Status => engine.tick(),
        TimerAction::Watch { start } => {
            if start {
                if let Some(event) = engine.start() {
                    print_event(&event)?;
                }
            }
            return watch(&mut engine);
        }
    };

    if let Some(event) = event {
        print_event(&event)?;
    }
    print_event(&engine.status())?;
    Ok(())
}

/// Drive the engine from a one-second interval on a single-threaded runtime.
///
/// Each wake reloads the stored snapshot so that commands run from another
/// shell (pause, skip, switch) are picked up rather than overwritten.
fn watch(engine: &mut Engine) -> Result<(), Box<dyn std::error::Error>> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .enable_io()
        .build()?;

    runtime.block_on(async {
        let mut interval = tokio::time::interval(TICK_INTERVAL);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let ctrl_c = tokio::signal::ctrl_c();
        tokio::pin!(ctrl_c);

        let mut stdout = std::io::stdout();
        while engine.is_running() {
            tokio::select! {
                _ = interval.tick() => {
                    engine.reload();
                    let remaining = engine.remaining_seconds();
                    write!(
                        stdout,
                        "\r{:<12} {:02}:{:02}  ",
                        engine.mode().label(),
                        remaining / 60,
                        remaining % 60
                    )?;
                    stdout.flush()?;
                }
                _ = &mut ctrl_c => {
                    tracing::debug!("interrupted, leaving timer state as persisted");
                    break;
                }
            }
        }
        writeln!(stdout)?;
        Ok::<_, std::io::Error>(())
    })?;

    print_event(&engine.status())
}
