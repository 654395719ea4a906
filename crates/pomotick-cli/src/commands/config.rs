use clap::Subcommand;
use pomotick_core::{Config, SettingsPatch};

use super::{open_engine, print_event};

#[derive(Subcommand)]
pub enum ConfigAction {
    /// Get a config value
    Get {
        /// Config key (e.g. "timer.pomodoro_minutes", "notifications.bell")
        key: String,
    },
    /// Set a config value
    Set {
        /// Config key
        key: String,
        /// New value
        value: String,
    },
    /// List all config values
    List,
    /// Reset config to defaults
    Reset,
    /// Print the config file location
    Path,
}

pub fn run(action: ConfigAction) -> Result<(), Box<dyn std::error::Error>> {
    match action {
        ConfigAction::Get { key } => {
            let config = Config::load()?;
            match config.get(&key) {
                Some(value) => println!("{value}"),
                None => return Err(format!("unknown key: {key}").into()),
            }
        }
        ConfigAction::Set { key, value } => {
            let config = Config::load()?;
            let updated = config.with_value(&key, &value)?;
            apply(&config, &updated)?;
        }
        ConfigAction::List => {
            let config = Config::load()?;
            let json = serde_json::to_string_pretty(&config)?;
            println!("{json}");
        }
        ConfigAction::Reset => {
            let config = Config::load_or_default();
            apply(&config, &Config::default())?;
        }
        ConfigAction::Path => {
            println!("{}", Config::path()?.display());
        }
    }
    Ok(())
}

/// Save `updated` and, when timer settings changed, push them through the
/// engine so a paused timer picks up the new duration.
fn apply(current: &Config, updated: &Config) -> Result<(), Box<dyn std::error::Error>> {
    updated.save()?;
    if current.timer_settings() == updated.timer_settings() {
        println!("ok");
        return Ok(());
    }

    let mut engine = open_engine(current)?;
    if let Some(event) = engine.update_settings(SettingsPatch::from(updated.timer_settings())) {
        print_event(&event)?;
    }
    Ok(())
}
