use clap::Subcommand;
use keepsake_core::{Config, ConfigError};

use super::{CmdResult, Context};

#[derive(Subcommand)]
pub enum ConfigAction {
    /// Get a config value
    Get {
        /// Config key (e.g. "storage.key", "schedule.path")
        key: String,
    },
    /// Set a config value
    Set {
        /// Config key
        key: String,
        /// New value (empty clears optional paths)
        value: String,
    },
    /// List all config values
    List,
    /// Reset config to defaults
    Reset,
}

pub fn run(ctx: &Context, action: ConfigAction) -> CmdResult {
    match action {
        ConfigAction::Get { key } => match ctx.config.get(&key) {
            Some(value) => println!("{value}"),
            None => return Err(ConfigError::UnknownKey(key).into()),
        },
        ConfigAction::Set { key, value } => {
            let mut config = ctx.config.clone();
            config.set(&key, &value)?;
            config.save_in(&ctx.data_dir)?;
            println!("ok");
        }
        ConfigAction::List => {
            let json = serde_json::to_string_pretty(&ctx.config)?;
            println!("{json}");
        }
        ConfigAction::Reset => {
            Config::default().save_in(&ctx.data_dir)?;
            println!("config reset to defaults");
        }
    }
    Ok(())
}
