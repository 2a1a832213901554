pub mod config;
pub mod open;
pub mod schedule;
pub mod visit;

use chrono::NaiveDate;
use clap::Args;
use keepsake_core::error::Result;
use keepsake_core::{
    data_dir, Config, FileStore, FixedClock, NullStore, Reconciler, Schedule, UnlockStore,
};
use std::path::PathBuf;

pub type CmdResult = Result<()>;

/// Data directory and configuration shared by every command.
pub struct Context {
    pub data_dir: PathBuf,
    pub config: Config,
}

impl Context {
    pub fn resolve(data_dir_override: Option<PathBuf>) -> Result<Self> {
        let data_dir = match data_dir_override {
            Some(dir) => {
                std::fs::create_dir_all(&dir)?;
                dir
            }
            None => data_dir()?,
        };
        let config = Config::load_in(&data_dir)?;
        Ok(Self { data_dir, config })
    }

    pub fn schedule(&self) -> Result<Schedule> {
        Ok(self.config.schedule(&self.data_dir)?)
    }

    /// Build the reconciler for one session.
    pub fn reconciler(&self, session: &SessionArgs) -> Result<Reconciler> {
        let store: Box<dyn UnlockStore> = if session.ephemeral {
            Box::new(NullStore)
        } else {
            Box::new(FileStore::new(self.config.unlock_dir(&self.data_dir)))
        };

        let mut reconciler = Reconciler::with_boxed_store(self.schedule()?, store)
            .with_key(self.config.storage.key.clone());
        if let Some(today) = session.today {
            reconciler = reconciler.with_clock(FixedClock(today));
        }
        Ok(reconciler)
    }
}

/// Options controlling how a visit is reconciled.
#[derive(Args, Debug, Clone, Default)]
pub struct SessionArgs {
    /// Pretend today is this date (YYYY-MM-DD)
    #[arg(long)]
    pub today: Option<NaiveDate>,

    /// Do not read or write saved progress
    #[arg(long)]
    pub ephemeral: bool,
}
