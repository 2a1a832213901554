use clap::Subcommand;
use keepsake_core::display_label;

use super::{CmdResult, Context};

#[derive(Subcommand)]
pub enum ScheduleAction {
    /// Show the configured schedule
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

pub fn run(ctx: &Context, action: ScheduleAction) -> CmdResult {
    match action {
        ScheduleAction::List { json } => {
            let schedule = ctx.schedule()?;
            if json {
                println!("{}", serde_json::to_string_pretty(schedule.items())?);
            } else {
                for (position, item) in schedule.items().iter().enumerate() {
                    println!("#{} {}  {}", item.id, display_label(position), item.release_date);
                }
            }
        }
    }
    Ok(())
}
