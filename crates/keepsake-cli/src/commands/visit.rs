use clap::Args;
use keepsake_core::{display_label, unlock_label, ItemId, Reconciliation, Schedule, FIRST_LABEL};
use serde::Serialize;

use super::{CmdResult, Context, SessionArgs};

#[derive(Args, Debug)]
pub struct VisitArgs {
    #[command(flatten)]
    pub session: SessionArgs,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

/// One row of the board.
#[derive(Serialize)]
struct BoardItem {
    id: ItemId,
    position: usize,
    title: String,
    unlocked: bool,
    label: String,
}

#[derive(Serialize)]
struct Board<'a> {
    #[serde(flatten)]
    reconciliation: &'a Reconciliation,
    unlocked_count: usize,
    total: usize,
    all_unlocked: bool,
    items: Vec<BoardItem>,
}

fn board<'a>(schedule: &Schedule, reconciliation: &'a Reconciliation) -> Board<'a> {
    let state = &reconciliation.state;
    let items = schedule
        .items()
        .iter()
        .enumerate()
        .map(|(position, item)| {
            let unlocked = state.is_unlocked(item.id);
            let label = if position == 0 {
                FIRST_LABEL.to_string()
            } else if unlocked {
                String::new()
            } else {
                unlock_label(item, position)
            };
            BoardItem {
                id: item.id,
                position,
                title: display_label(position),
                unlocked,
                label,
            }
        })
        .collect();

    Board {
        reconciliation,
        unlocked_count: state.unlocked_count(),
        total: schedule.len(),
        all_unlocked: state.all_unlocked(schedule),
        items,
    }
}

pub fn run(ctx: &Context, args: VisitArgs) -> CmdResult {
    let reconciler = ctx.reconciler(&args.session)?;
    let schedule = reconciler.schedule();
    let reconciliation = reconciler.reconcile();
    let board = board(schedule, &reconciliation);

    if args.json {
        println!("{}", serde_json::to_string_pretty(&board)?);
        return Ok(());
    }

    println!("Quest unlocked ({}/{})", board.unlocked_count, board.total);
    for item in &board.items {
        let mark = if item.unlocked { "x" } else { " " };
        if item.label.is_empty() {
            println!("  [{mark}] #{} {}", item.id, item.title);
        } else {
            println!("  [{mark}] #{} {}  {}", item.id, item.title, item.label);
        }
    }

    let percent = (reconciliation.state.progress(schedule) * 100.0).round();
    println!("progress: {percent}%");

    if !reconciliation.newly_unlocked.is_empty() {
        let ids: Vec<String> = reconciliation
            .newly_unlocked
            .iter()
            .map(ToString::to_string)
            .collect();
        println!("new today: {}", ids.join(", "));
    }
    if board.all_unlocked {
        println!("Every message is unlocked!");
    }
    Ok(())
}
