use clap::Args;
use keepsake_core::{display_label, Click, CoreError, ItemId};

use super::{CmdResult, Context, SessionArgs};

#[derive(Args, Debug)]
pub struct OpenArgs {
    /// Message id
    pub id: ItemId,

    #[command(flatten)]
    pub session: SessionArgs,
}

pub fn run(ctx: &Context, args: OpenArgs) -> CmdResult {
    let reconciler = ctx.reconciler(&args.session)?;
    let reconciliation = reconciler.reconcile();

    match reconciliation.state.open(reconciler.schedule(), args.id) {
        Click::Open {
            item,
            position,
            is_final,
        } => {
            if is_final {
                println!("*** {} (the last one) ***", display_label(position));
            } else {
                println!("--- {} ---", display_label(position));
            }
            println!("{}", item.content);
        }
        Click::Locked {
            position, label, ..
        } => {
            println!("{} is still locked. {label}", display_label(position));
        }
        Click::Unknown(id) => {
            return Err(CoreError::Custom(format!("no message with id {id}")));
        }
    }
    Ok(())
}
