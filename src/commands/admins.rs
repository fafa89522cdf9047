//! Operator management commands

use crate::cli::args::{AdminCommands, OutputFormat};
use crate::cli::output::{print_output, Message, OperatorList};
use crate::commands::AppContext;
use crate::domain::parse_operator_id;
use crate::error::Result;

/// Execute operator commands
pub async fn run_admins(ctx: &AppContext, command: &AdminCommands, format: OutputFormat) -> Result<()> {
    let base = ctx.base_ids();
    match command {
        AdminCommands::List => {
            let list = OperatorList {
                extra: ctx.store.extra_authorized_ids().await,
                base,
            };
            print_output(&list, format)?;
        }
        AdminCommands::Add { id } => {
            let id = parse_operator_id(id)?;
            let message = if ctx.store.add_authorized_id(id).await? {
                Message::ok(format!("Operator {} authorized", id))
            } else {
                Message {
                    message: format!("Operator {} not added (already listed or list full)", id),
                    success: false,
                }
            };
            print_output(&message, format)?;
        }
        AdminCommands::Remove { id } => {
            let id = parse_operator_id(id)?;
            let message = if ctx.store.remove_authorized_id(id, &base).await? {
                Message::ok(format!("Operator {} revoked", id))
            } else {
                Message {
                    message: format!("Operator {} was not in the list", id),
                    success: false,
                }
            };
            print_output(&message, format)?;
        }
    }
    Ok(())
}
