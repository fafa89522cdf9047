//! systemd unit, journal and package update commands

use crate::cli::args::{LogCommands, UnitActionArg, UpdateActionArg};
use crate::commands::AppContext;
use crate::domain::ServiceName;
use crate::error::Result;
use crate::services::{UnitAction, UpdateAction};

/// Execute a unit action
pub async fn run_service(ctx: &AppContext, name: &str, action: UnitActionArg) -> Result<()> {
    let name = ServiceName::new(name)?;
    let report = ctx
        .system(ctx.sampler())
        .unit_action(&name, UnitAction::from(action))
        .await;
    println!("{}", report);
    Ok(())
}

/// Execute journal queries
pub async fn run_logs(ctx: &AppContext, command: &LogCommands) -> Result<()> {
    let logs = ctx.logs();
    let report = match command {
        LogCommands::Kernel => logs.kernel().await,
        LogCommands::Errors => logs.errors().await,
        LogCommands::Auth => logs.auth().await,
        LogCommands::Unit { name } => logs.unit(&ServiceName::new(name)?).await,
        LogCommands::Search { query } => logs.search(&query.join(" ")).await?,
    };
    println!("{}", report);
    Ok(())
}

/// Execute a package update action
pub async fn run_updates(ctx: &AppContext, action: UpdateActionArg) -> Result<()> {
    let updates = ctx.updates();
    if let Some(manager) = updates.manager() {
        log::info!("Using package manager {}", manager);
    }
    let report = updates.run(UpdateAction::from(action)).await?;
    println!("{}", report);
    Ok(())
}
