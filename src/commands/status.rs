//! Status and ad-hoc command execution

use crate::cli::args::OutputFormat;
use crate::cli::output::{print_output, AlertSettingsView, StatusView};
use crate::commands::AppContext;
use crate::error::{AppError, Result};
use crate::exec::command_report;

/// Execute the status command
pub async fn run_status(ctx: &AppContext, format: OutputFormat) -> Result<()> {
    let usage = ctx.system(ctx.sampler()).usage().await?;
    let view = StatusView {
        usage,
        alerts: AlertSettingsView {
            alerts: ctx.store.alerts().await,
            destination: ctx.store.notification_destination().await,
        },
        firewall_enabled: ctx.store.firewall_enabled().await,
        safe_ports: ctx.safe_ports().await,
    };
    print_output(&view, format)?;
    Ok(())
}

/// Execute a command line through the shell and print the report
///
/// Exits non-zero when the command fails or times out.
pub async fn run_exec(ctx: &AppContext, command: &[String]) -> Result<()> {
    let line = command.join(" ");
    let terminal = ctx.terminal();
    let result = terminal.execute(&line).await?;
    println!("{}", command_report("Terminal", &result, usize::MAX));
    if result.success() {
        Ok(())
    } else {
        Err(AppError::CommandFailed(result.status_label()))
    }
}
