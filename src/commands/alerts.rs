//! Alert command implementation
//!
//! Handles alert-related CLI commands.

use crate::cli::args::{AlertCommands, OutputFormat};
use crate::cli::output::{print_output, AlertSettingsView, Message};
use crate::commands::AppContext;
use crate::domain::service::is_clear_keyword;
use crate::domain::{parse_service_list, Cooldown, Metric, Percent, PollInterval};
use crate::error::Result;

/// Execute alert commands
pub async fn run_alerts(ctx: &AppContext, command: &AlertCommands, format: OutputFormat) -> Result<()> {
    match command {
        AlertCommands::Show => show(ctx, format).await,
        AlertCommands::Enable => toggle(ctx, true, format).await,
        AlertCommands::Disable => toggle(ctx, false, format).await,
        AlertCommands::Set { metric, value } => {
            let metric = Metric::from(*metric);
            let value = Percent::parse(value)?;
            let stored = ctx
                .store
                .set_threshold(metric, i64::from(value.get()))
                .await?;
            print_output(
                &Message::ok(format!("{} threshold set to {}%", metric.label(), stored)),
                format,
            )?;
            Ok(())
        }
        AlertCommands::Interval { seconds } => {
            let value = PollInterval::parse(seconds)?;
            let stored = ctx.store.set_poll_interval(i64::from(value.get())).await?;
            print_output(&Message::ok(format!("Check interval set to {}s", stored)), format)?;
            Ok(())
        }
        AlertCommands::Cooldown { seconds } => {
            let value = Cooldown::parse(seconds)?;
            let stored = ctx.store.set_cooldown(i64::from(value.get())).await?;
            print_output(&Message::ok(format!("Alert cooldown set to {}s", stored)), format)?;
            Ok(())
        }
        AlertCommands::Services { names } => set_services(ctx, names, format).await,
        AlertCommands::Destination { chat } => {
            ctx.store.set_notification_destination(*chat).await?;
            print_output(
                &Message::ok(format!("Notifications go to {}", chat)),
                format,
            )?;
            Ok(())
        }
        AlertCommands::Check => {
            let engine = ctx.alert_engine(ctx.sampler())?;
            let summary = engine.check_once().await?;
            print_output(&summary, format)?;
            Ok(())
        }
        AlertCommands::Test => {
            let engine = ctx.alert_engine(ctx.sampler())?;
            engine.send_test_alert().await?;
            print_output(&Message::ok("Test alert delivered"), format)?;
            Ok(())
        }
    }
}

async fn show(ctx: &AppContext, format: OutputFormat) -> Result<()> {
    let view = AlertSettingsView {
        alerts: ctx.store.alerts().await,
        destination: ctx.store.notification_destination().await,
    };
    print_output(&view, format)?;
    Ok(())
}

async fn toggle(ctx: &AppContext, enabled: bool, format: OutputFormat) -> Result<()> {
    ctx.store.set_alert_enabled(enabled).await?;
    let state = if enabled { "enabled" } else { "disabled" };
    print_output(&Message::ok(format!("Alerts {}", state)), format)?;
    Ok(())
}

async fn set_services(ctx: &AppContext, names: &[String], format: OutputFormat) -> Result<()> {
    let joined = names.join(",");
    let services = if is_clear_keyword(&joined) {
        Vec::new()
    } else {
        parse_service_list(&joined)?
    };

    let stored = ctx.store.set_watched_services(&services).await?;
    let text = if stored.is_empty() {
        "Watched services cleared".to_string()
    } else {
        let list: Vec<&str> = stored.iter().map(|s| s.as_str()).collect();
        format!("Watched services: {}", list.join(", "))
    };
    print_output(&Message::ok(text), format)?;
    Ok(())
}
