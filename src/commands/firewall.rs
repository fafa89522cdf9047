//! Firewall command implementation
//!
//! The packet filter itself is changed through [`Firewall`]; the advisory
//! `firewall_enabled` flag and the safe ports are kept in the state store.

use crate::cli::args::FirewallCommands;
use crate::commands::AppContext;
use crate::domain::{parse_ip, parse_ports_csv, Port};
use crate::error::Result;
use crate::firewall::Profile;

/// Execute firewall commands
pub async fn run_firewall(ctx: &AppContext, command: &FirewallCommands) -> Result<()> {
    let firewall = ctx.firewall();
    let report = match command {
        FirewallCommands::Rules => firewall.list_rules().await,
        FirewallCommands::Enable => {
            let ports = ctx.safe_ports().await;
            let report = firewall.enable_safe_mode(&ports).await;
            ctx.store.set_firewall_enabled(true).await?;
            report
        }
        FirewallCommands::Disable => {
            let report = firewall.disable().await;
            ctx.store.set_firewall_enabled(false).await?;
            report
        }
        FirewallCommands::Flush => {
            let report = firewall.flush().await;
            ctx.store.set_firewall_enabled(false).await?;
            report
        }
        FirewallCommands::SafePorts { ports: None } => {
            format!("Safe ports: {}", join_ports(&ctx.safe_ports().await))
        }
        FirewallCommands::SafePorts { ports: Some(raw) } => {
            let ports = parse_ports_csv(raw)?;
            let stored = ctx.store.set_firewall_ports(&ports).await?;
            format!(
                "Safe ports saved: {}\nRun `hostwarden firewall enable` to apply them.",
                join_ports(&stored)
            )
        }
        FirewallCommands::Open { port } => firewall.open_port(port.parse()?).await,
        FirewallCommands::Close { port } => firewall.close_port(port.parse()?).await,
        FirewallCommands::Ban { ip } => firewall.ban_ip(parse_ip(ip)?).await,
        FirewallCommands::Profile { name, admin_ip } => {
            // validated before any rule runs
            let profile = Profile::parse(name, admin_ip.as_deref())?;
            let report = firewall.apply_profile(&profile).await;
            ctx.store.set_firewall_enabled(true).await?;
            report
        }
    };
    println!("{}", report);
    Ok(())
}

fn join_ports(ports: &[Port]) -> String {
    ports
        .iter()
        .map(Port::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}
