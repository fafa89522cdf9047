//! Output formatting utilities
//!
//! Provides table and JSON output formatting for CLI commands.

use crate::alerts::{HostUsage, TickSummary};
use crate::cli::args::OutputFormat;
use crate::config::AlertConfig;
use crate::domain::{Metric, OperatorId, Port};
use crate::services::{format_backups, human_uptime, BackupEntry, BackupInfo};
use serde::Serialize;
use std::io::{self, Write};

/// Format and print output based on the selected format
pub fn print_output<T: Serialize + TableDisplay>(data: &T, format: OutputFormat) -> io::Result<()> {
    let stdout = io::stdout();
    let mut handle = stdout.lock();

    match format {
        OutputFormat::Table => {
            writeln!(handle, "{}", data.to_table())?;
        }
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(data).unwrap_or_else(|_| "{}".to_string());
            writeln!(handle, "{}", json)?;
        }
        OutputFormat::Compact => {
            writeln!(handle, "{}", data.to_compact())?;
        }
    }

    Ok(())
}

/// Trait for types that can be displayed as a table
pub trait TableDisplay {
    /// Format as a table string
    fn to_table(&self) -> String;

    /// Format as a compact single line
    fn to_compact(&self) -> String {
        self.to_table().replace('\n', " | ")
    }
}

/// Alert settings for display
#[derive(Debug, Clone, Serialize)]
pub struct AlertSettingsView {
    #[serde(flatten)]
    pub alerts: AlertConfig,
    pub destination: Option<OperatorId>,
}

impl TableDisplay for AlertSettingsView {
    fn to_table(&self) -> String {
        let a = &self.alerts;
        let mut output = format!(
            "Alerts: {}\n",
            if a.enabled { "enabled" } else { "disabled" }
        );
        for metric in Metric::ALL {
            output.push_str(&format!(
                "  {:<12} {}%\n",
                format!("{}:", metric.label()),
                a.threshold(metric)
            ));
        }
        output.push_str(&format!("  {:<12} {}s\n", "Interval:", a.poll_interval_seconds));
        output.push_str(&format!("  {:<12} {}s\n", "Cooldown:", a.cooldown_seconds));

        let services: Vec<&str> = a.watched_services.iter().map(|s| s.as_str()).collect();
        output.push_str(&format!(
            "  {:<12} {}\n",
            "Services:",
            if services.is_empty() {
                "(none)".to_string()
            } else {
                services.join(", ")
            }
        ));
        output.push_str(&format!(
            "  {:<12} {}",
            "Deliver to:",
            self.destination
                .map(|d| d.to_string())
                .unwrap_or_else(|| "(not registered)".to_string())
        ));
        output
    }

    fn to_compact(&self) -> String {
        let a = &self.alerts;
        format!(
            "alerts={} cpu={} ram={} disk={} interval={} cooldown={} services={}",
            if a.enabled { "on" } else { "off" },
            a.cpu_threshold,
            a.ram_threshold,
            a.disk_threshold,
            a.poll_interval_seconds,
            a.cooldown_seconds,
            a.watched_services.len()
        )
    }
}

/// Host status for display
#[derive(Debug, Clone, Serialize)]
pub struct StatusView {
    pub usage: HostUsage,
    pub alerts: AlertSettingsView,
    pub firewall_enabled: bool,
    pub safe_ports: Vec<Port>,
}

impl TableDisplay for StatusView {
    fn to_table(&self) -> String {
        let u = &self.usage;
        let ports: Vec<String> = self.safe_ports.iter().map(ToString::to_string).collect();
        format!(
            "Host\n  CPU:    {:.1}%\n  RAM:    {:.1}%\n  Disk /: {:.1}%\n  Uptime: {}\n\n\
             Firewall: {} (safe ports: {})\n\n{}",
            u.cpu_percent,
            u.ram_percent,
            u.disk_percent,
            human_uptime(u.uptime_secs),
            if self.firewall_enabled { "enabled" } else { "disabled" },
            ports.join(", "),
            self.alerts.to_table()
        )
    }

    fn to_compact(&self) -> String {
        format!(
            "cpu={:.1}% ram={:.1}% disk={:.1}% fw={} {}",
            self.usage.cpu_percent,
            self.usage.ram_percent,
            self.usage.disk_percent,
            if self.firewall_enabled { "on" } else { "off" },
            self.alerts.to_compact()
        )
    }
}

/// Operator list for display
#[derive(Debug, Clone, Serialize)]
pub struct OperatorList {
    pub base: Vec<OperatorId>,
    pub extra: Vec<OperatorId>,
}

impl TableDisplay for OperatorList {
    fn to_table(&self) -> String {
        let mut output = String::from("Operators\n");
        for id in &self.base {
            output.push_str(&format!("  {:<14} settings\n", id));
        }
        for id in self.extra.iter().filter(|id| !self.base.contains(id)) {
            output.push_str(&format!("  {:<14} added\n", id));
        }
        output.trim_end().to_string()
    }

    fn to_compact(&self) -> String {
        let ids: Vec<String> = self
            .base
            .iter()
            .chain(self.extra.iter())
            .map(ToString::to_string)
            .collect();
        ids.join(",")
    }
}

impl TableDisplay for TickSummary {
    fn to_table(&self) -> String {
        if self.skipped {
            return "Alert check skipped (alerts disabled or no destination)".to_string();
        }
        let mut output = format!(
            "Alert check: {} key(s), {} notification(s), {} failed\n",
            self.evaluated, self.notified, self.delivery_failures
        );
        for (key, transition) in &self.transitions {
            output.push_str(&format!("  {:<24} {}\n", key, transition));
        }
        for failure in &self.sample_failures {
            output.push_str(&format!("  unavailable: {}\n", failure));
        }
        output.trim_end().to_string()
    }

    fn to_compact(&self) -> String {
        format!(
            "skipped={} evaluated={} notified={} failed={} unavailable={}",
            self.skipped,
            self.evaluated,
            self.notified,
            self.delivery_failures,
            self.sample_failures.len()
        )
    }
}

/// Backup archives for display
#[derive(Debug, Clone, Serialize)]
pub struct BackupList {
    pub dir: String,
    pub backups: Vec<BackupEntry>,
}

impl TableDisplay for BackupList {
    fn to_table(&self) -> String {
        format!("Directory: {}\n{}", self.dir, format_backups(&self.backups))
    }

    fn to_compact(&self) -> String {
        let names: Vec<&str> = self.backups.iter().map(|b| b.name.as_str()).collect();
        names.join(",")
    }
}

impl TableDisplay for BackupInfo {
    fn to_table(&self) -> String {
        self.report()
    }

    fn to_compact(&self) -> String {
        format!("{} {}", self.archive.display(), self.sha256)
    }
}

/// Simple message output
#[derive(Debug, Clone, Serialize)]
pub struct Message {
    pub message: String,
    pub success: bool,
}

impl Message {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            success: true,
        }
    }
}

impl TableDisplay for Message {
    fn to_table(&self) -> String {
        if self.success {
            format!("✓ {}", self.message)
        } else {
            format!("✗ {}", self.message)
        }
    }
}
