//! Host overview, processes and systemd units

use crate::alerts::{HostUsage, MetricsSampler};
use crate::domain::ServiceName;
use crate::error::{DomainError, Result};
use crate::exec::{clip_text, command_report, CommandRunner};

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

const GIB: f64 = (1u64 << 30) as f64;

/// systemd unit operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnitAction {
    Start,
    Stop,
    Restart,
    /// Query only
    Status,
}

impl UnitAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::Stop => "stop",
            Self::Restart => "restart",
            Self::Status => "status",
        }
    }
}

impl fmt::Display for UnitAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for UnitAction {
    type Err = DomainError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "start" => Ok(Self::Start),
            "stop" => Ok(Self::Stop),
            "restart" => Ok(Self::Restart),
            "status" => Ok(Self::Status),
            other => Err(DomainError::UnknownAction(other.to_string())),
        }
    }
}

/// Host-level operator actions
pub struct SystemService {
    runner: Arc<dyn CommandRunner>,
    sampler: Arc<dyn MetricsSampler>,
    timeout: Duration,
}

impl SystemService {
    pub fn new(
        runner: Arc<dyn CommandRunner>,
        sampler: Arc<dyn MetricsSampler>,
        timeout: Duration,
    ) -> Self {
        Self {
            runner,
            sampler,
            timeout,
        }
    }

    /// Current usage sample
    pub async fn usage(&self) -> Result<HostUsage> {
        self.sampler.sample().await
    }

    /// CPU, RAM, root disk and uptime as text
    pub async fn snapshot(&self) -> Result<String> {
        let usage = self.usage().await?;
        Ok(render_snapshot(&usage, chrono::Local::now()))
    }

    /// Top 15 processes by CPU
    pub async fn top_processes(&self) -> String {
        let result = self
            .runner
            .run_shell("ps -eo pid,comm,%cpu,%mem --sort=-%cpu | head -n 16", self.timeout)
            .await;
        command_report("Top 15 processes", &result, 3500)
    }

    /// Send SIGKILL to a process
    pub async fn kill_process(&self, pid: u32) -> String {
        let pid_text = pid.to_string();
        log::info!("Killing pid {}", pid);
        let result = self.runner.run_argv(&["kill", "-9", &pid_text], self.timeout).await;
        command_report(&format!("Kill PID {}", pid), &result, 3500)
    }

    /// Run a unit action, then report the unit's state
    pub async fn unit_action(&self, name: &ServiceName, action: UnitAction) -> String {
        let mut sections = vec![format!("Service: {}", name)];

        if action != UnitAction::Status {
            log::info!("systemctl {} {}", action, name);
            let result = self
                .runner
                .run_argv(&["systemctl", action.as_str(), name.as_str()], self.timeout)
                .await;
            sections.push(command_report(&format!("systemctl {}", action), &result, 1500));
        }

        let status = self
            .runner
            .run_argv(&["systemctl", "is-active", name.as_str()], self.timeout)
            .await;
        sections.push(format!(
            "Current state:\n{}",
            clip_text(status.first_output().unwrap_or_default(), 300)
        ));
        sections.join("\n")
    }
}

/// Render a usage sample the way the status views show it
pub fn render_snapshot<Tz>(usage: &HostUsage, now: chrono::DateTime<Tz>) -> String
where
    Tz: chrono::TimeZone,
    Tz::Offset: fmt::Display,
{
    format!(
        "System metrics\n\
         CPU: {:.1}%\n\
         RAM: {:.1}% ({:.2} / {:.2} GB)\n\
         Disk /: {:.1}% ({:.2} / {:.2} GB)\n\
         Uptime: {}\n\
         Updated: {}",
        usage.cpu_percent,
        usage.ram_percent,
        usage.memory_used_bytes as f64 / GIB,
        usage.memory_total_bytes as f64 / GIB,
        usage.disk_percent,
        usage.disk_used_bytes as f64 / GIB,
        usage.disk_total_bytes as f64 / GIB,
        human_uptime(usage.uptime_secs),
        now.format("%Y-%m-%d %H:%M:%S"),
    )
}

/// `HH:MM:SS`, prefixed with days when longer than a day
pub fn human_uptime(seconds: u64) -> String {
    let days = seconds / 86_400;
    let hours = seconds % 86_400 / 3_600;
    let minutes = seconds % 3_600 / 60;
    let secs = seconds % 60;
    if days > 0 {
        format!("{}d {:02}:{:02}:{:02}", days, hours, minutes, secs)
    } else {
        format!("{:02}:{:02}:{:02}", hours, minutes, secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{MockRunner, MockSampler};
    use chrono::TimeZone;

    fn service() -> (Arc<MockRunner>, SystemService) {
        let runner = Arc::new(MockRunner::new());
        let sampler = Arc::new(MockSampler::new(12.5, 25.0, 30.0));
        let svc = SystemService::new(runner.clone(), sampler, Duration::from_secs(30));
        (runner, svc)
    }

    #[test]
    fn test_human_uptime() {
        assert_eq!(human_uptime(59), "00:00:59");
        assert_eq!(human_uptime(3_661), "01:01:01");
        assert_eq!(human_uptime(90_061), "1d 01:01:01");
    }

    #[test]
    fn test_unit_action_parse() {
        assert_eq!("Restart".parse::<UnitAction>().unwrap(), UnitAction::Restart);
        assert!("reload".parse::<UnitAction>().is_err());
    }

    #[test]
    fn test_render_snapshot() {
        let usage = HostUsage {
            cpu_percent: 12.5,
            ram_percent: 25.0,
            disk_percent: 30.0,
            memory_used_bytes: 2 << 30,
            memory_total_bytes: 8 << 30,
            disk_used_bytes: 30 << 30,
            disk_total_bytes: 100 << 30,
            uptime_secs: 3_600,
        };
        let now = chrono::Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        let text = render_snapshot(&usage, now);
        assert!(text.contains("CPU: 12.5%"));
        assert!(text.contains("RAM: 25.0% (2.00 / 8.00 GB)"));
        assert!(text.contains("Disk /: 30.0% (30.00 / 100.00 GB)"));
        assert!(text.contains("Uptime: 01:00:00"));
        assert!(text.ends_with("Updated: 2024-05-01 12:00:00"));
    }

    #[tokio::test]
    async fn test_snapshot_uses_sampler() {
        let (_, svc) = service();
        assert!(svc.snapshot().await.unwrap().contains("CPU: 12.5%"));
    }

    #[tokio::test]
    async fn test_unit_action_then_status() {
        let (runner, svc) = service();
        runner.respond("systemctl is-active nginx", 0, "active\n", "");
        let name = ServiceName::new("nginx").unwrap();

        let report = svc.unit_action(&name, UnitAction::Restart).await;
        assert_eq!(
            runner.commands(),
            vec!["systemctl restart nginx", "systemctl is-active nginx"]
        );
        assert!(report.starts_with("Service: nginx"));
        assert!(report.ends_with("Current state:\nactive"));

        svc.unit_action(&name, UnitAction::Status).await;
        assert_eq!(runner.commands().len(), 3);
    }

    #[tokio::test]
    async fn test_processes_and_kill() {
        let (runner, svc) = service();
        svc.top_processes().await;
        let report = svc.kill_process(4242).await;
        assert_eq!(runner.commands()[1], "kill -9 4242");
        assert!(report.starts_with("== Kill PID 4242 =="));
    }
}
