//! Packet filter management
//!
//! Thin orchestration over `iptables`. Rule sequences run one after another
//! and every entry is reported, failures included; nothing aborts early.
//! Persisting `firewall_enabled` is left to the caller.

mod profile;

pub use profile::{baseline_rules, disable_rules, port_rule, safe_mode_rules, Profile, Rule};

use crate::domain::Port;
use crate::exec::{command_report, compact_report, labeled_report, CommandRunner, CommandSpec, ExecResult};

use std::net::IpAddr;
use std::sync::Arc;
use std::time::Duration;

/// Output limit for rule listings
const REPORT_LIMIT: usize = 3500;

/// Firewall operations bound to a runner and a per-command timeout
#[derive(Clone)]
pub struct Firewall {
    runner: Arc<dyn CommandRunner>,
    timeout: Duration,
}

impl Firewall {
    pub fn new(runner: Arc<dyn CommandRunner>, timeout: Duration) -> Self {
        Self { runner, timeout }
    }

    /// Apply a profile on top of the default-deny baseline
    pub async fn apply_profile(&self, profile: &Profile) -> String {
        log::info!("Applying firewall profile {}", profile.name());
        let entries = self.run_sequence(&profile.rules()).await;
        labeled_report(&format!("Firewall profile: {}", profile), &entries)
    }

    /// Baseline plus the safe ports on TCP and UDP
    pub async fn enable_safe_mode(&self, ports: &[Port]) -> String {
        let entries = self.run_sequence(&safe_mode_rules(ports)).await;
        let listed = if ports.is_empty() {
            "(none)".to_string()
        } else {
            ports
                .iter()
                .map(Port::to_string)
                .collect::<Vec<_>>()
                .join(", ")
        };
        labeled_report(&format!("Firewall enabled, ports: {}", listed), &entries)
    }

    /// Remove all rules and accept everything
    pub async fn disable(&self) -> String {
        let entries = self.run_sequence(&disable_rules()).await;
        labeled_report("Firewall disabled", &entries)
    }

    /// Flush all rules, keeping policies
    pub async fn flush(&self) -> String {
        let result = self.runner.run_argv(&["iptables", "-F"], self.timeout).await;
        command_report("Firewall flushed", &result, REPORT_LIMIT)
    }

    /// Current rule listing with counters and line numbers
    pub async fn list_rules(&self) -> String {
        let result = self
            .runner
            .run_argv(&["iptables", "-L", "-n", "-v", "--line-numbers"], self.timeout)
            .await;
        command_report("Current iptables rules", &result, REPORT_LIMIT)
    }

    /// Accept a port on TCP and UDP
    pub async fn open_port(&self, port: Port) -> String {
        let entries = self.both_protocols("-I", port).await;
        compact_report(&format!("Port {} opened", port), &entries)
    }

    /// Remove the TCP and UDP accept rules for a port
    pub async fn close_port(&self, port: Port) -> String {
        let entries = self.both_protocols("-D", port).await;
        compact_report(&format!("Port {} closed", port), &entries)
    }

    /// Drop all traffic from an address
    pub async fn ban_ip(&self, ip: IpAddr) -> String {
        let ip_text = ip.to_string();
        let result = self
            .runner
            .run_argv(&["iptables", "-I", "INPUT", "-s", &ip_text, "-j", "DROP"], self.timeout)
            .await;
        command_report(&format!("IP {} banned", ip), &result, REPORT_LIMIT)
    }

    /// Run the TCP and UDP variants concurrently and wait for both
    async fn both_protocols(&self, action: &str, port: Port) -> Vec<(String, ExecResult)> {
        let tcp_spec = port_rule(action, "tcp", port);
        let udp_spec = port_rule(action, "udp", port);
        let (tcp, udp) = tokio::join!(
            self.runner.execute(&tcp_spec, self.timeout),
            self.runner.execute(&udp_spec, self.timeout),
        );
        vec![("TCP".to_string(), tcp), ("UDP".to_string(), udp)]
    }

    async fn run_sequence(&self, rules: &[Rule]) -> Vec<(String, ExecResult)> {
        let mut entries = Vec::with_capacity(rules.len());
        for rule in rules {
            let result = self.execute(&rule.spec).await;
            if !result.success() {
                log::warn!("{} failed: {}", rule.label, result.status_label());
            }
            entries.push((rule.label.clone(), result));
        }
        entries
    }

    async fn execute(&self, spec: &CommandSpec) -> ExecResult {
        self.runner.execute(spec, self.timeout).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockRunner;

    fn firewall() -> (Arc<MockRunner>, Firewall) {
        let runner = Arc::new(MockRunner::new());
        let fw = Firewall::new(runner.clone(), Duration::from_secs(30));
        (runner, fw)
    }

    #[tokio::test(start_paused = true)]
    async fn test_open_port_runs_tcp_and_udp_concurrently() {
        let (runner, fw) = firewall();
        runner.delay(
            "iptables -I INPUT -p tcp --dport 8080 -j ACCEPT",
            Duration::from_secs(5),
        );
        runner.respond("iptables -I INPUT -p udp --dport 8080 -j ACCEPT", 1, "", "udp refused");

        let started = tokio::time::Instant::now();
        let report = fw.open_port(Port::new(8080).unwrap()).await;

        assert!(started.elapsed() < Duration::from_secs(6));
        assert!(report.starts_with("== Port 8080 opened =="));
        assert!(report.contains("TCP: OK"));
        assert!(report.contains("UDP: ERR 1"));
        assert!(report.contains("udp refused"));
        assert_eq!(runner.commands().len(), 2);
    }

    #[tokio::test]
    async fn test_close_port_deletes_both_rules() {
        let (runner, fw) = firewall();
        fw.close_port(Port::new(53).unwrap()).await;
        let mut commands = runner.commands();
        commands.sort();
        assert_eq!(
            commands,
            vec![
                "iptables -D INPUT -p tcp --dport 53 -j ACCEPT",
                "iptables -D INPUT -p udp --dport 53 -j ACCEPT",
            ]
        );
    }

    #[tokio::test]
    async fn test_profile_continues_after_failure() {
        let (runner, fw) = firewall();
        runner.respond("iptables -X", 1, "", "chain in use");

        let report = fw.apply_profile(&Profile::Ssh).await;
        assert_eq!(runner.commands().len(), 9);
        assert!(report.starts_with("== Firewall profile: SSH =="));
        assert!(report.contains("Delete user chains: ERR 1\nchain in use"));
        assert!(report.contains("Allow SSH 22/tcp: OK"));
    }

    #[tokio::test]
    async fn test_profile_commands_run_in_order() {
        let (runner, fw) = firewall();
        fw.apply_profile(&Profile::Web).await;
        let expected: Vec<String> = Profile::Web.rules().iter().map(|r| r.spec.display()).collect();
        assert_eq!(runner.commands(), expected);
    }

    #[tokio::test]
    async fn test_safe_mode_and_disable() {
        let (runner, fw) = firewall();
        let report = fw
            .enable_safe_mode(&[Port::new(22).unwrap(), Port::new(443).unwrap()])
            .await;
        assert!(report.starts_with("== Firewall enabled, ports: 22, 443 =="));
        assert_eq!(runner.commands().len(), 12);

        let report = fw.disable().await;
        assert!(report.contains("Policy INPUT ACCEPT: OK"));
        assert_eq!(runner.commands().len(), 17);
    }

    #[tokio::test]
    async fn test_ban_and_listing() {
        let (runner, fw) = firewall();
        runner.respond("iptables -L -n -v --line-numbers", 0, "Chain INPUT (policy DROP)", "");

        let report = fw.list_rules().await;
        assert!(report.contains("Chain INPUT (policy DROP)"));

        let report = fw.ban_ip("198.51.100.4".parse().unwrap()).await;
        assert!(report.contains("$ iptables -I INPUT -s 198.51.100.4 -j DROP"));

        fw.flush().await;
        assert_eq!(runner.commands().last().unwrap(), "iptables -F");
    }
}
