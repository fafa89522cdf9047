//! Firewall rule sets
//!
//! Every profile starts from the same default-deny baseline and then layers
//! its own allow/drop rules.

use crate::domain::{parse_ip, Port};
use crate::error::DomainError;
use crate::exec::CommandSpec;
use std::fmt;
use std::net::IpAddr;

/// One labelled packet-filter command
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rule {
    pub label: String,
    pub spec: CommandSpec,
}

impl Rule {
    fn new(label: impl Into<String>, args: &[&str]) -> Self {
        Self {
            label: label.into(),
            spec: CommandSpec::argv(std::iter::once("iptables").chain(args.iter().copied())),
        }
    }

    fn allow_tcp(label: &str, port: u16) -> Self {
        let port = port.to_string();
        Self::new(label, &["-A", "INPUT", "-p", "tcp", "--dport", &port, "-j", "ACCEPT"])
    }

    fn drop_tcp(label: &str, port: u16) -> Self {
        let port = port.to_string();
        Self::new(label, &["-A", "INPUT", "-p", "tcp", "--dport", &port, "-j", "DROP"])
    }
}

/// Named rule set
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Profile {
    /// SSH, HTTP and HTTPS
    Web,
    /// SSH only
    Ssh,
    /// Web ports plus explicit drops for common database ports
    Db,
    /// SSH from one admin address only
    Panic(IpAddr),
}

impl Profile {
    /// Names accepted by [`Profile::parse`]
    pub const NAMES: [&'static str; 4] = ["web", "ssh", "db", "panic"];

    /// Resolve a profile name; `panic` needs a valid admin address
    pub fn parse(name: &str, admin_ip: Option<&str>) -> Result<Self, DomainError> {
        match name.trim().to_ascii_lowercase().as_str() {
            "web" => Ok(Self::Web),
            "ssh" => Ok(Self::Ssh),
            "db" => Ok(Self::Db),
            "panic" => {
                let raw = admin_ip
                    .map(str::trim)
                    .filter(|ip| !ip.is_empty())
                    .ok_or(DomainError::MissingAdminIp)?;
                Ok(Self::Panic(parse_ip(raw)?))
            }
            other => Err(DomainError::UnknownProfile(other.to_string())),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Web => "web",
            Self::Ssh => "ssh",
            Self::Db => "db",
            Self::Panic(_) => "panic",
        }
    }

    /// Full ordered command sequence, baseline included
    pub fn rules(&self) -> Vec<Rule> {
        let mut rules = baseline_rules();
        match self {
            Self::Web => rules.extend(web_rules()),
            Self::Ssh => rules.push(Rule::allow_tcp("Allow SSH 22/tcp", 22)),
            Self::Db => {
                rules.extend(web_rules());
                rules.extend([
                    Rule::drop_tcp("Drop MySQL 3306/tcp", 3306),
                    Rule::drop_tcp("Drop PostgreSQL 5432/tcp", 5432),
                    Rule::drop_tcp("Drop Redis 6379/tcp", 6379),
                    Rule::drop_tcp("Drop MongoDB 27017/tcp", 27017),
                ]);
            }
            Self::Panic(ip) => {
                let ip = ip.to_string();
                rules.push(Rule::new(
                    "Allow SSH from admin IP",
                    &["-A", "INPUT", "-p", "tcp", "-s", &ip, "--dport", "22", "-j", "ACCEPT"],
                ));
            }
        }
        rules
    }
}

impl fmt::Display for Profile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Panic(ip) => write!(f, "PANIC ({})", ip),
            other => write!(f, "{}", other.name().to_uppercase()),
        }
    }
}

/// Reset to default-deny: flush, drop chains, set policies, allow
/// established traffic, loopback and ICMP
pub fn baseline_rules() -> Vec<Rule> {
    vec![
        Rule::new("Flush", &["-F"]),
        Rule::new("Delete user chains", &["-X"]),
        Rule::new("Policy INPUT DROP", &["-P", "INPUT", "DROP"]),
        Rule::new("Policy FORWARD DROP", &["-P", "FORWARD", "DROP"]),
        Rule::new("Policy OUTPUT ACCEPT", &["-P", "OUTPUT", "ACCEPT"]),
        Rule::new(
            "Allow ESTABLISHED",
            &["-A", "INPUT", "-m", "conntrack", "--ctstate", "ESTABLISHED,RELATED", "-j", "ACCEPT"],
        ),
        Rule::new("Allow loopback", &["-A", "INPUT", "-i", "lo", "-j", "ACCEPT"]),
        Rule::new("Allow ICMP", &["-A", "INPUT", "-p", "icmp", "-j", "ACCEPT"]),
    ]
}

fn web_rules() -> [Rule; 3] {
    [
        Rule::allow_tcp("Allow SSH 22/tcp", 22),
        Rule::allow_tcp("Allow HTTP 80/tcp", 80),
        Rule::allow_tcp("Allow HTTPS 443/tcp", 443),
    ]
}

/// Baseline plus each safe port on TCP and UDP
pub fn safe_mode_rules(ports: &[Port]) -> Vec<Rule> {
    let mut rules = baseline_rules();
    for port in ports {
        let p = port.to_string();
        for proto in ["tcp", "udp"] {
            rules.push(Rule::new(
                format!("Allow {}/{}", port, proto),
                &["-A", "INPUT", "-p", proto, "--dport", &p, "-j", "ACCEPT"],
            ));
        }
    }
    rules
}

/// Flush everything and accept all traffic
pub fn disable_rules() -> Vec<Rule> {
    vec![
        Rule::new("Flush", &["-F"]),
        Rule::new("Delete user chains", &["-X"]),
        Rule::new("Policy INPUT ACCEPT", &["-P", "INPUT", "ACCEPT"]),
        Rule::new("Policy FORWARD ACCEPT", &["-P", "FORWARD", "ACCEPT"]),
        Rule::new("Policy OUTPUT ACCEPT", &["-P", "OUTPUT", "ACCEPT"]),
    ]
}

/// Insert or delete the ACCEPT rule for one port and protocol
pub fn port_rule(action: &str, proto: &str, port: Port) -> CommandSpec {
    let port = port.to_string();
    CommandSpec::argv([
        "iptables",
        action,
        "INPUT",
        "-p",
        proto,
        "--dport",
        port.as_str(),
        "-j",
        "ACCEPT",
    ])
}
