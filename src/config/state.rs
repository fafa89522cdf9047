//! Persisted state document
//!
//! The document is read permissively: every field is parsed on its own, and a
//! missing, mistyped or out-of-range field falls back to (or is clamped into)
//! its default without affecting the others.

use crate::domain::{
    normalize_operator_ids, normalize_ports, normalize_services, Cooldown, Metric, OperatorId,
    Percent, PollInterval, Port, ServiceName,
};
use serde::Serialize;
use serde_json::{Map, Value};

/// Whole persisted document
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct StateDocument {
    /// Runtime data registered while operating
    pub runtime: RuntimeConfig,
    /// Alerting configuration
    pub alerts: AlertConfig,
}

/// Runtime section
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct RuntimeConfig {
    /// Chat receiving alert notifications; set on the first authorized contact
    pub notification_destination: Option<OperatorId>,
    /// Operators authorized at runtime in addition to the base list
    pub extra_authorized_ids: Vec<OperatorId>,
    /// Ports kept open by the safe-mode firewall
    pub firewall_safe_ports: Vec<Port>,
    /// Last applied firewall state (advisory)
    pub firewall_enabled: bool,
    /// Compose project file or directory (advisory)
    pub compose_project_path: String,
}

/// Alerts section
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct AlertConfig {
    pub enabled: bool,
    pub cpu_threshold: Percent,
    pub ram_threshold: Percent,
    pub disk_threshold: Percent,
    pub poll_interval_seconds: PollInterval,
    pub cooldown_seconds: Cooldown,
    pub watched_services: Vec<ServiceName>,
}

impl AlertConfig {
    /// Threshold configured for a metric
    pub fn threshold(&self, metric: Metric) -> Percent {
        match metric {
            Metric::Cpu => self.cpu_threshold,
            Metric::Ram => self.ram_threshold,
            Metric::Disk => self.disk_threshold,
        }
    }

    /// Mutable access to a metric's threshold
    pub fn threshold_mut(&mut self, metric: Metric) -> &mut Percent {
        match metric {
            Metric::Cpu => &mut self.cpu_threshold,
            Metric::Ram => &mut self.ram_threshold,
            Metric::Disk => &mut self.disk_threshold,
        }
    }
}

impl StateDocument {
    /// Build a document from arbitrary JSON, replacing bad fields with defaults
    pub fn from_value(value: &Value) -> Self {
        let empty = Map::new();
        let root = value.as_object().unwrap_or(&empty);
        let runtime = root.get("runtime").and_then(Value::as_object).unwrap_or(&empty);
        let alerts = root.get("alerts").and_then(Value::as_object).unwrap_or(&empty);

        Self {
            runtime: RuntimeConfig::from_map(runtime),
            alerts: AlertConfig::from_map(alerts),
        }
    }
}

impl RuntimeConfig {
    fn from_map(map: &Map<String, Value>) -> Self {
        Self {
            notification_destination: map.get("notification_destination").and_then(as_int),
            extra_authorized_ids: normalize_operator_ids(int_items(map.get("extra_authorized_ids"))),
            firewall_safe_ports: normalize_ports(int_items(map.get("firewall_safe_ports"))),
            firewall_enabled: map.get("firewall_enabled").map(truthy).unwrap_or(false),
            compose_project_path: map
                .get("compose_project_path")
                .and_then(Value::as_str)
                .map(|s| s.trim().to_string())
                .unwrap_or_default(),
        }
    }
}

impl AlertConfig {
    fn from_map(map: &Map<String, Value>) -> Self {
        let int = |key: &str| map.get(key).and_then(as_int);
        let percent = |key: &str| int(key).map(Percent::clamped).unwrap_or_default();

        Self {
            enabled: map.get("enabled").map(truthy).unwrap_or(false),
            cpu_threshold: percent("cpu_threshold"),
            ram_threshold: percent("ram_threshold"),
            disk_threshold: percent("disk_threshold"),
            poll_interval_seconds: int("poll_interval_seconds")
                .map(PollInterval::clamped)
                .unwrap_or_default(),
            cooldown_seconds: int("cooldown_seconds")
                .map(Cooldown::clamped)
                .unwrap_or_default(),
            watched_services: normalize_services(text_items(map.get("watched_services"))),
        }
    }
}

/// Integer from a JSON number or a numeric string
fn as_int(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    }
}

fn truthy(value: &Value) -> bool {
    match value {
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
        Value::Null => false,
    }
}

fn int_items(value: Option<&Value>) -> Vec<i64> {
    value
        .and_then(Value::as_array)
        .map(|items| items.iter().filter_map(as_int).collect())
        .unwrap_or_default()
}

fn text_items(value: Option<&Value>) -> Vec<String> {
    value
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(|item| match item {
                    Value::String(s) => Some(s.clone()),
                    Value::Number(n) => Some(n.to_string()),
                    _ => None,
                })
                .collect()
        })
        .unwrap_or_default()
}
