//! Alert system domain types
//!
//! Keys identify one monitored condition, readings carry what was measured,
//! and [`KeyState`] is the per-key hysteresis memory.

use crate::domain::{Metric, Percent, ServiceName};
use serde::Serialize;
use std::fmt;
use tokio::time::Instant;

/// One monitored condition
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum AlertKey {
    /// Host metric compared against its threshold
    Metric(Metric),
    /// Watched systemd unit
    Service(ServiceName),
}

impl fmt::Display for AlertKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Metric(metric) => write!(f, "{}", metric.id()),
            Self::Service(name) => write!(f, "service:{}", name),
        }
    }
}

/// What was observed for a key during one tick
#[derive(Debug, Clone, PartialEq)]
pub enum Reading {
    /// Metric usage in percent with the threshold it was compared to
    Usage {
        metric: Metric,
        value: f64,
        threshold: Percent,
    },
    /// Status reported by the service manager
    Unit {
        name: ServiceName,
        status: String,
        healthy: bool,
    },
}

impl Reading {
    /// The condition this reading belongs to
    pub fn key(&self) -> AlertKey {
        match self {
            Self::Usage { metric, .. } => AlertKey::Metric(*metric),
            Self::Unit { name, .. } => AlertKey::Service(name.clone()),
        }
    }

    /// Whether the condition is currently triggered
    ///
    /// Metrics trigger at or above the threshold; services whenever they are
    /// not healthy.
    pub fn triggered(&self) -> bool {
        match self {
            Self::Usage {
                value, threshold, ..
            } => *value >= f64::from(threshold.get()),
            Self::Unit { healthy, .. } => !healthy,
        }
    }

    /// Text sent when the condition is (still) triggered
    pub fn alarm_text(&self) -> String {
        match self {
            Self::Usage {
                metric,
                value,
                threshold,
            } => format!(
                "ALERT: {} above threshold: {:.1}% (threshold {}%)",
                metric.label(),
                value,
                threshold
            ),
            Self::Unit { name, status, .. } => {
                format!("ALERT: service {} is not active: {}", name, status)
            }
        }
    }

    /// Text sent once when the condition clears
    pub fn recovery_text(&self) -> String {
        match self {
            Self::Usage {
                metric,
                value,
                threshold,
            } => format!(
                "RECOVERED: {} back to normal: {:.1}% (threshold {}%)",
                metric.label(),
                value,
                threshold
            ),
            Self::Unit { name, .. } => format!("RECOVERED: service {} is active again", name),
        }
    }
}

/// Hysteresis memory of one key
///
/// Created lazily on first evaluation; lives for the process lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct KeyState {
    /// The condition is currently considered triggered
    pub active: bool,
    /// When the last alarm or recovery for this key was emitted
    pub last_notified_at: Option<Instant>,
}

/// Outcome of evaluating one reading against its key state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Transition {
    /// inactive -> active, always notified
    Raised,
    /// active -> active with the cooldown elapsed, notified again
    Repeated,
    /// active -> active inside the cooldown, silent
    Suppressed,
    /// active -> inactive, always notified
    Recovered,
    /// inactive -> inactive
    Quiet,
}

impl Transition {
    /// Whether this transition produces a message
    pub fn notifies(&self) -> bool {
        matches!(self, Self::Raised | Self::Repeated | Self::Recovered)
    }
}

impl fmt::Display for Transition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Raised => write!(f, "raised"),
            Self::Repeated => write!(f, "repeated"),
            Self::Suppressed => write!(f, "suppressed"),
            Self::Recovered => write!(f, "recovered"),
            Self::Quiet => write!(f, "quiet"),
        }
    }
}

/// Result of one evaluation tick
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TickSummary {
    /// The tick was skipped (alerts disabled or no destination)
    pub skipped: bool,
    /// Number of keys evaluated
    pub evaluated: usize,
    /// Messages handed to the notifier
    pub notified: usize,
    /// Deliveries the notifier reported as failed
    pub delivery_failures: usize,
    /// Metrics that could not be measured; their keys were left untouched
    pub sample_failures: Vec<String>,
    /// Per-key outcome, in evaluation order
    pub transitions: Vec<(String, Transition)>,
}

impl TickSummary {
    /// Summary of a tick that did nothing
    pub fn skipped() -> Self {
        Self {
            skipped: true,
            ..Self::default()
        }
    }

    /// Combined sampling error text, if any metric failed
    pub fn failure(&self) -> Option<String> {
        if self.sample_failures.is_empty() {
            None
        } else {
            Some(self.sample_failures.join("; "))
        }
    }
}
