//! Bounded numeric settings
//!
//! Alert thresholds and loop timings. Every value is clamped into its range
//! on construction, so an out-of-range number can never be stored.

use crate::error::DomainError;
use serde::Serialize;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// Clamp an integer into `[low, high]`
pub fn clamp_int(value: i64, low: i64, high: i64) -> i64 {
    value.clamp(low, high)
}

/// Parse operator input that must already lie within `[low, high]`
///
/// Unlike [`clamp_int`], this rejects instead of clamping: interactive input
/// is re-prompted rather than silently adjusted.
pub fn parse_bounded(text: &str, low: i64, high: i64) -> Result<i64, DomainError> {
    let trimmed = text.trim();
    if trimmed.is_empty() || !trimmed.bytes().all(|b| b.is_ascii_digit()) {
        return Err(DomainError::OutOfRange {
            value: trimmed.to_string(),
            min: low,
            max: high,
        });
    }
    match trimmed.parse::<i64>() {
        Ok(value) if (low..=high).contains(&value) => Ok(value),
        _ => Err(DomainError::OutOfRange {
            value: trimmed.to_string(),
            min: low,
            max: high,
        }),
    }
}

macro_rules! bounded_int {
    ($(#[$meta:meta])* $name:ident, $repr:ty, $min:expr, $max:expr, $default:expr) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
        #[serde(transparent)]
        pub struct $name($repr);

        impl $name {
            /// Minimum accepted value
            pub const MIN: $repr = $min;
            /// Maximum accepted value
            pub const MAX: $repr = $max;
            /// Value used when nothing valid is available
            pub const DEFAULT: $repr = $default;

            /// Clamp any integer into range
            pub fn clamped(value: i64) -> Self {
                Self(clamp_int(value, Self::MIN as i64, Self::MAX as i64) as $repr)
            }

            /// Parse strict operator input (rejects out-of-range values)
            pub fn parse(text: &str) -> Result<Self, DomainError> {
                parse_bounded(text, Self::MIN as i64, Self::MAX as i64).map(Self::clamped)
            }

            /// Get the raw value
            #[inline]
            pub const fn get(&self) -> $repr {
                self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self(Self::DEFAULT)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl FromStr for $name {
            type Err = DomainError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Self::parse(s)
            }
        }
    };
}

bounded_int!(
    /// Usage threshold in percent (1-100)
    Percent,
    u8,
    1,
    100,
    90
);

bounded_int!(
    /// Seconds between alert evaluation ticks (10-3600)
    PollInterval,
    u32,
    10,
    3600,
    30
);

bounded_int!(
    /// Minimum seconds between repeated alerts for one condition (30-86400)
    Cooldown,
    u32,
    30,
    86400,
    300
);

impl PollInterval {
    /// Tick interval as a duration
    pub fn as_duration(&self) -> Duration {
        Duration::from_secs(u64::from(self.0))
    }
}

impl Cooldown {
    /// Cooldown window as a duration
    pub fn as_duration(&self) -> Duration {
        Duration::from_secs(u64::from(self.0))
    }
}

/// A sampled host metric with its own threshold
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Metric {
    /// Global CPU utilisation
    Cpu,
    /// Used physical memory
    Ram,
    /// Used space on the root filesystem
    Disk,
}

impl Metric {
    /// All metrics in evaluation order
    pub const ALL: [Metric; 3] = [Metric::Cpu, Metric::Ram, Metric::Disk];

    /// Stable identifier used in alert keys and CLI arguments
    pub fn id(&self) -> &'static str {
        match self {
            Self::Cpu => "cpu",
            Self::Ram => "ram",
            Self::Disk => "disk",
        }
    }

    /// Label used in notification text
    pub fn label(&self) -> &'static str {
        match self {
            Self::Cpu => "CPU",
            Self::Ram => "RAM",
            Self::Disk => "Disk /",
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.id())
    }
}

impl FromStr for Metric {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "cpu" => Ok(Self::Cpu),
            "ram" | "mem" | "memory" => Ok(Self::Ram),
            "disk" => Ok(Self::Disk),
            other => Err(DomainError::UnknownAction(other.to_string())),
        }
    }
}
