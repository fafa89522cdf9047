//! Alerting on host metrics and watched services
//!
//! Threshold alerts with hysteresis and cooldown, delivered through a
//! pluggable notification channel.

mod engine;
mod notifier;
mod sampler;
mod tracker;
mod types;

pub use engine::{sleep_interval, spawn_alert_engine, AlertEngine, AlertEngineHandle, MIN_STATUS_TIMEOUT};
pub use notifier::{LogNotifier, Notifier, TelegramNotifier, TELEGRAM_API};
pub use sampler::{HostUsage, MetricsSampler, SysinfoSampler, ROOT_MOUNT};
pub use tracker::AlertTracker;
pub use types::{AlertKey, KeyState, Reading, TickSummary, Transition};
