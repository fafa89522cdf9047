//! Alert evaluation loop
//!
//! Each tick re-reads the alert settings, samples the host, queries every
//! watched unit and feeds the readings through the [`AlertTracker`].

use super::notifier::Notifier;
use super::sampler::MetricsSampler;
use super::tracker::AlertTracker;
use super::types::{Reading, TickSummary};
use crate::config::ConfigStore;
use crate::domain::{Metric, PollInterval, ServiceName};
use crate::error::{AppError, Result};
use crate::exec::CommandRunner;

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// Lower bound for unit status query timeouts
pub const MIN_STATUS_TIMEOUT: Duration = Duration::from_secs(10);

/// Periodic alert evaluator
pub struct AlertEngine {
    store: Arc<ConfigStore>,
    runner: Arc<dyn CommandRunner>,
    sampler: Arc<dyn MetricsSampler>,
    notifier: Arc<dyn Notifier>,
    command_timeout: Duration,
    tracker: Mutex<AlertTracker>,
}

impl AlertEngine {
    /// Create an engine with empty key state
    pub fn new(
        store: Arc<ConfigStore>,
        runner: Arc<dyn CommandRunner>,
        sampler: Arc<dyn MetricsSampler>,
        notifier: Arc<dyn Notifier>,
        command_timeout: Duration,
    ) -> Self {
        Self {
            store,
            runner,
            sampler,
            notifier,
            command_timeout,
            tracker: Mutex::new(AlertTracker::new()),
        }
    }

    /// Evaluate every key once
    ///
    /// Settings written by another process since the last tick are picked up
    /// here. Skipped without touching key state when alerts are disabled or
    /// no destination is registered. A metric that cannot be measured skips
    /// only its own key; watched units are always queried. Failed deliveries
    /// are logged and the key transition is committed regardless.
    pub async fn check_once(&self) -> Result<TickSummary> {
        if self.store.reload_if_changed().await {
            log::debug!("Alert settings changed on disk");
        }
        let alerts = self.store.alerts().await;
        if !alerts.enabled {
            log::debug!("Alerts disabled, skipping tick");
            return Ok(TickSummary::skipped());
        }
        let Some(destination) = self.store.notification_destination().await else {
            log::debug!("No notification destination, skipping tick");
            return Ok(TickSummary::skipped());
        };

        let mut tracker = self.tracker.lock().await;
        let cooldown = alerts.cooldown_seconds.as_duration();
        let mut summary = TickSummary::default();

        let mut readings = Vec::new();
        for (metric, outcome) in self.sampler.sample_metrics().await {
            match outcome {
                Ok(value) => readings.push(Reading::Usage {
                    metric,
                    value,
                    threshold: alerts.threshold(metric),
                }),
                Err(e) => {
                    log::warn!("{}", e);
                    summary.sample_failures.push(e.to_string());
                }
            }
        }
        for service in &alerts.watched_services {
            readings.push(self.unit_reading(service).await);
        }

        for reading in readings {
            let key = reading.key();
            let transition = tracker.observe(&key, reading.triggered(), cooldown, Instant::now());
            summary.evaluated += 1;
            summary.transitions.push((key.to_string(), transition));

            if !transition.notifies() {
                continue;
            }
            log::info!("Alert {} {}", key, transition);
            let text = if reading.triggered() {
                reading.alarm_text()
            } else {
                reading.recovery_text()
            };
            summary.notified += 1;
            if let Err(e) = self.notifier.deliver(destination, &text).await {
                log::warn!("Failed to notify via {}: {}", self.notifier.name(), e);
                summary.delivery_failures += 1;
            }
        }

        Ok(summary)
    }

    /// Query one unit; anything but a clean exit reporting `active` is unhealthy
    async fn unit_reading(&self, name: &ServiceName) -> Reading {
        let timeout = self.command_timeout.max(MIN_STATUS_TIMEOUT);
        let result = self
            .runner
            .run_argv(&["systemctl", "is-active", name.as_str()], timeout)
            .await;
        let status = result.first_output().unwrap_or("unknown").to_string();
        let healthy = result.success() && status == "active";
        Reading::Unit {
            name: name.clone(),
            status,
            healthy,
        }
    }

    /// Run ticks until `cancel` fires
    ///
    /// The interval is re-read before every tick. A failing tick is logged
    /// every time but reported to the destination once per distinct error,
    /// until a tick succeeds again.
    pub async fn run(&self, cancel: CancellationToken) {
        log::info!("Alert engine started");
        let mut last_failure: Option<String> = None;
        loop {
            let outcome = tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                outcome = self.check_once() => outcome,
            };
            let failure = match outcome {
                Ok(summary) => {
                    if summary.notified > 0 {
                        log::debug!("Tick sent {} notification(s)", summary.notified);
                    }
                    summary.failure()
                }
                Err(e) => Some(e.to_string()),
            };
            self.track_failure(&mut last_failure, failure).await;

            let interval = self.store.alerts().await.poll_interval_seconds;
            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                _ = tokio::time::sleep(sleep_interval(interval)) => {}
            }
        }
        log::info!("Alert engine stopped");
    }

    async fn track_failure(&self, last: &mut Option<String>, failure: Option<String>) {
        match failure {
            Some(reason) if last.as_deref() == Some(reason.as_str()) => {
                log::error!("Alert tick still failing: {}", reason);
            }
            Some(reason) => {
                log::error!("Alert tick failed: {}", reason);
                self.report_failure(&reason).await;
                *last = Some(reason);
            }
            None => {
                if last.take().is_some() {
                    log::info!("Alert tick recovered");
                }
            }
        }
    }

    async fn report_failure(&self, reason: &str) {
        if let Some(destination) = self.store.notification_destination().await {
            let text = format!("WARNING: alert cycle failed: {}", reason);
            if let Err(e) = self.notifier.deliver(destination, &text).await {
                log::warn!("Failed to report tick failure: {}", e);
            }
        }
    }

    /// Deliver a timestamped test message to the registered destination
    pub async fn send_test_alert(&self) -> Result<()> {
        let destination = self
            .store
            .notification_destination()
            .await
            .ok_or(AppError::NoDestination)?;
        let text = format!(
            "TEST: alert delivery works ({})",
            chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
        );
        self.notifier.deliver(destination, &text).await?;
        Ok(())
    }
}

/// Sleep between ticks, kept within 10-3600 seconds
pub fn sleep_interval(interval: PollInterval) -> Duration {
    let secs = interval
        .get()
        .clamp(PollInterval::MIN, PollInterval::MAX);
    Duration::from_secs(u64::from(secs))
}

/// Running alert loop
pub struct AlertEngineHandle {
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

impl AlertEngineHandle {
    /// Request cancellation and wait for the loop to finish
    pub async fn shutdown(self) {
        self.cancel.cancel();
        if let Err(e) = self.task.await {
            log::error!("Alert engine task failed: {}", e);
        }
    }

    /// Token that stops the loop when cancelled
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }
}

/// Start the alert loop on the runtime
pub fn spawn_alert_engine(engine: Arc<AlertEngine>) -> AlertEngineHandle {
    let cancel = CancellationToken::new();
    let token = cancel.clone();
    let task = tokio::spawn(async move { engine.run(token).await });
    AlertEngineHandle { cancel, task }
}
