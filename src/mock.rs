//! Mock implementations for testing
//!
//! Scripted command runner, metric sampler and notifier so the engine,
//! firewall and operator actions can be tested without touching the host.

use crate::alerts::{HostUsage, MetricsSampler, Notifier};
use crate::domain::{Metric, OperatorId};
use crate::error::{AppError, NotifyError, Result};
use crate::exec::{CommandRunner, CommandSpec, ExecResult};

use async_trait::async_trait;
use std::collections::HashMap;
use std::io;
use std::sync::Mutex;
use std::time::Duration;

#[derive(Debug, Clone)]
struct Scripted {
    exit_code: i32,
    stdout: String,
    stderr: String,
    timed_out: bool,
    delay: Duration,
}

/// Command runner answering from a script keyed by command text
///
/// Unscripted commands succeed with empty output.
#[derive(Debug, Default)]
pub struct MockRunner {
    script: Mutex<HashMap<String, Scripted>>,
    calls: Mutex<Vec<(String, Duration)>>,
}

impl MockRunner {
    /// Create a runner where every command succeeds silently
    pub fn new() -> Self {
        Self::default()
    }

    /// Script the result of a command
    pub fn respond(&self, command: &str, exit_code: i32, stdout: &str, stderr: &str) {
        self.script.lock().unwrap().insert(
            command.to_string(),
            Scripted {
                exit_code,
                stdout: stdout.to_string(),
                stderr: stderr.to_string(),
                timed_out: false,
                delay: Duration::ZERO,
            },
        );
    }

    /// Script a command that runs into its timeout
    pub fn respond_timeout(&self, command: &str) {
        self.script.lock().unwrap().insert(
            command.to_string(),
            Scripted {
                exit_code: -9,
                stdout: String::new(),
                stderr: String::new(),
                timed_out: true,
                delay: Duration::ZERO,
            },
        );
    }

    /// Make a command take `delay` before answering
    pub fn delay(&self, command: &str, delay: Duration) {
        let mut script = self.script.lock().unwrap();
        let entry = script.entry(command.to_string()).or_insert(Scripted {
            exit_code: 0,
            stdout: String::new(),
            stderr: String::new(),
            timed_out: false,
            delay: Duration::ZERO,
        });
        entry.delay = delay;
    }

    /// Commands run so far with their timeouts, in start order
    pub fn calls(&self) -> Vec<(String, Duration)> {
        self.calls.lock().unwrap().clone()
    }

    /// Command texts run so far, in start order
    pub fn commands(&self) -> Vec<String> {
        self.calls().into_iter().map(|(command, _)| command).collect()
    }
}

#[async_trait]
impl CommandRunner for MockRunner {
    async fn execute(&self, spec: &CommandSpec, timeout: Duration) -> ExecResult {
        let command = spec.display();
        self.calls.lock().unwrap().push((command.clone(), timeout));

        let scripted = self.script.lock().unwrap().get(&command).cloned();
        let scripted = scripted.unwrap_or(Scripted {
            exit_code: 0,
            stdout: String::new(),
            stderr: String::new(),
            timed_out: false,
            delay: Duration::ZERO,
        });
        if !scripted.delay.is_zero() {
            tokio::time::sleep(scripted.delay).await;
        }

        ExecResult {
            command,
            exit_code: scripted.exit_code,
            stdout: scripted.stdout,
            stderr: scripted.stderr,
            duration: if scripted.timed_out { timeout } else { scripted.delay },
            timed_out: scripted.timed_out,
        }
    }
}

/// Sampler returning settable readings
#[derive(Debug, Default)]
pub struct MockSampler {
    usage: Mutex<HostUsage>,
    failing: Mutex<bool>,
    broken_metrics: Mutex<Vec<Metric>>,
}

impl MockSampler {
    /// Create a sampler with fixed CPU, RAM and disk percentages
    pub fn new(cpu: f64, ram: f64, disk: f64) -> Self {
        Self {
            usage: Mutex::new(HostUsage {
                cpu_percent: cpu,
                ram_percent: ram,
                disk_percent: disk,
                memory_total_bytes: 8 << 30,
                memory_used_bytes: 2 << 30,
                disk_total_bytes: 100 << 30,
                disk_used_bytes: 30 << 30,
                uptime_secs: 3_600,
            }),
            failing: Mutex::new(false),
            broken_metrics: Mutex::new(Vec::new()),
        }
    }

    pub fn set_cpu(&self, value: f64) {
        self.usage.lock().unwrap().cpu_percent = value;
    }

    pub fn set_ram(&self, value: f64) {
        self.usage.lock().unwrap().ram_percent = value;
    }

    pub fn set_disk(&self, value: f64) {
        self.usage.lock().unwrap().disk_percent = value;
    }

    /// Make every sample fail
    pub fn fail(&self, failing: bool) {
        *self.failing.lock().unwrap() = failing;
    }

    /// Make one metric unmeasurable while the others keep working
    pub fn break_metric(&self, metric: Metric) {
        self.broken_metrics.lock().unwrap().push(metric);
    }
}

#[async_trait]
impl MetricsSampler for MockSampler {
    async fn sample(&self) -> Result<HostUsage> {
        if *self.failing.lock().unwrap() {
            return Err(io::Error::other("sensor unavailable").into());
        }
        Ok(self.usage.lock().unwrap().clone())
    }

    async fn sample_metrics(&self) -> Vec<(Metric, Result<f64>)> {
        let failing = *self.failing.lock().unwrap();
        let broken = self.broken_metrics.lock().unwrap().clone();
        let usage = self.usage.lock().unwrap().clone();
        Metric::ALL
            .iter()
            .map(|metric| {
                let outcome = if failing || broken.contains(metric) {
                    Err(AppError::Sampling {
                        metric: *metric,
                        reason: "sensor unavailable".to_string(),
                    })
                } else {
                    Ok(usage.percent(*metric))
                };
                (*metric, outcome)
            })
            .collect()
    }
}

/// Notifier recording every delivery attempt
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    sent: Mutex<Vec<(OperatorId, String)>>,
    failures_left: Mutex<usize>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reject the next `count` deliveries (they are still recorded)
    pub fn fail_next(&self, count: usize) {
        *self.failures_left.lock().unwrap() = count;
    }

    /// Every delivery attempt as (destination, text)
    pub fn messages(&self) -> Vec<(OperatorId, String)> {
        self.sent.lock().unwrap().clone()
    }

    /// Texts of every delivery attempt
    pub fn texts(&self) -> Vec<String> {
        self.messages().into_iter().map(|(_, text)| text).collect()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn deliver(&self, destination: OperatorId, text: &str) -> std::result::Result<(), NotifyError> {
        self.sent.lock().unwrap().push((destination, text.to_string()));
        let mut failures = self.failures_left.lock().unwrap();
        if *failures > 0 {
            *failures -= 1;
            return Err(NotifyError::Rejected {
                channel: "recording".to_string(),
                reason: "scripted failure".to_string(),
            });
        }
        Ok(())
    }

    fn name(&self) -> &str {
        "recording"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_runner_script() {
        let runner = MockRunner::new();
        runner.respond("uptime", 0, "up 3 days", "");

        let hit = runner.run_argv(&["uptime"], Duration::from_secs(1)).await;
        assert_eq!(hit.stdout, "up 3 days");
        let miss = runner.run_shell("true", Duration::from_secs(2)).await;
        assert!(miss.success());
        assert_eq!(runner.commands(), vec!["uptime", "true"]);
    }

    #[tokio::test]
    async fn test_recording_notifier_failures() {
        let notifier = RecordingNotifier::new();
        notifier.fail_next(1);
        assert!(notifier.deliver(1, "a").await.is_err());
        assert!(notifier.deliver(1, "b").await.is_ok());
        assert_eq!(notifier.texts(), vec!["a", "b"]);
    }
}
