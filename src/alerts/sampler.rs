//! Host metric sampling
//!
//! [`MetricsSampler`] is the seam between the alert engine and the OS so the
//! engine can be driven by scripted readings in tests.

use crate::domain::Metric;
use crate::error::{AppError, Result};
use async_trait::async_trait;
use nix::sys::statvfs::statvfs;
use serde::Serialize;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Instant;
use sysinfo::{CpuRefreshKind, MemoryRefreshKind, RefreshKind, System};

/// Mount point whose usage is reported as disk usage
pub const ROOT_MOUNT: &str = "/";

/// One sample of host usage
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct HostUsage {
    /// Global CPU utilisation in percent
    pub cpu_percent: f64,
    /// Used physical memory in percent
    pub ram_percent: f64,
    /// Used space on `/` in percent
    pub disk_percent: f64,
    pub memory_used_bytes: u64,
    pub memory_total_bytes: u64,
    pub disk_used_bytes: u64,
    pub disk_total_bytes: u64,
    pub uptime_secs: u64,
}

impl HostUsage {
    /// Percentage for one metric
    pub fn percent(&self, metric: Metric) -> f64 {
        match metric {
            Metric::Cpu => self.cpu_percent,
            Metric::Ram => self.ram_percent,
            Metric::Disk => self.disk_percent,
        }
    }
}

/// Source of host usage samples
#[async_trait]
pub trait MetricsSampler: Send + Sync {
    /// Take a sample; CPU usage covers the time since the previous call
    async fn sample(&self) -> Result<HostUsage>;

    /// Measure every alerting metric on its own
    ///
    /// An error covers only the metric it is paired with. The default derives
    /// all values from one [`sample`](Self::sample).
    async fn sample_metrics(&self) -> Vec<(Metric, Result<f64>)> {
        match self.sample().await {
            Ok(usage) => Metric::ALL
                .iter()
                .map(|metric| (*metric, Ok(usage.percent(*metric))))
                .collect(),
            Err(e) => {
                let reason = e.to_string();
                Metric::ALL
                    .iter()
                    .map(|metric| (*metric, Err(sampling_error(*metric, &reason))))
                    .collect()
            }
        }
    }
}

fn sampling_error(metric: Metric, reason: &dyn std::fmt::Display) -> AppError {
    AppError::Sampling {
        metric,
        reason: reason.to_string(),
    }
}

/// Space on one filesystem, computed the way `df` does
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DiskUsage {
    pub used_bytes: u64,
    pub total_bytes: u64,
    /// Used share of the space available to unprivileged users
    pub percent: f64,
}

/// Usage of the filesystem holding `path`
pub fn disk_usage(path: &Path) -> io::Result<DiskUsage> {
    let stat = statvfs(path)?;
    let fragment = u64::from(stat.fragment_size());
    let total = u64::from(stat.blocks()) * fragment;
    let free = u64::from(stat.blocks_free()) * fragment;
    let available = u64::from(stat.blocks_available()) * fragment;
    let used = total.saturating_sub(free);
    Ok(DiskUsage {
        used_bytes: used,
        total_bytes: total,
        percent: percent_of(used, used + available),
    })
}

struct CpuMemory {
    cpu_percent: f64,
    memory_used: u64,
    memory_total: u64,
}

/// Readings from one blocking pass; each part fails on its own
struct RawSample {
    cpu_memory: io::Result<CpuMemory>,
    disk: io::Result<DiskUsage>,
}

/// Sampler backed by `sysinfo` for CPU and memory and `statvfs` for disk
pub struct SysinfoSampler {
    system: Arc<Mutex<System>>,
    disk_path: PathBuf,
    primed_at: Instant,
}

impl SysinfoSampler {
    /// Create a sampler and take the CPU baseline
    pub fn new() -> Self {
        let refresh_kind = RefreshKind::nothing()
            .with_cpu(CpuRefreshKind::nothing().with_cpu_usage())
            .with_memory(MemoryRefreshKind::nothing().with_ram());
        let mut system = System::new_with_specifics(refresh_kind);
        system.refresh_cpu_usage();

        Self {
            system: Arc::new(Mutex::new(system)),
            disk_path: PathBuf::from(ROOT_MOUNT),
            primed_at: Instant::now(),
        }
    }

    async fn read(&self) -> RawSample {
        // The first reading needs a full update interval after the baseline
        let elapsed = self.primed_at.elapsed();
        if elapsed < sysinfo::MINIMUM_CPU_UPDATE_INTERVAL {
            tokio::time::sleep(sysinfo::MINIMUM_CPU_UPDATE_INTERVAL - elapsed).await;
        }

        let system = Arc::clone(&self.system);
        let disk_path = self.disk_path.clone();
        tokio::task::spawn_blocking(move || RawSample {
            cpu_memory: read_cpu_memory(&system),
            disk: disk_usage(&disk_path),
        })
        .await
        .unwrap_or_else(|e| RawSample {
            cpu_memory: Err(io::Error::other(e.to_string())),
            disk: Err(io::Error::other(e.to_string())),
        })
    }
}

fn read_cpu_memory(system: &Mutex<System>) -> io::Result<CpuMemory> {
    let mut system = system
        .lock()
        .map_err(|_| io::Error::other("sampler lock poisoned"))?;
    system.refresh_cpu_usage();
    system.refresh_memory();
    Ok(CpuMemory {
        cpu_percent: f64::from(system.global_cpu_usage()),
        memory_used: system.used_memory(),
        memory_total: system.total_memory(),
    })
}

impl Default for SysinfoSampler {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MetricsSampler for SysinfoSampler {
    async fn sample(&self) -> Result<HostUsage> {
        let raw = self.read().await;
        let cpu_memory = raw.cpu_memory?;
        let disk = raw.disk?;

        Ok(HostUsage {
            cpu_percent: cpu_memory.cpu_percent,
            ram_percent: percent_of(cpu_memory.memory_used, cpu_memory.memory_total),
            disk_percent: disk.percent,
            memory_used_bytes: cpu_memory.memory_used,
            memory_total_bytes: cpu_memory.memory_total,
            disk_used_bytes: disk.used_bytes,
            disk_total_bytes: disk.total_bytes,
            uptime_secs: System::uptime(),
        })
    }

    async fn sample_metrics(&self) -> Vec<(Metric, Result<f64>)> {
        let raw = self.read().await;
        let (cpu, ram) = match &raw.cpu_memory {
            Ok(reading) => (
                Ok(reading.cpu_percent),
                Ok(percent_of(reading.memory_used, reading.memory_total)),
            ),
            Err(e) => (
                Err(sampling_error(Metric::Cpu, e)),
                Err(sampling_error(Metric::Ram, e)),
            ),
        };
        let disk = raw
            .disk
            .map(|usage| usage.percent)
            .map_err(|e| sampling_error(Metric::Disk, &e));

        vec![(Metric::Cpu, cpu), (Metric::Ram, ram), (Metric::Disk, disk)]
    }
}

fn percent_of(used: u64, total: u64) -> f64 {
    if total == 0 {
        0.0
    } else {
        used as f64 / total as f64 * 100.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_percent_of() {
        assert_eq!(percent_of(0, 0), 0.0);
        assert_eq!(percent_of(50, 200), 25.0);
    }

    #[test]
    fn test_usage_by_metric() {
        let usage = HostUsage {
            cpu_percent: 12.5,
            ram_percent: 40.0,
            disk_percent: 71.0,
            ..HostUsage::default()
        };
        assert_eq!(usage.percent(Metric::Cpu), 12.5);
        assert_eq!(usage.percent(Metric::Ram), 40.0);
        assert_eq!(usage.percent(Metric::Disk), 71.0);
    }

    #[test]
    fn test_root_disk_usage() {
        let usage = disk_usage(Path::new(ROOT_MOUNT)).unwrap();
        assert!(usage.total_bytes > 0);
        assert!(usage.used_bytes <= usage.total_bytes);
        assert!((0.0..=100.0).contains(&usage.percent));
    }

    #[test]
    fn test_disk_usage_missing_path() {
        assert!(disk_usage(Path::new("/nonexistent/hostwarden")).is_err());
    }

    #[tokio::test]
    async fn test_sysinfo_sample_in_range() {
        let sampler = SysinfoSampler::new();
        let usage = sampler.sample().await.unwrap();
        assert!((0.0..=100.0).contains(&usage.ram_percent));
        assert!((0.0..=100.0).contains(&usage.disk_percent));
        assert!(usage.memory_total_bytes > 0);

        let metrics = sampler.sample_metrics().await;
        assert_eq!(metrics.len(), 3);
        assert!(metrics.iter().all(|(_, value)| value.is_ok()));
    }
}
