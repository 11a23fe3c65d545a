pub mod cpu;
pub mod disk;
pub mod host;
pub mod identity;
pub mod memory;
pub mod network;
pub mod system;

use crate::errors::CollectorError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::PathBuf;

/// Source of cumulative, ever-increasing host counters.
#[async_trait]
pub trait CounterSource: Send + Sync {
    /// Read the counters now. Unreadable counters come back as zero.
    async fn sample(&self) -> RawCounterSample;
}

/// Source of instantaneous, non-cumulative host facts.
#[async_trait]
pub trait PointSampler: Send + Sync {
    /// Read every fact independently; a failing source only zeroes its own field.
    async fn sample(&self) -> PointFacts;
}

/// Raw CPU tick counts from the aggregate line of /proc/stat.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CpuTicks {
    pub user: u64,
    pub nice: u64,
    pub system: u64,
    pub idle: u64,
    pub iowait: u64,
    pub irq: u64,
    pub softirq: u64,
    pub steal: u64,
}

impl CpuTicks {
    pub fn total(&self) -> u64 {
        [
            self.user,
            self.nice,
            self.system,
            self.idle,
            self.iowait,
            self.irq,
            self.softirq,
            self.steal,
        ]
        .into_iter()
        .fold(0u64, u64::saturating_add)
    }

    /// Ticks spent doing nothing useful: idle plus waiting on I/O.
    pub fn idle_total(&self) -> u64 {
        self.idle.saturating_add(self.iowait)
    }
}

/// Cumulative bytes over the counted interfaces.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct NetCounters {
    pub tx_bytes: u64,
    pub rx_bytes: u64,
}

/// One reading of the cumulative counters, kept only until the next cycle.
///
/// A group is `None` when its source could not be read this cycle. That is not
/// the same as a zero reading and must never become a rate baseline.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RawCounterSample {
    pub timestamp: DateTime<Utc>,
    pub net: Option<NetCounters>,
    pub cpu: Option<CpuTicks>,
}

impl RawCounterSample {
    pub fn new(timestamp: DateTime<Utc>, tx_bytes: u64, rx_bytes: u64, cpu: CpuTicks) -> Self {
        Self {
            timestamp,
            net: Some(NetCounters { tx_bytes, rx_bytes }),
            cpu: Some(cpu),
        }
    }

    /// Neither group could be read.
    pub fn unavailable(timestamp: DateTime<Utc>) -> Self {
        Self {
            timestamp,
            net: None,
            cpu: None,
        }
    }

    /// Cumulative (tx, rx) totals, zero when the network group is missing.
    pub fn totals(&self) -> (u64, u64) {
        self.net
            .map(|n| (n.tx_bytes, n.rx_bytes))
            .unwrap_or((0, 0))
    }
}

/// Per-cycle host facts that need no history. Memory and swap are in MiB.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PointFacts {
    pub mem_total: f64,
    pub mem_free: f64,
    pub mem_used: f64,
    pub swap_total: f64,
    pub swap_free: f64,
    pub disks_total_kb: u64,
    pub disks_avail_kb: u64,
    pub process_count: u32,
    pub connection_count: u32,
    pub uptime_secs: u64,
    pub cpu_num_cores: u32,
    pub machine_id: String,
    pub ip_address: String,
    pub cpu_model: String,
    pub system: String,
}

/// Filesystem locations the samplers read from. Tests point these at a temp tree.
#[derive(Debug, Clone)]
pub struct HostPaths {
    pub proc_root: PathBuf,
    pub os_release: PathBuf,
    pub machine_id: Vec<PathBuf>,
}

impl Default for HostPaths {
    fn default() -> Self {
        Self {
            proc_root: PathBuf::from("/proc"),
            os_release: PathBuf::from("/etc/os-release"),
            machine_id: vec![
                PathBuf::from("/etc/machine-id"),
                PathBuf::from("/var/lib/dbus/machine-id"),
            ],
        }
    }
}

impl HostPaths {
    /// Paths rooted at `root`, laid out like a real host (`root/proc`, `root/etc/...`).
    pub fn rooted_at(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        Self {
            proc_root: root.join("proc"),
            os_release: root.join("etc/os-release"),
            machine_id: vec![
                root.join("etc/machine-id"),
                root.join("var/lib/dbus/machine-id"),
            ],
        }
    }

    pub fn proc(&self, rel: &str) -> PathBuf {
        self.proc_root.join(rel)
    }
}

/// Read a whole file, mapping the io error into a collector error naming the path.
pub(crate) async fn read_source(path: &std::path::Path) -> Result<String, CollectorError> {
    tokio::fs::read_to_string(path)
        .await
        .map_err(|e| CollectorError::ProcReadError {
            path: path.display().to_string(),
            source: e,
        })
}

/// Collapse a failed field read into its default, keeping the reason at debug level.
pub(crate) fn or_default<T: Default>(field: &'static str, result: Result<T, CollectorError>) -> T {
    match result {
        Ok(value) => value,
        Err(e) => {
            tracing::debug!(field, error = %e, "source unavailable, using default");
            T::default()
        }
    }
}

/// Like [`or_default`], but keeps the failure visible as `None`.
pub(crate) fn or_unavailable<T>(
    group: &'static str,
    result: Result<T, CollectorError>,
) -> Option<T> {
    match result {
        Ok(value) => Some(value),
        Err(e) => {
            tracing::debug!(group, error = %e, "counter group unavailable this cycle");
            None
        }
    }
}
