// Shared test helpers
#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use host_telemetry_agent::collectors::{
    CounterSource, CpuTicks, PointFacts, PointSampler, RawCounterSample,
};
use host_telemetry_agent::errors::TransportError;
use host_telemetry_agent::reporter::Transport;
use host_telemetry_agent::snapshot::Identity;
use std::collections::VecDeque;
use std::path::Path;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

pub fn at(secs: i64) -> DateTime<Utc> {
    DateTime::from_timestamp(1_700_000_000 + secs, 0).unwrap()
}

pub fn counters(secs: i64, tx: u64, rx: u64, cpu: CpuTicks) -> RawCounterSample {
    RawCounterSample::new(at(secs), tx, rx, cpu)
}

pub fn identity() -> Identity {
    Identity {
        name: "edge-01".into(),
        location: "Frankfurt".into(),
    }
}

/// Replays a fixed list of counter samples, then repeats the last one.
pub struct ScriptedCounters {
    samples: Mutex<VecDeque<RawCounterSample>>,
    last: Mutex<Option<RawCounterSample>>,
}

impl ScriptedCounters {
    pub fn new(samples: Vec<RawCounterSample>) -> Self {
        Self {
            samples: Mutex::new(samples.into()),
            last: Mutex::new(None),
        }
    }
}

#[async_trait]
impl CounterSource for ScriptedCounters {
    async fn sample(&self) -> RawCounterSample {
        let next = self.samples.lock().unwrap().pop_front();
        let mut last = self.last.lock().unwrap();
        match next {
            Some(sample) => {
                *last = Some(sample.clone());
                sample
            }
            None => last.clone().unwrap_or_else(|| RawCounterSample::unavailable(at(0))),
        }
    }
}

/// Always returns the same facts.
pub struct FixedFacts(pub PointFacts);

#[async_trait]
impl PointSampler for FixedFacts {
    async fn sample(&self) -> PointFacts {
        self.0.clone()
    }
}

pub fn sample_facts() -> PointFacts {
    PointFacts {
        mem_total: 16000.0,
        mem_free: 2000.0,
        mem_used: 12000.0,
        swap_total: 8000.0,
        swap_free: 4000.0,
        disks_total_kb: 102400000,
        disks_avail_kb: 51200000,
        process_count: 312,
        connection_count: 47,
        uptime_secs: 35142,
        cpu_num_cores: 8,
        machine_id: "4c4c4544004d3510804cb4c04f383432".into(),
        ip_address: "10.0.0.5".into(),
        cpu_model: "Intel(R) Xeon(R) CPU E5-2680 v4 @ 2.40GHz".into(),
        system: "Ubuntu 22.04.4 LTS".into(),
    }
}

/// Transport that fails a scripted number of times before succeeding.
/// Call counts and bodies stay readable after the transport is boxed.
#[derive(Clone)]
pub struct ScriptedTransport {
    failures_left: Arc<AtomicU32>,
    calls: Arc<AtomicU32>,
    bodies: Arc<Mutex<Vec<String>>>,
}

impl ScriptedTransport {
    pub fn failing(times: u32) -> Self {
        Self {
            failures_left: Arc::new(AtomicU32::new(times)),
            calls: Arc::new(AtomicU32::new(0)),
            bodies: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn always_failing() -> Self {
        Self::failing(u32::MAX)
    }

    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn bodies(&self) -> Vec<String> {
        self.bodies.lock().unwrap().clone()
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn deliver(&self, body: &str) -> Result<(), TransportError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.bodies.lock().unwrap().push(body.to_string());
        let left = self.failures_left.load(Ordering::SeqCst);
        if left > 0 {
            self.failures_left.store(left - 1, Ordering::SeqCst);
            return Err(TransportError::Unavailable("connection refused".into()));
        }
        Ok(())
    }
}

/// In-memory log sink for asserting on emitted entries.
#[derive(Clone, Default)]
pub struct LogCapture(Arc<Mutex<Vec<u8>>>);

impl std::io::Write for LogCapture {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

impl LogCapture {
    pub fn lines(&self) -> Vec<String> {
        String::from_utf8_lossy(&self.0.lock().unwrap())
            .lines()
            .map(str::to_string)
            .collect()
    }

    /// Lines logged at `level` ("INFO", "WARN", "ERROR").
    pub fn at_level(&self, level: &str) -> Vec<String> {
        self.lines()
            .into_iter()
            .filter(|line| line.trim_start().starts_with(level))
            .collect()
    }
}

/// Route tracing output on the current thread into a [`LogCapture`].
pub fn capture_logs() -> (LogCapture, tracing::subscriber::DefaultGuard) {
    let capture = LogCapture::default();
    let writer = capture.clone();
    let subscriber = tracing_subscriber::fmt()
        .with_writer(move || writer.clone())
        .with_ansi(false)
        .without_time()
        .with_max_level(tracing::Level::INFO)
        .finish();
    (capture, tracing::subscriber::set_default(subscriber))
}

/// Lay out a fake host under `root`: proc files plus /etc entries.
pub fn write_fake_host(root: &Path) {
    let proc = root.join("proc");
    std::fs::create_dir_all(proc.join("net")).unwrap();
    std::fs::create_dir_all(root.join("etc")).unwrap();
    for pid in ["1", "42", "1337"] {
        std::fs::create_dir_all(proc.join(pid)).unwrap();
    }
    std::fs::create_dir_all(proc.join("self")).unwrap();
    std::fs::create_dir_all(proc.join("sys")).unwrap();
    std::fs::write(proc.join("99"), "not a directory").unwrap();

    std::fs::write(
        proc.join("stat"),
        "cpu  100 0 0 900 0 0 0 0 0 0\ncpu0 50 0 0 450 0 0 0 0 0 0\ncpu1 50 0 0 450 0 0 0 0 0 0\n",
    )
    .unwrap();
    std::fs::write(
        proc.join("meminfo"),
        "MemTotal: 2048000 kB\nMemFree: 512000 kB\nMemAvailable: 1024000 kB\nSwapTotal: 1024 kB\nSwapFree: 512 kB\n",
    )
    .unwrap();
    std::fs::write(proc.join("uptime"), "1234.56 4000.00\n").unwrap();
    std::fs::write(
        proc.join("cpuinfo"),
        "processor\t: 0\nmodel name\t: AMD EPYC 7B13\n",
    )
    .unwrap();
    std::fs::write(
        proc.join("net/dev"),
        "Inter-|   Receive\n face |bytes\n    lo: 900 1 0 0 0 0 0 0 900 1 0 0 0 0 0 0\n  eth0: 2000 1 0 0 0 0 0 0 1000 1 0 0 0 0 0 0\n",
    )
    .unwrap();
    std::fs::write(
        proc.join("net/tcp"),
        "  sl  local_address rem_address   st\n   0: 0100007F:0CEA 00000000:0000 0A\n   1: 3500007F:0035 00000000:0000 0A\n",
    )
    .unwrap();
    std::fs::write(
        proc.join("net/tcp6"),
        "  sl  local_address rem_address   st\n   0: 00000000000000000000000000000000:0016 00000000000000000000000000000000:0000 0A\n",
    )
    .unwrap();
    std::fs::write(proc.join("mounts"), "proc /proc proc rw 0 0\n").unwrap();
    std::fs::write(
        root.join("etc/os-release"),
        "NAME=\"Debian GNU/Linux\"\nPRETTY_NAME=\"Debian GNU/Linux 12 (bookworm)\"\n",
    )
    .unwrap();
    std::fs::write(
        root.join("etc/machine-id"),
        "0123456789abcdef0123456789abcdef\n",
    )
    .unwrap();
}
