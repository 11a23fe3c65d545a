use super::identity::{resolve_machine_id, MachineId};
use super::{
    cpu, disk, memory, network, or_default, or_unavailable, system, CounterSource, HostPaths,
    NetCounters, PointFacts, PointSampler, RawCounterSample,
};
use async_trait::async_trait;
use chrono::Utc;

/// Cumulative network and CPU counters read from /proc.
pub struct ProcCounterSource {
    paths: HostPaths,
}

impl ProcCounterSource {
    pub fn new(paths: HostPaths) -> Self {
        Self { paths }
    }
}

#[async_trait]
impl CounterSource for ProcCounterSource {
    async fn sample(&self) -> RawCounterSample {
        let timestamp = Utc::now();
        let net = or_unavailable("net_traffic", network::read_traffic(&self.paths).await)
            .map(|(tx_bytes, rx_bytes)| NetCounters { tx_bytes, rx_bytes });
        let cpu = or_unavailable("cpu_ticks", cpu::read_ticks(&self.paths).await);

        RawCounterSample {
            timestamp,
            net,
            cpu,
        }
    }
}

/// Point-in-time host facts read from /proc, /etc and a couple of syscalls.
pub struct ProcPointSampler {
    paths: HostPaths,
    machine_id: MachineId,
}

impl ProcPointSampler {
    /// Resolves the machine id up front; it is held unchanged for the sampler's lifetime.
    pub async fn new(paths: HostPaths) -> Self {
        let machine_id = resolve_machine_id(&paths).await;
        Self { paths, machine_id }
    }

    pub fn machine_id(&self) -> &MachineId {
        &self.machine_id
    }
}

#[async_trait]
impl PointSampler for ProcPointSampler {
    async fn sample(&self) -> PointFacts {
        let paths = &self.paths;
        let mem = or_default("memory", memory::read_memory(paths).await);
        let (disks_total_kb, disks_avail_kb) = or_default("disks", disk::read_disks(paths).await);

        let ip_address = match network::primary_ipv4().await {
            Ok(Some(addr)) => addr.to_string(),
            Ok(None) => "unknown".to_string(),
            Err(e) => {
                tracing::debug!(field = "ip_address", error = %e, "source unavailable, using default");
                "unknown".to_string()
            }
        };

        let os_name = system::read_os_name(paths)
            .await
            .unwrap_or_else(|_| "Unknown".to_string());

        PointFacts {
            mem_total: mem.mem_total,
            mem_free: mem.mem_free,
            mem_used: mem.mem_used,
            swap_total: mem.swap_total,
            swap_free: mem.swap_free,
            disks_total_kb,
            disks_avail_kb,
            process_count: or_default("process_count", system::read_process_count(paths).await),
            connection_count: or_default(
                "connection_count",
                system::read_connection_count(paths).await,
            ),
            uptime_secs: or_default("uptime", system::read_uptime(paths).await),
            cpu_num_cores: or_default("cpu_num_cores", cpu::read_core_count(paths).await),
            machine_id: self.machine_id.value.clone(),
            ip_address,
            cpu_model: or_default("cpu_model", cpu::read_cpu_model(paths).await),
            system: os_name,
        }
    }
}
