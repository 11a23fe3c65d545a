use crate::collectors::{CounterSource, PointFacts, PointSampler};
use crate::rate::{RateCalculator, RateMetrics};
use serde::Serialize;

/// Operator-supplied identity, fixed for the process lifetime.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub name: String,
    pub location: String,
}

/// One fully assembled reporting record. Every field always has a value.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Snapshot {
    pub machine_id: String,
    pub name: String,
    pub system: String,
    pub location: String,
    pub ip_address: String,
    pub uptime: u64,
    pub cpu_percent: f64,
    pub net_tx: u64,
    pub net_rx: u64,
    pub total_tx: u64,
    pub total_rx: u64,
    pub disks_total_kb: u64,
    pub disks_avail_kb: u64,
    pub cpu_num_cores: u32,
    pub mem_total: f64,
    pub mem_free: f64,
    pub mem_used: f64,
    pub swap_total: f64,
    pub swap_free: f64,
    pub process_count: u32,
    pub connection_count: u32,
    pub cpu_model: String,
}

impl Snapshot {
    pub fn assemble(
        identity: &Identity,
        facts: PointFacts,
        rates: RateMetrics,
        total_tx: u64,
        total_rx: u64,
    ) -> Self {
        Self {
            machine_id: facts.machine_id,
            name: identity.name.clone(),
            system: facts.system,
            location: identity.location.clone(),
            ip_address: facts.ip_address,
            uptime: facts.uptime_secs,
            cpu_percent: rates.cpu_percent,
            net_tx: rates.tx_bytes_per_sec,
            net_rx: rates.rx_bytes_per_sec,
            total_tx,
            total_rx,
            disks_total_kb: facts.disks_total_kb,
            disks_avail_kb: facts.disks_avail_kb,
            cpu_num_cores: facts.cpu_num_cores,
            mem_total: facts.mem_total,
            mem_free: facts.mem_free,
            mem_used: facts.mem_used,
            swap_total: facts.swap_total,
            swap_free: facts.swap_free,
            process_count: facts.process_count,
            connection_count: facts.connection_count,
            cpu_model: facts.cpu_model,
        }
    }
}

/// Composes counters, rates and point facts into a [`Snapshot`] once per cycle.
///
/// Owns the [`RateCalculator`], so it must be driven by a single cycle at a time;
/// `build` takes `&mut self` for that reason.
pub struct SnapshotBuilder {
    counters: Box<dyn CounterSource>,
    facts: Box<dyn PointSampler>,
    rates: RateCalculator,
    identity: Identity,
}

impl SnapshotBuilder {
    pub fn new(
        counters: Box<dyn CounterSource>,
        facts: Box<dyn PointSampler>,
        identity: Identity,
    ) -> Self {
        Self::with_rates(counters, facts, identity, RateCalculator::new())
    }

    pub fn with_rates(
        counters: Box<dyn CounterSource>,
        facts: Box<dyn PointSampler>,
        identity: Identity,
        rates: RateCalculator,
    ) -> Self {
        Self {
            counters,
            facts,
            rates,
            identity,
        }
    }

    pub async fn build(&mut self) -> Snapshot {
        let sample = self.counters.sample().await;
        let (total_tx, total_rx) = sample.totals();
        let rates = self.rates.update(sample);
        let facts = self.facts.sample().await;

        Snapshot::assemble(&self.identity, facts, rates, total_tx, total_rx)
    }
}
