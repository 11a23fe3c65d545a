//! Form-encoded wire body sent to the collector.
//!
//! Fields are always emitted in the same order. `cpu_percent` carries two
//! decimals, memory and swap figures one.

use crate::errors::WireError;
use crate::snapshot::Snapshot;
use std::collections::HashMap;
use std::str::FromStr;

pub const FIELDS: [&str; 22] = [
    "machine_id",
    "name",
    "system",
    "location",
    "ip_address",
    "uptime",
    "cpu_percent",
    "net_tx",
    "net_rx",
    "total_tx",
    "total_rx",
    "disks_total_kb",
    "disks_avail_kb",
    "cpu_num_cores",
    "mem_total",
    "mem_free",
    "mem_used",
    "swap_total",
    "swap_free",
    "process_count",
    "connection_count",
    "cpu_model",
];

/// Snapshot as ordered `(field, text)` pairs.
pub fn to_pairs(s: &Snapshot) -> Vec<(&'static str, String)> {
    vec![
        ("machine_id", s.machine_id.clone()),
        ("name", s.name.clone()),
        ("system", s.system.clone()),
        ("location", s.location.clone()),
        ("ip_address", s.ip_address.clone()),
        ("uptime", s.uptime.to_string()),
        ("cpu_percent", format!("{:.2}", s.cpu_percent)),
        ("net_tx", s.net_tx.to_string()),
        ("net_rx", s.net_rx.to_string()),
        ("total_tx", s.total_tx.to_string()),
        ("total_rx", s.total_rx.to_string()),
        ("disks_total_kb", s.disks_total_kb.to_string()),
        ("disks_avail_kb", s.disks_avail_kb.to_string()),
        ("cpu_num_cores", s.cpu_num_cores.to_string()),
        ("mem_total", format!("{:.1}", s.mem_total)),
        ("mem_free", format!("{:.1}", s.mem_free)),
        ("mem_used", format!("{:.1}", s.mem_used)),
        ("swap_total", format!("{:.1}", s.swap_total)),
        ("swap_free", format!("{:.1}", s.swap_free)),
        ("process_count", s.process_count.to_string()),
        ("connection_count", s.connection_count.to_string()),
        ("cpu_model", s.cpu_model.clone()),
    ]
}

pub fn encode(snapshot: &Snapshot) -> Result<String, WireError> {
    Ok(serde_urlencoded::to_string(to_pairs(snapshot))?)
}

pub fn decode(body: &str) -> Result<Snapshot, WireError> {
    let pairs: Vec<(String, String)> = serde_urlencoded::from_str(body)?;
    let fields: HashMap<String, String> = pairs.into_iter().collect();

    let text = |field: &'static str| -> Result<String, WireError> {
        fields.get(field).cloned().ok_or(WireError::MissingField(field))
    };
    fn number<T: FromStr>(
        fields: &HashMap<String, String>,
        field: &'static str,
    ) -> Result<T, WireError> {
        let raw = fields.get(field).ok_or(WireError::MissingField(field))?;
        raw.parse().map_err(|_| WireError::InvalidNumber {
            field,
            raw: raw.clone(),
        })
    }

    Ok(Snapshot {
        machine_id: text("machine_id")?,
        name: text("name")?,
        system: text("system")?,
        location: text("location")?,
        ip_address: text("ip_address")?,
        uptime: number(&fields, "uptime")?,
        cpu_percent: number(&fields, "cpu_percent")?,
        net_tx: number(&fields, "net_tx")?,
        net_rx: number(&fields, "net_rx")?,
        total_tx: number(&fields, "total_tx")?,
        total_rx: number(&fields, "total_rx")?,
        disks_total_kb: number(&fields, "disks_total_kb")?,
        disks_avail_kb: number(&fields, "disks_avail_kb")?,
        cpu_num_cores: number(&fields, "cpu_num_cores")?,
        mem_total: number(&fields, "mem_total")?,
        mem_free: number(&fields, "mem_free")?,
        mem_used: number(&fields, "mem_used")?,
        swap_total: number(&fields, "swap_total")?,
        swap_free: number(&fields, "swap_free")?,
        process_count: number(&fields, "process_count")?,
        connection_count: number(&fields, "connection_count")?,
        cpu_model: text("cpu_model")?,
    })
}
