use super::{read_source, HostPaths};
use crate::errors::CollectorError;
use std::collections::HashMap;

/// Memory and swap figures in MiB, as reported on the wire.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct MemoryFacts {
    pub mem_total: f64,
    pub mem_free: f64,
    pub mem_used: f64,
    pub swap_total: f64,
    pub swap_free: f64,
}

/// Parse /proc/meminfo into a key-value map of kB values.
pub fn parse_meminfo(content: &str) -> HashMap<String, u64> {
    let mut map = HashMap::new();
    for line in content.lines() {
        let parts: Vec<&str> = line.split_whitespace().collect();
        if parts.len() >= 2 {
            let key = parts[0].trim_end_matches(':').to_string();
            if let Ok(val) = parts[1].parse::<u64>() {
                map.insert(key, val);
            }
        }
    }
    map
}

/// Extract a required field from meminfo, converting kB -> MiB.
fn get_mib(map: &HashMap<String, u64>, field: &str) -> Result<f64, CollectorError> {
    map.get(field)
        .map(|kb| *kb as f64 / 1024.0)
        .ok_or_else(|| CollectorError::ParseError {
            path: "/proc/meminfo".into(),
            field: field.into(),
            raw: "field not found".into(),
        })
}

/// Build memory facts from a parsed meminfo map.
///
/// `MemTotal` and `MemFree` are required. Used memory is `MemTotal - MemAvailable`,
/// falling back to `MemTotal - MemFree` on kernels without `MemAvailable`.
/// Swap fields are optional and default to zero.
pub fn memory_facts(map: &HashMap<String, u64>) -> Result<MemoryFacts, CollectorError> {
    let total_kb = *map.get("MemTotal").ok_or_else(|| CollectorError::ParseError {
        path: "/proc/meminfo".into(),
        field: "MemTotal".into(),
        raw: "field not found".into(),
    })?;
    let mem_free = get_mib(map, "MemFree")?;
    let available_kb = map
        .get("MemAvailable")
        .or_else(|| map.get("MemFree"))
        .copied()
        .unwrap_or(0);

    Ok(MemoryFacts {
        mem_total: total_kb as f64 / 1024.0,
        mem_free,
        mem_used: total_kb.saturating_sub(available_kb) as f64 / 1024.0,
        swap_total: get_mib(map, "SwapTotal").unwrap_or(0.0),
        swap_free: get_mib(map, "SwapFree").unwrap_or(0.0),
    })
}

pub async fn read_memory(paths: &HostPaths) -> Result<MemoryFacts, CollectorError> {
    let content = read_source(&paths.proc("meminfo")).await?;
    memory_facts(&parse_meminfo(&content))
}
