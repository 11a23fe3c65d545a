use super::{read_source, CpuTicks, HostPaths};
use crate::errors::CollectorError;

/// Parse the aggregate CPU line from /proc/stat.
pub fn parse_cpu_line(line: &str) -> Result<CpuTicks, CollectorError> {
    let parts: Vec<&str> = line.split_whitespace().collect();
    if parts.len() < 9 || parts[0] != "cpu" {
        return Err(CollectorError::ParseError {
            path: "/proc/stat".into(),
            field: "cpu".into(),
            raw: line.to_string(),
        });
    }

    let parse = |idx: usize, field: &str| -> Result<u64, CollectorError> {
        parts[idx]
            .parse::<u64>()
            .map_err(|_| CollectorError::ParseError {
                path: "/proc/stat".into(),
                field: field.into(),
                raw: parts[idx].to_string(),
            })
    };

    Ok(CpuTicks {
        user: parse(1, "user")?,
        nice: parse(2, "nice")?,
        system: parse(3, "system")?,
        idle: parse(4, "idle")?,
        iowait: parse(5, "iowait")?,
        irq: parse(6, "irq")?,
        softirq: parse(7, "softirq")?,
        steal: parse(8, "steal")?,
    })
}

/// Count CPU cores from /proc/stat (lines starting with "cpu" followed by a digit).
pub fn count_cores(stat_content: &str) -> u32 {
    stat_content
        .lines()
        .filter(|line| {
            line.starts_with("cpu") && line.chars().nth(3).map_or(false, |c| c.is_ascii_digit())
        })
        .count() as u32
}

/// First "model name" entry of /proc/cpuinfo.
pub fn parse_cpu_model(cpuinfo: &str) -> Option<String> {
    cpuinfo
        .lines()
        .filter(|line| line.starts_with("model name"))
        .find_map(|line| {
            let (_, model) = line.split_once(':')?;
            let model = model.trim();
            (!model.is_empty()).then(|| model.to_string())
        })
}

pub async fn read_ticks(paths: &HostPaths) -> Result<CpuTicks, CollectorError> {
    let path = paths.proc("stat");
    let content = read_source(&path).await?;
    let cpu_line = content
        .lines()
        .next()
        .ok_or_else(|| CollectorError::ParseError {
            path: path.display().to_string(),
            field: "cpu_line".into(),
            raw: "empty file".into(),
        })?;
    parse_cpu_line(cpu_line)
}

pub async fn read_core_count(paths: &HostPaths) -> Result<u32, CollectorError> {
    let content = read_source(&paths.proc("stat")).await?;
    match count_cores(&content) {
        0 => Ok(std::thread::available_parallelism()
            .map(|n| n.get() as u32)
            .unwrap_or(0)),
        n => Ok(n),
    }
}

pub async fn read_cpu_model(paths: &HostPaths) -> Result<String, CollectorError> {
    let path = paths.proc("cpuinfo");
    let content = read_source(&path).await?;
    parse_cpu_model(&content).ok_or_else(|| CollectorError::ParseError {
        path: path.display().to_string(),
        field: "model name".into(),
        raw: "field not found".into(),
    })
}
