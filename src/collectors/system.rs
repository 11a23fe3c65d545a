use super::{read_source, HostPaths};
use crate::errors::CollectorError;

/// Number of running processes: numeric directories directly under the proc root.
pub async fn read_process_count(paths: &HostPaths) -> Result<u32, CollectorError> {
    let map_err = |e| CollectorError::ProcReadError {
        path: paths.proc_root.display().to_string(),
        source: e,
    };
    let mut dir = tokio::fs::read_dir(&paths.proc_root).await.map_err(map_err)?;

    let mut count = 0u32;
    while let Some(entry) = dir.next_entry().await.map_err(map_err)? {
        let is_pid = entry
            .file_name()
            .to_str()
            .map_or(false, |name| name.parse::<u32>().is_ok());
        if is_pid && entry.file_type().await.map_or(false, |t| t.is_dir()) {
            count += 1;
        }
    }
    Ok(count)
}

/// Rows of a /proc/net/tcp style table, header excluded.
pub fn count_table_entries(content: &str) -> u32 {
    content
        .lines()
        .skip(1)
        .filter(|line| !line.trim().is_empty())
        .count() as u32
}

/// TCP connections over IPv4 and IPv6. Either table may be missing (no IPv6),
/// only both missing is an error.
pub async fn read_connection_count(paths: &HostPaths) -> Result<u32, CollectorError> {
    let v4 = read_source(&paths.proc("net/tcp")).await;
    let v6 = read_source(&paths.proc("net/tcp6")).await;
    match (v4, v6) {
        (Err(e), Err(_)) => Err(e),
        (v4, v6) => Ok([v4, v6]
            .iter()
            .filter_map(|table| table.as_ref().ok())
            .map(|content| count_table_entries(content))
            .sum()),
    }
}

pub fn parse_uptime(content: &str) -> Result<u64, CollectorError> {
    let raw = content.split_whitespace().next().unwrap_or_default();
    raw.parse::<f64>()
        .ok()
        .filter(|secs| secs.is_finite() && *secs >= 0.0)
        .map(|secs| secs as u64)
        .ok_or_else(|| CollectorError::ParseError {
            path: "/proc/uptime".into(),
            field: "uptime".into(),
            raw: raw.to_string(),
        })
}

pub async fn read_uptime(paths: &HostPaths) -> Result<u64, CollectorError> {
    parse_uptime(&read_source(&paths.proc("uptime")).await?)
}

/// `PRETTY_NAME` from an os-release file, surrounding quotes removed.
pub fn parse_pretty_name(content: &str) -> Option<String> {
    content
        .lines()
        .find_map(|line| line.strip_prefix("PRETTY_NAME="))
        .map(|v| v.trim().trim_matches('"').to_string())
        .filter(|v| !v.is_empty())
}

/// Human-readable OS name, falling back to what sysinfo can work out.
pub async fn read_os_name(paths: &HostPaths) -> Result<String, CollectorError> {
    let from_release = read_source(&paths.os_release)
        .await
        .ok()
        .and_then(|content| parse_pretty_name(&content));
    from_release
        .or_else(sysinfo::System::long_os_version)
        .ok_or_else(|| CollectorError::ParseError {
            path: paths.os_release.display().to_string(),
            field: "PRETTY_NAME".into(),
            raw: "field not found".into(),
        })
}
