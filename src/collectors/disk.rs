use super::{read_source, HostPaths};
use crate::errors::CollectorError;
use std::collections::HashSet;

/// Device and mount point of one /proc/mounts entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MountEntry {
    pub device: String,
    pub mount_point: String,
}

pub fn parse_mounts(content: &str) -> Vec<MountEntry> {
    content
        .lines()
        .filter_map(|line| {
            let mut fields = line.split_whitespace();
            let device = fields.next()?;
            let mount_point = fields.next()?;
            Some(MountEntry {
                device: device.to_string(),
                mount_point: unescape_mount_path(mount_point),
            })
        })
        .collect()
}

/// /proc/mounts octal-escapes whitespace and backslashes in paths (`\040` for a space).
fn unescape_mount_path(raw: &str) -> String {
    let bytes = raw.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'\\' && i + 4 <= bytes.len() {
            let code = std::str::from_utf8(&bytes[i + 1..i + 4])
                .ok()
                .and_then(|digits| u8::from_str_radix(digits, 8).ok());
            if let Some(code) = code {
                out.push(code);
                i += 4;
                continue;
            }
        }
        out.push(bytes[i]);
        i += 1;
    }
    String::from_utf8_lossy(&out).into_owned()
}

/// Real block devices only: loop, ram and device-mapper nodes are skipped.
pub fn is_block_device(device: &str) -> bool {
    device.starts_with("/dev/")
        && !device.starts_with("/dev/loop")
        && !device.starts_with("/dev/ram")
        && !device.starts_with("/dev/dm-")
}

/// Mounts whose capacity should be summed, one per backing device.
pub fn countable_mounts(entries: &[MountEntry]) -> Vec<&MountEntry> {
    let mut seen = HashSet::new();
    entries
        .iter()
        .filter(|m| is_block_device(&m.device))
        .filter(|m| seen.insert(m.device.as_str()))
        .collect()
}

/// Total and available capacity in kB summed over real block devices.
/// A mount that cannot be stat'ed is skipped.
pub async fn read_disks(paths: &HostPaths) -> Result<(u64, u64), CollectorError> {
    let content = read_source(&paths.proc("mounts")).await?;
    let mount_points: Vec<String> = countable_mounts(&parse_mounts(&content))
        .into_iter()
        .map(|m| m.mount_point.clone())
        .collect();

    tokio::task::spawn_blocking(move || sum_capacity(&mount_points))
        .await
        .map_err(|source| CollectorError::Blocking {
            call: "statvfs",
            source,
        })
}

fn sum_capacity(mount_points: &[String]) -> (u64, u64) {
    let mut total_kb = 0u64;
    let mut avail_kb = 0u64;
    for mount_point in mount_points {
        match nix::sys::statvfs::statvfs(mount_point.as_str()) {
            Ok(vfs) => {
                let frsize = vfs.fragment_size() as u64;
                total_kb += vfs.blocks() as u64 * frsize / 1024;
                avail_kb += vfs.blocks_available() as u64 * frsize / 1024;
            }
            Err(e) => {
                tracing::debug!(mount = %mount_point, error = %e, "statvfs failed");
            }
        }
    }
    (total_kb, avail_kb)
}
