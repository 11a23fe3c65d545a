use super::{read_source, HostPaths};
use crate::errors::CollectorError;
use std::net::{Ipv4Addr, SocketAddrV4};

/// Interface name prefixes that never count as real traffic: loopback,
/// container bridges and virtual ethernet pairs.
const EXCLUDED_PREFIXES: &[&str] = &["lo", "docker", "br-", "veth", "virbr"];

pub fn is_excluded_interface(name: &str) -> bool {
    EXCLUDED_PREFIXES.iter().any(|p| name.starts_with(p))
}

/// Per-interface cumulative byte counters from /proc/net/dev.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InterfaceCounters {
    pub name: String,
    pub rx_bytes: u64,
    pub tx_bytes: u64,
}

/// Parse /proc/net/dev. The first two lines are headers; malformed rows are skipped.
pub fn parse_net_dev(content: &str) -> Vec<InterfaceCounters> {
    content
        .lines()
        .skip(2)
        .filter_map(|line| {
            let (name, rest) = line.split_once(':')?;
            let fields: Vec<&str> = rest.split_whitespace().collect();
            if fields.len() < 9 {
                return None;
            }
            Some(InterfaceCounters {
                name: name.trim().to_string(),
                rx_bytes: fields[0].parse().ok()?,
                tx_bytes: fields[8].parse().ok()?,
            })
        })
        .collect()
}

/// Sum (tx, rx) across real interfaces.
pub fn sum_traffic(interfaces: &[InterfaceCounters]) -> (u64, u64) {
    interfaces
        .iter()
        .filter(|i| !is_excluded_interface(&i.name))
        .fold((0u64, 0u64), |(tx, rx), i| {
            (tx.saturating_add(i.tx_bytes), rx.saturating_add(i.rx_bytes))
        })
}

/// Cumulative (tx, rx) bytes since boot across real interfaces.
pub async fn read_traffic(paths: &HostPaths) -> Result<(u64, u64), CollectorError> {
    let content = read_source(&paths.proc("net/dev")).await?;
    Ok(sum_traffic(&parse_net_dev(&content)))
}

/// First non-loopback IPv4 address on a real interface.
pub fn select_primary_ipv4<'a>(
    candidates: impl IntoIterator<Item = (&'a str, Ipv4Addr)>,
) -> Option<Ipv4Addr> {
    candidates
        .into_iter()
        .find(|(name, addr)| !is_excluded_interface(name) && !addr.is_loopback())
        .map(|(_, addr)| addr)
}

/// Walks the interface list on the blocking pool.
pub async fn primary_ipv4() -> Result<Option<Ipv4Addr>, CollectorError> {
    tokio::task::spawn_blocking(primary_ipv4_blocking)
        .await
        .map_err(|source| CollectorError::Blocking {
            call: "getifaddrs",
            source,
        })?
}

fn primary_ipv4_blocking() -> Result<Option<Ipv4Addr>, CollectorError> {
    let addrs = nix::ifaddrs::getifaddrs().map_err(|source| CollectorError::Syscall {
        call: "getifaddrs",
        source,
    })?;

    let candidates: Vec<(String, Ipv4Addr)> = addrs
        .filter_map(|ifa| {
            let sin = *ifa.address.as_ref()?.as_sockaddr_in()?;
            Some((ifa.interface_name, *SocketAddrV4::from(sin).ip()))
        })
        .collect();

    Ok(select_primary_ipv4(
        candidates.iter().map(|(name, addr)| (name.as_str(), *addr)),
    ))
}
