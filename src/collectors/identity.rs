use super::HostPaths;
use std::path::Path;

/// Where the machine id came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MachineIdSource {
    /// A stable host identifier file.
    HostFile,
    /// Generated for this run only. Changes on every restart.
    Random,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MachineId {
    pub value: String,
    pub source: MachineIdSource,
}

/// A valid machine id is exactly 32 hex characters.
pub fn parse_machine_id(content: &str) -> Option<String> {
    let id = content.trim();
    (id.len() == 32 && id.chars().all(|c| c.is_ascii_hexdigit())).then(|| id.to_ascii_lowercase())
}

pub fn random_machine_id() -> String {
    uuid::Uuid::new_v4().simple().to_string()
}

async fn read_machine_id_file(path: &Path) -> Option<String> {
    tokio::fs::read_to_string(path)
        .await
        .ok()
        .and_then(|content| parse_machine_id(&content))
}

/// Resolve the machine id once for the process lifetime. The first readable,
/// well-formed candidate file wins; otherwise a random id is generated and not persisted.
pub async fn resolve_machine_id(paths: &HostPaths) -> MachineId {
    for path in &paths.machine_id {
        if let Some(value) = read_machine_id_file(path).await {
            return MachineId {
                value,
                source: MachineIdSource::HostFile,
            };
        }
    }

    tracing::warn!("no usable machine-id found, using a randomly generated id for this run");
    MachineId {
        value: random_machine_id(),
        source: MachineIdSource::Random,
    }
}
