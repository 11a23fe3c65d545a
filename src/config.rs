use crate::reporter::RetryPolicy;
use crate::snapshot::Identity;
use clap::Parser;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const NAME_ENV: &str = "SERVER_NAME";
pub const LOCATION_ENV: &str = "SERVER_LOCATION";

const DEFAULT_NAME: &str = "unnamed";
const DEFAULT_LOCATION: &str = "unknown";

#[derive(Parser, Debug, Clone)]
#[command(name = "host-telemetry-agent", version, about)]
pub struct Config {
    /// Collector endpoint that receives the form-encoded snapshots.
    #[arg(
        short = 'u',
        long,
        env = "HOST_TELEMETRY_URL",
        required_unless_present = "dry_run"
    )]
    pub url: Option<String>,

    /// Reporting interval in seconds.
    #[arg(
        short = 's',
        long = "interval",
        env = "HOST_TELEMETRY_INTERVAL_SECS",
        default_value_t = 10
    )]
    pub interval_secs: u64,

    /// Directory for agent.log and agent.error.log. Console only when unset.
    #[arg(long, env = "HOST_TELEMETRY_LOG_DIR")]
    pub log_dir: Option<PathBuf>,

    /// KEY=value file consulted for SERVER_NAME / SERVER_LOCATION when the
    /// environment does not set them.
    #[arg(
        long,
        env = "HOST_TELEMETRY_IDENTITY_FILE",
        default_value = "/etc/host-telemetry/identity.conf"
    )]
    pub identity_file: PathBuf,

    /// Enable JSON structured logging on the console.
    #[arg(long, env = "HOST_TELEMETRY_JSON_LOGS", default_value_t = false)]
    pub json_logs: bool,

    /// Delivery attempts per snapshot.
    #[arg(long, env = "HOST_TELEMETRY_MAX_ATTEMPTS", default_value_t = 3)]
    pub max_attempts: u32,

    /// Pause between delivery attempts in seconds.
    #[arg(long, env = "HOST_TELEMETRY_RETRY_DELAY_SECS", default_value_t = 5)]
    pub retry_delay_secs: u64,

    /// TCP connect timeout for one delivery attempt, in seconds.
    #[arg(long, env = "HOST_TELEMETRY_CONNECT_TIMEOUT_SECS", default_value_t = 10)]
    pub connect_timeout_secs: u64,

    /// Overall timeout for one delivery attempt, in seconds.
    #[arg(long, env = "HOST_TELEMETRY_REQUEST_TIMEOUT_SECS", default_value_t = 30)]
    pub request_timeout_secs: u64,

    /// Sample twice, print the snapshot and its wire body, and exit without sending.
    #[arg(long, default_value_t = false)]
    pub dry_run: bool,
}

impl Config {
    pub fn validate(&self) -> anyhow::Result<()> {
        anyhow::ensure!(
            self.interval_secs > 0,
            "--interval must be at least 1 second, got {}",
            self.interval_secs
        );
        anyhow::ensure!(
            self.max_attempts > 0,
            "--max-attempts must be > 0, got {}",
            self.max_attempts
        );
        anyhow::ensure!(
            self.connect_timeout_secs > 0 && self.request_timeout_secs > 0,
            "--connect-timeout-secs and --request-timeout-secs must be > 0"
        );
        if let Some(url) = &self.url {
            let parsed = reqwest::Url::parse(url)
                .map_err(|e| anyhow::anyhow!("--url {url:?} is not a valid URL: {e}"))?;
            anyhow::ensure!(
                matches!(parsed.scheme(), "http" | "https"),
                "--url must use http or https, got {}",
                parsed.scheme()
            );
        }
        Ok(())
    }

    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.max_attempts,
            delay: Duration::from_secs(self.retry_delay_secs),
        }
    }

    /// Resolve name and location from the process environment, then the identity file.
    pub fn resolve_identity(&self) -> Identity {
        resolve_identity(
            std::env::var(NAME_ENV).ok(),
            std::env::var(LOCATION_ENV).ok(),
            &self.identity_file,
        )
    }
}

/// `KEY=value` lookup; the value may be wrapped in double quotes.
pub fn parse_identity_value(content: &str, key: &str) -> Option<String> {
    content.lines().find_map(|line| {
        let (k, v) = line.trim().split_once('=')?;
        (k.trim() == key).then(|| v.trim().trim_matches('"').to_string())
    })
}

/// Explicit values win, then the identity file, then defaults (host name for the name).
pub fn resolve_identity(
    env_name: Option<String>,
    env_location: Option<String>,
    identity_file: &Path,
) -> Identity {
    let file = std::fs::read_to_string(identity_file).ok();
    let from_file = |key: &str| {
        file.as_deref()
            .and_then(|content| parse_identity_value(content, key))
            .filter(|v| !v.is_empty())
    };

    let name = env_name
        .filter(|v| !v.is_empty())
        .or_else(|| from_file(NAME_ENV))
        .unwrap_or_else(|| {
            hostname::get()
                .map(|h| h.to_string_lossy().into_owned())
                .ok()
                .filter(|h| !h.is_empty())
                .unwrap_or_else(|| DEFAULT_NAME.to_string())
        });
    let location = env_location
        .filter(|v| !v.is_empty())
        .or_else(|| from_file(LOCATION_ENV))
        .unwrap_or_else(|| DEFAULT_LOCATION.to_string());

    Identity { name, location }
}
