use anyhow::Context;
use clap::Parser;
use host_telemetry_agent::agent::{shutdown_signal, Agent};
use host_telemetry_agent::collectors::host::{ProcCounterSource, ProcPointSampler};
use host_telemetry_agent::collectors::HostPaths;
use host_telemetry_agent::config::Config;
use host_telemetry_agent::reporter::{HttpTransport, Reporter};
use host_telemetry_agent::snapshot::SnapshotBuilder;
use host_telemetry_agent::{logging, wire};
use tracing::Instrument;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::parse();
    config.validate()?;

    let identity = config.resolve_identity();
    logging::init(config.log_dir.as_deref(), config.json_logs)?;

    let span = tracing::info_span!(
        "agent",
        pid = std::process::id(),
        name = %identity.name,
        location = %identity.location,
    );

    async move {
        tracing::info!(version = env!("CARGO_PKG_VERSION"), "host telemetry agent starting");

        let paths = HostPaths::default();
        let mut builder = SnapshotBuilder::new(
            Box::new(ProcCounterSource::new(paths.clone())),
            Box::new(ProcPointSampler::new(paths).await),
            identity,
        );

        if config.dry_run {
            // First build seeds the rate baseline.
            let _ = builder.build().await;
            tokio::time::sleep(std::time::Duration::from_secs(1)).await;
            let snapshot = builder.build().await;
            println!("{}", serde_json::to_string_pretty(&snapshot)?);
            println!("{}", wire::encode(&snapshot)?);
            return Ok(());
        }

        let url = config.url.clone().context("--url is required")?;
        let transport =
            HttpTransport::new(url.clone(), config.connect_timeout(), config.request_timeout())?;
        let reporter = Reporter::new(Box::new(transport), config.retry_policy());

        Agent::new(builder, reporter, config.interval(), url)
            .run_until(shutdown_signal())
            .await;
        Ok::<(), anyhow::Error>(())
    }
    .instrument(span)
    .await
}
