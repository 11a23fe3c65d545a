// Drives the sample -> build -> report cycle on a fixed interval.
// One cycle at a time: the next interval starts only after delivery, retries
// included, has finished. Drift is not corrected.

use crate::errors::DeliveryError;
use crate::reporter::Reporter;
use crate::snapshot::{Snapshot, SnapshotBuilder};
use std::future::Future;
use std::time::Duration;

pub struct Agent {
    builder: SnapshotBuilder,
    reporter: Reporter,
    interval: Duration,
    endpoint: String,
}

impl Agent {
    pub fn new(
        builder: SnapshotBuilder,
        reporter: Reporter,
        interval: Duration,
        endpoint: impl Into<String>,
    ) -> Self {
        Self {
            builder,
            reporter,
            interval,
            endpoint: endpoint.into(),
        }
    }

    /// Build one snapshot and hand it to the reporter. Callable repeatedly.
    pub async fn run_cycle(&mut self) -> Result<Snapshot, DeliveryError> {
        let snapshot = self.builder.build().await;
        tracing::info!(endpoint = %self.endpoint, "sending metrics");
        self.reporter.send(&snapshot).await?;
        Ok(snapshot)
    }

    /// Run cycles until `shutdown` resolves. Delivery failures are logged by the
    /// reporter and never stop the loop. Returns the number of cycles started.
    pub async fn run_until<F>(mut self, shutdown: F) -> u64
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);
        let mut cycles = 0u64;

        loop {
            cycles += 1;
            tokio::select! {
                _ = &mut shutdown => break,
                result = self.run_cycle() => {
                    if let Err(e) = result {
                        tracing::debug!(cycle = cycles, error = %e, "cycle ended without delivery");
                    }
                }
            }

            tokio::select! {
                _ = &mut shutdown => break,
                _ = tokio::time::sleep(self.interval) => {}
            }
        }

        tracing::info!(cycles, "agent loop stopped");
        cycles
    }
}

/// Resolves on Ctrl-C or, on unix, SIGTERM.
pub async fn shutdown_signal() {
    #[cfg(unix)]
    {
        let mut sigterm = match tokio::signal::unix::signal(
            tokio::signal::unix::SignalKind::terminate(),
        ) {
            Ok(s) => s,
            Err(_) => {
                let _ = tokio::signal::ctrl_c().await;
                return;
            }
        };
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {}
            _ = sigterm.recv() => {}
        }
    }
    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}
