// Periodic health monitor. Publishes the latest report on a watch channel;
// no lock is held across the health-check request.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{MissedTickBehavior, interval};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};
use unigate_api::{HealthReport, ResilientClient};

pub struct HealthMonitor {
    reports: watch::Receiver<Option<HealthReport>>,
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

impl HealthMonitor {
    /// Spawn on the current runtime. The first check runs immediately.
    pub fn spawn(client: Arc<ResilientClient>, every: Duration, cancel: CancellationToken) -> Self {
        let (tx, reports) = watch::channel(None);
        let token = cancel.clone();

        let handle = tokio::spawn(async move {
            let mut ticker = interval(every);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    biased;
                    () = token.cancelled() => break,
                    _ = ticker.tick() => {
                        let report = tokio::select! {
                            biased;
                            () = token.cancelled() => break,
                            report = client.health_check() => report,
                        };
                        if report.is_healthy() {
                            debug!(latency_ms = report.latency_ms, "health check passed");
                        } else {
                            warn!(error = ?report.last_error, "controller unhealthy");
                        }
                        if tx.send(Some(report)).is_err() {
                            break;
                        }
                    }
                }
            }
            debug!("health monitor stopped");
        });

        Self {
            reports,
            cancel,
            handle,
        }
    }

    /// The most recent report, if one has completed.
    pub fn latest(&self) -> Option<HealthReport> {
        self.reports.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<Option<HealthReport>> {
        self.reports.clone()
    }

    pub async fn stop(self) {
        self.cancel.cancel();
        let _ = self.handle.await;
    }
}
