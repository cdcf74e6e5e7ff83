use billhub_database::BillingStore;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};

use super::cancel::CancelSignal;
use super::orchestrator::BillOrchestrator;

/// Periodically refreshes the bills of every known user.
#[derive(Clone)]
pub struct RefreshScheduler {
    orchestrator: Arc<BillOrchestrator>,
    store: Arc<dyn BillingStore>,
    period: Duration,
}

impl RefreshScheduler {
    pub fn new(orchestrator: Arc<BillOrchestrator>, store: Arc<dyn BillingStore>, period: Duration) -> Self {
        Self {
            orchestrator,
            store,
            period,
        }
    }

    /// Start the loop. The first tick fires one period from now; the loop
    /// ends once `signal` is cancelled.
    pub fn spawn(self, signal: CancelSignal) -> JoinHandle<()> {
        tokio::spawn(async move { self.run(signal).await })
    }

    async fn run(self, signal: CancelSignal) {
        let mut ticker = interval_at(Instant::now() + self.period, self.period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        tracing::info!(period_secs = self.period.as_secs(), "Periodic bill refresh scheduled");

        loop {
            tokio::select! {
                _ = signal.cancelled() => break,
                _ = ticker.tick() => {
                    let refreshed = self.tick(&signal).await;
                    tracing::info!(users = refreshed, "Periodic bill refresh tick finished");
                }
            }
        }

        tracing::info!("Periodic bill refresh stopped");
    }

    /// Refresh every user once. Returns how many users refreshed without error.
    pub async fn tick(&self, signal: &CancelSignal) -> usize {
        let users = match self.store.list_users().await {
            Ok(users) => users,
            Err(e) => {
                tracing::error!("Failed to list users for periodic refresh: {:#}", e);
                return 0;
            }
        };

        let mut refreshed = 0;
        for user in users {
            if signal.is_cancelled() {
                break;
            }
            match self.orchestrator.refresh_bills(&user.id, signal).await {
                Ok(()) => refreshed += 1,
                Err(e) => tracing::error!(user_id = %user.id, error = %e, "Periodic refresh failed for user"),
            }
        }
        refreshed
    }
}
