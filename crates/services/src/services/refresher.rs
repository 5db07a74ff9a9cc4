//! Background polling that keeps selected collections fresh.

use std::{sync::Arc, time::Duration};

use models::EntityKind;
use tokio::{task::JoinHandle, time::interval};
use tracing::{debug, info, warn};

use super::store::{DashboardStore, StoreError};

/// `tokio::time::interval` rejects a zero period.
const MIN_POLL_INTERVAL: Duration = Duration::from_millis(1);

/// Periodically refreshes a fixed set of collections until the store closes.
pub struct AutoRefresher {
    store: Arc<DashboardStore>,
    kinds: Vec<EntityKind>,
    poll_interval: Duration,
}

impl AutoRefresher {
    /// Spawn the refresher. The first round runs immediately. A zero
    /// interval is raised to one millisecond.
    pub fn spawn(
        store: Arc<DashboardStore>,
        kinds: Vec<EntityKind>,
        poll_interval: Duration,
    ) -> JoinHandle<()> {
        let refresher = Self {
            store,
            kinds,
            poll_interval: poll_interval.max(MIN_POLL_INTERVAL),
        };
        tokio::spawn(async move {
            refresher.start().await;
        })
    }

    async fn start(&self) {
        info!(
            "Starting auto-refresh of {:?} every {:?}",
            self.kinds, self.poll_interval
        );

        let mut interval = interval(self.poll_interval);
        loop {
            tokio::select! {
                _ = self.store.closed() => break,
                _ = interval.tick() => {
                    if !self.refresh_all().await {
                        break;
                    }
                }
            }
        }

        info!("Auto-refresh stopped");
    }

    /// Returns false once the store has closed.
    async fn refresh_all(&self) -> bool {
        for kind in &self.kinds {
            match self.store.refresh_kind(*kind).await {
                Ok(()) => debug!(kind = %kind, "auto-refreshed"),
                Err(StoreError::Closed) => return false,
                Err(e) => warn!(kind = %kind, error = %e, "auto-refresh failed"),
            }
        }
        true
    }
}
