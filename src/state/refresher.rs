use crate::state::messages::NetworkRequest;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::interval;

/// Re-reads the public views on a fixed period so a publish from the admin
/// side shows up without a restart.
pub struct PeriodicRefresher {
    network_requests: mpsc::Sender<NetworkRequest>,
    every: Duration,
}

impl PeriodicRefresher {
    pub fn new(network_requests: mpsc::Sender<NetworkRequest>, every: Duration) -> Self {
        Self { network_requests, every }
    }

    pub async fn run(self) {
        let mut views_interval = interval(self.every);
        // Skip the immediate first tick so startup loading isn't double-triggered.
        views_interval.tick().await;

        loop {
            views_interval.tick().await;
            if self.network_requests.send(NetworkRequest::LoadPublicViews).await.is_err() {
                break;
            }
        }
    }
}
