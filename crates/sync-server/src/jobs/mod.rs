pub mod offline_replay;

use std::time::Duration;
use tokio::sync::watch;

use crate::state::AppState;

/// Background job scheduler
///
/// Manages periodic tasks with graceful shutdown support.
pub struct JobScheduler {
    shutdown_tx: watch::Sender<bool>,
    shutdown_rx: watch::Receiver<bool>,
}

impl JobScheduler {
    /// Create a new job scheduler
    pub fn new() -> Self {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        Self {
            shutdown_tx,
            shutdown_rx,
        }
    }

    /// Start all background jobs
    ///
    /// Spawns periodic tasks that run until shutdown is signalled.
    pub fn start(&self, state: AppState) {
        let interval = Duration::from_secs(state.config.sync.offline_replay_interval_secs);
        let rx = self.shutdown_rx.clone();

        tokio::spawn(async move {
            Self::run_periodic("offline_replay", interval, rx, move || {
                let s = state.clone();
                async move {
                    offline_replay::run(&s).await;
                }
            })
            .await;
        });

        tracing::info!("Background job scheduler started (1 job)");
    }

    /// Run a periodic task with shutdown support
    async fn run_periodic<F, Fut>(
        name: &str,
        interval: Duration,
        mut shutdown_rx: watch::Receiver<bool>,
        task_fn: F,
    ) where
        F: Fn() -> Fut,
        Fut: std::future::Future<Output = ()>,
    {
        let mut ticker = tokio::time::interval(interval);
        // Skip the first immediate tick
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    tracing::debug!("Running background job: {}", name);
                    task_fn().await;
                }
                _ = shutdown_rx.changed() => {
                    tracing::info!("Shutting down background job: {}", name);
                    break;
                }
            }
        }
    }

    /// Signal all background jobs to stop
    pub fn shutdown(&self) {
        let _ = self.shutdown_tx.send(true);
        tracing::info!("Background job scheduler shutdown signal sent");
    }
}

impl Default for JobScheduler {
    fn default() -> Self {
        Self::new()
    }
}
