//! Background purge of abandoned job records.
//!
//! A client that crashes before its final poll never tells the gate its job
//! finished. The sweeper periodically drops records older than the entry
//! TTL so that capacity does not leak.

use super::controller::AdmissionController;
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Handle to a running sweeper task.
///
/// Dropping the handle stops the sweeper.
#[derive(Debug)]
pub struct SweeperHandle {
    shutdown: CancellationToken,
    task: Option<JoinHandle<()>>,
}

impl SweeperHandle {
    /// Signals the sweeper to stop. Safe to call more than once.
    pub fn stop(&self) {
        self.shutdown.cancel();
    }

    /// Returns true once a stop has been requested.
    pub fn is_stopped(&self) -> bool {
        self.shutdown.is_cancelled()
    }

    /// Stops the sweeper and waits for the task to exit.
    pub async fn join(mut self) {
        self.stop();
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                debug!(error = %e, "Sweeper task ended abnormally");
            }
        }
    }
}

impl Drop for SweeperHandle {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

impl AdmissionController {
    /// Spawns the stale-entry sweeper on the current tokio runtime.
    ///
    /// The task holds only a weak reference, so it also exits once the
    /// controller itself is dropped.
    pub fn start_sweeper(self: &Arc<Self>) -> SweeperHandle {
        let shutdown = CancellationToken::new();
        let interval = self.config().cleanup_interval();
        let task = tokio::spawn(run_sweeper_loop(
            Arc::downgrade(self),
            interval,
            shutdown.clone(),
        ));
        SweeperHandle {
            shutdown,
            task: Some(task),
        }
    }
}

async fn run_sweeper_loop(
    controller: Weak<AdmissionController>,
    period: Duration,
    shutdown: CancellationToken,
) {
    info!(interval_ms = period.as_millis() as u64, "Stale job sweeper started");

    // interval() panics on a zero period
    let mut ticker = tokio::time::interval(period.max(Duration::from_millis(1)));
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    // The first tick completes immediately; nothing can be stale yet.
    ticker.tick().await;

    loop {
        tokio::select! {
            _ = shutdown.cancelled() => {
                info!("Stale job sweeper shutting down");
                break;
            }
            _ = ticker.tick() => {
                let Some(controller) = controller.upgrade() else {
                    debug!("Admission controller dropped, sweeper exiting");
                    break;
                };
                controller.sweep_stale();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AdmissionConfig;
    use crate::request_id::RequestId;

    fn gate(interval: Duration, ttl: Duration) -> Arc<AdmissionController> {
        Arc::new(AdmissionController::new(
            AdmissionConfig::new()
                .with_max_concurrent(2)
                .with_cleanup_interval(interval)
                .with_entry_ttl(ttl),
        ))
    }

    #[tokio::test(start_paused = true)]
    async fn test_sweeper_purges_abandoned_record() {
        let gate = gate(Duration::from_millis(100), Duration::from_secs(1));
        let sweeper = gate.start_sweeper();

        gate.try_admit()
            .unwrap()
            .accept(&RequestId::from_string("abc"));
        assert_eq!(gate.stats().serving, 1);

        tokio::time::sleep(Duration::from_secs(2)).await;

        assert!(!gate.contains("abc"));
        let stats = gate.stats();
        assert_eq!(stats.serving, 0);
        assert_eq!(stats.purged, 1);

        sweeper.join().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_is_idempotent() {
        let gate = gate(Duration::from_millis(100), Duration::from_secs(1));
        let sweeper = gate.start_sweeper();

        sweeper.stop();
        sweeper.stop();
        assert!(sweeper.is_stopped());
        sweeper.join().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_stopped_sweeper_leaves_records() {
        let gate = gate(Duration::from_millis(100), Duration::from_secs(1));
        let sweeper = gate.start_sweeper();
        sweeper.join().await;

        gate.try_admit()
            .unwrap()
            .accept(&RequestId::from_string("abc"));
        tokio::time::sleep(Duration::from_secs(5)).await;

        assert!(gate.contains("abc"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_sweeper_exits_when_controller_dropped() {
        let gate = gate(Duration::from_millis(100), Duration::from_secs(1));
        let mut sweeper = gate.start_sweeper();
        drop(gate);

        tokio::time::sleep(Duration::from_millis(250)).await;

        let task = sweeper.task.take().unwrap();
        assert!(task.is_finished());
    }

    #[test]
    fn test_controller_without_sweeper_drops_cleanly() {
        let gate = gate(Duration::from_secs(1), Duration::from_secs(1));
        drop(gate);
    }
}
