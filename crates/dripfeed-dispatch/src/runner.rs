// SPDX-FileCopyrightText: 2026 Dripfeed Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Long-running loops: the dispatch poll cycle and the lock-expiry sweep.
//!
//! Both loops are cancellation-driven and tick on fixed intervals with
//! missed ticks skipped, so a slow cycle never causes a burst of catch-up
//! cycles.

use std::sync::Arc;

use chrono::Utc;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use dripfeed_core::DripfeedError;
use dripfeed_storage::{Database, LockManager, queries::queue};

use crate::coordinator::DispatchCoordinator;

/// Requeue entries stranded in `processing` by a previous run.
///
/// Call once before starting the loops. Entries awaiting review are
/// re-claimed and re-notified on their next due cycle, which is safe for
/// review surfaces keyed on the idempotent entry id.
pub async fn recover_interrupted(db: &Database) -> Result<usize, DripfeedError> {
    let requeued = queue::requeue_stale_processing(db, Utc::now()).await?;
    if requeued > 0 {
        info!(requeued, "requeued entries interrupted by previous shutdown");
    }
    Ok(requeued)
}

/// Poll loop: one [`DispatchCoordinator::run_cycle`] per tick until
/// cancelled.
pub async fn run_dispatch_loop(
    coordinator: Arc<DispatchCoordinator>,
    poll_interval: std::time::Duration,
    shutdown: CancellationToken,
) {
    let mut ticker = tokio::time::interval(poll_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    info!(interval_secs = poll_interval.as_secs(), "dispatch loop started");
    loop {
        tokio::select! {
            _ = shutdown.cancelled() => {
                info!("dispatch loop stopping");
                break;
            }
            _ = ticker.tick() => {
                coordinator.run_cycle().await;
            }
        }
    }
}

/// Periodic lock-expiry sweep, independent of the dispatch cycle.
pub async fn run_lock_sweep(
    locks: LockManager,
    sweep_interval: std::time::Duration,
    shutdown: CancellationToken,
) {
    let mut ticker = tokio::time::interval(sweep_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    info!(interval_secs = sweep_interval.as_secs(), "lock sweep started");
    loop {
        tokio::select! {
            _ = shutdown.cancelled() => {
                info!("lock sweep stopping");
                break;
            }
            _ = ticker.tick() => {
                if let Err(e) = locks.sweep_expired(Utc::now()).await {
                    error!(error = %e, "lock sweep failed");
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use dripfeed_core::{QueueStatus, Tenant};
    use dripfeed_storage::queries::media;
    use dripfeed_test_utils::{entry_fixture, media_fixture};

    use super::*;

    #[tokio::test]
    async fn recovery_requeues_interrupted_entries() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("test.db");
        let db = Database::open(path.to_str().unwrap()).await.unwrap();
        let tenant = Tenant::global();

        let item = media_fixture("m1", &tenant, None);
        media::insert(&db, &item).await.unwrap();
        let entry = entry_fixture(&item, Utc::now() - Duration::minutes(5));
        queue::enqueue(&db, &entry).await.unwrap();
        queue::claim_due(&db, &tenant, Utc::now()).await.unwrap().unwrap();

        // Simulated restart: the claim holder is gone.
        let requeued = recover_interrupted(&db).await.unwrap();
        assert_eq!(requeued, 1);
        let reloaded = queue::get(&db, &entry.id).await.unwrap().unwrap();
        assert_eq!(reloaded.status, QueueStatus::Pending);

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn loops_stop_on_cancellation() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("test.db");
        let db = Database::open(path.to_str().unwrap()).await.unwrap();
        let locks = LockManager::new(db.clone(), Duration::days(30));

        let shutdown = CancellationToken::new();
        let handle = tokio::spawn(run_lock_sweep(
            locks,
            std::time::Duration::from_millis(10),
            shutdown.clone(),
        ));
        tokio::time::sleep(std::time::Duration::from_millis(30)).await;
        shutdown.cancel();
        handle.await.unwrap();

        db.close().await.unwrap();
    }
}
