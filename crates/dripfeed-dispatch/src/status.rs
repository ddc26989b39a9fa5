// SPDX-FileCopyrightText: 2026 Dripfeed Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Queue and lock status reports for the operational surface.

use chrono::{Duration, Utc};
use serde::Serialize;

use dripfeed_core::{DripfeedError, HistoryRecord, Lock, QueueEntry, Tenant};
use dripfeed_storage::queries::{history, queue};

use crate::coordinator::DispatchCoordinator;

/// Snapshot of a tenant's queue, recent outcomes, and posting pace.
#[derive(Debug, Clone, Serialize)]
pub struct QueueStatusReport {
    pub tenant: String,
    pub live_entries: i64,
    pub upcoming: Vec<QueueEntry>,
    pub recent_history: Vec<HistoryRecord>,
    /// Successful posts recorded in the last 24 hours.
    pub posted_last_day: i64,
}

/// Active locks for a tenant.
#[derive(Debug, Clone, Serialize)]
pub struct LockStatus {
    pub tenant: String,
    pub active: Vec<Lock>,
}

impl DispatchCoordinator {
    /// Queue snapshot for one tenant, bounded by `limit` rows per section.
    pub async fn queue_status(
        &self,
        tenant: &Tenant,
        limit: i64,
    ) -> Result<QueueStatusReport, DripfeedError> {
        let now = Utc::now();
        Ok(QueueStatusReport {
            tenant: tenant.to_string(),
            live_entries: queue::count(&self.db, tenant).await?,
            upcoming: queue::list_upcoming(&self.db, tenant, limit).await?,
            recent_history: history::recent(&self.db, tenant, limit).await?,
            posted_last_day: history::posted_count_since(
                &self.db,
                tenant,
                now - Duration::hours(24),
            )
            .await?,
        })
    }

    /// Active locks for one tenant.
    pub async fn lock_status(&self, tenant: &Tenant) -> Result<LockStatus, DripfeedError> {
        Ok(LockStatus {
            tenant: tenant.to_string(),
            active: self.locks.list_active(tenant, Utc::now()).await?,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use dripfeed_storage::{Database, LockManager};
    use dripfeed_test_utils::{
        MockCatalog, MockNotifier, MockPublisher, StaticTenantDirectory, entry_fixture,
        media_fixture,
    };

    use super::*;
    use crate::coordinator::DispatchSettings;

    #[tokio::test]
    async fn status_reflects_queue_history_and_locks() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("test.db");
        let db = Database::open(path.to_str().unwrap()).await.unwrap();
        let tenant = Tenant::global();
        let catalog = Arc::new(MockCatalog::new());
        let coordinator = DispatchCoordinator::new(
            db.clone(),
            catalog.clone(),
            Arc::new(MockPublisher::new()),
            Arc::new(MockNotifier::new()),
            Arc::new(StaticTenantDirectory::new().with_tenant(tenant.clone())),
            LockManager::new(db.clone(), Duration::days(30)),
            DispatchSettings {
                max_claims_per_cycle: 1,
                publish_timeout: std::time::Duration::from_secs(5),
                retry_backoff: Duration::minutes(5),
                pause_shift: Duration::hours(24),
                rate_limit: 10,
                rate_window: Duration::hours(1),
            },
        );

        let item = media_fixture("m1", &tenant, None);
        catalog.add(item.clone());
        dripfeed_storage::queries::media::insert(&db, &item)
            .await
            .unwrap();
        let due = entry_fixture(&item, Utc::now() - Duration::minutes(1));
        queue::enqueue(&db, &due).await.unwrap();
        let later = media_fixture("m2", &tenant, None);
        catalog.add(later.clone());
        dripfeed_storage::queries::media::insert(&db, &later)
            .await
            .unwrap();
        queue::enqueue(&db, &entry_fixture(&later, Utc::now() + Duration::hours(4)))
            .await
            .unwrap();

        // Post the due entry so history and the lock list have content.
        coordinator
            .dispatch_tenant(&tenant, Utc::now())
            .await
            .unwrap();

        let status = coordinator.queue_status(&tenant, 10).await.unwrap();
        assert_eq!(status.live_entries, 1);
        assert_eq!(status.upcoming.len(), 1);
        assert_eq!(status.recent_history.len(), 1);
        assert_eq!(status.posted_last_day, 1);

        let locks = coordinator.lock_status(&tenant).await.unwrap();
        assert_eq!(locks.active.len(), 1);
        assert_eq!(locks.active[0].media_id.0, "m1");

        db.close().await.unwrap();
    }
}
