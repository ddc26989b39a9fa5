// SPDX-FileCopyrightText: 2026 Dripfeed Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! TTL lock subsystem for repost prevention.
//!
//! A lock on a media item excludes it from slot allocation until the lock
//! expires or is released. Successful posts create a cooldown lock
//! automatically; operators and the review flow create manual, seasonal, and
//! permanent locks. At most one active lock exists per (media, tenant).

use chrono::{DateTime, Duration, Utc};
use tracing::{debug, info};
use uuid::Uuid;

use dripfeed_core::{DripfeedError, Lock, LockReason, MediaId, Tenant};

use crate::database::Database;
use crate::queries::locks;

/// Creates, inspects, and sweeps repost-prevention locks.
#[derive(Clone)]
pub struct LockManager {
    db: Database,
    default_cooldown: Duration,
}

impl LockManager {
    pub fn new(db: Database, default_cooldown: Duration) -> Self {
        Self {
            db,
            default_cooldown,
        }
    }

    /// Create the automatic post-cooldown lock after a successful publish.
    pub async fn lock_after_post(
        &self,
        media_id: &MediaId,
        tenant: &Tenant,
        now: DateTime<Utc>,
    ) -> Result<Lock, DripfeedError> {
        self.create(
            media_id,
            tenant,
            LockReason::RecentPost,
            Some(self.default_cooldown),
            "coordinator",
            now,
        )
        .await
    }

    /// Create a lock with an explicit reason and duration. `duration = None`
    /// makes the lock permanent; permanent locks are never swept.
    ///
    /// Fails with [`DripfeedError::LockHeld`] if the item already has an
    /// active lock in this scope.
    pub async fn create(
        &self,
        media_id: &MediaId,
        tenant: &Tenant,
        reason: LockReason,
        duration: Option<Duration>,
        created_by: &str,
        now: DateTime<Utc>,
    ) -> Result<Lock, DripfeedError> {
        let lock = Lock {
            id: Uuid::new_v4().to_string(),
            media_id: media_id.clone(),
            tenant: tenant.clone(),
            locked_at: now,
            locked_until: duration.map(|d| now + d),
            reason,
            created_by: created_by.to_string(),
        };
        locks::insert(&self.db, &lock, now).await?;
        debug!(
            media_id = %lock.media_id,
            tenant = %lock.tenant,
            reason = %lock.reason,
            permanent = lock.locked_until.is_none(),
            "lock created"
        );
        Ok(lock)
    }

    /// Permanently exclude an item (review rejection path).
    pub async fn lock_permanently(
        &self,
        media_id: &MediaId,
        tenant: &Tenant,
        created_by: &str,
        now: DateTime<Utc>,
    ) -> Result<Lock, DripfeedError> {
        self.create(
            media_id,
            tenant,
            LockReason::PermanentReject,
            None,
            created_by,
            now,
        )
        .await
    }

    /// Whether the item is currently excluded from selection.
    pub async fn is_locked(
        &self,
        media_id: &MediaId,
        tenant: &Tenant,
        now: DateTime<Utc>,
    ) -> Result<bool, DripfeedError> {
        locks::is_locked(&self.db, media_id, tenant, now).await
    }

    /// The active lock on an item, if any.
    pub async fn active_lock(
        &self,
        media_id: &MediaId,
        tenant: &Tenant,
        now: DateTime<Utc>,
    ) -> Result<Option<Lock>, DripfeedError> {
        locks::get_active(&self.db, media_id, tenant, now).await
    }

    /// Media ids excluded from allocation for this tenant right now.
    pub async fn locked_media(
        &self,
        tenant: &Tenant,
        now: DateTime<Utc>,
    ) -> Result<std::collections::HashSet<String>, DripfeedError> {
        locks::active_locked_media(&self.db, tenant, now).await
    }

    /// All active locks for a tenant, newest first.
    pub async fn list_active(
        &self,
        tenant: &Tenant,
        now: DateTime<Utc>,
    ) -> Result<Vec<Lock>, DripfeedError> {
        locks::list_active(&self.db, tenant, now).await
    }

    /// Release a lock early. Returns false if the lock no longer exists.
    pub async fn release(&self, lock_id: &str) -> Result<bool, DripfeedError> {
        locks::release(&self.db, lock_id).await
    }

    /// Delete expired lock rows. Returns how many were removed.
    pub async fn sweep_expired(&self, now: DateTime<Utc>) -> Result<usize, DripfeedError> {
        let removed = locks::sweep_expired(&self.db, now).await?;
        if removed > 0 {
            info!(removed, "swept expired locks");
        }
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queries::media;
    use crate::testing::{media_item, setup_db};

    async fn manager() -> (LockManager, Database, tempfile::TempDir) {
        let (db, dir) = setup_db().await;
        (LockManager::new(db.clone(), Duration::days(30)), db, dir)
    }

    #[tokio::test]
    async fn cooldown_lock_expires_after_default_window() {
        let (mgr, db, _dir) = manager().await;
        let tenant = Tenant::global();
        let item = media_item("m1", &tenant);
        media::insert(&db, &item).await.unwrap();

        let now = Utc::now();
        let lock = mgr.lock_after_post(&item.id, &tenant, now).await.unwrap();
        assert_eq!(lock.reason, LockReason::RecentPost);
        assert_eq!(lock.locked_until, Some(now + Duration::days(30)));

        assert!(mgr.is_locked(&item.id, &tenant, now).await.unwrap());
        assert!(
            !mgr.is_locked(&item.id, &tenant, now + Duration::days(31))
                .await
                .unwrap()
        );

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn permanent_lock_survives_sweep_and_blocks_forever() {
        let (mgr, db, _dir) = manager().await;
        let tenant = Tenant::global();
        let item = media_item("m1", &tenant);
        media::insert(&db, &item).await.unwrap();

        let now = Utc::now();
        let lock = mgr
            .lock_permanently(&item.id, &tenant, "reviewer:alice", now)
            .await
            .unwrap();
        assert!(lock.locked_until.is_none());

        let far_future = now + Duration::days(10_000);
        assert_eq!(mgr.sweep_expired(far_future).await.unwrap(), 0);
        assert!(mgr.is_locked(&item.id, &tenant, far_future).await.unwrap());

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn double_lock_is_rejected_until_release() {
        let (mgr, db, _dir) = manager().await;
        let tenant = Tenant::global();
        let item = media_item("m1", &tenant);
        media::insert(&db, &item).await.unwrap();

        let now = Utc::now();
        let lock = mgr.lock_after_post(&item.id, &tenant, now).await.unwrap();

        let err = mgr
            .create(
                &item.id,
                &tenant,
                LockReason::ManualHold,
                Some(Duration::days(7)),
                "operator",
                now,
            )
            .await
            .unwrap_err();
        assert!(matches!(err, DripfeedError::LockHeld { .. }));

        assert!(mgr.release(&lock.id).await.unwrap());
        mgr.create(
            &item.id,
            &tenant,
            LockReason::ManualHold,
            Some(Duration::days(7)),
            "operator",
            now,
        )
        .await
        .unwrap();

        db.close().await.unwrap();
    }
}
