// SPDX-FileCopyrightText: 2026 Dripfeed Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Repost-prevention lock rows.
//!
//! The active predicate is `locked_until IS NULL OR locked_until > now`
//! everywhere: a NULL expiry is a permanent lock. Expired rows are left in
//! place until the periodic sweep deletes them; the predicate already makes
//! them invisible, so sweeping is hygiene, not correctness.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use rusqlite::params;

use dripfeed_core::DripfeedError;

use crate::database::{Database, decode_enum, decode_ts, encode_ts, map_tr_err};
use crate::models::{Lock, LockReason, MediaId, Tenant};

const LOCK_COLUMNS: &str = "id, media_id, tenant, locked_at, locked_until, reason, created_by";

const ACTIVE: &str = "(locked_until IS NULL OR locked_until > ?)";

fn row_to_lock(row: &rusqlite::Row<'_>) -> Result<Lock, rusqlite::Error> {
    let locked_at: String = row.get(3)?;
    let locked_until: Option<String> = row.get(4)?;
    let reason: String = row.get(5)?;
    Ok(Lock {
        id: row.get(0)?,
        media_id: MediaId(row.get(1)?),
        tenant: Tenant(row.get(2)?),
        locked_at: decode_ts(&locked_at)?,
        locked_until: locked_until.as_deref().map(decode_ts).transpose()?,
        reason: decode_enum::<LockReason>(&reason)?,
        created_by: row.get(6)?,
    })
}

/// Insert a lock, enforcing at most one active lock per (media, tenant).
///
/// The existence check and the insert run in the same single-writer closure,
/// so two concurrent callers cannot both pass the check. Returns `LockHeld`
/// when an active lock already exists; expired rows do not block.
pub async fn insert(db: &Database, lock: &Lock, now: DateTime<Utc>) -> Result<(), DripfeedError> {
    let media_id = lock.media_id.0.clone();
    let lock = lock.clone();
    let held: bool = db
        .connection()
        .call(move |conn| {
            let tx = conn.transaction()?;
            let existing: i64 = tx.query_row(
                &format!(
                    "SELECT COUNT(*) FROM locks
                     WHERE media_id = ?1 AND tenant IS ?2 AND {ACTIVE}"
                ),
                params![lock.media_id.0, lock.tenant.as_param(), encode_ts(&now)],
                |row| row.get(0),
            )?;
            if existing > 0 {
                tx.commit()?;
                return Ok(true);
            }
            tx.execute(
                "INSERT INTO locks (id, media_id, tenant, locked_at, locked_until, reason, created_by)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    lock.id,
                    lock.media_id.0,
                    lock.tenant.as_param(),
                    encode_ts(&lock.locked_at),
                    lock.locked_until.as_ref().map(encode_ts),
                    lock.reason.to_string(),
                    lock.created_by,
                ],
            )?;
            tx.commit()?;
            Ok(false)
        })
        .await
        .map_err(map_tr_err)?;

    if held {
        return Err(DripfeedError::LockHeld { media_id });
    }
    Ok(())
}

/// Whether the media item is under an active lock.
pub async fn is_locked(
    db: &Database,
    media_id: &MediaId,
    tenant: &Tenant,
    now: DateTime<Utc>,
) -> Result<bool, DripfeedError> {
    let media_id = media_id.0.clone();
    let tenant = tenant.clone();
    db.connection()
        .call(move |conn| {
            let n: i64 = conn.query_row(
                &format!(
                    "SELECT COUNT(*) FROM locks
                     WHERE media_id = ?1 AND tenant IS ?2 AND {ACTIVE}"
                ),
                params![media_id, tenant.as_param(), encode_ts(&now)],
                |row| row.get(0),
            )?;
            Ok(n > 0)
        })
        .await
        .map_err(map_tr_err)
}

/// All media ids with an active lock in the tenant's scope, for bulk
/// exclusion during slot allocation.
pub async fn active_locked_media(
    db: &Database,
    tenant: &Tenant,
    now: DateTime<Utc>,
) -> Result<HashSet<String>, DripfeedError> {
    let tenant = tenant.clone();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT media_id FROM locks WHERE tenant IS ?1 AND {ACTIVE}"
            ))?;
            let rows = stmt.query_map(params![tenant.as_param(), encode_ts(&now)], |row| {
                row.get(0)
            })?;
            Ok(rows.collect::<Result<HashSet<String>, _>>()?)
        })
        .await
        .map_err(map_tr_err)
}

/// The active lock on a media item, if any.
pub async fn get_active(
    db: &Database,
    media_id: &MediaId,
    tenant: &Tenant,
    now: DateTime<Utc>,
) -> Result<Option<Lock>, DripfeedError> {
    let media_id = media_id.0.clone();
    let tenant = tenant.clone();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {LOCK_COLUMNS} FROM locks
                 WHERE media_id = ?1 AND tenant IS ?2 AND {ACTIVE}"
            ))?;
            match stmt.query_row(
                params![media_id, tenant.as_param(), encode_ts(&now)],
                row_to_lock,
            ) {
                Ok(lock) => Ok(Some(lock)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e.into()),
            }
        })
        .await
        .map_err(map_tr_err)
}

/// All active locks in a tenant's scope, newest first.
pub async fn list_active(
    db: &Database,
    tenant: &Tenant,
    now: DateTime<Utc>,
) -> Result<Vec<Lock>, DripfeedError> {
    let tenant = tenant.clone();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {LOCK_COLUMNS} FROM locks
                 WHERE tenant IS ?1 AND {ACTIVE}
                 ORDER BY locked_at DESC"
            ))?;
            let rows =
                stmt.query_map(params![tenant.as_param(), encode_ts(&now)], row_to_lock)?;
            Ok(rows.collect::<Result<Vec<_>, _>>()?)
        })
        .await
        .map_err(map_tr_err)
}

/// Delete expired rows. Permanent locks (NULL expiry) are never touched.
pub async fn sweep_expired(db: &Database, now: DateTime<Utc>) -> Result<usize, DripfeedError> {
    db.connection()
        .call(move |conn| {
            let removed = conn.execute(
                "DELETE FROM locks WHERE locked_until IS NOT NULL AND locked_until <= ?1",
                params![encode_ts(&now)],
            )?;
            Ok(removed)
        })
        .await
        .map_err(map_tr_err)
}

/// Remove a lock early by id (operator release).
pub async fn release(db: &Database, id: &str) -> Result<bool, DripfeedError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| {
            let changed = conn.execute("DELETE FROM locks WHERE id = ?1", params![id])?;
            Ok(changed == 1)
        })
        .await
        .map_err(map_tr_err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queries::media;
    use crate::testing::{media_item, setup_db};
    use chrono::Duration;

    fn lock_for(item_id: &str, tenant: &Tenant, until: Option<DateTime<Utc>>) -> Lock {
        Lock {
            id: uuid::Uuid::new_v4().to_string(),
            media_id: MediaId(item_id.to_string()),
            tenant: tenant.clone(),
            locked_at: Utc::now(),
            locked_until: until,
            reason: LockReason::RecentPost,
            created_by: "coordinator".to_string(),
        }
    }

    #[tokio::test]
    async fn second_active_lock_is_rejected() {
        let (db, _dir) = setup_db().await;
        let tenant = Tenant::global();
        let item = media_item("m1", &tenant);
        media::insert(&db, &item).await.unwrap();

        let now = Utc::now();
        insert(&db, &lock_for("m1", &tenant, Some(now + Duration::days(30))), now)
            .await
            .unwrap();
        let err = insert(&db, &lock_for("m1", &tenant, Some(now + Duration::days(5))), now)
            .await
            .unwrap_err();
        assert!(matches!(err, DripfeedError::LockHeld { .. }));

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn expired_lock_does_not_block_a_new_one() {
        let (db, _dir) = setup_db().await;
        let tenant = Tenant::global();
        let item = media_item("m1", &tenant);
        media::insert(&db, &item).await.unwrap();

        let now = Utc::now();
        insert(&db, &lock_for("m1", &tenant, Some(now - Duration::hours(1))), now)
            .await
            .unwrap();
        assert!(!is_locked(&db, &item.id, &tenant, now).await.unwrap());
        insert(&db, &lock_for("m1", &tenant, Some(now + Duration::days(30))), now)
            .await
            .unwrap();
        assert!(is_locked(&db, &item.id, &tenant, now).await.unwrap());

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn sweep_removes_expired_but_never_permanent() {
        let (db, _dir) = setup_db().await;
        let tenant = Tenant::global();
        for id in ["expired", "live", "forever"] {
            media::insert(&db, &media_item(id, &tenant)).await.unwrap();
        }

        let now = Utc::now();
        insert(&db, &lock_for("expired", &tenant, Some(now - Duration::hours(1))), now)
            .await
            .unwrap();
        insert(&db, &lock_for("live", &tenant, Some(now + Duration::days(1))), now)
            .await
            .unwrap();
        let mut permanent = lock_for("forever", &tenant, None);
        permanent.reason = LockReason::PermanentReject;
        insert(&db, &permanent, now).await.unwrap();

        let removed = sweep_expired(&db, now).await.unwrap();
        assert_eq!(removed, 1);

        // A sweep far in the future still leaves the permanent lock alone.
        let removed = sweep_expired(&db, now + Duration::days(3650)).await.unwrap();
        assert_eq!(removed, 1);
        assert!(
            is_locked(&db, &MediaId("forever".into()), &tenant, now + Duration::days(3650))
                .await
                .unwrap()
        );

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn lock_scopes_are_per_tenant() {
        let (db, _dir) = setup_db().await;
        let a = Tenant::named("a");
        let b = Tenant::named("b");
        media::insert(&db, &media_item("m1", &a)).await.unwrap();

        let now = Utc::now();
        insert(&db, &lock_for("m1", &a, Some(now + Duration::days(1))), now)
            .await
            .unwrap();

        assert!(is_locked(&db, &MediaId("m1".into()), &a, now).await.unwrap());
        assert!(!is_locked(&db, &MediaId("m1".into()), &b, now).await.unwrap());

        let locked = active_locked_media(&db, &a, now).await.unwrap();
        assert!(locked.contains("m1"));

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn release_removes_by_id() {
        let (db, _dir) = setup_db().await;
        let tenant = Tenant::global();
        media::insert(&db, &media_item("m1", &tenant)).await.unwrap();

        let now = Utc::now();
        let lock = lock_for("m1", &tenant, Some(now + Duration::days(1)));
        insert(&db, &lock, now).await.unwrap();

        assert!(release(&db, &lock.id).await.unwrap());
        assert!(!release(&db, &lock.id).await.unwrap());
        assert!(!is_locked(&db, &MediaId("m1".into()), &tenant, now).await.unwrap());

        db.close().await.unwrap();
    }
}
