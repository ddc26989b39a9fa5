// SPDX-FileCopyrightText: 2026 Dripfeed Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Posting queue operations with atomic single-row claiming.
//!
//! The queue holds only live work: rows are `pending` or `processing`, and
//! terminal entries are deleted after being snapshotted into history. The
//! claim operation runs select-then-update inside one single-writer closure,
//! which gives the same exactly-one-claimer guarantee as a row-lock-with-skip
//! primitive would on a server database.

use std::collections::HashSet;

use chrono::{DateTime, Duration, Utc};
use rusqlite::params;

use dripfeed_core::DripfeedError;

use crate::database::{Database, decode_enum, decode_ts, encode_ts, map_tr_err};
use crate::models::{MediaId, QueueEntry, QueueStatus, Tenant};

const ENTRY_COLUMNS: &str = "id, media_id, tenant, scheduled_for, status, retry_count, \
                             max_retries, next_retry_at, last_error, created_at";

fn row_to_entry(row: &rusqlite::Row<'_>) -> Result<QueueEntry, rusqlite::Error> {
    let scheduled_for: String = row.get(3)?;
    let status: String = row.get(4)?;
    let next_retry_at: Option<String> = row.get(7)?;
    let created_at: String = row.get(9)?;
    Ok(QueueEntry {
        id: row.get(0)?,
        media_id: MediaId(row.get(1)?),
        tenant: Tenant(row.get(2)?),
        scheduled_for: decode_ts(&scheduled_for)?,
        status: decode_enum::<QueueStatus>(&status)?,
        retry_count: row.get(5)?,
        max_retries: row.get(6)?,
        next_retry_at: next_retry_at.as_deref().map(decode_ts).transpose()?,
        last_error: row.get(8)?,
        created_at: decode_ts(&created_at)?,
    })
}

/// Insert a new queue entry.
pub async fn enqueue(db: &Database, entry: &QueueEntry) -> Result<(), DripfeedError> {
    let entry = entry.clone();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO queue (id, media_id, tenant, scheduled_for, status, retry_count,
                                    max_retries, next_retry_at, last_error, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
                params![
                    entry.id,
                    entry.media_id.0,
                    entry.tenant.as_param(),
                    encode_ts(&entry.scheduled_for),
                    entry.status.to_string(),
                    entry.retry_count,
                    entry.max_retries,
                    entry.next_retry_at.as_ref().map(encode_ts),
                    entry.last_error,
                    encode_ts(&entry.created_at),
                ],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// Get an entry by id.
pub async fn get(db: &Database, id: &str) -> Result<Option<QueueEntry>, DripfeedError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {ENTRY_COLUMNS} FROM queue WHERE id = ?1"
            ))?;
            match stmt.query_row(params![id], row_to_entry) {
                Ok(entry) => Ok(Some(entry)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e.into()),
            }
        })
        .await
        .map_err(map_tr_err)
}

/// Atomically claim the oldest due pending entry for a tenant.
///
/// Due means `scheduled_for <= now` and, for retried entries, `next_retry_at
/// <= now`. Exactly one concurrent caller observes the pending row and flips
/// it to `processing`; everyone else gets `None`. Bounded to one row per
/// call so the dispatch loop drains a backlog gradually.
pub async fn claim_due(
    db: &Database,
    tenant: &Tenant,
    now: DateTime<Utc>,
) -> Result<Option<QueueEntry>, DripfeedError> {
    claim(db, tenant, Some(now)).await
}

/// Claim the oldest pending entry regardless of its scheduled time.
///
/// Used by the force-dispatch operational entry point.
pub async fn claim_next(
    db: &Database,
    tenant: &Tenant,
) -> Result<Option<QueueEntry>, DripfeedError> {
    claim(db, tenant, None).await
}

async fn claim(
    db: &Database,
    tenant: &Tenant,
    due_before: Option<DateTime<Utc>>,
) -> Result<Option<QueueEntry>, DripfeedError> {
    let tenant = tenant.clone();
    db.connection()
        .call(move |conn| {
            let tx = conn.transaction()?;

            let result = {
                let (sql, cutoff) = match due_before {
                    Some(now) => (
                        format!(
                            "SELECT {ENTRY_COLUMNS} FROM queue
                             WHERE tenant IS ?1 AND status = 'pending'
                               AND scheduled_for <= ?2
                               AND (next_retry_at IS NULL OR next_retry_at <= ?2)
                             ORDER BY scheduled_for ASC, id ASC
                             LIMIT 1"
                        ),
                        Some(encode_ts(&now)),
                    ),
                    None => (
                        format!(
                            "SELECT {ENTRY_COLUMNS} FROM queue
                             WHERE tenant IS ?1 AND status = 'pending'
                             ORDER BY scheduled_for ASC, id ASC
                             LIMIT 1"
                        ),
                        None,
                    ),
                };
                let mut stmt = tx.prepare(&sql)?;
                match cutoff {
                    Some(cutoff) => {
                        stmt.query_row(params![tenant.as_param(), cutoff], row_to_entry)
                    }
                    None => stmt.query_row(params![tenant.as_param()], row_to_entry),
                }
            };

            match result {
                Ok(entry) => {
                    // The conditional update is the claim: under the single
                    // writer no other claimer can run between the select and
                    // this statement, and the status guard keeps the
                    // operation safe even if that ever changes.
                    let changed = tx.execute(
                        "UPDATE queue SET status = 'processing' WHERE id = ?1 AND status = 'pending'",
                        params![entry.id],
                    )?;
                    tx.commit()?;
                    if changed == 1 {
                        Ok(Some(QueueEntry {
                            status: QueueStatus::Processing,
                            ..entry
                        }))
                    } else {
                        Ok(None)
                    }
                }
                Err(rusqlite::Error::QueryReturnedNoRows) => {
                    tx.commit()?;
                    Ok(None)
                }
                Err(e) => Err(e.into()),
            }
        })
        .await
        .map_err(map_tr_err)
}

/// Return a claimed entry to `pending` for another attempt.
///
/// Increments the retry counter, records the error, and sets the retry
/// cutoff so the entry is not immediately reclaimed.
pub async fn release_for_retry(
    db: &Database,
    id: &str,
    error: &str,
    next_retry_at: DateTime<Utc>,
) -> Result<(), DripfeedError> {
    let id = id.to_string();
    let error = error.to_string();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "UPDATE queue SET status = 'pending', retry_count = retry_count + 1,
                                  last_error = ?1, next_retry_at = ?2
                 WHERE id = ?3",
                params![error, encode_ts(&next_retry_at), id],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// Delete a terminal entry. The caller must have written history first.
pub async fn remove(db: &Database, id: &str) -> Result<bool, DripfeedError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| {
            let changed = conn.execute("DELETE FROM queue WHERE id = ?1", params![id])?;
            Ok(changed == 1)
        })
        .await
        .map_err(map_tr_err)
}

/// All media ids with a live queue entry for the tenant, used by the
/// allocator to exclude already-queued content.
pub async fn queued_media_ids(
    db: &Database,
    tenant: &Tenant,
) -> Result<HashSet<String>, DripfeedError> {
    let tenant = tenant.clone();
    db.connection()
        .call(move |conn| {
            let mut stmt =
                conn.prepare("SELECT media_id FROM queue WHERE tenant IS ?1")?;
            let rows = stmt.query_map(params![tenant.as_param()], |row| row.get(0))?;
            Ok(rows.collect::<Result<HashSet<String>, _>>()?)
        })
        .await
        .map_err(map_tr_err)
}

/// The latest scheduled time among the tenant's entries, used by
/// extend-schedule to find where the current plan ends.
pub async fn last_scheduled_for(
    db: &Database,
    tenant: &Tenant,
) -> Result<Option<DateTime<Utc>>, DripfeedError> {
    let tenant = tenant.clone();
    db.connection()
        .call(move |conn| {
            let max: Option<String> = conn.query_row(
                "SELECT MAX(scheduled_for) FROM queue WHERE tenant IS ?1",
                params![tenant.as_param()],
                |row| row.get(0),
            )?;
            max.as_deref().map(decode_ts).transpose().map_err(Into::into)
        })
        .await
        .map_err(map_tr_err)
}

/// Shift every overdue pending entry of a paused tenant forward by the given
/// increment, repeatedly, until each sits in the future. Returns the number
/// of entries moved.
///
/// Prevents a burst flood of stale items when the tenant resumes.
pub async fn reschedule_overdue(
    db: &Database,
    tenant: &Tenant,
    now: DateTime<Utc>,
    shift: Duration,
) -> Result<usize, DripfeedError> {
    let tenant = tenant.clone();
    db.connection()
        .call(move |conn| {
            let tx = conn.transaction()?;
            let overdue: Vec<(String, DateTime<Utc>)> = {
                let mut stmt = tx.prepare(
                    "SELECT id, scheduled_for FROM queue
                     WHERE tenant IS ?1 AND status = 'pending' AND scheduled_for <= ?2",
                )?;
                let rows = stmt.query_map(
                    params![tenant.as_param(), encode_ts(&now)],
                    |row| {
                        let id: String = row.get(0)?;
                        let ts: String = row.get(1)?;
                        Ok((id, decode_ts(&ts)?))
                    },
                )?;
                rows.collect::<Result<Vec<_>, _>>()?
            };

            for (id, scheduled_for) in &overdue {
                let mut shifted = *scheduled_for;
                while shifted <= now {
                    shifted += shift;
                }
                tx.execute(
                    "UPDATE queue SET scheduled_for = ?1 WHERE id = ?2",
                    params![encode_ts(&shifted), id],
                )?;
            }

            tx.commit()?;
            Ok(overdue.len())
        })
        .await
        .map_err(map_tr_err)
}

/// Return stale `processing` entries to `pending`.
///
/// Crash recovery: a process that died mid-dispatch leaves its claim behind;
/// entries stuck in `processing` longer than `older_than` become claimable
/// again on the next cycle. Review-pending entries are intentionally included
/// since re-notifying is safe for surfaces that honor the idempotency key.
pub async fn requeue_stale_processing(
    db: &Database,
    older_than: DateTime<Utc>,
) -> Result<usize, DripfeedError> {
    db.connection()
        .call(move |conn| {
            let changed = conn.execute(
                "UPDATE queue SET status = 'pending'
                 WHERE status = 'processing' AND scheduled_for <= ?1",
                params![encode_ts(&older_than)],
            )?;
            Ok(changed)
        })
        .await
        .map_err(map_tr_err)
}

/// Upcoming entries for a tenant in scheduled order, for status queries.
pub async fn list_upcoming(
    db: &Database,
    tenant: &Tenant,
    limit: i64,
) -> Result<Vec<QueueEntry>, DripfeedError> {
    let tenant = tenant.clone();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {ENTRY_COLUMNS} FROM queue WHERE tenant IS ?1
                 ORDER BY scheduled_for ASC LIMIT ?2"
            ))?;
            let rows = stmt.query_map(params![tenant.as_param(), limit], row_to_entry)?;
            Ok(rows.collect::<Result<Vec<_>, _>>()?)
        })
        .await
        .map_err(map_tr_err)
}

/// Count of live entries for a tenant.
pub async fn count(db: &Database, tenant: &Tenant) -> Result<i64, DripfeedError> {
    let tenant = tenant.clone();
    db.connection()
        .call(move |conn| {
            let n = conn.query_row(
                "SELECT COUNT(*) FROM queue WHERE tenant IS ?1",
                params![tenant.as_param()],
                |row| row.get(0),
            )?;
            Ok(n)
        })
        .await
        .map_err(map_tr_err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queries::media;
    use crate::testing::{entry_for, media_item, setup_db};

    #[tokio::test]
    async fn claim_lifecycle() {
        let (db, _dir) = setup_db().await;
        let tenant = Tenant::global();
        let item = media_item("m1", &tenant);
        media::insert(&db, &item).await.unwrap();

        let now = Utc::now();
        let entry = entry_for(&item, now - Duration::minutes(5));
        enqueue(&db, &entry).await.unwrap();

        let claimed = claim_due(&db, &tenant, now).await.unwrap().unwrap();
        assert_eq!(claimed.id, entry.id);
        assert_eq!(claimed.status, QueueStatus::Processing);

        // Nothing else is claimable now.
        assert!(claim_due(&db, &tenant, now).await.unwrap().is_none());

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn future_entries_are_not_due() {
        let (db, _dir) = setup_db().await;
        let tenant = Tenant::global();
        let item = media_item("m1", &tenant);
        media::insert(&db, &item).await.unwrap();

        let now = Utc::now();
        enqueue(&db, &entry_for(&item, now + Duration::hours(1)))
            .await
            .unwrap();

        assert!(claim_due(&db, &tenant, now).await.unwrap().is_none());
        // But force-claim takes it anyway.
        assert!(claim_next(&db, &tenant).await.unwrap().is_some());

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn concurrent_claimers_get_exactly_one_entry() {
        let (db, _dir) = setup_db().await;
        let tenant = Tenant::global();
        let item = media_item("m1", &tenant);
        media::insert(&db, &item).await.unwrap();

        let now = Utc::now();
        enqueue(&db, &entry_for(&item, now - Duration::minutes(1)))
            .await
            .unwrap();

        let mut handles = Vec::new();
        for _ in 0..10 {
            let db = db.clone();
            let tenant = tenant.clone();
            handles.push(tokio::spawn(async move {
                claim_due(&db, &tenant, now).await.unwrap()
            }));
        }

        let mut winners = 0;
        for handle in handles {
            if handle.await.unwrap().is_some() {
                winners += 1;
            }
        }
        assert_eq!(winners, 1, "exactly one claimer must win");

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn retry_release_and_backoff_cutoff() {
        let (db, _dir) = setup_db().await;
        let tenant = Tenant::global();
        let item = media_item("m1", &tenant);
        media::insert(&db, &item).await.unwrap();

        let now = Utc::now();
        let entry = entry_for(&item, now - Duration::minutes(1));
        enqueue(&db, &entry).await.unwrap();

        let claimed = claim_due(&db, &tenant, now).await.unwrap().unwrap();
        release_for_retry(&db, &claimed.id, "boom", now + Duration::minutes(10))
            .await
            .unwrap();

        let reloaded = get(&db, &claimed.id).await.unwrap().unwrap();
        assert_eq!(reloaded.status, QueueStatus::Pending);
        assert_eq!(reloaded.retry_count, 1);
        assert_eq!(reloaded.last_error.as_deref(), Some("boom"));

        // Not claimable until the retry cutoff passes.
        assert!(claim_due(&db, &tenant, now).await.unwrap().is_none());
        assert!(
            claim_due(&db, &tenant, now + Duration::minutes(11))
                .await
                .unwrap()
                .is_some()
        );

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn tenants_are_isolated() {
        let (db, _dir) = setup_db().await;
        let a = Tenant::named("a");
        let b = Tenant::named("b");
        let item_a = media_item("m-a", &a);
        let item_b = media_item("m-b", &b);
        media::insert(&db, &item_a).await.unwrap();
        media::insert(&db, &item_b).await.unwrap();

        let now = Utc::now();
        enqueue(&db, &entry_for(&item_a, now - Duration::minutes(1)))
            .await
            .unwrap();
        enqueue(&db, &entry_for(&item_b, now - Duration::minutes(1)))
            .await
            .unwrap();

        let claimed = claim_due(&db, &a, now).await.unwrap().unwrap();
        assert_eq!(claimed.media_id.0, "m-a");
        // Tenant b's entry is untouched by tenant a's claim.
        assert_eq!(count(&db, &b).await.unwrap(), 1);
        let b_claimed = claim_due(&db, &b, now).await.unwrap().unwrap();
        assert_eq!(b_claimed.media_id.0, "m-b");

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn reschedule_overdue_shifts_until_future() {
        let (db, _dir) = setup_db().await;
        let tenant = Tenant::global();
        let item = media_item("m1", &tenant);
        media::insert(&db, &item).await.unwrap();

        let now = Utc::now();
        // Three days overdue: one +24h shift is not enough.
        enqueue(&db, &entry_for(&item, now - Duration::days(3)))
            .await
            .unwrap();

        let moved = reschedule_overdue(&db, &tenant, now, Duration::hours(24))
            .await
            .unwrap();
        assert_eq!(moved, 1);

        let upcoming = list_upcoming(&db, &tenant, 10).await.unwrap();
        assert!(upcoming[0].scheduled_for > now);
        // Shifted in whole increments from the original time.
        assert!(upcoming[0].scheduled_for <= now + Duration::hours(24));

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn stale_processing_entries_are_requeued() {
        let (db, _dir) = setup_db().await;
        let tenant = Tenant::global();
        let item = media_item("m1", &tenant);
        media::insert(&db, &item).await.unwrap();

        let now = Utc::now();
        enqueue(&db, &entry_for(&item, now - Duration::hours(2)))
            .await
            .unwrap();
        let claimed = claim_due(&db, &tenant, now).await.unwrap().unwrap();

        let requeued = requeue_stale_processing(&db, now - Duration::hours(1))
            .await
            .unwrap();
        assert_eq!(requeued, 1);
        let reloaded = get(&db, &claimed.id).await.unwrap().unwrap();
        assert_eq!(reloaded.status, QueueStatus::Pending);

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn last_scheduled_for_tracks_max() {
        let (db, _dir) = setup_db().await;
        let tenant = Tenant::global();
        assert!(last_scheduled_for(&db, &tenant).await.unwrap().is_none());

        let item1 = media_item("m1", &tenant);
        let item2 = media_item("m2", &tenant);
        media::insert(&db, &item1).await.unwrap();
        media::insert(&db, &item2).await.unwrap();

        let now = Utc::now();
        let late = now + Duration::days(2);
        enqueue(&db, &entry_for(&item1, now)).await.unwrap();
        enqueue(&db, &entry_for(&item2, late)).await.unwrap();

        let max = last_scheduled_for(&db, &tenant).await.unwrap().unwrap();
        assert_eq!(
            max.timestamp_millis(),
            late.timestamp_millis()
        );

        db.close().await.unwrap();
    }
}
