// SPDX-FileCopyrightText: 2026 Dripfeed Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Media catalog rows.

use chrono::{DateTime, Utc};
use rusqlite::params;

use dripfeed_core::DripfeedError;

use crate::database::{Database, decode_ts, encode_ts, map_tr_err};
use crate::models::{MediaId, MediaItem, Tenant};

const MEDIA_COLUMNS: &str = "id, tenant, category, caption, source, times_posted, \
                             last_posted_at, active, requires_review";

fn row_to_item(row: &rusqlite::Row<'_>) -> Result<MediaItem, rusqlite::Error> {
    let last_posted_at: Option<String> = row.get(6)?;
    Ok(MediaItem {
        id: MediaId(row.get(0)?),
        tenant: Tenant(row.get(1)?),
        category: row.get(2)?,
        caption: row.get(3)?,
        source: row.get(4)?,
        times_posted: row.get(5)?,
        last_posted_at: last_posted_at.as_deref().map(decode_ts).transpose()?,
        active: row.get(7)?,
        requires_review: row.get(8)?,
    })
}

pub async fn insert(db: &Database, item: &MediaItem) -> Result<(), DripfeedError> {
    let item = item.clone();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO media (id, tenant, category, caption, source, times_posted,
                                    last_posted_at, active, requires_review)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
                params![
                    item.id.0,
                    item.tenant.as_param(),
                    item.category,
                    item.caption,
                    item.source,
                    item.times_posted,
                    item.last_posted_at.as_ref().map(encode_ts),
                    item.active,
                    item.requires_review,
                ],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

pub async fn get(db: &Database, id: &MediaId) -> Result<Option<MediaItem>, DripfeedError> {
    let id = id.0.clone();
    db.connection()
        .call(move |conn| {
            let mut stmt =
                conn.prepare(&format!("SELECT {MEDIA_COLUMNS} FROM media WHERE id = ?1"))?;
            match stmt.query_row(params![id], row_to_item) {
                Ok(item) => Ok(Some(item)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e.into()),
            }
        })
        .await
        .map_err(map_tr_err)
}

/// Active items for a tenant, optionally restricted to one category.
///
/// Ordering is part of the selection contract: never-posted items first, then
/// oldest `last_posted_at`, then ascending post count, so rotation favors the
/// least-recently-used content. Ties are broken downstream with a random
/// shuffle, not here.
pub async fn list_eligible(
    db: &Database,
    tenant: &Tenant,
    category: Option<&str>,
) -> Result<Vec<MediaItem>, DripfeedError> {
    let tenant = tenant.clone();
    let category = category.map(str::to_string);
    db.connection()
        .call(move |conn| {
            let base = format!(
                "SELECT {MEDIA_COLUMNS} FROM media
                 WHERE tenant IS ?1 AND active = 1"
            );
            let order =
                "ORDER BY last_posted_at IS NOT NULL, last_posted_at ASC, times_posted ASC, id ASC";
            let items = match &category {
                Some(cat) => {
                    let mut stmt =
                        conn.prepare(&format!("{base} AND category = ?2 {order}"))?;
                    let rows =
                        stmt.query_map(params![tenant.as_param(), cat], row_to_item)?;
                    rows.collect::<Result<Vec<_>, _>>()?
                }
                None => {
                    let mut stmt = conn.prepare(&format!("{base} {order}"))?;
                    let rows = stmt.query_map(params![tenant.as_param()], row_to_item)?;
                    rows.collect::<Result<Vec<_>, _>>()?
                }
            };
            Ok(items)
        })
        .await
        .map_err(map_tr_err)
}

/// Bump the post counters after a successful publish.
pub async fn record_post(
    db: &Database,
    id: &MediaId,
    posted_at: DateTime<Utc>,
) -> Result<(), DripfeedError> {
    let id = id.0.clone();
    db.connection()
        .call(move |conn| {
            let changed = conn.execute(
                "UPDATE media SET times_posted = times_posted + 1, last_posted_at = ?1
                 WHERE id = ?2",
                params![encode_ts(&posted_at), id],
            )?;
            if changed == 0 {
                return Err(tokio_rusqlite::Error::Rusqlite(
                    rusqlite::Error::QueryReturnedNoRows,
                ));
            }
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// Deactivate an item so it is never selected again.
pub async fn deactivate(db: &Database, id: &MediaId) -> Result<(), DripfeedError> {
    let id = id.0.clone();
    db.connection()
        .call(move |conn| {
            conn.execute("UPDATE media SET active = 0 WHERE id = ?1", params![id])?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}
