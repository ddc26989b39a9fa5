// SPDX-FileCopyrightText: 2026 Dripfeed Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Append-only dispatch history.
//!
//! Rows are inserted once and never updated or deleted. After the ephemeral
//! queue entry is removed, history is the only record that an attempt
//! happened, so already-handled checks and the rate-limit window both read
//! from here.

use chrono::{DateTime, Utc};
use rusqlite::params;

use dripfeed_core::DripfeedError;

use crate::database::{Database, decode_enum, decode_ts, encode_ts, map_tr_err};
use crate::models::{HistoryRecord, MediaId, Outcome, Tenant};

const HISTORY_COLUMNS: &str =
    "id, entry_id, media_id, tenant, outcome, success, error, actor, scheduled_for, recorded_at";

fn row_to_record(row: &rusqlite::Row<'_>) -> Result<HistoryRecord, rusqlite::Error> {
    let outcome: String = row.get(4)?;
    let scheduled_for: String = row.get(8)?;
    let recorded_at: String = row.get(9)?;
    Ok(HistoryRecord {
        id: row.get(0)?,
        entry_id: row.get(1)?,
        media_id: MediaId(row.get(2)?),
        tenant: Tenant(row.get(3)?),
        outcome: decode_enum::<Outcome>(&outcome)?,
        success: row.get(5)?,
        error: row.get(6)?,
        actor: row.get(7)?,
        scheduled_for: decode_ts(&scheduled_for)?,
        recorded_at: decode_ts(&recorded_at)?,
    })
}

pub async fn record(db: &Database, record: &HistoryRecord) -> Result<(), DripfeedError> {
    let record = record.clone();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO history (id, entry_id, media_id, tenant, outcome, success, error,
                                      actor, scheduled_for, recorded_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
                params![
                    record.id,
                    record.entry_id,
                    record.media_id.0,
                    record.tenant.as_param(),
                    record.outcome.to_string(),
                    record.success,
                    record.error,
                    record.actor,
                    encode_ts(&record.scheduled_for),
                    encode_ts(&record.recorded_at),
                ],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// The terminal record for a queue entry, if one exists.
///
/// Used to answer "was this already handled" after the entry left the queue,
/// e.g. when a reviewer acts twice on the same notification.
pub async fn find_by_entry(
    db: &Database,
    entry_id: &str,
) -> Result<Option<HistoryRecord>, DripfeedError> {
    let entry_id = entry_id.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {HISTORY_COLUMNS} FROM history WHERE entry_id = ?1
                 ORDER BY recorded_at DESC LIMIT 1"
            ))?;
            match stmt.query_row(params![entry_id], row_to_record) {
                Ok(record) => Ok(Some(record)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e.into()),
            }
        })
        .await
        .map_err(map_tr_err)
}

/// Most recent records for a tenant, newest first.
pub async fn recent(
    db: &Database,
    tenant: &Tenant,
    limit: i64,
) -> Result<Vec<HistoryRecord>, DripfeedError> {
    let tenant = tenant.clone();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {HISTORY_COLUMNS} FROM history WHERE tenant IS ?1
                 ORDER BY recorded_at DESC LIMIT ?2"
            ))?;
            let rows = stmt.query_map(params![tenant.as_param(), limit], row_to_record)?;
            Ok(rows.collect::<Result<Vec<_>, _>>()?)
        })
        .await
        .map_err(map_tr_err)
}

/// Successful posts recorded after `since`, for the rolling rate-limit
/// window.
pub async fn posted_count_since(
    db: &Database,
    tenant: &Tenant,
    since: DateTime<Utc>,
) -> Result<i64, DripfeedError> {
    let tenant = tenant.clone();
    db.connection()
        .call(move |conn| {
            let n = conn.query_row(
                "SELECT COUNT(*) FROM history
                 WHERE tenant IS ?1 AND success = 1 AND recorded_at > ?2",
                params![tenant.as_param(), encode_ts(&since)],
                |row| row.get(0),
            )?;
            Ok(n)
        })
        .await
        .map_err(map_tr_err)
}
