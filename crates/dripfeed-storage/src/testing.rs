// SPDX-FileCopyrightText: 2026 Dripfeed Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Shared fixtures for storage tests.

use chrono::{DateTime, Utc};
use tempfile::TempDir;

use crate::database::Database;
use crate::models::{MediaId, MediaItem, QueueEntry, QueueStatus, Tenant};

pub(crate) async fn setup_db() -> (Database, TempDir) {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("test.db");
    let db = Database::open(path.to_str().unwrap()).await.unwrap();
    (db, dir)
}

pub(crate) fn media_item(id: &str, tenant: &Tenant) -> MediaItem {
    MediaItem {
        id: MediaId(id.to_string()),
        tenant: tenant.clone(),
        category: Some("general".to_string()),
        caption: None,
        source: format!("assets/{id}.jpg"),
        times_posted: 0,
        last_posted_at: None,
        active: true,
        requires_review: false,
    }
}

pub(crate) fn entry_for(item: &MediaItem, scheduled_for: DateTime<Utc>) -> QueueEntry {
    QueueEntry {
        id: uuid::Uuid::new_v4().to_string(),
        media_id: item.id.clone(),
        tenant: item.tenant.clone(),
        scheduled_for,
        status: QueueStatus::Pending,
        retry_count: 0,
        max_retries: 3,
        next_retry_at: None,
        last_error: None,
        created_at: Utc::now(),
    }
}
