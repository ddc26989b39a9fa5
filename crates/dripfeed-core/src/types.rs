// SPDX-FileCopyrightText: 2026 Dripfeed Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Domain types shared across the Dripfeed workspace.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Unique identifier for a media item in the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MediaId(pub String);

impl std::fmt::Display for MediaId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// An isolated posting scope.
///
/// Queue entries, locks, and history are logically partitioned by tenant.
/// The `None` scope is the legacy/global tenant: rows with a NULL tenant
/// column belong to it. Scope comparisons in SQL must use `IS` semantics so
/// NULL matches NULL.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Tenant(pub Option<String>);

impl Tenant {
    /// The legacy/global scope (NULL tenant column).
    pub fn global() -> Self {
        Tenant(None)
    }

    /// A named tenant scope.
    pub fn named(name: impl Into<String>) -> Self {
        Tenant(Some(name.into()))
    }

    /// True for the legacy/global scope.
    pub fn is_global(&self) -> bool {
        self.0.is_none()
    }

    /// The value bound into SQL parameters (`None` binds NULL).
    pub fn as_param(&self) -> Option<&str> {
        self.0.as_deref()
    }
}

impl std::fmt::Display for Tenant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.0 {
            Some(name) => f.write_str(name),
            None => f.write_str("global"),
        }
    }
}

/// A unit of publishable content, owned by the external media catalog.
///
/// The dispatch coordinator is the only component that mutates catalog rows,
/// and only to bump `times_posted` / `last_posted_at` after a successful post.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaItem {
    pub id: MediaId,
    pub tenant: Tenant,
    /// Content category used for weighted slot allocation. `None` means
    /// uncategorized; such items only match category-less slots and fallback
    /// selection.
    pub category: Option<String>,
    /// Caption or description attached when the item is published.
    pub caption: Option<String>,
    /// Opaque locator for the underlying asset (file path, object key, URL).
    pub source: String,
    pub times_posted: i64,
    pub last_posted_at: Option<DateTime<Utc>>,
    pub active: bool,
    /// When set, the item always routes to manual review, never auto-publish.
    pub requires_review: bool,
}

/// Lifecycle status of a queue entry. Terminal outcomes are not statuses:
/// a terminal entry is deleted from the queue and snapshotted into history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, Serialize, Deserialize)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum QueueStatus {
    Pending,
    Processing,
}

/// A single scheduled posting attempt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueueEntry {
    pub id: String,
    pub media_id: MediaId,
    pub tenant: Tenant,
    pub scheduled_for: DateTime<Utc>,
    pub status: QueueStatus,
    pub retry_count: i64,
    pub max_retries: i64,
    pub next_retry_at: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl QueueEntry {
    /// Idempotency key passed to the publisher so an external surface that
    /// supports deduplication can detect a replayed attempt.
    pub fn idempotency_key(&self) -> String {
        format!("{}:{}", self.id, self.media_id)
    }
}

/// Why a lock exists on a media item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, Serialize, Deserialize)]
#[strum(serialize_all = "kebab-case")]
#[serde(rename_all = "kebab-case")]
pub enum LockReason {
    /// Cooldown created automatically after a successful post.
    RecentPost,
    /// An operator explicitly withheld the item.
    ManualHold,
    /// The item is out of season and parked until further notice.
    Seasonal,
    /// The item was rejected during review and must never post again.
    PermanentReject,
}

/// A time-bounded (or permanent) exclusion preventing a media item from
/// being reselected by the allocator.
///
/// `locked_until = None` is a permanent lock: it is never created by the
/// post-cooldown path and never removed by the expiry sweep.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Lock {
    pub id: String,
    pub media_id: MediaId,
    pub tenant: Tenant,
    pub locked_at: DateTime<Utc>,
    pub locked_until: Option<DateTime<Utc>>,
    pub reason: LockReason,
    pub created_by: String,
}

impl Lock {
    /// The active-lock predicate: NULL expiry or expiry in the future.
    ///
    /// This must agree with the SQL predicate used by the lock queries; both
    /// treat a NULL expiry as active forever.
    pub fn is_active(&self, now: DateTime<Utc>) -> bool {
        match self.locked_until {
            None => true,
            Some(until) => until > now,
        }
    }
}

/// Terminal outcome of a posting attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, Serialize, Deserialize)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    Posted,
    Failed,
    Skipped,
    Rejected,
}

impl Outcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Posted)
    }
}

/// Append-only audit record of a terminal posting attempt.
///
/// History is the source of truth for "did this already happen" once the
/// ephemeral queue entry is gone.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryRecord {
    pub id: String,
    /// Queue entry this record snapshots. Used for already-handled lookups.
    pub entry_id: String,
    pub media_id: MediaId,
    pub tenant: Tenant,
    pub outcome: Outcome,
    pub success: bool,
    pub error: Option<String>,
    /// Who finalized the entry: "coordinator" for automated paths, a
    /// reviewer identity for manual actions.
    pub actor: String,
    pub scheduled_for: DateTime<Utc>,
    pub recorded_at: DateTime<Utc>,
}

/// Posting cadence for one tenant.
///
/// `window_end < window_start` describes a window crossing midnight, e.g.
/// 21:00 through 02:00 the next day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cadence {
    pub posts_per_day: u32,
    /// First posting hour of the daily window (0-23).
    pub window_start: u8,
    /// Last posting hour of the daily window (0-23), inclusive.
    pub window_end: u8,
}

/// Receipt returned by a successful automated publish.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PublishReceipt {
    /// Identifier assigned by the external publishing surface, if any.
    pub remote_id: Option<String>,
}

/// Handle returned when an item is handed to the manual-review surface.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewHandle {
    /// Opaque reference to the review notification (message id, ticket id).
    pub reference: String,
}
