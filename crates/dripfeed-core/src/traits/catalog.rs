// SPDX-FileCopyrightText: 2026 Dripfeed Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Media catalog trait: the read-mostly source of eligible content.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::DripfeedError;
use crate::types::{MediaId, MediaItem, Tenant};

/// Read-mostly source of publishable content and per-item posting stats.
///
/// Ingestion and indexing of content are out of scope for the core; the
/// allocator only reads from the catalog, and the dispatch coordinator only
/// writes through [`record_post`](MediaCatalog::record_post) after a
/// successful post.
#[async_trait]
pub trait MediaCatalog: Send + Sync {
    /// Lists active items eligible for the tenant, optionally narrowed to a
    /// category. The caller applies lock and queue exclusions on top.
    async fn list_eligible(
        &self,
        tenant: &Tenant,
        category: Option<&str>,
    ) -> Result<Vec<MediaItem>, DripfeedError>;

    /// Fetches a single item by id, or `None` if it does not exist.
    async fn get(&self, media_id: &MediaId) -> Result<Option<MediaItem>, DripfeedError>;

    /// Increments the item's posted counter and stamps `last_posted_at`.
    async fn record_post(
        &self,
        media_id: &MediaId,
        posted_at: DateTime<Utc>,
    ) -> Result<(), DripfeedError>;
}
