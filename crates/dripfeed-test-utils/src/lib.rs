// SPDX-FileCopyrightText: 2026 Dripfeed Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! In-memory implementations of the boundary traits for tests.
//!
//! These doubles are deliberately simple: state behind a `Mutex`, scripted
//! results popped in order, and recorded calls exposed for assertions. They
//! live in a separate crate so every workspace member can use them as a dev
//! dependency without cycles.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use dripfeed_core::traits::{MediaCatalog, Notifier, Publisher, TenantDirectory};
use dripfeed_core::{
    Cadence, DripfeedError, MediaId, MediaItem, PublishReceipt, QueueEntry, ReviewHandle, Tenant,
};

/// In-memory media catalog.
#[derive(Default)]
pub struct MockCatalog {
    items: Mutex<Vec<MediaItem>>,
}

impl MockCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_items(items: Vec<MediaItem>) -> Self {
        Self {
            items: Mutex::new(items),
        }
    }

    pub fn add(&self, item: MediaItem) {
        self.items.lock().unwrap().push(item);
    }

    /// Snapshot of an item's posting counters, for assertions.
    pub fn stats(&self, media_id: &MediaId) -> Option<(i64, Option<DateTime<Utc>>)> {
        self.items
            .lock()
            .unwrap()
            .iter()
            .find(|i| &i.id == media_id)
            .map(|i| (i.times_posted, i.last_posted_at))
    }
}

#[async_trait]
impl MediaCatalog for MockCatalog {
    async fn list_eligible(
        &self,
        tenant: &Tenant,
        category: Option<&str>,
    ) -> Result<Vec<MediaItem>, DripfeedError> {
        let mut items: Vec<MediaItem> = self
            .items
            .lock()
            .unwrap()
            .iter()
            .filter(|i| {
                i.active
                    && i.tenant == *tenant
                    && category.is_none_or(|c| i.category.as_deref() == Some(c))
            })
            .cloned()
            .collect();
        items.sort_by_key(|i| (i.last_posted_at, i.times_posted));
        Ok(items)
    }

    async fn get(&self, media_id: &MediaId) -> Result<Option<MediaItem>, DripfeedError> {
        Ok(self
            .items
            .lock()
            .unwrap()
            .iter()
            .find(|i| &i.id == media_id)
            .cloned())
    }

    async fn record_post(
        &self,
        media_id: &MediaId,
        posted_at: DateTime<Utc>,
    ) -> Result<(), DripfeedError> {
        let mut items = self.items.lock().unwrap();
        let item = items
            .iter_mut()
            .find(|i| &i.id == media_id)
            .ok_or_else(|| DripfeedError::MediaNotFound {
                media_id: media_id.0.clone(),
            })?;
        item.times_posted += 1;
        item.last_posted_at = Some(posted_at);
        Ok(())
    }
}

/// Publisher double with scripted results.
///
/// Results are consumed front to back; when the script runs out every call
/// succeeds with an empty receipt. Calls are recorded as
/// `(media id, idempotency key)`.
#[derive(Default)]
pub struct MockPublisher {
    script: Mutex<VecDeque<Result<PublishReceipt, DripfeedError>>>,
    calls: Mutex<Vec<(MediaId, String)>>,
}

impl MockPublisher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_result(&self, result: Result<PublishReceipt, DripfeedError>) {
        self.script.lock().unwrap().push_back(result);
    }

    pub fn push_failure(&self, kind: dripfeed_core::PublishErrorKind, message: &str) {
        self.push_result(Err(DripfeedError::Publish {
            kind,
            message: message.to_string(),
        }));
    }

    pub fn calls(&self) -> Vec<(MediaId, String)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl Publisher for MockPublisher {
    async fn publish(
        &self,
        item: &MediaItem,
        idempotency_key: &str,
    ) -> Result<PublishReceipt, DripfeedError> {
        self.calls
            .lock()
            .unwrap()
            .push((item.id.clone(), idempotency_key.to_string()));
        match self.script.lock().unwrap().pop_front() {
            Some(result) => result,
            None => Ok(PublishReceipt { remote_id: None }),
        }
    }
}

/// Notifier double that records every review notification.
#[derive(Default)]
pub struct MockNotifier {
    notified: Mutex<Vec<(MediaId, String)>>,
    fail: Mutex<bool>,
}

impl MockNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make subsequent notifications fail, for rollback tests.
    pub fn set_failing(&self, fail: bool) {
        *self.fail.lock().unwrap() = fail;
    }

    /// Recorded `(media id, entry id)` pairs.
    pub fn notified(&self) -> Vec<(MediaId, String)> {
        self.notified.lock().unwrap().clone()
    }
}

#[async_trait]
impl Notifier for MockNotifier {
    async fn notify_for_review(
        &self,
        item: &MediaItem,
        entry: &QueueEntry,
    ) -> Result<ReviewHandle, DripfeedError> {
        if *self.fail.lock().unwrap() {
            return Err(DripfeedError::Notify {
                message: "notifier down".to_string(),
                source: None,
            });
        }
        self.notified
            .lock()
            .unwrap()
            .push((item.id.clone(), entry.id.clone()));
        Ok(ReviewHandle {
            reference: uuid::Uuid::new_v4().to_string(),
        })
    }
}

/// Fixed tenant directory built up with fluent setters.
#[derive(Default)]
pub struct StaticTenantDirectory {
    tenants: Vec<Tenant>,
    cadences: HashMap<Tenant, Cadence>,
    weights: HashMap<Tenant, HashMap<String, f64>>,
    paused: HashMap<Tenant, bool>,
    auto_publish: HashMap<Tenant, bool>,
}

impl StaticTenantDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_tenant(mut self, tenant: Tenant) -> Self {
        self.tenants.push(tenant);
        self
    }

    pub fn with_cadence(mut self, tenant: Tenant, cadence: Cadence) -> Self {
        self.cadences.insert(tenant, cadence);
        self
    }

    pub fn with_weights(mut self, tenant: Tenant, weights: HashMap<String, f64>) -> Self {
        self.weights.insert(tenant, weights);
        self
    }

    pub fn with_paused(mut self, tenant: Tenant, paused: bool) -> Self {
        self.paused.insert(tenant, paused);
        self
    }

    pub fn with_auto_publish(mut self, tenant: Tenant, enabled: bool) -> Self {
        self.auto_publish.insert(tenant, enabled);
        self
    }
}

#[async_trait]
impl TenantDirectory for StaticTenantDirectory {
    async fn tenants(&self) -> Result<Vec<Tenant>, DripfeedError> {
        Ok(self.tenants.clone())
    }

    async fn cadence(&self, tenant: &Tenant) -> Result<Cadence, DripfeedError> {
        Ok(self.cadences.get(tenant).copied().unwrap_or(Cadence {
            posts_per_day: 3,
            window_start: 9,
            window_end: 17,
        }))
    }

    async fn category_weights(
        &self,
        tenant: &Tenant,
    ) -> Result<Option<HashMap<String, f64>>, DripfeedError> {
        Ok(self.weights.get(tenant).cloned())
    }

    async fn is_paused(&self, tenant: &Tenant) -> Result<bool, DripfeedError> {
        Ok(self.paused.get(tenant).copied().unwrap_or(false))
    }

    async fn auto_publish_enabled(&self, tenant: &Tenant) -> Result<bool, DripfeedError> {
        Ok(self.auto_publish.get(tenant).copied().unwrap_or(true))
    }
}

/// A ready-to-use media item fixture.
pub fn media_fixture(id: &str, tenant: &Tenant, category: Option<&str>) -> MediaItem {
    MediaItem {
        id: MediaId(id.to_string()),
        tenant: tenant.clone(),
        category: category.map(str::to_string),
        caption: Some(format!("caption for {id}")),
        source: format!("assets/{id}.jpg"),
        times_posted: 0,
        last_posted_at: None,
        active: true,
        requires_review: false,
    }
}

/// A pending queue entry fixture for the given item.
pub fn entry_fixture(item: &MediaItem, scheduled_for: DateTime<Utc>) -> QueueEntry {
    QueueEntry {
        id: uuid::Uuid::new_v4().to_string(),
        media_id: item.id.clone(),
        tenant: item.tenant.clone(),
        scheduled_for,
        status: dripfeed_core::QueueStatus::Pending,
        retry_count: 0,
        max_retries: 3,
        next_retry_at: None,
        last_error: None,
        created_at: Utc::now(),
    }
}
