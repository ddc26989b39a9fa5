// SPDX-FileCopyrightText: 2026 Dripfeed Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The dispatch coordinator: claims due entries and drives them to a
//! terminal state.
//!
//! State machine: `pending → processing → {posted, skipped, rejected,
//! failed}`. A failed side effect returns the entry to `pending` with retry
//! bookkeeping while retries remain; terminal states delete the entry after
//! writing its history record, so the queue never accumulates finished work.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use dripfeed_core::traits::{MediaCatalog, Notifier, Publisher, TenantDirectory};
use dripfeed_core::{
    DripfeedError, HistoryRecord, MediaItem, Outcome, PublishErrorKind, QueueEntry, Tenant,
};
use dripfeed_storage::queries::{history, queue};
use dripfeed_storage::{Database, LockManager};

use crate::rate::RateWindow;

/// Tuning knobs for the coordinator, taken from the dispatch and publish
/// sections of the service configuration.
#[derive(Debug, Clone)]
pub struct DispatchSettings {
    pub max_claims_per_cycle: u32,
    pub publish_timeout: std::time::Duration,
    /// Base retry delay; doubles with each failed attempt.
    pub retry_backoff: Duration,
    /// How far overdue entries of a paused tenant are pushed forward.
    pub pause_shift: Duration,
    pub rate_limit: u32,
    pub rate_window: Duration,
}

/// What happened to one claimed entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// Published automatically and finalized.
    Posted,
    /// Handed to the manual-review surface; awaiting an actor decision.
    SentForReview,
    /// Side effect failed; returned to pending with a retry scheduled.
    Retried,
    /// Retries exhausted or unrecoverable; terminally failed.
    Failed,
    /// A review action cancelled the attempt mid-flight.
    Cancelled,
}

/// Removes the in-flight marker when a processing attempt ends, on every
/// exit path.
#[derive(Debug)]
struct InFlightGuard<'a> {
    map: &'a DashMap<String, ()>,
    id: String,
}

impl<'a> InFlightGuard<'a> {
    fn acquire(map: &'a DashMap<String, ()>, id: &str) -> Result<Self, DripfeedError> {
        use dashmap::mapref::entry::Entry;
        match map.entry(id.to_string()) {
            Entry::Occupied(_) => Err(DripfeedError::AlreadyProcessing {
                entry_id: id.to_string(),
            }),
            Entry::Vacant(slot) => {
                slot.insert(());
                Ok(Self {
                    map,
                    id: id.to_string(),
                })
            }
        }
    }
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.map.remove(&self.id);
    }
}

/// Claims, routes, and finalizes posting attempts.
pub struct DispatchCoordinator {
    pub(crate) db: Database,
    pub(crate) catalog: Arc<dyn MediaCatalog>,
    publisher: Arc<dyn Publisher>,
    notifier: Arc<dyn Notifier>,
    directory: Arc<dyn TenantDirectory>,
    pub(crate) locks: LockManager,
    settings: DispatchSettings,
    rate: RateWindow,
    pub(crate) in_flight: DashMap<String, ()>,
    pub(crate) cancellations: DashMap<String, CancellationToken>,
}

impl DispatchCoordinator {
    pub fn new(
        db: Database,
        catalog: Arc<dyn MediaCatalog>,
        publisher: Arc<dyn Publisher>,
        notifier: Arc<dyn Notifier>,
        directory: Arc<dyn TenantDirectory>,
        locks: LockManager,
        settings: DispatchSettings,
    ) -> Self {
        let rate = RateWindow::new(settings.rate_limit, settings.rate_window);
        Self {
            db,
            catalog,
            publisher,
            notifier,
            directory,
            locks,
            settings,
            rate,
            in_flight: DashMap::new(),
            cancellations: DashMap::new(),
        }
    }

    /// One poll cycle over all tenants. A tenant's failure is logged and the
    /// cycle continues with the next tenant.
    pub async fn run_cycle(&self) {
        let tenants = match self.directory.tenants().await {
            Ok(tenants) => tenants,
            Err(e) => {
                error!(error = %e, "could not list tenants, skipping cycle");
                return;
            }
        };
        let now = Utc::now();
        for tenant in tenants {
            if let Err(e) = self.dispatch_tenant(&tenant, now).await {
                error!(tenant = %tenant, error = %e, "tenant dispatch failed");
            }
        }
    }

    /// Claim and process due entries for one tenant, bounded per cycle so an
    /// overdue backlog drains gradually instead of bursting.
    pub async fn dispatch_tenant(
        &self,
        tenant: &Tenant,
        now: DateTime<Utc>,
    ) -> Result<(), DripfeedError> {
        if self.directory.is_paused(tenant).await? {
            let moved =
                queue::reschedule_overdue(&self.db, tenant, now, self.settings.pause_shift)
                    .await?;
            if moved > 0 {
                info!(tenant = %tenant, moved, "paused tenant, shifted overdue entries");
            }
            return Ok(());
        }

        for _ in 0..self.settings.max_claims_per_cycle {
            let Some(entry) = queue::claim_due(&self.db, tenant, now).await? else {
                break;
            };
            let outcome = self.process_claimed(entry, now).await?;
            debug!(tenant = %tenant, ?outcome, "processed due entry");
        }
        Ok(())
    }

    /// Force-claim the oldest entry regardless of schedule and process it.
    pub async fn dispatch_next(
        &self,
        tenant: &Tenant,
    ) -> Result<Option<DispatchOutcome>, DripfeedError> {
        let now = Utc::now();
        match queue::claim_next(&self.db, tenant).await? {
            Some(entry) => Ok(Some(self.process_claimed(entry, now).await?)),
            None => Ok(None),
        }
    }

    async fn process_claimed(
        &self,
        entry: QueueEntry,
        now: DateTime<Utc>,
    ) -> Result<DispatchOutcome, DripfeedError> {
        let _guard = InFlightGuard::acquire(&self.in_flight, &entry.id)?;
        let token = CancellationToken::new();
        self.cancellations.insert(entry.id.clone(), token.clone());
        let result = self.route(&entry, &token, now).await;
        self.cancellations.remove(&entry.id);
        result
    }

    /// Choose and run the automated or manual path for a claimed entry.
    async fn route(
        &self,
        entry: &QueueEntry,
        token: &CancellationToken,
        now: DateTime<Utc>,
    ) -> Result<DispatchOutcome, DripfeedError> {
        if token.is_cancelled() {
            return Ok(DispatchOutcome::Cancelled);
        }

        let Some(item) = self.catalog.get(&entry.media_id).await? else {
            // Data integrity failure: retrying cannot produce the missing
            // row, so fail terminally right away.
            warn!(entry_id = %entry.id, media_id = %entry.media_id, "media row missing");
            self.finalize(entry, Outcome::Failed, Some("media item missing"), "coordinator", now)
                .await?;
            return Ok(DispatchOutcome::Failed);
        };

        let auto = self.directory.auto_publish_enabled(&entry.tenant).await?;
        let automated =
            !item.requires_review && auto && self.rate.has_capacity(&entry.tenant, now);

        if automated {
            self.attempt_publish(entry, &item, token, now).await
        } else {
            if !item.requires_review && auto {
                debug!(tenant = %entry.tenant, "publish budget exhausted, routing to review");
            }
            self.send_for_review(entry, &item, now).await
        }
    }

    async fn attempt_publish(
        &self,
        entry: &QueueEntry,
        item: &MediaItem,
        token: &CancellationToken,
        now: DateTime<Utc>,
    ) -> Result<DispatchOutcome, DripfeedError> {
        // Last checkpoint before the irreversible external call.
        if token.is_cancelled() {
            return Ok(DispatchOutcome::Cancelled);
        }

        let key = entry.idempotency_key();
        let attempt = self.publisher.publish(item, &key);
        match tokio::time::timeout(self.settings.publish_timeout, attempt).await {
            Ok(Ok(receipt)) => {
                debug!(
                    entry_id = %entry.id,
                    remote_id = receipt.remote_id.as_deref().unwrap_or("-"),
                    "published"
                );
                self.finalize_posted(entry, now, "coordinator").await?;
                Ok(DispatchOutcome::Posted)
            }
            Ok(Err(DripfeedError::Publish { kind, message })) if kind.is_recoverable() => {
                // The item still reaches a human even when the automated
                // surface is refusing work.
                warn!(entry_id = %entry.id, ?kind, %message, "publish degraded, falling back to review");
                self.send_for_review(entry, item, now).await
            }
            Ok(Err(DripfeedError::Publish { kind, message }))
                if kind == PublishErrorKind::Permanent =>
            {
                warn!(entry_id = %entry.id, %message, "permanent publish failure");
                self.finalize(entry, Outcome::Failed, Some(&message), "coordinator", now)
                    .await?;
                Ok(DispatchOutcome::Failed)
            }
            Ok(Err(e)) => self.rollback(entry, &e.to_string(), now).await,
            Err(_) => {
                warn!(entry_id = %entry.id, "publish timed out, falling back to review");
                self.send_for_review(entry, item, now).await
            }
        }
    }

    /// Hand the entry to the review surface. On success the entry stays
    /// `processing` until an external actor resolves it.
    async fn send_for_review(
        &self,
        entry: &QueueEntry,
        item: &MediaItem,
        now: DateTime<Utc>,
    ) -> Result<DispatchOutcome, DripfeedError> {
        match self.notifier.notify_for_review(item, entry).await {
            Ok(handle) => {
                debug!(entry_id = %entry.id, reference = %handle.reference, "sent for review");
                Ok(DispatchOutcome::SentForReview)
            }
            Err(e) => self.rollback(entry, &e.to_string(), now).await,
        }
    }

    /// Return a failed attempt to `pending` with doubled backoff, or fail it
    /// terminally once retries are exhausted.
    async fn rollback(
        &self,
        entry: &QueueEntry,
        error: &str,
        now: DateTime<Utc>,
    ) -> Result<DispatchOutcome, DripfeedError> {
        if entry.retry_count < entry.max_retries {
            let exp = u32::try_from(entry.retry_count).unwrap_or(u32::MAX).min(16);
            let backoff = self.settings.retry_backoff * 2_i32.pow(exp);
            queue::release_for_retry(&self.db, &entry.id, error, now + backoff).await?;
            info!(
                entry_id = %entry.id,
                attempt = entry.retry_count + 1,
                backoff_secs = backoff.num_seconds(),
                "attempt failed, retry scheduled"
            );
            Ok(DispatchOutcome::Retried)
        } else {
            warn!(entry_id = %entry.id, error, "retries exhausted, failing entry");
            self.finalize(entry, Outcome::Failed, Some(error), "coordinator", now)
                .await?;
            Ok(DispatchOutcome::Failed)
        }
    }

    /// Post-success bookkeeping: counters, cooldown lock, rate budget, and
    /// the terminal history record.
    pub(crate) async fn finalize_posted(
        &self,
        entry: &QueueEntry,
        now: DateTime<Utc>,
        actor: &str,
    ) -> Result<(), DripfeedError> {
        self.catalog.record_post(&entry.media_id, now).await?;
        match self
            .locks
            .lock_after_post(&entry.media_id, &entry.tenant, now)
            .await
        {
            Ok(_) => {}
            Err(DripfeedError::LockHeld { .. }) => {
                // A manual or seasonal lock already covers the item.
                warn!(media_id = %entry.media_id, "cooldown lock skipped, item already locked");
            }
            Err(e) => return Err(e),
        }
        self.rate.record(&entry.tenant, now);
        self.finalize(entry, Outcome::Posted, None, actor, now).await
    }

    /// Write the terminal history record, then delete the queue entry.
    pub(crate) async fn finalize(
        &self,
        entry: &QueueEntry,
        outcome: Outcome,
        error: Option<&str>,
        actor: &str,
        now: DateTime<Utc>,
    ) -> Result<(), DripfeedError> {
        let record = HistoryRecord {
            id: Uuid::new_v4().to_string(),
            entry_id: entry.id.clone(),
            media_id: entry.media_id.clone(),
            tenant: entry.tenant.clone(),
            outcome,
            success: outcome.is_success(),
            error: error.map(str::to_string),
            actor: actor.to_string(),
            scheduled_for: entry.scheduled_for,
            recorded_at: now,
        };
        history::record(&self.db, &record).await?;
        queue::remove(&self.db, &entry.id).await?;
        info!(entry_id = %entry.id, %outcome, actor, "entry finalized");
        Ok(())
    }
}
