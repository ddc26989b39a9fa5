// SPDX-FileCopyrightText: 2026 Dripfeed Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The slot allocator: builds the future posting plan for a tenant.
//!
//! Planning is read-only against the media catalog. The allocator writes
//! queue entries and nothing else; post counters and locks are only touched
//! by the dispatch side after an attempt actually happens.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::{Days, NaiveDate, Utc};
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use serde::Serialize;
use tracing::{info, warn};
use uuid::Uuid;

use dripfeed_core::traits::{MediaCatalog, TenantDirectory};
use dripfeed_core::{DripfeedError, MediaItem, QueueEntry, QueueStatus, Tenant};
use dripfeed_storage::{Database, LockManager, queries::queue};

use crate::ratio;
use crate::timing;

/// Tuning knobs for the allocator, taken from the schedule section of the
/// service configuration.
#[derive(Debug, Clone)]
pub struct AllocatorSettings {
    pub horizon_days: u32,
    pub jitter_minutes: i64,
    pub fallback_category: String,
    pub max_retries: i64,
}

/// Result of one planning pass. Partial allocation is success: slots that
/// found no content are counted, not errored.
#[derive(Debug, Clone, Serialize)]
pub struct AllocationReport {
    pub tenant: String,
    pub requested: u32,
    pub created: u32,
    pub skipped: u32,
    pub issues: Vec<String>,
}

/// Plans posting slots and fills them with eligible media.
pub struct SlotAllocator {
    db: Database,
    catalog: Arc<dyn MediaCatalog>,
    locks: LockManager,
    directory: Arc<dyn TenantDirectory>,
    settings: AllocatorSettings,
}

impl SlotAllocator {
    pub fn new(
        db: Database,
        catalog: Arc<dyn MediaCatalog>,
        locks: LockManager,
        directory: Arc<dyn TenantDirectory>,
        settings: AllocatorSettings,
    ) -> Self {
        Self {
            db,
            catalog,
            locks,
            directory,
            settings,
        }
    }

    /// Plan `days` days of slots starting tomorrow.
    pub async fn plan(
        &self,
        tenant: &Tenant,
        days: u32,
    ) -> Result<AllocationReport, DripfeedError> {
        let start = Utc::now().date_naive() + Days::new(1);
        self.plan_from(tenant, start, days).await
    }

    /// Continue the plan from the day after the tenant's last scheduled
    /// entry, leaving existing entries untouched.
    pub async fn extend(
        &self,
        tenant: &Tenant,
        days: u32,
    ) -> Result<AllocationReport, DripfeedError> {
        let start = match queue::last_scheduled_for(&self.db, tenant).await? {
            Some(last) => last.date_naive() + Days::new(1),
            None => Utc::now().date_naive() + Days::new(1),
        };
        self.plan_from(tenant, start, days).await
    }

    async fn plan_from(
        &self,
        tenant: &Tenant,
        start_date: NaiveDate,
        days: u32,
    ) -> Result<AllocationReport, DripfeedError> {
        let now = Utc::now();
        let cadence = self.directory.cadence(tenant).await?;
        let weights = self.directory.category_weights(tenant).await?;
        let requested = days * cadence.posts_per_day;

        let mut issues = Vec::new();
        let mut rng = StdRng::from_entropy();

        let counts = weights.as_ref().and_then(|w| {
            ratio::category_counts(w, requested, &self.settings.fallback_category, &mut issues)
        });
        let sequence: Vec<Option<String>> = match counts {
            Some(counts) => ratio::slot_sequence(&counts, &mut rng),
            None => vec![None; requested as usize],
        };

        let locked = self.locks.locked_media(tenant, now).await?;
        let queued = queue::queued_media_ids(&self.db, tenant).await?;
        let eligible = self
            .eligible_pool(tenant, &locked, &queued)
            .await?;

        let mut pool = eligible.clone();
        Self::rank(&mut pool, &mut rng);

        let mut created = 0u32;
        let mut skipped = 0u32;
        let mut slots = sequence.into_iter();

        for day in 0..days {
            let times = timing::day_slot_times(
                start_date,
                day,
                &cadence,
                self.settings.jitter_minutes,
                &mut rng,
            );
            for time in times {
                let category = slots.next().flatten();

                // Repeat content rather than leave slots empty: when the
                // working set runs dry mid-plan, refill it from the eligible
                // pool. Within one refill round every item is used at most
                // once, so repeats are as spread out as supply allows.
                if pool.is_empty() && !eligible.is_empty() {
                    pool = eligible.clone();
                    Self::rank(&mut pool, &mut rng);
                }

                let idx = match &category {
                    Some(cat) => pool
                        .iter()
                        .position(|i| i.category.as_deref() == Some(cat))
                        .or_else(|| (!pool.is_empty()).then_some(0)),
                    None => (!pool.is_empty()).then_some(0),
                };

                let Some(idx) = idx else {
                    skipped += 1;
                    continue;
                };
                let item = pool.remove(idx);

                let entry = QueueEntry {
                    id: Uuid::new_v4().to_string(),
                    media_id: item.id.clone(),
                    tenant: tenant.clone(),
                    scheduled_for: time,
                    status: QueueStatus::Pending,
                    retry_count: 0,
                    max_retries: self.settings.max_retries,
                    next_retry_at: None,
                    last_error: None,
                    created_at: now,
                };
                match queue::enqueue(&self.db, &entry).await {
                    Ok(()) => created += 1,
                    Err(e) => {
                        warn!(media_id = %item.id, error = %e, "enqueue failed");
                        issues.push(format!("enqueue failed for {}: {e}", item.id));
                        skipped += 1;
                    }
                }
            }
        }

        info!(
            tenant = %tenant,
            requested,
            created,
            skipped,
            "allocation pass complete"
        );
        Ok(AllocationReport {
            tenant: tenant.to_string(),
            requested,
            created,
            skipped,
            issues,
        })
    }

    async fn eligible_pool(
        &self,
        tenant: &Tenant,
        locked: &HashSet<String>,
        queued: &HashSet<String>,
    ) -> Result<Vec<MediaItem>, DripfeedError> {
        let items = self.catalog.list_eligible(tenant, None).await?;
        Ok(items
            .into_iter()
            .filter(|i| !locked.contains(&i.id.0) && !queued.contains(&i.id.0))
            .collect())
    }

    /// Selection order: never-posted first, then oldest `last_posted_at`,
    /// then fewest `times_posted`. The shuffle before the stable sort makes
    /// ties break randomly.
    fn rank(pool: &mut [MediaItem], rng: &mut StdRng) {
        pool.shuffle(rng);
        pool.sort_by_key(|i| (i.last_posted_at, i.times_posted));
    }
}
