// SPDX-FileCopyrightText: 2026 Dripfeed Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Review actions: an external actor finalizing an entry that went to the
//! manual-review surface.
//!
//! Feedback is immediate: the action resolves against local state before any
//! further side effect, and a duplicate act on an already-finalized entry is
//! answered from history instead of a bare not-found.

use chrono::Utc;
use serde::Deserialize;
use strum::{Display, EnumString};
use tracing::{info, warn};

use dripfeed_core::{DripfeedError, LockReason, Outcome};
use dripfeed_storage::queries::{history, queue};

use crate::coordinator::DispatchCoordinator;

/// Decision from the reviewing actor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, Deserialize)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ReviewAction {
    /// The reviewer published the item manually.
    Posted,
    /// The reviewer passed on the item this time; it stays eligible.
    Skipped,
    /// The reviewer rejected the item; it must never post again.
    Rejected,
}

impl DispatchCoordinator {
    /// Apply a review decision to an entry.
    ///
    /// Cancels any in-flight automated attempt on the entry first; if that
    /// attempt is still winding down the actor gets an immediate
    /// already-processing answer and can simply act again. A decision on an
    /// entry that already reached a terminal state answers
    /// [`DripfeedError::AlreadyHandled`] with the recorded outcome.
    pub async fn resolve_review(
        &self,
        entry_id: &str,
        action: ReviewAction,
        actor: &str,
    ) -> Result<Outcome, DripfeedError> {
        if let Some((_, token)) = self.cancellations.remove(entry_id) {
            token.cancel();
        }
        if self.in_flight.contains_key(entry_id) {
            return Err(DripfeedError::AlreadyProcessing {
                entry_id: entry_id.to_string(),
            });
        }

        let Some(entry) = queue::get(&self.db, entry_id).await? else {
            return match history::find_by_entry(&self.db, entry_id).await? {
                Some(record) => Err(DripfeedError::AlreadyHandled {
                    entry_id: entry_id.to_string(),
                    outcome: record.outcome,
                }),
                None => Err(DripfeedError::EntryNotFound {
                    entry_id: entry_id.to_string(),
                }),
            };
        };

        let now = Utc::now();
        let outcome = match action {
            ReviewAction::Posted => {
                self.finalize_posted(&entry, now, actor).await?;
                Outcome::Posted
            }
            ReviewAction::Skipped => {
                self.finalize(&entry, Outcome::Skipped, None, actor, now)
                    .await?;
                Outcome::Skipped
            }
            ReviewAction::Rejected => {
                self.reject_media(&entry, actor).await?;
                self.finalize(&entry, Outcome::Rejected, None, actor, now)
                    .await?;
                Outcome::Rejected
            }
        };
        info!(entry_id, %action, actor, "review decision applied");
        Ok(outcome)
    }

    /// Place the permanent-reject lock, replacing any existing active lock
    /// so the rejection always wins.
    async fn reject_media(
        &self,
        entry: &dripfeed_core::QueueEntry,
        actor: &str,
    ) -> Result<(), DripfeedError> {
        let now = Utc::now();
        match self
            .locks
            .create(
                &entry.media_id,
                &entry.tenant,
                LockReason::PermanentReject,
                None,
                actor,
                now,
            )
            .await
        {
            Ok(_) => Ok(()),
            Err(DripfeedError::LockHeld { .. }) => {
                if let Some(existing) = self
                    .locks
                    .active_lock(&entry.media_id, &entry.tenant, now)
                    .await?
                {
                    warn!(
                        media_id = %entry.media_id,
                        replaced = %existing.reason,
                        "replacing active lock with permanent reject"
                    );
                    self.locks.release(&existing.id).await?;
                }
                self.locks
                    .create(
                        &entry.media_id,
                        &entry.tenant,
                        LockReason::PermanentReject,
                        None,
                        actor,
                        now,
                    )
                    .await?;
                Ok(())
            }
            Err(e) => Err(e),
        }
    }
}
