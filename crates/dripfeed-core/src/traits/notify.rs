// SPDX-FileCopyrightText: 2026 Dripfeed Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Notifier trait: the manual-review surface.

use async_trait::async_trait;

use crate::error::DripfeedError;
use crate::types::{MediaItem, QueueEntry, ReviewHandle};

/// Manual-review notification capability.
///
/// The coordinator hands a claimed entry to the notifier when the item
/// requires human review or when automated publishing is unavailable. The
/// reviewing human later finalizes the entry through the review-action API.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Delivers the item to a human-visible review channel.
    async fn notify_for_review(
        &self,
        item: &MediaItem,
        entry: &QueueEntry,
    ) -> Result<ReviewHandle, DripfeedError>;
}
