// SPDX-FileCopyrightText: 2026 Dripfeed Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Publisher trait: the automated publishing surface.

use async_trait::async_trait;

use crate::error::DripfeedError;
use crate::types::{MediaItem, PublishReceipt};

/// Automated publishing capability.
///
/// Implementations must classify failures via
/// [`DripfeedError::Publish`](crate::DripfeedError::Publish) so the routing
/// layer can distinguish rate limiting and expired credentials (fall back to
/// manual review) from permanent failures.
#[async_trait]
pub trait Publisher: Send + Sync {
    /// Publishes the item to the external surface.
    ///
    /// `idempotency_key` identifies this posting attempt (entry id + media
    /// id); surfaces that support deduplication should use it to detect a
    /// replay of an attempt whose local commit was lost.
    async fn publish(
        &self,
        item: &MediaItem,
        idempotency_key: &str,
    ) -> Result<PublishReceipt, DripfeedError>;
}
