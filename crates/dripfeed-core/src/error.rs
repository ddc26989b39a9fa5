// SPDX-FileCopyrightText: 2026 Dripfeed Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the Dripfeed posting engine.

use thiserror::Error;

use crate::types::Outcome;

/// Classification of a failed publish attempt.
///
/// The routing layer uses this to decide between fallback to manual review
/// (recoverable kinds) and failing the queue entry outright.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PublishErrorKind {
    /// The publishing surface refused the call due to rate limiting.
    RateLimited,
    /// The stored credential for the target account is no longer valid.
    CredentialExpired,
    /// A transient failure (timeout, 5xx) that may succeed on retry.
    Transient,
    /// A permanent failure that retrying cannot fix.
    Permanent,
}

impl PublishErrorKind {
    /// True for error kinds that should fall back to the manual-review path
    /// instead of failing the entry.
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, PublishErrorKind::Permanent)
    }
}

/// The primary error type used across all Dripfeed crates.
#[derive(Debug, Error)]
pub enum DripfeedError {
    /// Configuration errors (invalid TOML, missing required fields, bad ratios).
    #[error("configuration error: {0}")]
    Config(String),

    /// Storage backend errors (database connection, query failure, migration).
    #[error("storage error: {source}")]
    Storage {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// A publish attempt failed with a classified cause.
    #[error("publish failed ({kind:?}): {message}")]
    Publish {
        kind: PublishErrorKind,
        message: String,
    },

    /// The manual-review notification could not be delivered.
    #[error("notify failed: {message}")]
    Notify {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// A referenced media item does not exist in the catalog.
    #[error("media item not found: {media_id}")]
    MediaNotFound { media_id: String },

    /// A queue entry does not exist and has no history record.
    #[error("queue entry not found: {entry_id}")]
    EntryNotFound { entry_id: String },

    /// The entry already reached a terminal state via a concurrent action.
    #[error("entry {entry_id} already handled: {outcome}")]
    AlreadyHandled { entry_id: String, outcome: Outcome },

    /// A duplicate trigger arrived while the entry is still being processed.
    #[error("entry {entry_id} is already being processed")]
    AlreadyProcessing { entry_id: String },

    /// An active lock already exists for the media item.
    #[error("media item {media_id} already holds an active lock")]
    LockHeld { media_id: String },

    /// Operation timed out.
    #[error("operation timed out after {duration:?}")]
    Timeout { duration: std::time::Duration },

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

impl DripfeedError {
    /// Shorthand for wrapping an arbitrary error as a storage error.
    pub fn storage<E>(source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        DripfeedError::Storage {
            source: Box::new(source),
        }
    }
}
