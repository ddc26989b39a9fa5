// SPDX-FileCopyrightText: 2026 Dripfeed Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Domain model types for storage entities.
//!
//! The canonical types are defined in `dripfeed-core::types` for use across
//! trait boundaries. This module re-exports them for convenience within the
//! storage crate.

pub use dripfeed_core::types::{
    HistoryRecord, Lock, LockReason, MediaId, MediaItem, Outcome, QueueEntry, QueueStatus, Tenant,
};
