// SPDX-FileCopyrightText: 2026 Dripfeed Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Dispatch coordination for the Dripfeed posting engine.
//!
//! The coordinator claims due queue entries one at a time, routes each to
//! the automated publish path or the manual-review path, rolls failed
//! attempts back into the queue with retry bookkeeping, and applies review
//! decisions from external actors. Background loops drive the poll cycle
//! and the lock-expiry sweep.

pub mod coordinator;
pub mod rate;
pub mod review;
pub mod runner;
pub mod status;

pub use coordinator::{DispatchCoordinator, DispatchOutcome, DispatchSettings};
pub use review::ReviewAction;
pub use status::{LockStatus, QueueStatusReport};
