// SPDX-FileCopyrightText: 2026 Dripfeed Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Slot allocation for the Dripfeed posting engine.
//!
//! Turns per-tenant cadence and category weights into concrete queue entries:
//! weighted category counts via proportional allocation, evenly spaced slot
//! times with per-slot jitter, and least-recently-posted media selection with
//! lock and queue exclusions.

pub mod allocator;
pub mod ratio;
pub mod timing;

pub use allocator::{AllocationReport, AllocatorSettings, SlotAllocator};
