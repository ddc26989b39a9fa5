// SPDX-FileCopyrightText: 2026 Dripfeed Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Query modules for the posting queue, locks, history, and media catalog.

pub mod history;
pub mod locks;
pub mod media;
pub mod queue;
