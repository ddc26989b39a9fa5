// SPDX-FileCopyrightText: 2026 Dripfeed Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite persistence layer for the Dripfeed posting engine.
//!
//! Provides WAL-mode SQLite storage with embedded migrations, a single-writer
//! concurrency model via `tokio-rusqlite`, and typed operations for the
//! posting queue, repost-prevention locks, the append-only dispatch history,
//! and the media catalog.
//!
//! The single-writer model is what makes the queue claim atomic: every
//! mutation runs as one closure on the connection's background thread, so a
//! select-then-update inside one closure cannot interleave with another
//! claimer.

pub mod catalog;
pub mod database;
pub mod lock_manager;
pub mod migrations;
pub mod models;
pub mod queries;

#[cfg(test)]
pub(crate) mod testing;

pub use catalog::SqliteCatalog;
pub use database::Database;
pub use lock_manager::LockManager;
pub use models::*;
