// SPDX-FileCopyrightText: 2026 Dripfeed Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Boundary trait definitions for the Dripfeed core.
//!
//! The scheduling and dispatch engine treats the media catalog, the
//! publishing/notification transports, and the tenant configuration store as
//! external collaborators behind these traits. All traits use `#[async_trait]`
//! for dynamic dispatch compatibility.

pub mod catalog;
pub mod notify;
pub mod publish;
pub mod tenants;

// Re-export all traits at the traits module level for convenience.
pub use catalog::MediaCatalog;
pub use notify::Notifier;
pub use publish::Publisher;
pub use tenants::TenantDirectory;
