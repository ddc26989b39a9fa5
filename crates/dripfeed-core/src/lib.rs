// SPDX-FileCopyrightText: 2026 Dripfeed Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the Dripfeed posting engine.
//!
//! This crate provides the foundational trait definitions, error types, and
//! domain types used throughout the Dripfeed workspace. The scheduling,
//! dispatch, and storage crates all build on the contracts defined here.

pub mod error;
pub mod traits;
pub mod types;

// Re-export key items at crate root for ergonomic imports.
pub use error::{DripfeedError, PublishErrorKind};
pub use types::{
    Cadence, HistoryRecord, Lock, LockReason, MediaId, MediaItem, Outcome, PublishReceipt,
    QueueEntry, QueueStatus, ReviewHandle, Tenant,
};

// Re-export all boundary traits at crate root.
pub use traits::{MediaCatalog, Notifier, Publisher, TenantDirectory};

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn queue_status_round_trips() {
        for status in [QueueStatus::Pending, QueueStatus::Processing] {
            let s = status.to_string();
            let parsed = QueueStatus::from_str(&s).expect("should parse back");
            assert_eq!(status, parsed);
        }
    }

    #[test]
    fn lock_reason_uses_kebab_case() {
        assert_eq!(LockReason::RecentPost.to_string(), "recent-post");
        assert_eq!(LockReason::PermanentReject.to_string(), "permanent-reject");
        assert_eq!(
            LockReason::from_str("manual-hold").unwrap(),
            LockReason::ManualHold
        );
    }

    #[test]
    fn outcome_success_flag() {
        assert!(Outcome::Posted.is_success());
        assert!(!Outcome::Failed.is_success());
        assert!(!Outcome::Skipped.is_success());
        assert!(!Outcome::Rejected.is_success());
    }

    #[test]
    fn tenant_global_is_null_scope() {
        let global = Tenant::global();
        assert!(global.is_global());
        assert_eq!(global.as_param(), None);
        assert_eq!(global.to_string(), "global");

        let named = Tenant::named("studio-a");
        assert!(!named.is_global());
        assert_eq!(named.as_param(), Some("studio-a"));
        assert_eq!(named.to_string(), "studio-a");
    }

    #[test]
    fn error_variants_construct() {
        let _config = DripfeedError::Config("bad weights".into());
        let _storage = DripfeedError::Storage {
            source: Box::new(std::io::Error::other("disk")),
        };
        let _publish = DripfeedError::Publish {
            kind: PublishErrorKind::RateLimited,
            message: "429".into(),
        };
        let _handled = DripfeedError::AlreadyHandled {
            entry_id: "e1".into(),
            outcome: Outcome::Posted,
        };
    }
}
