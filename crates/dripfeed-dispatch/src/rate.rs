// SPDX-FileCopyrightText: 2026 Dripfeed Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Rolling-window publish rate budget.
//!
//! Process-local: the budget bounds how fast this instance pushes to the
//! external surface, it is not a cross-instance quota. Timestamps older
//! than the window are pruned on every check.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use chrono::{DateTime, Duration, Utc};

use dripfeed_core::Tenant;

/// Per-tenant rolling window of recent successful publishes.
pub struct RateWindow {
    limit: u32,
    window: Duration,
    posts: Mutex<HashMap<Tenant, VecDeque<DateTime<Utc>>>>,
}

impl RateWindow {
    pub fn new(limit: u32, window: Duration) -> Self {
        Self {
            limit,
            window,
            posts: Mutex::new(HashMap::new()),
        }
    }

    /// Whether the tenant has budget for another publish right now.
    pub fn has_capacity(&self, tenant: &Tenant, now: DateTime<Utc>) -> bool {
        let mut posts = self.posts.lock().unwrap_or_else(|e| e.into_inner());
        let queue = posts.entry(tenant.clone()).or_default();
        Self::prune(queue, now, self.window);
        (queue.len() as u32) < self.limit
    }

    /// Record a successful publish against the tenant's budget.
    pub fn record(&self, tenant: &Tenant, now: DateTime<Utc>) {
        let mut posts = self.posts.lock().unwrap_or_else(|e| e.into_inner());
        let queue = posts.entry(tenant.clone()).or_default();
        Self::prune(queue, now, self.window);
        queue.push_back(now);
    }

    fn prune(queue: &mut VecDeque<DateTime<Utc>>, now: DateTime<Utc>, window: Duration) {
        let cutoff = now - window;
        while queue.front().is_some_and(|t| *t <= cutoff) {
            queue.pop_front();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn budget_exhausts_and_recovers() {
        let window = RateWindow::new(2, Duration::hours(1));
        let tenant = Tenant::global();
        let now = Utc::now();

        assert!(window.has_capacity(&tenant, now));
        window.record(&tenant, now);
        window.record(&tenant, now);
        assert!(!window.has_capacity(&tenant, now));

        // Budget frees up once the old posts age out of the window.
        assert!(window.has_capacity(&tenant, now + Duration::hours(2)));
    }

    #[test]
    fn budgets_are_per_tenant() {
        let window = RateWindow::new(1, Duration::hours(1));
        let a = Tenant::named("a");
        let b = Tenant::named("b");
        let now = Utc::now();

        window.record(&a, now);
        assert!(!window.has_capacity(&a, now));
        assert!(window.has_capacity(&b, now));
    }
}
