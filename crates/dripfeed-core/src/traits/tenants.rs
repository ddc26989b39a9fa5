// SPDX-FileCopyrightText: 2026 Dripfeed Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Tenant directory trait: read-only per-tenant configuration.

use std::collections::HashMap;

use async_trait::async_trait;

use crate::error::DripfeedError;
use crate::types::{Cadence, Tenant};

/// Read-only view of per-tenant cadence, category weights, and pause state.
///
/// Implementations must answer from durable configuration, not process-local
/// state: the dispatch loops read pause state fresh every cycle so that it
/// survives restarts and multi-instance deployments.
#[async_trait]
pub trait TenantDirectory: Send + Sync {
    /// All tenants the periodic loops should iterate, including the
    /// legacy/global scope when it is configured.
    async fn tenants(&self) -> Result<Vec<Tenant>, DripfeedError>;

    /// Posting cadence for the tenant.
    async fn cadence(&self, tenant: &Tenant) -> Result<Cadence, DripfeedError>;

    /// Active category → ratio weights, or `None` when the tenant posts
    /// without category weighting. Ratios are expected to sum to 1.0; the
    /// allocator validates and reports violations.
    async fn category_weights(
        &self,
        tenant: &Tenant,
    ) -> Result<Option<HashMap<String, f64>>, DripfeedError>;

    /// Whether dispatch is paused for the tenant.
    async fn is_paused(&self, tenant: &Tenant) -> Result<bool, DripfeedError>;

    /// Whether the automated publishing path is enabled for the tenant.
    async fn auto_publish_enabled(&self, tenant: &Tenant) -> Result<bool, DripfeedError>;
}
