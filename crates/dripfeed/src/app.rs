// SPDX-FileCopyrightText: 2026 Dripfeed Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Wiring: builds the storage, allocator, and coordinator stack from
//! configuration. Shared by `serve` and the one-shot subcommands.

use std::sync::Arc;

use chrono::Duration;

use dripfeed_config::{ConfigTenantDirectory, DripfeedConfig};
use dripfeed_core::traits::{MediaCatalog, Notifier, Publisher};
use dripfeed_core::{DripfeedError, Tenant};
use dripfeed_dispatch::coordinator::{DispatchCoordinator, DispatchSettings};
use dripfeed_scheduler::{AllocatorSettings, SlotAllocator};
use dripfeed_storage::{Database, LockManager, SqliteCatalog};

use crate::webhook::{WebhookNotifier, WebhookPublisher};

/// Fully wired application state.
pub struct App {
    pub config: DripfeedConfig,
    pub db: Database,
    pub directory: Arc<ConfigTenantDirectory>,
    pub locks: LockManager,
    pub allocator: SlotAllocator,
    pub coordinator: Arc<DispatchCoordinator>,
}

impl App {
    pub async fn build(config: DripfeedConfig) -> Result<Self, DripfeedError> {
        let db =
            Database::open_with(&config.storage.database_path, config.storage.wal_mode).await?;

        let catalog: Arc<dyn MediaCatalog> = Arc::new(SqliteCatalog::new(db.clone()));
        let directory = Arc::new(ConfigTenantDirectory::new(&config));
        let locks = LockManager::new(db.clone(), Duration::hours(config.locks.cooldown_hours));

        let publish_timeout = std::time::Duration::from_secs(config.dispatch.publish_timeout_secs);
        let publisher: Arc<dyn Publisher> = Arc::new(WebhookPublisher::new(
            config.publish.endpoint.clone(),
            publish_timeout,
        )?);
        let notifier: Arc<dyn Notifier> = Arc::new(WebhookNotifier::new(
            config.review.endpoint.clone(),
            publish_timeout,
        )?);

        let coordinator = Arc::new(DispatchCoordinator::new(
            db.clone(),
            catalog.clone(),
            publisher,
            notifier,
            directory.clone(),
            locks.clone(),
            DispatchSettings {
                max_claims_per_cycle: config.dispatch.max_claims_per_cycle,
                publish_timeout,
                retry_backoff: Duration::seconds(config.dispatch.retry_backoff_secs),
                pause_shift: Duration::hours(config.dispatch.pause_shift_hours),
                rate_limit: config.publish.rate_limit,
                rate_window: Duration::seconds(config.publish.rate_window_secs as i64),
            },
        ));

        let allocator = SlotAllocator::new(
            db.clone(),
            catalog,
            locks.clone(),
            directory.clone(),
            AllocatorSettings {
                horizon_days: config.schedule.horizon_days,
                jitter_minutes: config.schedule.jitter_minutes,
                fallback_category: config.schedule.fallback_category.clone(),
                max_retries: config.dispatch.max_retries,
            },
        );

        Ok(Self {
            config,
            db,
            directory,
            locks,
            allocator,
            coordinator,
        })
    }

    /// The tenants a command should act on: the explicit one, or every
    /// configured tenant.
    pub async fn resolve_tenants(
        &self,
        tenant: Option<Tenant>,
    ) -> Result<Vec<Tenant>, DripfeedError> {
        use dripfeed_core::traits::TenantDirectory;
        match tenant {
            Some(tenant) => Ok(vec![tenant]),
            None => self.directory.tenants().await,
        }
    }

    pub async fn close(self) -> Result<(), DripfeedError> {
        self.db.close().await
    }
}
