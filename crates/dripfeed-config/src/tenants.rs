// SPDX-FileCopyrightText: 2026 Dripfeed Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Config-backed [`TenantDirectory`] implementation.
//!
//! Answers every query from the loaded configuration snapshot. Pause state is
//! deliberately not cached anywhere else: the dispatch loops call
//! [`TenantDirectory::is_paused`] fresh each cycle, so replacing the directory
//! (e.g. after a config reload) takes effect on the next cycle and survives
//! restarts and multi-instance deployments.

use std::collections::HashMap;

use async_trait::async_trait;

use dripfeed_core::{Cadence, DripfeedError, Tenant, TenantDirectory};

use crate::model::{DripfeedConfig, TenantEntry};

/// [`TenantDirectory`] backed by the `[defaults]` and `[tenants.*]` sections
/// of the Dripfeed configuration.
pub struct ConfigTenantDirectory {
    defaults: Cadence,
    enable_global: bool,
    default_auto_publish: bool,
    entries: HashMap<String, TenantEntry>,
}

impl ConfigTenantDirectory {
    pub fn new(config: &DripfeedConfig) -> Self {
        Self {
            defaults: Cadence {
                posts_per_day: config.defaults.posts_per_day,
                window_start: config.defaults.window_start,
                window_end: config.defaults.window_end,
            },
            enable_global: config.defaults.enable_global,
            default_auto_publish: config.defaults.auto_publish,
            entries: config.tenants.clone(),
        }
    }

    fn entry(&self, tenant: &Tenant) -> Option<&TenantEntry> {
        tenant.as_param().and_then(|name| self.entries.get(name))
    }
}

#[async_trait]
impl TenantDirectory for ConfigTenantDirectory {
    async fn tenants(&self) -> Result<Vec<Tenant>, DripfeedError> {
        let mut tenants = Vec::new();
        if self.enable_global {
            tenants.push(Tenant::global());
        }
        let mut names: Vec<&String> = self.entries.keys().collect();
        names.sort();
        tenants.extend(names.into_iter().map(Tenant::named));
        Ok(tenants)
    }

    async fn cadence(&self, tenant: &Tenant) -> Result<Cadence, DripfeedError> {
        let entry = self.entry(tenant);
        Ok(Cadence {
            posts_per_day: entry
                .and_then(|e| e.posts_per_day)
                .unwrap_or(self.defaults.posts_per_day),
            window_start: entry
                .and_then(|e| e.window_start)
                .unwrap_or(self.defaults.window_start),
            window_end: entry
                .and_then(|e| e.window_end)
                .unwrap_or(self.defaults.window_end),
        })
    }

    async fn category_weights(
        &self,
        tenant: &Tenant,
    ) -> Result<Option<HashMap<String, f64>>, DripfeedError> {
        Ok(self.entry(tenant).and_then(|e| e.weights.clone()))
    }

    async fn is_paused(&self, tenant: &Tenant) -> Result<bool, DripfeedError> {
        Ok(self.entry(tenant).map(|e| e.paused).unwrap_or(false))
    }

    async fn auto_publish_enabled(&self, tenant: &Tenant) -> Result<bool, DripfeedError> {
        Ok(self
            .entry(tenant)
            .and_then(|e| e.auto_publish)
            .unwrap_or(self.default_auto_publish))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::load_config_from_str;

    fn directory(toml: &str) -> ConfigTenantDirectory {
        let config = load_config_from_str(toml).expect("config should parse");
        ConfigTenantDirectory::new(&config)
    }

    #[tokio::test]
    async fn global_scope_enabled_by_default() {
        let dir = directory("");
        let tenants = dir.tenants().await.unwrap();
        assert_eq!(tenants, vec![Tenant::global()]);
    }

    #[tokio::test]
    async fn named_tenants_listed_in_stable_order() {
        let dir = directory(
            "[defaults]\nenable_global = false\n[tenants.beta]\n[tenants.alpha]\n",
        );
        let tenants = dir.tenants().await.unwrap();
        assert_eq!(tenants, vec![Tenant::named("alpha"), Tenant::named("beta")]);
    }

    #[tokio::test]
    async fn cadence_falls_back_to_defaults() {
        let dir = directory("[tenants.a]\nposts_per_day = 6\n");
        let cadence = dir.cadence(&Tenant::named("a")).await.unwrap();
        assert_eq!(cadence.posts_per_day, 6);
        assert_eq!(cadence.window_start, 9);
        assert_eq!(cadence.window_end, 17);

        let global = dir.cadence(&Tenant::global()).await.unwrap();
        assert_eq!(global.posts_per_day, 3);
    }

    #[tokio::test]
    async fn pause_and_auto_publish_flags() {
        let dir = directory("[tenants.a]\npaused = true\nauto_publish = true\n");
        assert!(dir.is_paused(&Tenant::named("a")).await.unwrap());
        assert!(dir.auto_publish_enabled(&Tenant::named("a")).await.unwrap());
        assert!(!dir.is_paused(&Tenant::global()).await.unwrap());
        assert!(!dir.auto_publish_enabled(&Tenant::global()).await.unwrap());
    }

    #[tokio::test]
    async fn auto_publish_inherits_the_default_unless_overridden() {
        let dir = directory(
            "[defaults]\nauto_publish = true\n[tenants.a]\n[tenants.b]\nauto_publish = false\n",
        );
        assert!(dir.auto_publish_enabled(&Tenant::global()).await.unwrap());
        // A tenant section without the flag inherits the default.
        assert!(dir.auto_publish_enabled(&Tenant::named("a")).await.unwrap());
        // An explicit flag wins over the default.
        assert!(!dir.auto_publish_enabled(&Tenant::named("b")).await.unwrap());
    }

    #[tokio::test]
    async fn weights_only_for_configured_tenants() {
        let dir = directory("[tenants.a.weights]\nmeme = 1.0\n");
        let weights = dir.category_weights(&Tenant::named("a")).await.unwrap();
        assert_eq!(weights.unwrap().get("meme"), Some(&1.0));
        assert!(dir
            .category_weights(&Tenant::global())
            .await
            .unwrap()
            .is_none());
    }
}
