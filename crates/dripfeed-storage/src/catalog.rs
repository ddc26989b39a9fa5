// SPDX-FileCopyrightText: 2026 Dripfeed Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite-backed [`MediaCatalog`] implementation.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use dripfeed_core::traits::MediaCatalog;
use dripfeed_core::{DripfeedError, MediaId, MediaItem, Tenant};

use crate::database::Database;
use crate::queries::media;

/// Media catalog stored in the same SQLite database as the queue.
#[derive(Clone)]
pub struct SqliteCatalog {
    db: Database,
}

impl SqliteCatalog {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Add an item to the catalog.
    pub async fn add(&self, item: &MediaItem) -> Result<(), DripfeedError> {
        media::insert(&self.db, item).await
    }

    /// Mark an item inactive so it is never selected again.
    pub async fn deactivate(&self, media_id: &MediaId) -> Result<(), DripfeedError> {
        media::deactivate(&self.db, media_id).await
    }
}

#[async_trait]
impl MediaCatalog for SqliteCatalog {
    async fn list_eligible(
        &self,
        tenant: &Tenant,
        category: Option<&str>,
    ) -> Result<Vec<MediaItem>, DripfeedError> {
        media::list_eligible(&self.db, tenant, category).await
    }

    async fn get(&self, media_id: &MediaId) -> Result<Option<MediaItem>, DripfeedError> {
        media::get(&self.db, media_id).await
    }

    async fn record_post(
        &self,
        media_id: &MediaId,
        posted_at: DateTime<Utc>,
    ) -> Result<(), DripfeedError> {
        media::record_post(&self.db, media_id, posted_at).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{media_item, setup_db};

    #[tokio::test]
    async fn trait_object_round_trip() {
        let (db, _dir) = setup_db().await;
        let catalog = SqliteCatalog::new(db.clone());
        let tenant = Tenant::global();
        catalog.add(&media_item("m1", &tenant)).await.unwrap();

        let dyn_catalog: &dyn MediaCatalog = &catalog;
        let eligible = dyn_catalog.list_eligible(&tenant, None).await.unwrap();
        assert_eq!(eligible.len(), 1);

        catalog.deactivate(&eligible[0].id).await.unwrap();
        assert!(
            dyn_catalog
                .list_eligible(&tenant, None)
                .await
                .unwrap()
                .is_empty()
        );

        db.close().await.unwrap();
    }
}
