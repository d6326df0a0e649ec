//! In-memory [`CatalogSource`] implementation for testing and embedding.
//!
//! Uses `HashMap` behind `std::sync::RwLock`. Versions are returned ordered
//! by normalized version, the same order the SQLite catalog produces.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{PoisonError, RwLock};

use anyhow::{bail, Result};
use async_trait::async_trait;

use crate::models::{CompatibilityRecord, ModelId, UpgradePathRecord, Version};
use crate::normalize::compare_versions;

use super::CatalogSource;

#[derive(Default)]
struct ModelCatalog {
    versions: Vec<Version>,
    upgrade_paths: Vec<UpgradePathRecord>,
    compatibilities: Vec<CompatibilityRecord>,
}

/// In-memory catalog keyed by model id.
#[derive(Default)]
pub struct InMemoryCatalog {
    models: RwLock<HashMap<ModelId, ModelCatalog>>,
    failing: RwLock<HashSet<ModelId>>,
    version_fetches: AtomicUsize,
}

impl InMemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a version, replacing any existing version with the same id.
    pub fn insert_version(&self, model_id: ModelId, version: Version) {
        let mut models = self.models.write().unwrap_or_else(PoisonError::into_inner);
        let catalog = models.entry(model_id).or_default();
        catalog.versions.retain(|v| v.id != version.id);
        catalog.versions.push(version);
    }

    pub fn add_upgrade_path(&self, model_id: ModelId, record: UpgradePathRecord) {
        let mut models = self.models.write().unwrap_or_else(PoisonError::into_inner);
        models.entry(model_id).or_default().upgrade_paths.push(record);
    }

    pub fn add_compatibility(&self, model_id: ModelId, record: CompatibilityRecord) {
        let mut models = self.models.write().unwrap_or_else(PoisonError::into_inner);
        models.entry(model_id).or_default().compatibilities.push(record);
    }

    /// Make every fetch for `model_id` fail until [`recover`](Self::recover).
    pub fn fail_fetches(&self, model_id: ModelId) {
        self.failing
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(model_id);
    }

    pub fn recover(&self, model_id: ModelId) {
        self.failing
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&model_id);
    }

    /// Number of `versions` calls served so far, failed ones included.
    pub fn version_fetches(&self) -> usize {
        self.version_fetches.load(Ordering::SeqCst)
    }

    fn check_available(&self, model_id: ModelId) -> Result<()> {
        let failing = self.failing.read().unwrap_or_else(PoisonError::into_inner);
        if failing.contains(&model_id) {
            bail!("catalog unavailable for model {}", model_id);
        }
        Ok(())
    }
}

#[async_trait]
impl CatalogSource for InMemoryCatalog {
    async fn versions(&self, model_id: ModelId) -> Result<Vec<Version>> {
        self.version_fetches.fetch_add(1, Ordering::SeqCst);
        self.check_available(model_id)?;
        let models = self.models.read().unwrap_or_else(PoisonError::into_inner);
        let mut versions = models
            .get(&model_id)
            .map(|c| c.versions.clone())
            .unwrap_or_default();
        versions.sort_by(|a, b| {
            let ka = a.normalized_version.as_deref().unwrap_or(&a.version_string);
            let kb = b.normalized_version.as_deref().unwrap_or(&b.version_string);
            compare_versions(ka, kb).then(a.id.cmp(&b.id))
        });
        Ok(versions)
    }

    async fn upgrade_paths(&self, model_id: ModelId) -> Result<Vec<UpgradePathRecord>> {
        self.check_available(model_id)?;
        let models = self.models.read().unwrap_or_else(PoisonError::into_inner);
        Ok(models
            .get(&model_id)
            .map(|c| c.upgrade_paths.clone())
            .unwrap_or_default())
    }

    async fn compatibilities(&self, model_id: ModelId) -> Result<Vec<CompatibilityRecord>> {
        self.check_available(model_id)?;
        let models = self.models.read().unwrap_or_else(PoisonError::into_inner);
        Ok(models
            .get(&model_id)
            .map(|c| c.compatibilities.iter().filter(|r| r.allowed).cloned().collect())
            .unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_versions_sorted_numerically() {
        let catalog = InMemoryCatalog::new();
        catalog.insert_version(1, Version::new(3, "4.10.0"));
        catalog.insert_version(1, Version::new(1, "4.9.0"));
        catalog.insert_version(1, Version::new(2, "v4.9.5"));

        let ids: Vec<_> = catalog.versions(1).await.unwrap().iter().map(|v| v.id).collect();
        assert_eq!(ids, vec![1, 2, 3]);
        assert!(catalog.versions(2).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_only_allowed_compatibilities_returned() {
        let catalog = InMemoryCatalog::new();
        catalog.add_compatibility(1, CompatibilityRecord::allowed(1, 2));
        catalog.add_compatibility(
            1,
            CompatibilityRecord {
                allowed: false,
                ..CompatibilityRecord::allowed(2, 3)
            },
        );
        let records = catalog.compatibilities(1).await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].to_version_id, 2);
    }

    #[tokio::test]
    async fn test_fail_and_recover() {
        let catalog = InMemoryCatalog::new();
        catalog.insert_version(1, Version::new(1, "1.0"));
        catalog.fail_fetches(1);
        assert!(catalog.versions(1).await.is_err());
        assert!(catalog.upgrade_paths(1).await.is_err());
        catalog.recover(1);
        assert_eq!(catalog.versions(1).await.unwrap().len(), 1);
        assert_eq!(catalog.version_fetches(), 2);
    }

    #[tokio::test]
    async fn test_find_version_default_impl() {
        let catalog = InMemoryCatalog::new();
        catalog.insert_version(1, Version::new(10, "4.2.0"));
        let found = catalog.find_version(1, "v4.2").await.unwrap();
        assert_eq!(found.map(|v| v.id), Some(10));
        assert!(catalog.find_version(1, "9.9").await.unwrap().is_none());
    }
}
