//! Catalog source abstraction.
//!
//! The [`CatalogSource`] trait is the engine's only view of persisted data:
//! versions, upgrade-path records, and compatibility records for one model.
//! Implementations must be `Send + Sync`; the engine calls them from
//! concurrent request tasks and never holds a lock across these calls.
//!
//! | Implementation | Backend |
//! |----------------|---------|
//! | [`memory::InMemoryCatalog`] | `HashMap` behind `RwLock`, for tests and embedding |
//! | `SqliteCatalog` (application crate) | SQLite via sqlx |

pub mod memory;

use anyhow::Result;
use async_trait::async_trait;

use crate::models::{CompatibilityRecord, ModelId, UpgradePathRecord, Version};
use crate::normalize::normalize_version;

/// Source of catalog rows for graph building.
///
/// Errors returned here reach callers as
/// [`EngineError::DataFetch`](crate::error::EngineError::DataFetch).
#[async_trait]
pub trait CatalogSource: Send + Sync {
    /// All versions of a model, ordered by normalized version. An unknown
    /// model yields an empty list.
    async fn versions(&self, model_id: ModelId) -> Result<Vec<Version>>;

    /// Upgrade-path records of a model.
    async fn upgrade_paths(&self, model_id: ModelId) -> Result<Vec<UpgradePathRecord>>;

    /// Allowed compatibility records of a model.
    async fn compatibilities(&self, model_id: ModelId) -> Result<Vec<CompatibilityRecord>>;

    /// Resolve a version label within a model.
    ///
    /// An exact label match wins; otherwise the normalized forms are compared
    /// so `"v4.2"` finds a version stored as `"4.2.0"`.
    async fn find_version(&self, model_id: ModelId, label: &str) -> Result<Option<Version>> {
        let versions = self.versions(model_id).await?;
        Ok(resolve_label(versions, label))
    }
}

/// Pick the version matching `label` from a model's version list.
pub fn resolve_label(versions: Vec<Version>, label: &str) -> Option<Version> {
    let label = label.trim();
    if let Some(exact) = versions.iter().position(|v| v.version_string == label) {
        return versions.into_iter().nth(exact);
    }
    let wanted = normalize_version(label)?;
    versions.into_iter().find(|v| {
        v.normalized_version.as_deref() == Some(wanted.as_str())
            || normalize_version(&v.version_string).as_deref() == Some(wanted.as_str())
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_exact_before_normalized() {
        let versions = vec![Version::new(1, "4.2.0"), Version::new(2, "v4.2")];
        assert_eq!(resolve_label(versions.clone(), "v4.2").unwrap().id, 2);
        assert_eq!(resolve_label(versions, "4.2.0").unwrap().id, 1);
    }

    #[test]
    fn test_resolve_normalized() {
        let versions = vec![Version::new(1, "Release 5.0.1")];
        assert_eq!(resolve_label(versions.clone(), "5.0.1").unwrap().id, 1);
        assert!(resolve_label(versions, "5.0.2").is_none());
        assert!(resolve_label(vec![], "").is_none());
    }
}
