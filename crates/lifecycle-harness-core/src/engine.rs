//! Upgrade path engine: per-model graph cache plus the public operations.
//!
//! # Graph lifecycle
//!
//! Each model is either *not built* or *built*. The first
//! [`compute_upgrade_path`](UpgradePathEngine::compute_upgrade_path) for a
//! model fetches its catalog rows and builds the graph; later calls reuse the
//! cached graph until [`rebuild`](UpgradePathEngine::rebuild) is called.
//! A model with no versions is not cached, so data ingested later is picked
//! up by the next request.
//!
//! # Concurrency
//!
//! The cache is a `RwLock<HashMap<ModelId, Arc<ModelGraph>>>`. Catalog
//! fetches run without any lock held. Each build produces a complete graph
//! before it is published, and publication is first-writer-wins: when two
//! tasks race to build the same model, the loser discards its copy and
//! returns the graph already in the cache, so every caller observes the
//! same graph.
//!
//! # Pipeline
//!
//! ```text
//! catalog rows ─▶ build_graph ─▶ find_path ─▶ expand_with_intermediates
//!                                                   │
//!                    UpgradePathResult ◀─ summarize ◀┘
//! ```

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use serde::Serialize;

use crate::error::{EngineError, PathError};
use crate::graph::{build_graph, ModelGraph};
use crate::models::{ModelId, RiskLevel, VersionId};
use crate::path::{expand_with_intermediates, find_path, has_path};
use crate::store::CatalogSource;
use crate::summary::{detail_path, overall_risk, total_downtime, UpgradeStep};

/// A computed upgrade path with rolled-up risk and downtime.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UpgradePathResult {
    pub model_id: ModelId,
    pub from_version_id: VersionId,
    pub to_version_id: VersionId,
    pub steps: Vec<UpgradeStep>,
    pub overall_risk: RiskLevel,
    pub total_estimated_downtime_minutes: Option<u32>,
    pub step_count: usize,
}

/// Why [`UpgradePathEngine::validate_path`] rejected a pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum InvalidPathReason {
    GraphNotBuilt,
    SourceVersionNotFound,
    TargetVersionNotFound,
    NoPath,
}

/// Outcome of [`UpgradePathEngine::validate_path`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PathValidation {
    pub valid: bool,
    pub reason: Option<String>,
    pub reason_code: Option<InvalidPathReason>,
}

impl PathValidation {
    pub fn ok() -> Self {
        Self {
            valid: true,
            reason: None,
            reason_code: None,
        }
    }

    pub fn invalid(code: InvalidPathReason, reason: String) -> Self {
        Self {
            valid: false,
            reason: Some(reason),
            reason_code: Some(code),
        }
    }
}

/// Computes upgrade paths over cached per-model graphs.
pub struct UpgradePathEngine {
    source: Arc<dyn CatalogSource>,
    graphs: RwLock<HashMap<ModelId, Arc<ModelGraph>>>,
}

impl UpgradePathEngine {
    pub fn new(source: Arc<dyn CatalogSource>) -> Self {
        Self {
            source,
            graphs: RwLock::new(HashMap::new()),
        }
    }

    /// The cached graph for a model, if it has been built.
    pub fn graph(&self, model_id: ModelId) -> Option<Arc<ModelGraph>> {
        self.read_graphs().get(&model_id).cloned()
    }

    /// Ids of all models with a cached graph, ascending.
    pub fn cached_models(&self) -> Vec<ModelId> {
        let mut ids: Vec<ModelId> = self.read_graphs().keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    /// Return the model's graph, building and caching it on first use.
    ///
    /// An empty graph is returned but not cached.
    pub async fn ensure_graph(&self, model_id: ModelId) -> Result<Arc<ModelGraph>, EngineError> {
        if let Some(graph) = self.graph(model_id) {
            tracing::debug!(model_id, "graph cache hit");
            return Ok(graph);
        }

        let graph = self.load_graph(model_id).await?;
        if graph.is_empty() {
            tracing::warn!(model_id, "no versions found for model");
            return Ok(Arc::new(graph));
        }

        let mut graphs = self.write_graphs();
        let cached = graphs
            .entry(model_id)
            .or_insert_with(|| Arc::new(graph))
            .clone();
        Ok(cached)
    }

    /// Fetch fresh catalog rows and replace the model's cached graph.
    ///
    /// Readers holding the previous graph keep using it; new calls see the
    /// replacement. If the model now has no versions its entry is removed.
    pub async fn rebuild(&self, model_id: ModelId) -> Result<Arc<ModelGraph>, EngineError> {
        let graph = Arc::new(self.load_graph(model_id).await?);
        let mut graphs = self.write_graphs();
        if graph.is_empty() {
            graphs.remove(&model_id);
        } else {
            graphs.insert(model_id, graph.clone());
        }
        Ok(graph)
    }

    async fn load_graph(&self, model_id: ModelId) -> Result<ModelGraph, EngineError> {
        let fetch_err = |source| EngineError::DataFetch { model_id, source };

        let versions = self.source.versions(model_id).await.map_err(fetch_err)?;
        if versions.is_empty() {
            return Ok(ModelGraph::new(model_id));
        }
        let upgrade_paths = self
            .source
            .upgrade_paths(model_id)
            .await
            .map_err(fetch_err)?;
        let compatibilities = self
            .source
            .compatibilities(model_id)
            .await
            .map_err(fetch_err)?;

        Ok(build_graph(
            model_id,
            &versions,
            &upgrade_paths,
            &compatibilities,
        ))
    }

    /// Compute the upgrade path between two versions of a model.
    ///
    /// Returns `Ok(None)` when the model has no versions or no directed route
    /// exists. An endpoint that is not a version of the model is
    /// [`EngineError::VersionNotInGraph`].
    pub async fn compute_upgrade_path(
        &self,
        model_id: ModelId,
        from_version_id: VersionId,
        to_version_id: VersionId,
    ) -> Result<Option<UpgradePathResult>, EngineError> {
        let graph = self.ensure_graph(model_id).await?;
        if graph.is_empty() {
            return Ok(None);
        }

        let hops = find_path(&graph, from_version_id, to_version_id)
            .map_err(|e| EngineError::from_path(model_id, e))?;
        let Some(hops) = hops else {
            tracing::info!(
                model_id,
                from = from_version_id,
                to = to_version_id,
                "no upgrade path found"
            );
            return Ok(None);
        };

        let expanded = expand_with_intermediates(&graph, &hops);
        let steps = detail_path(&graph, &expanded);
        tracing::debug!(
            model_id,
            from = from_version_id,
            to = to_version_id,
            hops = hops.len(),
            steps = steps.len(),
            "computed upgrade path"
        );

        Ok(Some(UpgradePathResult {
            model_id,
            from_version_id,
            to_version_id,
            overall_risk: overall_risk(&steps),
            total_estimated_downtime_minutes: total_downtime(&steps),
            step_count: steps.len(),
            steps,
        }))
    }

    /// Check whether a path exists using only the current cache.
    ///
    /// Never builds a graph: an unbuilt model is reported as
    /// [`InvalidPathReason::GraphNotBuilt`].
    pub fn validate_path(
        &self,
        model_id: ModelId,
        from_version_id: VersionId,
        to_version_id: VersionId,
    ) -> PathValidation {
        let Some(graph) = self.graph(model_id) else {
            return PathValidation::invalid(
                InvalidPathReason::GraphNotBuilt,
                format!("No graph available for model {}", model_id),
            );
        };

        match has_path(&graph, from_version_id, to_version_id) {
            Ok(true) => PathValidation::ok(),
            Ok(false) => PathValidation::invalid(
                InvalidPathReason::NoPath,
                format!(
                    "No upgrade path exists from version {} to {}",
                    from_version_id, to_version_id
                ),
            ),
            Err(PathError::VersionNotInGraph(id)) if id == from_version_id => {
                PathValidation::invalid(
                    InvalidPathReason::SourceVersionNotFound,
                    format!("Source version {} not found", id),
                )
            }
            Err(PathError::VersionNotInGraph(id)) => PathValidation::invalid(
                InvalidPathReason::TargetVersionNotFound,
                format!("Target version {} not found", id),
            ),
        }
    }

    fn read_graphs(&self) -> RwLockReadGuard<'_, HashMap<ModelId, Arc<ModelGraph>>> {
        self.graphs.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_graphs(&self) -> RwLockWriteGuard<'_, HashMap<ModelId, Arc<ModelGraph>>> {
        self.graphs.write().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CompatibilityRecord, UpgradePathRecord, Version};
    use crate::store::memory::InMemoryCatalog;

    const MODEL: ModelId = 1;

    fn base_catalog() -> Arc<InMemoryCatalog> {
        let catalog = InMemoryCatalog::new();
        catalog.insert_version(MODEL, Version::new(1, "4.0.0"));
        catalog.insert_version(MODEL, Version::new(2, "4.1.0"));
        catalog.insert_version(MODEL, Version::new(3, "4.2.0"));
        catalog.add_upgrade_path(MODEL, UpgradePathRecord::new(1, 2));
        catalog.add_upgrade_path(MODEL, UpgradePathRecord::new(2, 3));
        Arc::new(catalog)
    }

    #[tokio::test]
    async fn test_linear_path() {
        let engine = UpgradePathEngine::new(base_catalog());
        let result = engine.compute_upgrade_path(MODEL, 1, 3).await.unwrap().unwrap();

        let hops: Vec<_> = result
            .steps
            .iter()
            .map(|s| (s.from_version_id, s.to_version_id))
            .collect();
        assert_eq!(hops, vec![(1, 2), (2, 3)]);
        assert_eq!(result.overall_risk, RiskLevel::Low);
        assert_eq!(result.step_count, 2);
        assert_eq!(result.total_estimated_downtime_minutes, None);
        assert_eq!(result.steps[0].label(), "4.0.0 -> 4.1.0");
    }

    #[tokio::test]
    async fn test_expanded_hops_report_their_own_risk() {
        let catalog = base_catalog();
        catalog.add_upgrade_path(
            MODEL,
            UpgradePathRecord {
                mandatory_intermediates: vec![2],
                risk_level: Some(RiskLevel::High),
                ..UpgradePathRecord::new(1, 3)
            },
        );
        let engine = UpgradePathEngine::new(catalog);
        let result = engine.compute_upgrade_path(MODEL, 1, 3).await.unwrap().unwrap();

        // The direct 1→3 edge is the shortest path; expansion routes it
        // through 2, and each hop is scored by its own LOW edge.
        let hops: Vec<_> = result
            .steps
            .iter()
            .map(|s| (s.from_version_id, s.to_version_id))
            .collect();
        assert_eq!(hops, vec![(1, 2), (2, 3)]);
        assert_eq!(result.step_count, 2);
        assert_eq!(result.overall_risk, RiskLevel::Low);
    }

    #[tokio::test]
    async fn test_expanded_hop_without_edge_uses_defaults() {
        let catalog = InMemoryCatalog::new();
        for (id, label) in [(1, "1.0"), (2, "2.0"), (3, "2.5"), (4, "3.0"), (5, "4.0")] {
            catalog.insert_version(MODEL, Version::new(id, label));
        }
        catalog.add_upgrade_path(MODEL, UpgradePathRecord::new(1, 2));
        catalog.add_upgrade_path(
            MODEL,
            UpgradePathRecord {
                mandatory_intermediates: vec![3],
                risk_level: Some(RiskLevel::Med),
                ..UpgradePathRecord::new(2, 4)
            },
        );
        catalog.add_upgrade_path(
            MODEL,
            UpgradePathRecord {
                risk_level: Some(RiskLevel::High),
                estimated_downtime_minutes: Some(20),
                ..UpgradePathRecord::new(4, 5)
            },
        );
        let engine = UpgradePathEngine::new(Arc::new(catalog));
        let result = engine.compute_upgrade_path(MODEL, 1, 5).await.unwrap().unwrap();

        assert_eq!(result.step_count, 4);
        assert_eq!(result.steps[1].label(), "2.0 -> 2.5");
        assert_eq!(result.steps[1].risk_level, RiskLevel::Low);
        assert_eq!(result.steps[3].risk_level, RiskLevel::High);
        assert_eq!(result.overall_risk, RiskLevel::High);
        assert_eq!(result.total_estimated_downtime_minutes, Some(20));
    }

    #[tokio::test]
    async fn test_upgrade_path_beats_compatibility() {
        let catalog = base_catalog();
        catalog.add_compatibility(MODEL, CompatibilityRecord::allowed(2, 3));
        catalog.add_upgrade_path(
            MODEL,
            UpgradePathRecord {
                risk_level: Some(RiskLevel::Med),
                estimated_downtime_minutes: Some(15),
                ..UpgradePathRecord::new(2, 3)
            },
        );
        let engine = UpgradePathEngine::new(catalog);
        let result = engine.compute_upgrade_path(MODEL, 2, 3).await.unwrap().unwrap();
        assert_eq!(result.steps[0].risk_level, RiskLevel::Med);
        assert_eq!(result.total_estimated_downtime_minutes, Some(15));
    }

    #[tokio::test]
    async fn test_backward_query_is_none() {
        let engine = UpgradePathEngine::new(base_catalog());
        assert!(engine.compute_upgrade_path(MODEL, 3, 1).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_self_path_has_no_steps() {
        let engine = UpgradePathEngine::new(base_catalog());
        let result = engine.compute_upgrade_path(MODEL, 2, 2).await.unwrap().unwrap();
        assert!(result.steps.is_empty());
        assert_eq!(result.step_count, 0);
        assert_eq!(result.overall_risk, RiskLevel::Low);
    }

    #[tokio::test]
    async fn test_unknown_version_is_error() {
        let engine = UpgradePathEngine::new(base_catalog());
        let err = engine.compute_upgrade_path(MODEL, 1, 999).await.unwrap_err();
        assert!(matches!(
            err,
            EngineError::VersionNotInGraph {
                model_id: MODEL,
                version_id: 999
            }
        ));
    }

    #[tokio::test]
    async fn test_unknown_model_is_none_and_not_cached() {
        let catalog = base_catalog();
        let engine = UpgradePathEngine::new(catalog.clone());
        assert!(engine.compute_upgrade_path(42, 1, 2).await.unwrap().is_none());
        assert!(engine.graph(42).is_none());

        catalog.insert_version(42, Version::new(1, "1.0"));
        catalog.insert_version(42, Version::new(2, "2.0"));
        catalog.add_upgrade_path(42, UpgradePathRecord::new(1, 2));
        assert!(engine.compute_upgrade_path(42, 1, 2).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_graph_built_once() {
        let catalog = base_catalog();
        let engine = UpgradePathEngine::new(catalog.clone());
        for _ in 0..3 {
            engine.compute_upgrade_path(MODEL, 1, 3).await.unwrap();
        }
        assert_eq!(catalog.version_fetches(), 1);
        assert_eq!(engine.cached_models(), vec![MODEL]);
    }

    #[tokio::test]
    async fn test_cache_not_invalidated_until_rebuild() {
        let catalog = base_catalog();
        let engine = UpgradePathEngine::new(catalog.clone());
        assert!(engine.compute_upgrade_path(MODEL, 3, 1).await.unwrap().is_none());

        catalog.add_upgrade_path(MODEL, UpgradePathRecord::new(3, 1));
        assert!(engine.compute_upgrade_path(MODEL, 3, 1).await.unwrap().is_none());

        let rebuilt = engine.rebuild(MODEL).await.unwrap();
        assert_eq!(rebuilt.edge_count(), 3);
        assert!(engine.compute_upgrade_path(MODEL, 3, 1).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_fetch_failure_leaves_model_unbuilt() {
        let catalog = base_catalog();
        catalog.fail_fetches(MODEL);
        let engine = UpgradePathEngine::new(catalog.clone());

        let err = engine.compute_upgrade_path(MODEL, 1, 3).await.unwrap_err();
        assert!(matches!(err, EngineError::DataFetch { model_id: MODEL, .. }));
        assert!(engine.graph(MODEL).is_none());

        catalog.recover(MODEL);
        assert!(engine.compute_upgrade_path(MODEL, 1, 3).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_validate_does_not_build() {
        let catalog = base_catalog();
        let engine = UpgradePathEngine::new(catalog.clone());

        let v = engine.validate_path(MODEL, 1, 3);
        assert!(!v.valid);
        assert_eq!(v.reason_code, Some(InvalidPathReason::GraphNotBuilt));
        assert_eq!(catalog.version_fetches(), 0);
    }

    #[tokio::test]
    async fn test_validate_reasons_are_distinct() {
        let catalog = base_catalog();
        catalog.insert_version(MODEL, Version::new(4, "5.0.0"));
        let engine = UpgradePathEngine::new(catalog);
        engine.ensure_graph(MODEL).await.unwrap();

        assert_eq!(engine.validate_path(MODEL, 1, 3), PathValidation::ok());

        let missing = engine.validate_path(MODEL, 1, 999);
        assert!(!missing.valid);
        assert_eq!(missing.reason_code, Some(InvalidPathReason::TargetVersionNotFound));
        assert!(missing.reason.unwrap().contains("not found"));

        let source = engine.validate_path(MODEL, 999, 1);
        assert_eq!(source.reason_code, Some(InvalidPathReason::SourceVersionNotFound));

        let disconnected = engine.validate_path(MODEL, 1, 4);
        assert!(!disconnected.valid);
        assert_eq!(disconnected.reason_code, Some(InvalidPathReason::NoPath));
        assert!(disconnected.reason.unwrap().contains("No upgrade path"));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_first_requests_share_one_graph() {
        let catalog = base_catalog();
        let engine = Arc::new(UpgradePathEngine::new(catalog));

        let mut handles = Vec::new();
        for _ in 0..16 {
            let engine = engine.clone();
            handles.push(tokio::spawn(async move { engine.ensure_graph(MODEL).await }));
        }
        let mut graphs = Vec::new();
        for handle in handles {
            graphs.push(handle.await.unwrap().unwrap());
        }

        let cached = engine.graph(MODEL).unwrap();
        for graph in &graphs {
            assert!(Arc::ptr_eq(graph, &cached));
        }
        assert_eq!(cached.edge_count(), 2);
    }
}
