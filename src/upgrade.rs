//! Upgrade path lookup by version label.
//!
//! Resolves caller-supplied version strings against the catalog, runs the
//! [`UpgradePathEngine`], and shapes the result for output. Used by both the
//! `lch path` / `lch validate` CLI commands and the HTTP endpoints.

use std::sync::Arc;

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;

use lifecycle_harness_core::engine::{
    InvalidPathReason, PathValidation, UpgradePathEngine, UpgradePathResult,
};
use lifecycle_harness_core::error::EngineError;
use lifecycle_harness_core::models::{ModelId, RiskLevel};
use lifecycle_harness_core::store::CatalogSource;

use crate::config::Config;
use crate::db;
use crate::sqlite_store::SqliteCatalog;

/// Body of `POST /upgrade-path` and `POST /upgrade-path/validate`.
#[derive(Debug, Clone, Deserialize)]
pub struct PathRequest {
    pub model_id: ModelId,
    pub current_version: String,
    pub target_version: String,
}

/// One step of an upgrade path as shown to callers.
#[derive(Debug, Clone, Serialize)]
pub struct StepResponse {
    /// `"<from> -> <to>"`.
    pub step: String,
    pub risk: RiskLevel,
    pub notes: Option<String>,
    pub requires_backup: bool,
    pub requires_reboot: bool,
    pub estimated_downtime_minutes: Option<u32>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PathResponse {
    pub model_id: ModelId,
    pub from_version: String,
    pub to_version: String,
    pub steps: Vec<StepResponse>,
    pub overall_risk: RiskLevel,
    pub total_estimated_downtime_minutes: Option<u32>,
    pub step_count: usize,
}

impl PathResponse {
    fn from_result(from_version: String, to_version: String, result: UpgradePathResult) -> Self {
        let steps = result
            .steps
            .iter()
            .map(|s| StepResponse {
                step: s.label(),
                risk: s.risk_level,
                notes: s.notes.clone(),
                requires_backup: s.requires_backup,
                requires_reboot: s.requires_reboot,
                estimated_downtime_minutes: s.estimated_downtime_minutes,
            })
            .collect();
        Self {
            model_id: result.model_id,
            from_version,
            to_version,
            steps,
            overall_risk: result.overall_risk,
            total_estimated_downtime_minutes: result.total_estimated_downtime_minutes,
            step_count: result.step_count,
        }
    }
}

/// Outcome of a label-based path lookup. Callers render each case
/// differently, so "not found" and "no path" are not folded into errors.
#[derive(Debug, Clone)]
pub enum PathLookup {
    Found(PathResponse),
    VersionNotFound(String),
    NoPath { from: String, to: String },
}

/// Graph summary returned by a rebuild.
#[derive(Debug, Clone, Serialize)]
pub struct RebuildResponse {
    pub model_id: ModelId,
    pub versions: usize,
    pub edges: usize,
}

/// A shared engine plus the catalog it reads from.
#[derive(Clone)]
pub struct UpgradeService {
    catalog: Arc<SqliteCatalog>,
    engine: Arc<UpgradePathEngine>,
}

impl UpgradeService {
    pub fn new(pool: SqlitePool) -> Self {
        let catalog = Arc::new(SqliteCatalog::new(pool));
        let engine = Arc::new(UpgradePathEngine::new(catalog.clone()));
        Self { catalog, engine }
    }

    pub fn catalog(&self) -> &SqliteCatalog {
        &self.catalog
    }

    pub fn engine(&self) -> &UpgradePathEngine {
        &self.engine
    }

    /// Resolve both labels and compute the path, building the graph if needed.
    pub async fn lookup_path(
        &self,
        model_id: ModelId,
        current: &str,
        target: &str,
    ) -> Result<PathLookup> {
        let Some(from) = self.catalog.find_version(model_id, current).await? else {
            return Ok(PathLookup::VersionNotFound(not_found_message(model_id, current)));
        };
        let Some(to) = self.catalog.find_version(model_id, target).await? else {
            return Ok(PathLookup::VersionNotFound(not_found_message(model_id, target)));
        };

        match self
            .engine
            .compute_upgrade_path(model_id, from.id, to.id)
            .await
        {
            Ok(Some(result)) => Ok(PathLookup::Found(PathResponse::from_result(
                from.version_string,
                to.version_string,
                result,
            ))),
            Ok(None) => Ok(PathLookup::NoPath {
                from: from.version_string,
                to: to.version_string,
            }),
            // The cached graph predates this version; a rebuild will pick it up.
            Err(EngineError::VersionNotInGraph { version_id, .. }) => {
                let label = if version_id == from.id { current } else { target };
                Ok(PathLookup::VersionNotFound(format!(
                    "version '{}' is not in the cached graph for model {}; rebuild the model",
                    label, model_id
                )))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Validate against the cached graph only.
    pub async fn validate(
        &self,
        model_id: ModelId,
        current: &str,
        target: &str,
    ) -> Result<PathValidation> {
        if self.engine.graph(model_id).is_none() {
            return Ok(PathValidation::invalid(
                InvalidPathReason::GraphNotBuilt,
                format!("No graph available for model {}", model_id),
            ));
        }
        let Some(from) = self.catalog.find_version(model_id, current).await? else {
            return Ok(PathValidation::invalid(
                InvalidPathReason::SourceVersionNotFound,
                format!("Source version {} not found", current),
            ));
        };
        let Some(to) = self.catalog.find_version(model_id, target).await? else {
            return Ok(PathValidation::invalid(
                InvalidPathReason::TargetVersionNotFound,
                format!("Target version {} not found", target),
            ));
        };
        Ok(self.engine.validate_path(model_id, from.id, to.id))
    }

    pub async fn rebuild(&self, model_id: ModelId) -> Result<RebuildResponse> {
        let graph = self.engine.rebuild(model_id).await?;
        tracing::info!(
            model_id,
            versions = graph.node_count(),
            edges = graph.edge_count(),
            "graph rebuilt"
        );
        Ok(RebuildResponse {
            model_id,
            versions: graph.node_count(),
            edges: graph.edge_count(),
        })
    }
}

fn not_found_message(model_id: ModelId, label: &str) -> String {
    format!("version '{}' not found for model {}", label, model_id)
}

/// CLI entry point for `lch path`.
pub async fn run_path(
    config: &Config,
    model_id: ModelId,
    current: &str,
    target: &str,
    json: bool,
) -> Result<()> {
    let pool = db::connect(config).await?;
    let service = UpgradeService::new(pool.clone());
    let lookup = service.lookup_path(model_id, current, target).await;
    pool.close().await;

    match lookup? {
        PathLookup::Found(path) => {
            if json {
                println!("{}", serde_json::to_string_pretty(&path)?);
            } else {
                print_path(&path);
            }
            Ok(())
        }
        PathLookup::VersionNotFound(message) => bail!(message),
        PathLookup::NoPath { from, to } => {
            eprintln!("no upgrade path found from {} to {}", from, to);
            std::process::exit(1);
        }
    }
}

fn print_path(path: &PathResponse) {
    println!(
        "model {}: {} -> {} ({} steps)",
        path.model_id, path.from_version, path.to_version, path.step_count
    );
    for (i, step) in path.steps.iter().enumerate() {
        let mut flags = Vec::new();
        if step.requires_backup {
            flags.push("backup");
        }
        if step.requires_reboot {
            flags.push("reboot");
        }
        let downtime = step
            .estimated_downtime_minutes
            .map(|m| format!(", ~{} min", m))
            .unwrap_or_default();
        println!(
            "  {}. {}  [{}{}] {}",
            i + 1,
            step.step,
            step.risk,
            downtime,
            flags.join(" ")
        );
        if let Some(ref notes) = step.notes {
            println!("     {}", notes);
        }
    }
    println!("overall risk: {}", path.overall_risk);
    match path.total_estimated_downtime_minutes {
        Some(m) => println!("estimated downtime: {} min", m),
        None => println!("estimated downtime: unknown"),
    }
}

/// CLI entry point for `lch validate`. A one-shot process has an empty
/// cache, so the model's graph is built before validating.
pub async fn run_validate(
    config: &Config,
    model_id: ModelId,
    current: &str,
    target: &str,
) -> Result<()> {
    let pool = db::connect(config).await?;
    let service = UpgradeService::new(pool.clone());
    let validation = async {
        service.engine().ensure_graph(model_id).await?;
        service.validate(model_id, current, target).await
    }
    .await;
    pool.close().await;
    let validation = validation?;

    if validation.valid {
        println!("valid");
        return Ok(());
    }
    let reason = validation.reason.unwrap_or_default();
    eprintln!("invalid: {}", reason);
    std::process::exit(1);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::import::{apply_document, CatalogDocument};
    use crate::migrate::apply_schema;
    use sqlx::sqlite::SqlitePoolOptions;

    async fn seeded_service() -> (UpgradeService, ModelId) {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        apply_schema(&pool).await.unwrap();

        let document: CatalogDocument = serde_json::from_str(
            r#"{ "models": [{
                "vendor": "Acme", "model_name": "R100",
                "versions": [{ "version": "1.0" }, { "version": "2.0" }, { "version": "3.0" }, { "version": "9.0" }],
                "upgrade_paths": [
                  { "from": "1.0", "to": "2.0", "risk_level": "MED", "estimated_downtime_minutes": 10,
                    "requires_reboot": false },
                  { "from": "2.0", "to": "3.0", "notes": "take a backup first" }
                ]
            }] }"#,
        )
        .unwrap();
        let summary = apply_document(&pool, &document, "hash", "inline").await.unwrap();
        (UpgradeService::new(pool), summary.models[0].model_id)
    }

    #[tokio::test]
    async fn test_lookup_found_by_label() {
        let (service, model_id) = seeded_service().await;
        let PathLookup::Found(path) = service.lookup_path(model_id, "v1.0", "3.0").await.unwrap()
        else {
            panic!("expected a path");
        };
        assert_eq!(path.from_version, "1.0");
        assert_eq!(path.step_count, 2);
        assert_eq!(path.steps[0].step, "1.0 -> 2.0");
        assert_eq!(path.steps[0].risk, RiskLevel::Med);
        assert!(!path.steps[0].requires_reboot);
        assert_eq!(path.steps[1].notes.as_deref(), Some("take a backup first"));
        assert_eq!(path.overall_risk, RiskLevel::Med);
        assert_eq!(path.total_estimated_downtime_minutes, Some(10));
    }

    #[tokio::test]
    async fn test_lookup_distinguishes_not_found_from_no_path() {
        let (service, model_id) = seeded_service().await;
        assert!(matches!(
            service.lookup_path(model_id, "1.0", "7.7").await.unwrap(),
            PathLookup::VersionNotFound(_)
        ));
        assert!(matches!(
            service.lookup_path(model_id, "1.0", "9.0").await.unwrap(),
            PathLookup::NoPath { .. }
        ));
        assert!(matches!(
            service.lookup_path(model_id + 100, "1.0", "2.0").await.unwrap(),
            PathLookup::VersionNotFound(_)
        ));
    }

    #[tokio::test]
    async fn test_validate_needs_built_graph() {
        let (service, model_id) = seeded_service().await;
        let before = service.validate(model_id, "1.0", "3.0").await.unwrap();
        assert_eq!(before.reason_code, Some(InvalidPathReason::GraphNotBuilt));

        service.engine().ensure_graph(model_id).await.unwrap();
        assert!(service.validate(model_id, "1.0", "3.0").await.unwrap().valid);

        let unknown = service.validate(model_id, "0.1", "3.0").await.unwrap();
        assert_eq!(unknown.reason_code, Some(InvalidPathReason::SourceVersionNotFound));

        let backwards = service.validate(model_id, "3.0", "1.0").await.unwrap();
        assert_eq!(backwards.reason_code, Some(InvalidPathReason::NoPath));
    }

    #[tokio::test]
    async fn test_rebuild_reports_graph_size() {
        let (service, model_id) = seeded_service().await;
        let rebuilt = service.rebuild(model_id).await.unwrap();
        assert_eq!(rebuilt.versions, 4);
        assert_eq!(rebuilt.edges, 2);
    }
}
