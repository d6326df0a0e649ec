//! Per-model compatibility graph.
//!
//! Nodes are the model's [`Version`]s; edges are [`CompatibilityEdge`]s built
//! from two record kinds with a fixed precedence:
//!
//! 1. Every upgrade-path record becomes an edge carrying all of its fields.
//! 2. Every allowed compatibility record becomes an edge only if no edge
//!    exists yet for the same `(from, to)` pair, with conservative defaults.
//!
//! Precedence is by record kind, not by arrival order: upgrade-path records
//! are always applied first.
//!
//! Edges are kept in insertion order and successor lists preserve that order,
//! which makes breadth-first search over the graph deterministic.

use std::collections::HashMap;

use serde::Serialize;

use crate::models::{
    CompatibilityRecord, ModelId, RiskLevel, UpgradePathRecord, Version, VersionId,
};

/// Where an edge's metadata came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EdgeSource {
    UpgradePath,
    Compatibility,
    /// Synthesized by [`default_edge_metadata`] for a hop with no stored edge.
    Default,
}

/// A directed upgrade/compatibility transition within one model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CompatibilityEdge {
    pub from: VersionId,
    pub to: VersionId,
    pub risk_level: RiskLevel,
    pub mandatory_intermediates: Vec<VersionId>,
    pub estimated_downtime_minutes: Option<u32>,
    pub requires_backup: bool,
    pub requires_reboot: bool,
    pub notes: Option<String>,
    pub source: EdgeSource,
}

/// Baseline metadata for a hop that has no edge of its own: `LOW` risk,
/// backup and reboot required, no intermediates, notes, or downtime.
///
/// Compatibility-sourced edges start from the same values.
pub fn default_edge_metadata(from: VersionId, to: VersionId) -> CompatibilityEdge {
    CompatibilityEdge {
        from,
        to,
        risk_level: RiskLevel::Low,
        mandatory_intermediates: Vec::new(),
        estimated_downtime_minutes: None,
        requires_backup: true,
        requires_reboot: true,
        notes: None,
        source: EdgeSource::Default,
    }
}

impl CompatibilityEdge {
    fn from_upgrade_path(record: &UpgradePathRecord) -> Self {
        Self {
            from: record.from_version_id,
            to: record.to_version_id,
            risk_level: record.risk_level.unwrap_or_default(),
            mandatory_intermediates: record.mandatory_intermediates.clone(),
            estimated_downtime_minutes: record.estimated_downtime_minutes,
            requires_backup: record.requires_backup.unwrap_or(true),
            requires_reboot: record.requires_reboot.unwrap_or(true),
            notes: record.notes.clone(),
            source: EdgeSource::UpgradePath,
        }
    }

    fn from_compatibility(record: &CompatibilityRecord) -> Self {
        Self {
            notes: record.notes.clone(),
            source: EdgeSource::Compatibility,
            ..default_edge_metadata(record.from_version_id, record.to_version_id)
        }
    }
}

/// Directed graph of one model's versions.
#[derive(Debug, Clone)]
pub struct ModelGraph {
    model_id: ModelId,
    versions: Vec<Version>,
    version_index: HashMap<VersionId, usize>,
    edges: Vec<CompatibilityEdge>,
    edge_index: HashMap<(VersionId, VersionId), usize>,
    successors: HashMap<VersionId, Vec<VersionId>>,
}

impl ModelGraph {
    pub fn new(model_id: ModelId) -> Self {
        Self {
            model_id,
            versions: Vec::new(),
            version_index: HashMap::new(),
            edges: Vec::new(),
            edge_index: HashMap::new(),
            successors: HashMap::new(),
        }
    }

    pub fn model_id(&self) -> ModelId {
        self.model_id
    }

    pub fn node_count(&self) -> usize {
        self.versions.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.versions.is_empty()
    }

    pub fn contains(&self, id: VersionId) -> bool {
        self.version_index.contains_key(&id)
    }

    pub fn version(&self, id: VersionId) -> Option<&Version> {
        self.version_index.get(&id).map(|&i| &self.versions[i])
    }

    /// Versions in catalog order.
    pub fn versions(&self) -> &[Version] {
        &self.versions
    }

    /// Edges in insertion order.
    pub fn edges(&self) -> impl Iterator<Item = &CompatibilityEdge> {
        self.edges.iter()
    }

    pub fn edge(&self, from: VersionId, to: VersionId) -> Option<&CompatibilityEdge> {
        self.edge_index.get(&(from, to)).map(|&i| &self.edges[i])
    }

    pub fn has_edge(&self, from: VersionId, to: VersionId) -> bool {
        self.edge_index.contains_key(&(from, to))
    }

    /// Direct successors of `id`, in edge-insertion order.
    pub fn successors(&self, id: VersionId) -> &[VersionId] {
        self.successors.get(&id).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Adds a node. Returns `false` if the id was already present, in which
    /// case the existing version is kept.
    pub fn add_version(&mut self, version: Version) -> bool {
        if self.version_index.contains_key(&version.id) {
            return false;
        }
        self.version_index.insert(version.id, self.versions.len());
        self.versions.push(version);
        true
    }

    /// Adds an edge, or replaces the metadata of an existing edge for the
    /// same pair in place (its traversal position is unchanged).
    pub fn upsert_edge(&mut self, edge: CompatibilityEdge) {
        let key = (edge.from, edge.to);
        if let Some(&i) = self.edge_index.get(&key) {
            self.edges[i] = edge;
            return;
        }
        self.edge_index.insert(key, self.edges.len());
        self.successors.entry(edge.from).or_default().push(edge.to);
        self.edges.push(edge);
    }
}

/// Build a model's graph from its catalog rows.
///
/// Edges that reference a version id not present in `versions` are skipped
/// with a warning instead of failing the build. An empty `versions` slice
/// produces an empty graph.
pub fn build_graph(
    model_id: ModelId,
    versions: &[Version],
    upgrade_paths: &[UpgradePathRecord],
    compatibilities: &[CompatibilityRecord],
) -> ModelGraph {
    let mut graph = ModelGraph::new(model_id);

    for version in versions {
        if !graph.add_version(version.clone()) {
            tracing::warn!(model_id, version_id = version.id, "duplicate version id ignored");
        }
    }

    let mut skipped = 0usize;

    for record in upgrade_paths {
        if !endpoints_known(&graph, record.from_version_id, record.to_version_id) {
            skipped += 1;
            continue;
        }
        if let Some(unknown) = record
            .mandatory_intermediates
            .iter()
            .find(|id| !graph.contains(**id))
        {
            tracing::warn!(
                model_id,
                from = record.from_version_id,
                to = record.to_version_id,
                intermediate = *unknown,
                "upgrade path names an intermediate version outside the catalog"
            );
        }
        if graph.has_edge(record.from_version_id, record.to_version_id) {
            tracing::debug!(
                model_id,
                from = record.from_version_id,
                to = record.to_version_id,
                "repeated upgrade path record replaces earlier one"
            );
        }
        graph.upsert_edge(CompatibilityEdge::from_upgrade_path(record));
    }

    for record in compatibilities.iter().filter(|r| r.allowed) {
        if !endpoints_known(&graph, record.from_version_id, record.to_version_id) {
            skipped += 1;
            continue;
        }
        if graph.has_edge(record.from_version_id, record.to_version_id) {
            continue;
        }
        graph.upsert_edge(CompatibilityEdge::from_compatibility(record));
    }

    tracing::info!(
        model_id,
        versions = graph.node_count(),
        edges = graph.edge_count(),
        skipped_edges = skipped,
        "built compatibility graph"
    );

    graph
}

fn endpoints_known(graph: &ModelGraph, from: VersionId, to: VersionId) -> bool {
    for id in [from, to] {
        if !graph.contains(id) {
            tracing::warn!(
                model_id = graph.model_id(),
                from,
                to,
                missing = id,
                "skipping edge that references an unknown version"
            );
            return false;
        }
    }
    true
}
