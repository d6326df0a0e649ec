//! Turning an expanded hop sequence into caller-facing steps, and rolling
//! the steps up into overall risk and total downtime.

use serde::Serialize;

use crate::graph::{default_edge_metadata, ModelGraph};
use crate::models::{RiskLevel, VersionId};
use crate::path::Hop;

/// One hop of an upgrade path, annotated for display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UpgradeStep {
    pub from_version_id: VersionId,
    pub to_version_id: VersionId,
    /// Label of the source version, if it is a node of the graph.
    pub from_version: Option<String>,
    /// Label of the target version, if it is a node of the graph.
    pub to_version: Option<String>,
    pub risk_level: RiskLevel,
    pub notes: Option<String>,
    pub estimated_downtime_minutes: Option<u32>,
    pub requires_backup: bool,
    pub requires_reboot: bool,
    pub mandatory_intermediates: Vec<VersionId>,
}

impl UpgradeStep {
    /// `"4.0.0 -> 4.1.0"`. Ids stand in for labels missing from the catalog.
    pub fn label(&self) -> String {
        format!(
            "{} -> {}",
            display_version(self.from_version.as_deref(), self.from_version_id),
            display_version(self.to_version.as_deref(), self.to_version_id)
        )
    }
}

fn display_version(label: Option<&str>, id: VersionId) -> String {
    match label {
        Some(l) => l.to_string(),
        None => format!("#{}", id),
    }
}

/// Annotate each hop with its own edge metadata.
///
/// Every hop is looked up independently by its exact `(from, to)` pair. A hop
/// synthesized by intermediate expansion that has no stored edge gets
/// [`default_edge_metadata`], so it reports `LOW` risk even when the edge it
/// was expanded from was riskier.
pub fn detail_path(graph: &ModelGraph, hops: &[Hop]) -> Vec<UpgradeStep> {
    hops.iter()
        .map(|&(from, to)| {
            let edge = graph
                .edge(from, to)
                .cloned()
                .unwrap_or_else(|| default_edge_metadata(from, to));
            UpgradeStep {
                from_version_id: from,
                to_version_id: to,
                from_version: graph.version(from).map(|v| v.version_string.clone()),
                to_version: graph.version(to).map(|v| v.version_string.clone()),
                risk_level: edge.risk_level,
                notes: edge.notes,
                estimated_downtime_minutes: edge.estimated_downtime_minutes,
                requires_backup: edge.requires_backup,
                requires_reboot: edge.requires_reboot,
                mandatory_intermediates: edge.mandatory_intermediates,
            }
        })
        .collect()
}

/// Highest risk across all steps; `LOW` for an empty path.
pub fn overall_risk(steps: &[UpgradeStep]) -> RiskLevel {
    steps
        .iter()
        .map(|s| s.risk_level)
        .max()
        .unwrap_or(RiskLevel::Low)
}

/// Sum of the known downtime estimates.
///
/// `None` when no step carries an estimate, so "unknown" stays distinct from
/// "zero minutes". Steps without an estimate count as 0 otherwise.
pub fn total_downtime(steps: &[UpgradeStep]) -> Option<u32> {
    steps
        .iter()
        .filter_map(|s| s.estimated_downtime_minutes)
        .fold(None, |acc, m| Some(acc.unwrap_or(0u32).saturating_add(m)))
}
