//! Error types for the upgrade path engine.
//!
//! Path absence is not an error: searches return `Ok(None)` when the graph
//! and both endpoints exist but no directed route connects them.

use thiserror::Error;

use crate::models::{ModelId, VersionId};

/// Precondition failure raised by the path search primitives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum PathError {
    #[error("version {0} is not in the graph")]
    VersionNotInGraph(VersionId),
}

/// Errors surfaced by [`UpgradePathEngine`](crate::engine::UpgradePathEngine).
#[derive(Debug, Error)]
pub enum EngineError {
    /// A requested endpoint is not a node of the model's built graph.
    #[error("version {version_id} is not part of the upgrade graph for model {model_id}")]
    VersionNotInGraph {
        model_id: ModelId,
        version_id: VersionId,
    },

    /// The catalog source failed while the graph was being built. The model
    /// stays unbuilt so a later call can retry.
    #[error("failed to load catalog data for model {model_id}")]
    DataFetch {
        model_id: ModelId,
        #[source]
        source: anyhow::Error,
    },
}

impl EngineError {
    pub(crate) fn from_path(model_id: ModelId, err: PathError) -> Self {
        match err {
            PathError::VersionNotInGraph(version_id) => EngineError::VersionNotInGraph {
                model_id,
                version_id,
            },
        }
    }
}
