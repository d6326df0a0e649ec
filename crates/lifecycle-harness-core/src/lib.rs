//! # Lifecycle Harness Core
//!
//! The upgrade path engine: a deterministic, per-model directed graph of
//! software versions used to compute canonical upgrade paths, expand them
//! with mandatory intermediate steps, and score their aggregate risk and
//! downtime.
//!
//! This crate contains no tokio, sqlx, or filesystem I/O. Persisted data is
//! reached only through the [`store::CatalogSource`] trait.
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`models`] | Versions, risk and lifecycle enums, upgrade/compatibility records |
//! | [`normalize`] | Version, date, vendor, and lifecycle label normalization |
//! | [`graph`] | Compatibility graph construction with source precedence |
//! | [`path`] | Breadth-first shortest path and intermediate expansion |
//! | [`summary`] | Step details, overall risk, total downtime |
//! | [`engine`] | Graph cache and the public `compute_upgrade_path` / `validate_path` |
//! | [`store`] | Catalog source trait and in-memory implementation |
//! | [`error`] | Engine and path error types |

pub mod engine;
pub mod error;
pub mod graph;
pub mod models;
pub mod normalize;
pub mod path;
pub mod store;
pub mod summary;

pub use engine::{InvalidPathReason, PathValidation, UpgradePathEngine, UpgradePathResult};
pub use error::{EngineError, PathError};
pub use models::{EolStatus, ModelId, RiskLevel, Version, VersionId};
