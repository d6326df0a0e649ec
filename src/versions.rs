//! Version listing for a model.
//!
//! Used by the `lch versions` CLI command and `GET /models/{model_id}/versions`.

use anyhow::{bail, Result};
use chrono::NaiveDate;
use serde::Serialize;

use lifecycle_harness_core::models::{EolStatus, ModelId, Version, VersionId};
use lifecycle_harness_core::store::CatalogSource;

use crate::config::Config;
use crate::db;
use crate::sqlite_store::SqliteCatalog;

#[derive(Debug, Clone, Serialize)]
pub struct VersionResponse {
    pub id: VersionId,
    pub version: String,
    pub normalized_version: Option<String>,
    pub eol_status: EolStatus,
    pub eol_date: Option<NaiveDate>,
    pub release_date: Option<NaiveDate>,
}

impl From<Version> for VersionResponse {
    fn from(v: Version) -> Self {
        Self {
            id: v.id,
            version: v.version_string,
            normalized_version: v.normalized_version,
            eol_status: v.eol_status,
            eol_date: v.eol_date,
            release_date: v.release_date,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct VersionListResponse {
    pub model_id: ModelId,
    pub versions: Vec<VersionResponse>,
}

/// Versions of a model in upgrade order. Fails if the model does not exist.
pub async fn list_versions(catalog: &SqliteCatalog, model_id: ModelId) -> Result<VersionListResponse> {
    if !catalog.model_exists(model_id).await? {
        bail!("model not found: {}", model_id);
    }
    let versions = catalog
        .versions(model_id)
        .await?
        .into_iter()
        .map(VersionResponse::from)
        .collect();
    Ok(VersionListResponse { model_id, versions })
}

/// CLI entry point for `lch versions`.
pub async fn run_versions(config: &Config, model_id: ModelId) -> Result<()> {
    let pool = db::connect(config).await?;
    let catalog = SqliteCatalog::new(pool.clone());
    let listing = list_versions(&catalog, model_id).await;
    pool.close().await;
    let listing = listing?;

    println!("--- Model {} ({} versions) ---", model_id, listing.versions.len());
    for v in &listing.versions {
        let eol = v
            .eol_date
            .map(|d| format!("  eol {}", d))
            .unwrap_or_default();
        println!("{:>6}  {:<16} {:<10}{}", v.id, v.version, v.eol_status, eol);
    }
    Ok(())
}
