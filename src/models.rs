//! Hardware model listing and lifecycle rollup.
//!
//! Used by the `lch models` CLI command, `GET /models`, and
//! `GET /models/{model_id}`.
//!
//! A model's overall status is `EOL` only when at least one version is EOL
//! and none is supported; anything else rolls up to `SUPPORTED`. The overall
//! EOL date is the latest date among the EOL versions.

use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use sqlx::sqlite::SqliteRow;
use sqlx::Row;

use lifecycle_harness_core::models::{EolStatus, ModelId, Version};
use lifecycle_harness_core::normalize::canonical_vendor;
use lifecycle_harness_core::store::CatalogSource;

use crate::config::Config;
use crate::db;
use crate::sqlite_store::SqliteCatalog;
use crate::versions::VersionResponse;

pub const DEFAULT_SKIP: u32 = 0;
pub const DEFAULT_LIMIT: u32 = 100;

#[derive(Debug, Clone, Serialize)]
pub struct ModelResponse {
    pub id: ModelId,
    pub vendor: String,
    pub product_family: Option<String>,
    pub model_name: String,
    pub aliases: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ModelLifecycle {
    pub model_id: ModelId,
    pub vendor: String,
    pub model_name: String,
    pub eol_status: EolStatus,
    pub eol_date: Option<NaiveDate>,
    pub versions: Vec<VersionResponse>,
}

fn timestamp(row: &SqliteRow, column: &str) -> Result<DateTime<Utc>> {
    let secs: i64 = row.try_get(column)?;
    DateTime::from_timestamp(secs, 0).with_context(|| format!("invalid {} {}", column, secs))
}

fn model_from_row(row: &SqliteRow) -> Result<ModelResponse> {
    let id: ModelId = row.try_get("id")?;
    let aliases_json: String = row.try_get("aliases_json")?;
    Ok(ModelResponse {
        id,
        vendor: row.try_get("vendor")?,
        product_family: row.try_get("product_family")?,
        model_name: row.try_get("model_name")?,
        aliases: serde_json::from_str(&aliases_json)
            .with_context(|| format!("model {}: malformed aliases", id))?,
        created_at: timestamp(row, "created_at")?,
        updated_at: timestamp(row, "updated_at")?,
    })
}

/// Models in id order, optionally restricted to one vendor.
///
/// The vendor filter goes through the same canonicalization as import, so
/// `vmware` and `VMware` both match the stored `Vmware`.
pub async fn list_models(
    catalog: &SqliteCatalog,
    vendor: Option<&str>,
    skip: u32,
    limit: u32,
) -> Result<Vec<ModelResponse>> {
    let vendor = vendor.and_then(canonical_vendor);
    let rows = sqlx::query(
        r#"
        SELECT id, vendor, product_family, model_name, aliases_json, created_at, updated_at
        FROM models
        WHERE ?1 IS NULL OR vendor = ?1
        ORDER BY id
        LIMIT ?2 OFFSET ?3
        "#,
    )
    .bind(vendor)
    .bind(limit)
    .bind(skip)
    .fetch_all(catalog.pool())
    .await?;

    rows.iter().map(model_from_row).collect()
}

/// Roll a model's versions up into one status and date.
pub fn overall_lifecycle(versions: &[Version]) -> (EolStatus, Option<NaiveDate>) {
    let any_eol = versions.iter().any(|v| v.eol_status == EolStatus::Eol);
    let any_supported = versions.iter().any(|v| v.eol_status == EolStatus::Supported);
    let status = if any_eol && !any_supported {
        EolStatus::Eol
    } else {
        EolStatus::Supported
    };
    let date = versions
        .iter()
        .filter(|v| v.eol_status == EolStatus::Eol)
        .filter_map(|v| v.eol_date)
        .max();
    (status, date)
}

/// Lifecycle view of one model. `None` when the model does not exist.
pub async fn model_lifecycle(
    catalog: &SqliteCatalog,
    model_id: ModelId,
) -> Result<Option<ModelLifecycle>> {
    let row = sqlx::query("SELECT vendor, model_name FROM models WHERE id = ?")
        .bind(model_id)
        .fetch_optional(catalog.pool())
        .await?;
    let Some(row) = row else {
        return Ok(None);
    };

    let versions = catalog.versions(model_id).await?;
    let (eol_status, eol_date) = overall_lifecycle(&versions);
    Ok(Some(ModelLifecycle {
        model_id,
        vendor: row.try_get("vendor")?,
        model_name: row.try_get("model_name")?,
        eol_status,
        eol_date,
        versions: versions.into_iter().map(VersionResponse::from).collect(),
    }))
}

/// CLI entry point for `lch models`.
pub async fn run_models(config: &Config, vendor: Option<&str>, limit: u32) -> Result<()> {
    let pool = db::connect(config).await?;
    let catalog = SqliteCatalog::new(pool.clone());
    let listing = collect_lifecycles(&catalog, vendor, limit).await;
    pool.close().await;
    let listing = listing?;

    if listing.is_empty() {
        println!("No models found.");
        return Ok(());
    }
    for (model, lifecycle) in &listing {
        let eol = lifecycle
            .eol_date
            .map(|d| format!("  eol {}", d))
            .unwrap_or_default();
        println!(
            "[{}] {} {}  {} versions  {}{}",
            model.id,
            model.vendor,
            model.model_name,
            lifecycle.versions.len(),
            lifecycle.eol_status,
            eol
        );
    }
    Ok(())
}

async fn collect_lifecycles(
    catalog: &SqliteCatalog,
    vendor: Option<&str>,
    limit: u32,
) -> Result<Vec<(ModelResponse, ModelLifecycle)>> {
    let mut out = Vec::new();
    for model in list_models(catalog, vendor, DEFAULT_SKIP, limit).await? {
        if let Some(lifecycle) = model_lifecycle(catalog, model.id).await? {
            out.push((model, lifecycle));
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::import::import_file;
    use crate::migrate::apply_schema;
    use sqlx::sqlite::SqlitePoolOptions;
    use sqlx::SqlitePool;
    use tempfile::TempDir;

    fn version(id: i64, status: EolStatus, eol: Option<(i32, u32, u32)>) -> Version {
        let mut v = Version::new(id, format!("{}.0", id));
        v.eol_status = status;
        v.eol_date = eol.and_then(|(y, m, d)| NaiveDate::from_ymd_opt(y, m, d));
        v
    }

    fn ymd(y: i32, m: u32, d: u32) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(y, m, d)
    }

    #[test]
    fn test_all_eol_rolls_up_to_eol_with_latest_date() {
        let versions = vec![
            version(1, EolStatus::Eol, Some((2023, 1, 31))),
            version(2, EolStatus::Eol, Some((2024, 6, 1))),
            version(3, EolStatus::Eol, None),
        ];
        assert_eq!(overall_lifecycle(&versions), (EolStatus::Eol, ymd(2024, 6, 1)));
    }

    #[test]
    fn test_any_supported_version_keeps_model_supported() {
        let versions = vec![
            version(1, EolStatus::Eol, Some((2024, 6, 1))),
            version(2, EolStatus::Supported, Some((2030, 1, 1))),
            version(3, EolStatus::Unknown, None),
        ];
        // The date still comes from EOL versions only.
        assert_eq!(overall_lifecycle(&versions), (EolStatus::Supported, ymd(2024, 6, 1)));
    }

    #[test]
    fn test_eol_and_unknown_rolls_up_to_eol() {
        let versions = vec![
            version(1, EolStatus::Eol, Some((2022, 3, 1))),
            version(2, EolStatus::Unknown, None),
        ];
        assert_eq!(overall_lifecycle(&versions), (EolStatus::Eol, ymd(2022, 3, 1)));
    }

    #[test]
    fn test_no_eol_versions() {
        let versions = vec![version(1, EolStatus::Unknown, None)];
        assert_eq!(overall_lifecycle(&versions), (EolStatus::Supported, None));
        assert_eq!(overall_lifecycle(&[]), (EolStatus::Supported, None));
    }

    const CATALOG: &str = r#"{ "models": [
        { "vendor": "vmware", "model_name": "Edge 620", "aliases": ["EG 620"],
          "versions": [
            { "version": "4.0", "eol_status": "eol", "eol_date": "2024-06-01" },
            { "version": "4.1", "eol_status": "eol", "eol_date": "2025-01-15" }
          ] },
        { "vendor": "Cisco", "model_name": "ISR 1100",
          "versions": [{ "version": "17.3", "eol_status": "supported" }] },
        { "vendor": "VMware", "model_name": "Edge 840" }
    ] }"#;

    async fn seeded_catalog() -> SqliteCatalog {
        let pool: SqlitePool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        apply_schema(&pool).await.unwrap();
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("catalog.json");
        std::fs::write(&path, CATALOG).unwrap();
        import_file(&pool, &path, false).await.unwrap();
        SqliteCatalog::new(pool)
    }

    #[tokio::test]
    async fn test_list_models_filters_and_pages() {
        let catalog = seeded_catalog().await;

        let all = list_models(&catalog, None, DEFAULT_SKIP, DEFAULT_LIMIT).await.unwrap();
        let names: Vec<_> = all.iter().map(|m| m.model_name.as_str()).collect();
        assert_eq!(names, vec!["Edge 620", "ISR 1100", "Edge 840"]);
        assert_eq!(all[0].aliases, vec!["EG 620".to_string()]);

        let vmware = list_models(&catalog, Some("VMware"), 0, 100).await.unwrap();
        assert_eq!(vmware.len(), 2);
        assert!(vmware.iter().all(|m| m.vendor == "Vmware"));

        let page = list_models(&catalog, None, 1, 1).await.unwrap();
        assert_eq!(page.len(), 1);
        assert_eq!(page[0].model_name, "ISR 1100");

        assert!(list_models(&catalog, Some("Juniper"), 0, 100).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_model_lifecycle() {
        let catalog = seeded_catalog().await;

        let edge = model_lifecycle(&catalog, 1).await.unwrap().unwrap();
        assert_eq!(edge.vendor, "Vmware");
        assert_eq!(edge.eol_status, EolStatus::Eol);
        assert_eq!(edge.eol_date, ymd(2025, 1, 15));
        assert_eq!(edge.versions.len(), 2);

        let isr = model_lifecycle(&catalog, 2).await.unwrap().unwrap();
        assert_eq!(isr.eol_status, EolStatus::Supported);
        assert_eq!(isr.eol_date, None);

        let empty = model_lifecycle(&catalog, 3).await.unwrap().unwrap();
        assert_eq!(empty.eol_status, EolStatus::Supported);
        assert!(empty.versions.is_empty());

        assert!(model_lifecycle(&catalog, 99).await.unwrap().is_none());
    }
}
