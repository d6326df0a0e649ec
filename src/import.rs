//! JSON catalog import.
//!
//! Loads a catalog document describing hardware models, their software
//! versions, and the upgrade paths and compatibility statements between
//! them, and upserts everything into SQLite in a single transaction.
//!
//! Edge endpoints in the document are version *labels*, resolved against the
//! model's versions: an exact label match first, then the normalized form, so
//! `"4.2"` in an upgrade path finds a version declared as `"v4.2.0"`.
//!
//! Each applied file is recorded by SHA-256 in `catalog_imports`; importing
//! the same bytes again does nothing unless `--force` is given.

use std::collections::HashMap;
use std::path::Path;

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use sha2::{Digest, Sha256};
use sqlx::{Row, Sqlite, SqlitePool, Transaction};

use lifecycle_harness_core::models::{ModelId, RiskLevel, VersionId};
use lifecycle_harness_core::normalize::{
    canonical_vendor, eol_status, normalize_model_name, normalize_version, parse_date,
};

use crate::config::Config;
use crate::db;

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CatalogDocument {
    pub models: Vec<ModelEntry>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ModelEntry {
    pub vendor: String,
    pub model_name: String,
    pub product_family: Option<String>,
    #[serde(default)]
    pub aliases: Vec<String>,
    #[serde(default)]
    pub versions: Vec<VersionEntry>,
    #[serde(default)]
    pub upgrade_paths: Vec<UpgradePathEntry>,
    #[serde(default)]
    pub compatibility: Vec<CompatibilityEntry>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct VersionEntry {
    pub version: String,
    pub eol_status: Option<String>,
    pub eol_date: Option<String>,
    pub release_date: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpgradePathEntry {
    pub from: String,
    pub to: String,
    /// Mandatory intermediate versions, in upgrade order.
    #[serde(default)]
    pub via: Vec<String>,
    pub risk_level: Option<String>,
    pub notes: Option<String>,
    pub estimated_downtime_minutes: Option<u32>,
    pub requires_backup: Option<bool>,
    pub requires_reboot: Option<bool>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CompatibilityEntry {
    pub from: String,
    pub to: String,
    #[serde(default = "default_allowed")]
    pub allowed: bool,
    pub notes: Option<String>,
}

fn default_allowed() -> bool {
    true
}

/// Per-model outcome of an import.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportedModel {
    pub model_id: ModelId,
    pub vendor: String,
    pub model_name: String,
    pub versions: usize,
}

/// Counts reported after an import.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportSummary {
    /// True when the file was already applied and `force` was not set.
    pub skipped: bool,
    pub content_hash: String,
    pub models: Vec<ImportedModel>,
    pub versions: usize,
    pub upgrade_paths: usize,
    pub compatibilities: usize,
}

/// CLI entry point for `lch import`.
pub async fn run_import(config: &Config, path: &Path, force: bool) -> Result<()> {
    let pool = db::connect(config).await?;
    let summary = import_file(&pool, path, force).await;
    pool.close().await;
    let summary = summary?;

    println!("import {}", path.display());
    if summary.skipped {
        println!("  already imported (sha256 {}); use --force to re-apply", summary.content_hash);
        println!("ok");
        return Ok(());
    }
    println!("  models: {}", summary.models.len());
    for m in &summary.models {
        println!(
            "    [{}] {} {} ({} versions)",
            m.model_id, m.vendor, m.model_name, m.versions
        );
    }
    println!("  versions: {}", summary.versions);
    println!("  upgrade paths: {}", summary.upgrade_paths);
    println!("  compatibilities: {}", summary.compatibilities);
    println!("ok");
    Ok(())
}

/// Read, parse, and apply a catalog file.
pub async fn import_file(pool: &SqlitePool, path: &Path, force: bool) -> Result<ImportSummary> {
    let bytes = std::fs::read(path)
        .with_context(|| format!("Failed to read catalog file: {}", path.display()))?;
    let content_hash = format!("{:x}", Sha256::digest(&bytes));

    if !force {
        let seen: Option<String> =
            sqlx::query_scalar("SELECT content_hash FROM catalog_imports WHERE content_hash = ?")
                .bind(&content_hash)
                .fetch_optional(pool)
                .await?;
        if seen.is_some() {
            tracing::info!(path = %path.display(), "catalog already imported, skipping");
            return Ok(ImportSummary {
                skipped: true,
                content_hash,
                ..Default::default()
            });
        }
    }

    let document: CatalogDocument = serde_json::from_slice(&bytes)
        .with_context(|| format!("Failed to parse catalog file: {}", path.display()))?;

    let mut summary = apply_document(pool, &document, &content_hash, &path.display().to_string())
        .await
        .with_context(|| format!("Failed to import {}", path.display()))?;
    summary.content_hash = content_hash;
    Ok(summary)
}

/// Apply a parsed document in one transaction. Any failure rolls back every
/// model in the document.
pub async fn apply_document(
    pool: &SqlitePool,
    document: &CatalogDocument,
    content_hash: &str,
    source_path: &str,
) -> Result<ImportSummary> {
    let now = chrono::Utc::now().timestamp();
    let mut tx = pool.begin().await?;
    let mut summary = ImportSummary::default();

    for entry in &document.models {
        let imported = import_model(&mut tx, entry, now, &mut summary)
            .await
            .with_context(|| format!("model '{} {}'", entry.vendor, entry.model_name))?;
        summary.models.push(imported);
    }

    sqlx::query(
        r#"
        INSERT INTO catalog_imports (content_hash, source_path, imported_at) VALUES (?, ?, ?)
        ON CONFLICT(content_hash) DO UPDATE SET
            source_path = excluded.source_path,
            imported_at = excluded.imported_at
        "#,
    )
    .bind(content_hash)
    .bind(source_path)
    .bind(now)
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;

    tracing::info!(
        models = summary.models.len(),
        versions = summary.versions,
        upgrade_paths = summary.upgrade_paths,
        compatibilities = summary.compatibilities,
        "catalog imported"
    );
    Ok(summary)
}

async fn import_model(
    tx: &mut Transaction<'_, Sqlite>,
    entry: &ModelEntry,
    now: i64,
    summary: &mut ImportSummary,
) -> Result<ImportedModel> {
    let Some(vendor) = canonical_vendor(&entry.vendor) else {
        bail!("vendor must not be empty");
    };
    let Some(model_name) = normalize_model_name(&entry.model_name) else {
        bail!("model_name must not be empty");
    };
    let aliases_json = serde_json::to_string(&entry.aliases)?;

    sqlx::query(
        r#"
        INSERT INTO models (vendor, product_family, model_name, aliases_json, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?)
        ON CONFLICT(vendor, model_name) DO UPDATE SET
            product_family = COALESCE(excluded.product_family, models.product_family),
            aliases_json = excluded.aliases_json,
            updated_at = excluded.updated_at
        "#,
    )
    .bind(&vendor)
    .bind(&entry.product_family)
    .bind(&model_name)
    .bind(&aliases_json)
    .bind(now)
    .bind(now)
    .execute(&mut **tx)
    .await?;

    let model_id: ModelId =
        sqlx::query_scalar("SELECT id FROM models WHERE vendor = ? AND model_name = ?")
            .bind(&vendor)
            .bind(&model_name)
            .fetch_one(&mut **tx)
            .await?;

    for v in &entry.versions {
        upsert_version(tx, model_id, v, now).await?;
    }
    summary.versions += entry.versions.len();

    let labels = LabelIndex::load(tx, model_id).await?;

    for p in &entry.upgrade_paths {
        let from = labels.resolve(&p.from)?;
        let to = labels.resolve(&p.to)?;
        let via = p
            .via
            .iter()
            .map(|label| labels.resolve(label))
            .collect::<Result<Vec<VersionId>>>()?;
        let risk = p
            .risk_level
            .as_deref()
            .map(str::parse::<RiskLevel>)
            .transpose()
            .with_context(|| format!("upgrade path {} -> {}", p.from, p.to))?;

        sqlx::query(
            r#"
            INSERT INTO upgrade_paths (model_id, from_version_id, to_version_id,
                mandatory_intermediates_json, notes, risk_level, estimated_downtime_minutes,
                requires_backup, requires_reboot, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(model_id, from_version_id, to_version_id) DO UPDATE SET
                mandatory_intermediates_json = excluded.mandatory_intermediates_json,
                notes = excluded.notes,
                risk_level = excluded.risk_level,
                estimated_downtime_minutes = excluded.estimated_downtime_minutes,
                requires_backup = excluded.requires_backup,
                requires_reboot = excluded.requires_reboot
            "#,
        )
        .bind(model_id)
        .bind(from)
        .bind(to)
        .bind(serde_json::to_string(&via)?)
        .bind(&p.notes)
        .bind(risk.map(|r| r.as_str()))
        .bind(p.estimated_downtime_minutes.map(i64::from))
        .bind(p.requires_backup)
        .bind(p.requires_reboot)
        .bind(now)
        .execute(&mut **tx)
        .await?;
    }
    summary.upgrade_paths += entry.upgrade_paths.len();

    for c in &entry.compatibility {
        let from = labels.resolve(&c.from)?;
        let to = labels.resolve(&c.to)?;
        sqlx::query(
            r#"
            INSERT INTO model_version_compatibility (model_id, from_version_id, to_version_id,
                allowed, notes, created_at)
            VALUES (?, ?, ?, ?, ?, ?)
            ON CONFLICT(model_id, from_version_id, to_version_id) DO UPDATE SET
                allowed = excluded.allowed,
                notes = excluded.notes
            "#,
        )
        .bind(model_id)
        .bind(from)
        .bind(to)
        .bind(c.allowed)
        .bind(&c.notes)
        .bind(now)
        .execute(&mut **tx)
        .await?;
    }
    summary.compatibilities += entry.compatibility.len();

    Ok(ImportedModel {
        model_id,
        vendor,
        model_name,
        versions: labels.len(),
    })
}

async fn upsert_version(
    tx: &mut Transaction<'_, Sqlite>,
    model_id: ModelId,
    v: &VersionEntry,
    now: i64,
) -> Result<()> {
    let label = v.version.trim();
    if label.is_empty() {
        bail!("version label must not be empty");
    }

    // An entry without a status keeps whatever the stored row says.
    let status = v
        .eol_status
        .as_deref()
        .map(|s| eol_status(Some(s)).as_str());
    let eol_date = import_date(v.eol_date.as_deref(), label, "eol_date");
    let release_date = import_date(v.release_date.as_deref(), label, "release_date");

    sqlx::query(
        r#"
        INSERT INTO software_versions (model_id, version_string, normalized_version,
            release_date, eol_date, eol_status, notes, created_at, updated_at)
        VALUES (?1, ?2, ?3, ?4, ?5, COALESCE(?6, 'UNKNOWN'), ?7, ?8, ?8)
        ON CONFLICT(model_id, version_string) DO UPDATE SET
            normalized_version = excluded.normalized_version,
            release_date = COALESCE(excluded.release_date, software_versions.release_date),
            eol_date = COALESCE(excluded.eol_date, software_versions.eol_date),
            eol_status = COALESCE(?6, software_versions.eol_status),
            notes = COALESCE(excluded.notes, software_versions.notes),
            updated_at = excluded.updated_at
        "#,
    )
    .bind(model_id)
    .bind(label)
    .bind(normalize_version(label))
    .bind(release_date)
    .bind(eol_date)
    .bind(status)
    .bind(&v.notes)
    .bind(now)
    .execute(&mut **tx)
    .await?;

    Ok(())
}

/// Dates are stored as ISO `YYYY-MM-DD`. Unparseable text is dropped with a
/// warning rather than failing the import.
fn import_date(text: Option<&str>, label: &str, field: &str) -> Option<String> {
    let text = text?;
    match parse_date(text) {
        Some(date) => Some(date.format("%Y-%m-%d").to_string()),
        None => {
            tracing::warn!(version = label, field, value = text, "unrecognised date, ignoring");
            None
        }
    }
}

/// Version label lookup for one model.
struct LabelIndex {
    exact: HashMap<String, VersionId>,
    normalized: HashMap<String, VersionId>,
}

impl LabelIndex {
    async fn load(tx: &mut Transaction<'_, Sqlite>, model_id: ModelId) -> Result<Self> {
        let rows = sqlx::query(
            "SELECT id, version_string, normalized_version FROM software_versions WHERE model_id = ? ORDER BY id",
        )
        .bind(model_id)
        .fetch_all(&mut **tx)
        .await?;

        let mut index = LabelIndex {
            exact: HashMap::new(),
            normalized: HashMap::new(),
        };
        for row in &rows {
            let id: VersionId = row.try_get("id")?;
            let label: String = row.try_get("version_string")?;
            let normalized: Option<String> = row.try_get("normalized_version")?;
            if let Some(n) = normalized {
                index.normalized.entry(n).or_insert(id);
            }
            index.exact.insert(label, id);
        }
        Ok(index)
    }

    fn len(&self) -> usize {
        self.exact.len()
    }

    fn resolve(&self, label: &str) -> Result<VersionId> {
        let trimmed = label.trim();
        if let Some(id) = self.exact.get(trimmed) {
            return Ok(*id);
        }
        normalize_version(trimmed)
            .and_then(|n| self.normalized.get(&n).copied())
            .with_context(|| format!("unknown version label '{}'", label))
    }
}
