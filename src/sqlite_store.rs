//! SQLite-backed [`CatalogSource`] implementation.
//!
//! Reads the `software_versions`, `upgrade_paths`, and
//! `model_version_compatibility` tables created by [`migrate`](crate::migrate).
//! Stored values that do not fit the catalog types (an unknown risk level, a
//! malformed intermediates array, a negative downtime) are reported as errors
//! rather than passed through.

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};

use lifecycle_harness_core::models::{
    CompatibilityRecord, EolStatus, ModelId, RiskLevel, UpgradePathRecord, Version, VersionId,
};
use lifecycle_harness_core::normalize::compare_versions;
use lifecycle_harness_core::store::CatalogSource;

/// SQLite implementation of the [`CatalogSource`] trait.
#[derive(Clone)]
pub struct SqliteCatalog {
    pool: SqlitePool,
}

impl SqliteCatalog {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Whether a model row exists.
    pub async fn model_exists(&self, model_id: ModelId) -> Result<bool> {
        let found: Option<i64> = sqlx::query_scalar("SELECT id FROM models WHERE id = ?")
            .bind(model_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(found.is_some())
    }
}

fn parse_stored_date(value: Option<String>, column: &str) -> Result<Option<NaiveDate>> {
    value
        .map(|s| {
            NaiveDate::parse_from_str(&s, "%Y-%m-%d")
                .with_context(|| format!("invalid {} '{}'", column, s))
        })
        .transpose()
}

fn version_from_row(row: &SqliteRow) -> Result<Version> {
    let id: VersionId = row.try_get("id")?;
    let eol_status: String = row.try_get("eol_status")?;
    Ok(Version {
        id,
        version_string: row.try_get("version_string")?,
        normalized_version: row.try_get("normalized_version")?,
        eol_status: eol_status
            .parse::<EolStatus>()
            .with_context(|| format!("software version {}", id))?,
        eol_date: parse_stored_date(row.try_get("eol_date")?, "eol_date")?,
        release_date: parse_stored_date(row.try_get("release_date")?, "release_date")?,
    })
}

fn upgrade_path_from_row(row: &SqliteRow) -> Result<UpgradePathRecord> {
    let id: i64 = row.try_get("id")?;
    let intermediates_json: String = row.try_get("mandatory_intermediates_json")?;
    let mandatory_intermediates: Vec<VersionId> = serde_json::from_str(&intermediates_json)
        .with_context(|| format!("upgrade path {}: malformed mandatory intermediates", id))?;

    let risk_level = row
        .try_get::<Option<String>, _>("risk_level")?
        .map(|s| s.parse::<RiskLevel>())
        .transpose()
        .with_context(|| format!("upgrade path {}", id))?;

    let estimated_downtime_minutes = match row.try_get::<Option<i64>, _>("estimated_downtime_minutes")? {
        None => None,
        Some(m) if m < 0 => bail!("upgrade path {}: negative downtime {}", id, m),
        Some(m) => Some(
            u32::try_from(m).with_context(|| format!("upgrade path {}: downtime too large", id))?,
        ),
    };

    Ok(UpgradePathRecord {
        from_version_id: row.try_get("from_version_id")?,
        to_version_id: row.try_get("to_version_id")?,
        mandatory_intermediates,
        risk_level,
        notes: row.try_get("notes")?,
        estimated_downtime_minutes,
        requires_backup: row.try_get("requires_backup")?,
        requires_reboot: row.try_get("requires_reboot")?,
    })
}

#[async_trait]
impl CatalogSource for SqliteCatalog {
    async fn versions(&self, model_id: ModelId) -> Result<Vec<Version>> {
        let rows = sqlx::query(
            r#"
            SELECT id, version_string, normalized_version, eol_status, eol_date, release_date
            FROM software_versions
            WHERE model_id = ?
            ORDER BY normalized_version ASC, id ASC
            "#,
        )
        .bind(model_id)
        .fetch_all(&self.pool)
        .await?;

        let mut versions = rows
            .iter()
            .map(version_from_row)
            .collect::<Result<Vec<_>>>()?;

        // SQL orders text lexically; reorder numerically ("4.10" after "4.9").
        versions.sort_by(|a, b| {
            let ka = a.normalized_version.as_deref().unwrap_or(&a.version_string);
            let kb = b.normalized_version.as_deref().unwrap_or(&b.version_string);
            compare_versions(ka, kb).then(a.id.cmp(&b.id))
        });
        Ok(versions)
    }

    async fn upgrade_paths(&self, model_id: ModelId) -> Result<Vec<UpgradePathRecord>> {
        let rows = sqlx::query(
            r#"
            SELECT id, from_version_id, to_version_id, mandatory_intermediates_json, notes,
                   risk_level, estimated_downtime_minutes, requires_backup, requires_reboot
            FROM upgrade_paths
            WHERE model_id = ?
            ORDER BY id ASC
            "#,
        )
        .bind(model_id)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(upgrade_path_from_row).collect()
    }

    async fn compatibilities(&self, model_id: ModelId) -> Result<Vec<CompatibilityRecord>> {
        let rows = sqlx::query(
            r#"
            SELECT from_version_id, to_version_id, allowed, notes
            FROM model_version_compatibility
            WHERE model_id = ? AND allowed = 1
            ORDER BY id ASC
            "#,
        )
        .bind(model_id)
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| {
                Ok(CompatibilityRecord {
                    from_version_id: row.try_get("from_version_id")?,
                    to_version_id: row.try_get("to_version_id")?,
                    allowed: row.try_get("allowed")?,
                    notes: row.try_get("notes")?,
                })
            })
            .collect()
    }

    async fn find_version(&self, model_id: ModelId, label: &str) -> Result<Option<Version>> {
        let row = sqlx::query(
            r#"
            SELECT id, version_string, normalized_version, eol_status, eol_date, release_date
            FROM software_versions
            WHERE model_id = ? AND version_string = ?
            "#,
        )
        .bind(model_id)
        .bind(label.trim())
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => Ok(Some(version_from_row(&row)?)),
            None => {
                let versions = self.versions(model_id).await?;
                Ok(lifecycle_harness_core::store::resolve_label(versions, label))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::migrate::apply_schema;
    use sqlx::sqlite::SqlitePoolOptions;

    async fn memory_pool() -> SqlitePool {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        apply_schema(&pool).await.unwrap();
        sqlx::query("INSERT INTO models (id, vendor, model_name, created_at, updated_at) VALUES (1, 'Acme', 'R100', 0, 0)")
            .execute(&pool)
            .await
            .unwrap();
        pool
    }

    async fn insert_version(pool: &SqlitePool, id: i64, label: &str, normalized: &str) {
        sqlx::query(
            "INSERT INTO software_versions (id, model_id, version_string, normalized_version, eol_status, eol_date, created_at, updated_at) VALUES (?, 1, ?, ?, 'SUPPORTED', '2026-01-31', 0, 0)",
        )
        .bind(id)
        .bind(label)
        .bind(normalized)
        .execute(pool)
        .await
        .unwrap();
    }

    #[tokio::test]
    async fn test_versions_ordered_numerically() {
        let pool = memory_pool().await;
        insert_version(&pool, 1, "4.10", "4.10.0").await;
        insert_version(&pool, 2, "4.9", "4.9.0").await;
        let catalog = SqliteCatalog::new(pool);

        let versions = catalog.versions(1).await.unwrap();
        let ids: Vec<_> = versions.iter().map(|v| v.id).collect();
        assert_eq!(ids, vec![2, 1]);
        assert_eq!(versions[0].eol_status, EolStatus::Supported);
        assert_eq!(versions[0].eol_date, NaiveDate::from_ymd_opt(2026, 1, 31));
        assert!(catalog.versions(2).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_upgrade_path_decoding_and_defaults() {
        let pool = memory_pool().await;
        insert_version(&pool, 1, "1.0", "1.0.0").await;
        insert_version(&pool, 2, "2.0", "2.0.0").await;
        insert_version(&pool, 3, "3.0", "3.0.0").await;
        sqlx::query(
            "INSERT INTO upgrade_paths (model_id, from_version_id, to_version_id, mandatory_intermediates_json, risk_level, estimated_downtime_minutes, requires_backup, requires_reboot, created_at) VALUES (1, 1, 3, '[2]', 'HIGH', 30, 0, NULL, 0)",
        )
        .execute(&pool)
        .await
        .unwrap();
        let catalog = SqliteCatalog::new(pool);

        let records = catalog.upgrade_paths(1).await.unwrap();
        assert_eq!(records.len(), 1);
        let r = &records[0];
        assert_eq!(r.mandatory_intermediates, vec![2]);
        assert_eq!(r.risk_level, Some(RiskLevel::High));
        assert_eq!(r.estimated_downtime_minutes, Some(30));
        assert_eq!(r.requires_backup, Some(false));
        assert_eq!(r.requires_reboot, None);
    }

    #[tokio::test]
    async fn test_unknown_risk_level_rejected() {
        let pool = memory_pool().await;
        insert_version(&pool, 1, "1.0", "1.0.0").await;
        insert_version(&pool, 2, "2.0", "2.0.0").await;
        sqlx::query(
            "INSERT INTO upgrade_paths (model_id, from_version_id, to_version_id, risk_level, created_at) VALUES (1, 1, 2, 'SEVERE', 0)",
        )
        .execute(&pool)
        .await
        .unwrap();
        let catalog = SqliteCatalog::new(pool);
        assert!(catalog.upgrade_paths(1).await.is_err());
    }

    #[tokio::test]
    async fn test_only_allowed_compatibilities() {
        let pool = memory_pool().await;
        insert_version(&pool, 1, "1.0", "1.0.0").await;
        insert_version(&pool, 2, "2.0", "2.0.0").await;
        sqlx::query(
            "INSERT INTO model_version_compatibility (model_id, from_version_id, to_version_id, allowed, notes, created_at) VALUES (1, 1, 2, 1, 'ok', 0), (1, 2, 1, 0, 'no downgrade', 0)",
        )
        .execute(&pool)
        .await
        .unwrap();
        let catalog = SqliteCatalog::new(pool);

        let records = catalog.compatibilities(1).await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].notes.as_deref(), Some("ok"));
        assert!(records[0].allowed);
    }

    #[tokio::test]
    async fn test_find_version_exact_then_normalized() {
        let pool = memory_pool().await;
        insert_version(&pool, 1, "v4.2", "4.2.0").await;
        let catalog = SqliteCatalog::new(pool);

        assert_eq!(catalog.find_version(1, "v4.2").await.unwrap().map(|v| v.id), Some(1));
        assert_eq!(catalog.find_version(1, "4.2.0").await.unwrap().map(|v| v.id), Some(1));
        assert!(catalog.find_version(1, "4.3").await.unwrap().is_none());
    }
}
