use anyhow::Result;
use sqlx::SqlitePool;

use crate::config::Config;
use crate::db;

pub async fn run_migrations(config: &Config) -> Result<()> {
    let pool = db::connect(config).await?;
    apply_schema(&pool).await?;
    pool.close().await;
    Ok(())
}

/// Create all tables and indexes. Safe to run repeatedly.
pub async fn apply_schema(pool: &SqlitePool) -> Result<()> {
    // Hardware models
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS models (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            vendor TEXT NOT NULL,
            product_family TEXT,
            model_name TEXT NOT NULL,
            aliases_json TEXT NOT NULL DEFAULT '[]',
            created_at INTEGER NOT NULL,
            updated_at INTEGER NOT NULL,
            UNIQUE(vendor, model_name)
        )
        "#,
    )
    .execute(pool)
    .await?;

    // Software versions, one row per (model, label)
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS software_versions (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            model_id INTEGER NOT NULL,
            version_string TEXT NOT NULL,
            normalized_version TEXT,
            release_date TEXT,
            eol_date TEXT,
            eol_status TEXT NOT NULL DEFAULT 'UNKNOWN',
            notes TEXT,
            created_at INTEGER NOT NULL,
            updated_at INTEGER NOT NULL,
            UNIQUE(model_id, version_string),
            FOREIGN KEY (model_id) REFERENCES models(id)
        )
        "#,
    )
    .execute(pool)
    .await?;

    // Authoritative upgrade paths; intermediates are a JSON array of version ids
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS upgrade_paths (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            model_id INTEGER NOT NULL,
            from_version_id INTEGER NOT NULL,
            to_version_id INTEGER NOT NULL,
            mandatory_intermediates_json TEXT NOT NULL DEFAULT '[]',
            notes TEXT,
            risk_level TEXT DEFAULT 'LOW',
            estimated_downtime_minutes INTEGER,
            requires_backup INTEGER DEFAULT 1,
            requires_reboot INTEGER DEFAULT 1,
            created_at INTEGER NOT NULL,
            UNIQUE(model_id, from_version_id, to_version_id),
            FOREIGN KEY (model_id) REFERENCES models(id),
            FOREIGN KEY (from_version_id) REFERENCES software_versions(id),
            FOREIGN KEY (to_version_id) REFERENCES software_versions(id)
        )
        "#,
    )
    .execute(pool)
    .await?;

    // Compatibility statements
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS model_version_compatibility (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            model_id INTEGER NOT NULL,
            from_version_id INTEGER NOT NULL,
            to_version_id INTEGER NOT NULL,
            allowed INTEGER NOT NULL DEFAULT 1,
            notes TEXT,
            created_at INTEGER NOT NULL,
            UNIQUE(model_id, from_version_id, to_version_id),
            FOREIGN KEY (model_id) REFERENCES models(id),
            FOREIGN KEY (from_version_id) REFERENCES software_versions(id),
            FOREIGN KEY (to_version_id) REFERENCES software_versions(id)
        )
        "#,
    )
    .execute(pool)
    .await?;

    // Applied catalog files, by content hash
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS catalog_imports (
            content_hash TEXT PRIMARY KEY,
            source_path TEXT NOT NULL,
            imported_at INTEGER NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    // Create indexes
    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_versions_model ON software_versions(model_id, normalized_version)",
    )
    .execute(pool)
    .await?;
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_versions_eol ON software_versions(eol_status)")
        .execute(pool)
        .await?;
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_upgrade_paths_model ON upgrade_paths(model_id)")
        .execute(pool)
        .await?;
    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_compat_model ON model_version_compatibility(model_id, allowed)",
    )
    .execute(pool)
    .await?;

    Ok(())
}
