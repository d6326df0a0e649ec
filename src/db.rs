//! Connection pool for the lifecycle catalog database.
//!
//! One SQLite file at `[db].path` holds the models, software versions,
//! upgrade paths, compatibility statements, and import history. Foreign keys
//! are enforced so versions and edges cannot outlive their model.

use anyhow::{Context, Result};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};
use std::str::FromStr;

use crate::config::Config;

/// Open (creating if needed) the lifecycle catalog database named by
/// `[db].path`, in WAL mode with foreign keys on.
pub async fn connect(config: &Config) -> Result<SqlitePool> {
    let db_path = &config.db.path;

    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent).with_context(|| {
            format!("Failed to create catalog database directory {}", parent.display())
        })?;
    }

    let options = SqliteConnectOptions::from_str(&format!("sqlite:{}", db_path.display()))?
        .create_if_missing(true)
        .foreign_keys(true)
        .journal_mode(SqliteJournalMode::Wal);

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(options)
        .await
        .with_context(|| format!("Failed to open catalog database {}", db_path.display()))?;

    Ok(pool)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_connect_creates_file_with_foreign_keys() {
        let tmp = TempDir::new().unwrap();
        let db_path = tmp.path().join("nested/dir/lch.sqlite");
        let config: Config = toml::from_str(&format!(
            "[db]\npath = \"{}\"\n\n[server]\nbind = \"127.0.0.1:0\"\n",
            db_path.display()
        ))
        .unwrap();

        let pool = connect(&config).await.unwrap();
        assert!(db_path.exists());
        let fk: i64 = sqlx::query_scalar("PRAGMA foreign_keys")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(fk, 1);
        pool.close().await;
    }
}
