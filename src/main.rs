//! # Lifecycle Harness CLI (`lch`)
//!
//! The `lch` binary manages the lifecycle catalog database and answers
//! upgrade path questions from the command line or over HTTP.
//!
//! ## Usage
//!
//! ```bash
//! lch --config ./config/lch.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `lch init` | Create the SQLite database and run schema migrations |
//! | `lch import <file>` | Import a JSON catalog of models, versions, and paths |
//! | `lch models [--vendor <name>]` | List models with their overall lifecycle status |
//! | `lch versions <model_id>` | List a model's versions with lifecycle data |
//! | `lch path <model_id> <current> <target>` | Compute an upgrade path |
//! | `lch validate <model_id> <current> <target>` | Check that a path exists |
//! | `lch serve` | Start the HTTP server |
//!
//! ## Examples
//!
//! ```bash
//! lch init --config ./config/lch.toml
//! lch import demos/catalog.json --config ./config/lch.toml
//! lch path 1 v4.0 4.2 --json --config ./config/lch.toml
//! lch serve --config ./config/lch.toml
//! ```

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use lifecycle_harness::{config, import, migrate, models, server, telemetry, upgrade, versions};
use lifecycle_harness_core::models::ModelId;

/// Lifecycle Harness CLI: software lifecycle catalog and upgrade path
/// planning for hardware models.
///
/// All commands accept a `--config` flag pointing to a TOML configuration
/// file. See `config/lch.example.toml` for a full example.
#[derive(Parser)]
#[command(
    name = "lch",
    about = "Lifecycle Harness: software lifecycle catalog and upgrade path planner",
    version,
    long_about = "Lifecycle Harness imports vendor lifecycle data (versions, EOL dates, \
    upgrade paths, compatibility statements) into SQLite and computes deterministic \
    shortest upgrade paths with mandatory intermediate steps, risk, and downtime."
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/lch.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the database schema.
    ///
    /// Creates the SQLite database file and all required tables. Running it
    /// again is safe.
    Init,

    /// Import a JSON catalog file.
    ///
    /// Models, versions, upgrade paths, and compatibility statements are
    /// upserted in one transaction. A file whose contents were already
    /// imported is skipped.
    Import {
        /// Path to the catalog JSON file.
        file: PathBuf,

        /// Re-apply the file even if identical contents were imported before.
        #[arg(long)]
        force: bool,
    },

    /// List imported models with their overall lifecycle status.
    ///
    /// A model is EOL only when some version is EOL and none is supported.
    Models {
        /// Only models from this vendor (matched after canonicalization).
        #[arg(long)]
        vendor: Option<String>,

        /// Maximum number of models to list.
        #[arg(long, default_value_t = models::DEFAULT_LIMIT)]
        limit: u32,
    },

    /// List the versions of a model in upgrade order.
    Versions {
        /// Model id (printed by `lch import`).
        model_id: ModelId,
    },

    /// Compute the upgrade path between two versions.
    ///
    /// Version labels are matched exactly first, then by normalized form,
    /// so `v4.2` finds `4.2.0`. Exits with status 1 when no path exists.
    Path {
        model_id: ModelId,
        /// Currently installed version.
        current: String,
        /// Desired version.
        target: String,

        /// Print the result as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Check whether an upgrade path exists between two versions.
    Validate {
        model_id: ModelId,
        current: String,
        target: String,
    },

    /// Start the HTTP server on `[server].bind`.
    Serve,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let cfg = config::load_config(&cli.config)?;
    telemetry::init_logging(&cfg.logging);

    match cli.command {
        Commands::Init => {
            migrate::run_migrations(&cfg).await?;
            println!("Database initialized successfully.");
        }
        Commands::Import { file, force } => {
            import::run_import(&cfg, &file, force).await?;
        }
        Commands::Models { vendor, limit } => {
            models::run_models(&cfg, vendor.as_deref(), limit).await?;
        }
        Commands::Versions { model_id } => {
            versions::run_versions(&cfg, model_id).await?;
        }
        Commands::Path {
            model_id,
            current,
            target,
            json,
        } => {
            upgrade::run_path(&cfg, model_id, &current, &target, json).await?;
        }
        Commands::Validate {
            model_id,
            current,
            target,
        } => {
            upgrade::run_validate(&cfg, model_id, &current, &target).await?;
        }
        Commands::Serve => {
            server::run_server(&cfg).await?;
        }
    }

    Ok(())
}
