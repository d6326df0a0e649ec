//! # Lifecycle Harness
//!
//! A software lifecycle catalog for hardware models with a deterministic
//! upgrade path service.
//!
//! Catalog documents (versions, EOL data, vendor upgrade paths, and
//! compatibility statements) are imported into SQLite. Per-model upgrade
//! graphs are built from that data on first use and queried through a CLI
//! and an HTTP API. The graph, path search, and summarization live in
//! [`lifecycle_harness_core`]; this crate supplies storage and the outer
//! surfaces.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐   ┌─────────────┐   ┌───────────────────┐
//! │ catalog.json│──▶│   import    │──▶│      SQLite       │
//! └─────────────┘   └─────────────┘   └─────────┬─────────┘
//!                                               │ SqliteCatalog
//!                                     ┌─────────▼─────────┐
//!                                     │ UpgradePathEngine │
//!                                     └─────────┬─────────┘
//!                               ┌───────────────┤
//!                               ▼               ▼
//!                          ┌──────────┐   ┌──────────┐
//!                          │   CLI    │   │   HTTP   │
//!                          │  (lch)   │   │  (axum)  │
//!                          └──────────┘   └──────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! lch init                          # create database
//! lch import demos/catalog.json     # load a catalog
//! lch models --vendor vmware        # list models with lifecycle status
//! lch versions 1                    # list versions of model 1
//! lch path 1 4.0 4.2                # compute an upgrade path
//! lch serve                         # start HTTP server
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`db`] | Database connection |
//! | [`migrate`] | Schema migrations |
//! | [`sqlite_store`] | SQLite catalog source |
//! | [`import`] | JSON catalog import |
//! | [`models`] | Model listing and lifecycle rollup |
//! | [`upgrade`] | Label-based path lookup and validation |
//! | [`versions`] | Version listing |
//! | [`server`] | HTTP server |
//! | [`telemetry`] | Log subscriber setup |

pub mod config;
pub mod db;
pub mod import;
pub mod migrate;
pub mod models;
pub mod server;
pub mod sqlite_store;
pub mod telemetry;
pub mod upgrade;
pub mod versions;
