//! Core data models for the version catalog.
//!
//! These are the shapes the upgrade path engine consumes from a
//! [`CatalogSource`](crate::store::CatalogSource): versions of one hardware
//! model and the two kinds of transition records between them.

use std::fmt;
use std::str::FromStr;

use anyhow::bail;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Identifier of a hardware/product model.
pub type ModelId = i64;

/// Identifier of a software version, unique within a model.
pub type VersionId = i64;

/// Lifecycle status of a version.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum EolStatus {
    Eol,
    Supported,
    #[default]
    Unknown,
}

impl EolStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            EolStatus::Eol => "EOL",
            EolStatus::Supported => "SUPPORTED",
            EolStatus::Unknown => "UNKNOWN",
        }
    }
}

impl fmt::Display for EolStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for EolStatus {
    type Err = anyhow::Error;

    /// Strict parse of the stored form. Free-text labels from documents go
    /// through [`normalize::eol_status`](crate::normalize::eol_status).
    fn from_str(s: &str) -> anyhow::Result<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "EOL" => Ok(EolStatus::Eol),
            "SUPPORTED" => Ok(EolStatus::Supported),
            "UNKNOWN" => Ok(EolStatus::Unknown),
            other => bail!("invalid eol status: '{}'", other),
        }
    }
}

/// Risk of a single upgrade transition.
///
/// Variants are declared in ascending severity, so `Ord` gives
/// `Low < Med < High` and the overall risk of a path is simply the maximum.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "UPPERCASE")]
pub enum RiskLevel {
    #[default]
    Low,
    Med,
    High,
}

impl RiskLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLevel::Low => "LOW",
            RiskLevel::Med => "MED",
            RiskLevel::High => "HIGH",
        }
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for RiskLevel {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> anyhow::Result<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "LOW" => Ok(RiskLevel::Low),
            "MED" | "MEDIUM" => Ok(RiskLevel::Med),
            "HIGH" => Ok(RiskLevel::High),
            other => bail!("invalid risk level: '{}'. Must be LOW, MED, or HIGH.", other),
        }
    }
}

/// One software release of one model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Version {
    pub id: VersionId,
    /// Label as it appeared in the source document (e.g. `"v4.2.1"`).
    pub version_string: String,
    /// Canonical dotted form used for ordering (e.g. `"4.2.1"`).
    pub normalized_version: Option<String>,
    pub eol_status: EolStatus,
    pub eol_date: Option<NaiveDate>,
    pub release_date: Option<NaiveDate>,
}

impl Version {
    /// Minimal constructor used by tests and in-memory catalogs.
    pub fn new(id: VersionId, version_string: impl Into<String>) -> Self {
        let version_string = version_string.into();
        Self {
            id,
            normalized_version: crate::normalize::normalize_version(&version_string),
            version_string,
            eol_status: EolStatus::Unknown,
            eol_date: None,
            release_date: None,
        }
    }
}

/// Authoritative upgrade-path record.
///
/// Unset optional fields are defaulted when the record becomes a graph edge:
/// risk to `LOW`, backup and reboot to `true`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpgradePathRecord {
    pub from_version_id: VersionId,
    pub to_version_id: VersionId,
    /// Versions that must be visited, in order, between `from` and `to`.
    pub mandatory_intermediates: Vec<VersionId>,
    pub risk_level: Option<RiskLevel>,
    pub notes: Option<String>,
    pub estimated_downtime_minutes: Option<u32>,
    pub requires_backup: Option<bool>,
    pub requires_reboot: Option<bool>,
}

impl UpgradePathRecord {
    pub fn new(from_version_id: VersionId, to_version_id: VersionId) -> Self {
        Self {
            from_version_id,
            to_version_id,
            ..Default::default()
        }
    }
}

/// Compatibility statement between two versions.
///
/// Only records with `allowed = true` become edges, and they carry no risk
/// information of their own.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompatibilityRecord {
    pub from_version_id: VersionId,
    pub to_version_id: VersionId,
    pub allowed: bool,
    pub notes: Option<String>,
}

impl CompatibilityRecord {
    pub fn allowed(from_version_id: VersionId, to_version_id: VersionId) -> Self {
        Self {
            from_version_id,
            to_version_id,
            allowed: true,
            notes: None,
        }
    }
}
