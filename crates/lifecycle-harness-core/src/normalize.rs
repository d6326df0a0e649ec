//! Normalization of free-text catalog fields.
//!
//! Release notes spell the same thing many ways (`"v4.2"`, `"Release 4.2.0"`,
//! `"End of Life"`, `"June 2024"`). These helpers reduce them to the canonical
//! forms stored in the catalog and used for ordering.

use std::cmp::Ordering;
use std::sync::LazyLock;

use chrono::NaiveDate;
use regex::Regex;

use crate::models::EolStatus;

static VERSION_PREFIX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(version|release|ver|v|r)\s*").expect("version prefix regex must compile")
});

static DOTTED_VERSION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(\d+)\.(\d+)(?:\.(\d+))?(?:\.(\d+))?").expect("dotted version regex must compile")
});

static DIGIT_RUN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d+").expect("digit run regex must compile"));

static YEAR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d{4})").expect("year regex must compile"));

static MONTH: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(0?[1-9]|1[0-2])\b").expect("month regex must compile"));

static MODEL_TOKENS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(eg|vco|sd-wan|vpn)\b").expect("model token regex must compile")
});

static WHITESPACE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("whitespace regex must compile"));

const VENDOR_ALIASES: &[(&str, &[&str])] = &[
    ("cisco", &["cisco systems", "cisco inc"]),
    ("vmware", &["vmware inc", "vmware, inc"]),
    ("aruba", &["aruba networks", "hpe aruba"]),
    ("juniper", &["juniper networks"]),
    ("fortinet", &["fortinet inc"]),
];

/// Reduce a version label to `major.minor.patch[.build]`.
///
/// A missing patch component is padded with `0`. Labels without a dotted
/// number are returned trimmed and unchanged; empty labels yield `None`.
pub fn normalize_version(label: &str) -> Option<String> {
    let trimmed = label.trim();
    if trimmed.is_empty() {
        return None;
    }
    let stripped = VERSION_PREFIX.replace(trimmed, "");

    let Some(caps) = DOTTED_VERSION.captures(&stripped) else {
        return Some(stripped.to_string());
    };

    let mut parts = vec![&caps[1], &caps[2]];
    parts.push(caps.get(3).map_or("0", |m| m.as_str()));
    if let Some(build) = caps.get(4) {
        parts.push(build.as_str());
    }
    Some(parts.join("."))
}

/// Order two version labels by their sequences of integer runs.
///
/// `"4.10.0"` sorts after `"4.9.2"`; labels with no digits sort first.
pub fn compare_versions(a: &str, b: &str) -> Ordering {
    numeric_parts(a).cmp(&numeric_parts(b))
}

fn numeric_parts(label: &str) -> Vec<u64> {
    DIGIT_RUN
        .find_iter(label)
        .map(|m| m.as_str().parse().unwrap_or(u64::MAX))
        .collect()
}

/// Map a free-text lifecycle label onto [`EolStatus`].
pub fn eol_status(label: Option<&str>) -> EolStatus {
    let Some(label) = label else {
        return EolStatus::Unknown;
    };
    match label.trim().to_lowercase().as_str() {
        "eol" | "end of life" | "deprecated" | "discontinued" | "unsupported" => EolStatus::Eol,
        "supported" | "active" | "current" | "maintained" => EolStatus::Supported,
        _ => EolStatus::Unknown,
    }
}

/// Parse the date spellings found in release notes.
///
/// Month-only dates resolve to the first of the month. As a last resort a
/// bare year (optionally with a numeric month) is accepted.
pub fn parse_date(text: &str) -> Option<NaiveDate> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }

    const FULL_FORMATS: &[&str] = &["%Y-%m-%d", "%m/%d/%Y", "%d/%m/%Y", "%B %d, %Y", "%b %d, %Y"];
    for fmt in FULL_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(text, fmt) {
            return Some(date);
        }
    }

    // Month precision: supply the day so chrono can build a full date.
    let month_forms = [
        (format!("1 {}", text), "%d %B %Y"),
        (format!("1 {}", text), "%d %b %Y"),
        (format!("{}-01", text), "%Y-%m-%d"),
        (format!("01-{}", text), "%d-%m-%Y"),
    ];
    for (candidate, fmt) in &month_forms {
        if let Ok(date) = NaiveDate::parse_from_str(candidate, fmt) {
            return Some(date);
        }
    }

    let year: i32 = YEAR.captures(text)?[1].parse().ok()?;
    let month: u32 = MONTH
        .captures(text)
        .and_then(|c| c[1].parse().ok())
        .unwrap_or(1);
    NaiveDate::from_ymd_opt(year, month, 1)
}

/// Canonical vendor name: known aliases collapse to one spelling, anything
/// else is title-cased.
pub fn canonical_vendor(vendor: &str) -> Option<String> {
    let trimmed = vendor.trim();
    if trimmed.is_empty() {
        return None;
    }
    let lower = trimmed.to_lowercase();
    for (canonical, aliases) in VENDOR_ALIASES {
        if lower == *canonical || aliases.contains(&lower.as_str()) {
            return Some(title_case(canonical));
        }
    }
    Some(title_case(trimmed))
}

/// Collapse whitespace and upper-case well-known product tokens
/// (`eg`, `vco`, `sd-wan`, `vpn`).
pub fn normalize_model_name(name: &str) -> Option<String> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return None;
    }
    let collapsed = WHITESPACE.replace_all(trimmed, " ");
    let upper = MODEL_TOKENS.replace_all(&collapsed, |caps: &regex::Captures| caps[1].to_uppercase());
    Some(upper.into_owned())
}

fn title_case(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut at_word_start = true;
    for ch in text.chars() {
        if ch.is_alphabetic() {
            if at_word_start {
                out.extend(ch.to_uppercase());
            } else {
                out.extend(ch.to_lowercase());
            }
            at_word_start = false;
        } else {
            out.push(ch);
            at_word_start = true;
        }
    }
    out
}
