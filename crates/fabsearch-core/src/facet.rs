//! Facet Builder
//!
//! Pure aggregation over a ranked result set: per-source, per-license and
//! per-format counts, a price bucket split, cumulative recency buckets,
//! and tab counts. Also hosts the facet *filters* applied to a result set
//! before tab filtering.

use std::collections::BTreeMap;

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

use crate::normalize::{AssetType, EntityType, NormalizedResult};
use crate::rank::RankedResult;

// ============================================================================
// FACET COUNTS
// ============================================================================

/// Price bucket split. free = price exactly 0, paid = price > 0,
/// unknown = missing/invalid. Invariant: free + paid + unknown == total.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PriceFacet {
    pub free: u64,
    pub paid: u64,
    pub unknown: u64,
}

/// Cumulative recency buckets over fixed windows.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RecencyFacet {
    #[serde(rename = "7d")]
    pub last_7d: u64,
    #[serde(rename = "30d")]
    pub last_30d: u64,
    #[serde(rename = "365d")]
    pub last_365d: u64,
    pub older: u64,
    pub unknown: u64,
}

/// Aggregate counts over one result set.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FacetCounts {
    pub sources: BTreeMap<String, u64>,
    pub licenses: BTreeMap<String, u64>,
    pub formats: BTreeMap<String, u64>,
    pub price: PriceFacet,
    pub time_range: RecencyFacet,
}

fn result_stamp(item: &NormalizedResult) -> Option<DateTime<Utc>> {
    item.published_at.or(item.updated_at)
}

/// Derive facet counts from a result set. No mutation of inputs.
pub fn build_facets(items: &[RankedResult], now: DateTime<Utc>) -> FacetCounts {
    let mut facets = FacetCounts::default();

    for ranked in items {
        let item = &ranked.result;
        let source = item
            .source_label
            .clone()
            .unwrap_or_else(|| item.source.clone());
        *facets.sources.entry(source).or_default() += 1;

        let license = item
            .license
            .clone()
            .unwrap_or_else(|| "unknown".to_string());
        *facets.licenses.entry(license).or_default() += 1;

        for format in &item.formats {
            *facets.formats.entry(format.clone()).or_default() += 1;
        }

        match item.price {
            Some(price) if price == 0.0 => facets.price.free += 1,
            Some(price) if price > 0.0 => facets.price.paid += 1,
            _ => facets.price.unknown += 1,
        }

        match result_stamp(item) {
            None => facets.time_range.unknown += 1,
            Some(stamp) => {
                let age = now - stamp;
                if age <= Duration::days(7) {
                    facets.time_range.last_7d += 1;
                    facets.time_range.last_30d += 1;
                    facets.time_range.last_365d += 1;
                } else if age <= Duration::days(30) {
                    facets.time_range.last_30d += 1;
                    facets.time_range.last_365d += 1;
                } else if age <= Duration::days(365) {
                    facets.time_range.last_365d += 1;
                } else {
                    facets.time_range.older += 1;
                }
            }
        }
    }

    facets
}

// ============================================================================
// TABS
// ============================================================================

/// Result counts per category tab.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TabCounts {
    pub models: u64,
    #[serde(rename = "laser-cut")]
    pub laser_cut: u64,
    pub users: u64,
    pub collections: u64,
    pub posts: u64,
}

const MODEL_ASSETS: [AssetType; 4] = [
    AssetType::Model3d,
    AssetType::Cnc,
    AssetType::Scan3d,
    AssetType::Cad,
];

/// Canonical tab name: `laser` aliases `laser-cut`, anything unrecognized
/// falls back to `models`.
pub fn canonical_tab(tab: &str) -> String {
    let tab = tab.trim().to_lowercase();
    match tab.as_str() {
        "laser" => "laser-cut".to_string(),
        "laser-cut" | "users" | "collections" | "posts" | "models" => tab,
        _ => "models".to_string(),
    }
}

/// Whether a result belongs on the given tab.
pub fn matches_tab(item: &NormalizedResult, tab: &str) -> bool {
    match tab {
        "users" => item.entity_type == EntityType::User,
        "collections" => item.entity_type == EntityType::Collection,
        "posts" => item.entity_type == EntityType::Post,
        "laser-cut" => item.entity_type == EntityType::Asset && item.asset_type == AssetType::Laser2d,
        _ => item.entity_type == EntityType::Asset && MODEL_ASSETS.contains(&item.asset_type),
    }
}

/// Count results per tab.
pub fn count_tabs<'a>(items: impl Iterator<Item = &'a NormalizedResult>) -> TabCounts {
    let mut counts = TabCounts::default();
    for item in items {
        if matches_tab(item, "models") {
            counts.models += 1;
        }
        if matches_tab(item, "laser-cut") {
            counts.laser_cut += 1;
        }
        if matches_tab(item, "users") {
            counts.users += 1;
        }
        if matches_tab(item, "collections") {
            counts.collections += 1;
        }
        if matches_tab(item, "posts") {
            counts.posts += 1;
        }
    }
    counts
}

// ============================================================================
// FACET FILTERS
// ============================================================================

/// Active facet filters for one request, already trimmed and lowercased.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FacetFilters {
    pub license: Option<String>,
    pub format: Option<String>,
    pub price: Option<String>,
    /// Raw time-window token, e.g. `30d`.
    pub time_range: Option<String>,
}

impl FacetFilters {
    pub fn is_empty(&self) -> bool {
        self.license.is_none()
            && self.format.is_none()
            && self.price.is_none()
            && self.time_range.is_none()
    }
}

/// Parse a `Nd` time-window token into a duration.
pub fn parse_time_window(value: &str) -> Option<Duration> {
    let days = value.trim().to_lowercase().strip_suffix('d')?.parse::<i64>().ok()?;
    (days > 0).then(|| Duration::days(days))
}

/// Drop results that do not satisfy the active facet filters.
pub fn apply_facet_filters(
    items: Vec<RankedResult>,
    filters: &FacetFilters,
    now: DateTime<Utc>,
) -> Vec<RankedResult> {
    if filters.is_empty() {
        return items;
    }
    let window = filters
        .time_range
        .as_deref()
        .and_then(parse_time_window);

    items
        .into_iter()
        .filter(|ranked| {
            let item = &ranked.result;
            if let Some(license) = &filters.license {
                let held = item.license.as_deref().unwrap_or("").to_lowercase();
                if !held.contains(license) {
                    return false;
                }
            }
            if let Some(format) = &filters.format {
                let has = item
                    .formats
                    .iter()
                    .any(|candidate| candidate.to_lowercase() == *format);
                if !has {
                    return false;
                }
            }
            match filters.price.as_deref() {
                Some("free") if item.price != Some(0.0) => return false,
                Some("paid") => match item.price {
                    Some(price) if price > 0.0 => {}
                    _ => return false,
                },
                _ => {}
            }
            if let Some(window) = window {
                match result_stamp(item) {
                    Some(stamp) if now - stamp <= window => {}
                    _ => return false,
                }
            }
            true
        })
        .collect()
}
