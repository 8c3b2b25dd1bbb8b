//! Ranker / Deduplicator
//!
//! Merges canonical duplicates across providers and orders the combined
//! result set. Two dedup levels:
//!
//! 1. Exact key (lower-cased url, else source+id+title): later duplicates
//!    are discarded outright.
//! 2. Canonical key (normalized title + creator): when two *different*
//!    providers plausibly describe the same asset, their records merge
//!    into one [`RankedResult`] keeping the best available fields, the
//!    field-wise maximum of each stat, and the full set of contributing
//!    providers.
//!
//! Ordering is fully determined by the sort key and tie-break rule,
//! independent of provider completion order.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::normalize::NormalizedResult;

/// Flat score bonus for explicitly boosted items under [`SortMode::Boosts`].
const BOOST_BONUS: f64 = 5.0;

/// Blend weights for the trending score.
const TRENDING_POPULARITY_WEIGHT: f64 = 0.7;
const TRENDING_FRESHNESS_WEIGHT: f64 = 0.3;

// ============================================================================
// SORT MODES
// ============================================================================

/// How the combined result set is ordered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SortMode {
    /// Accumulated relevance score (base score plus intent boosts).
    #[default]
    Relevant,
    Newest,
    Likes,
    Downloads,
    Views,
    /// Popularity blended with a freshness decay.
    Trending,
    /// Trending plus a flat bonus for boosted items.
    Boosts,
}

impl SortMode {
    /// Total parse: unknown values fall back to [`SortMode::Relevant`].
    pub fn parse(value: &str) -> Self {
        match value.trim().to_lowercase().as_str() {
            "newest" => SortMode::Newest,
            "likes" => SortMode::Likes,
            "downloads" => SortMode::Downloads,
            "views" => SortMode::Views,
            "trending" => SortMode::Trending,
            "boosts" => SortMode::Boosts,
            _ => SortMode::Relevant,
        }
    }
}

impl std::fmt::Display for SortMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SortMode::Relevant => write!(f, "relevant"),
            SortMode::Newest => write!(f, "newest"),
            SortMode::Likes => write!(f, "likes"),
            SortMode::Downloads => write!(f, "downloads"),
            SortMode::Views => write!(f, "views"),
            SortMode::Trending => write!(f, "trending"),
            SortMode::Boosts => write!(f, "boosts"),
        }
    }
}

// ============================================================================
// RANKED RESULTS
// ============================================================================

/// One provider's url for a merged asset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceVariant {
    pub source: String,
    pub url: String,
}

/// A normalized result after cross-provider merge.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RankedResult {
    #[serde(flatten)]
    pub result: NormalizedResult,
    /// Provider ids that contributed this asset, base provider first.
    pub also_found_on: Vec<String>,
    /// Per-provider urls for the merged variants.
    pub source_variants: Vec<SourceVariant>,
}

impl From<NormalizedResult> for RankedResult {
    fn from(result: NormalizedResult) -> Self {
        let variant = SourceVariant {
            source: result.source.clone(),
            url: result.url.clone(),
        };
        let also_found_on = vec![result.source.clone()];
        Self {
            result,
            also_found_on,
            source_variants: vec![variant],
        }
    }
}

impl RankedResult {
    /// Fold another provider's record for the same asset into this one.
    fn merge(&mut self, other: NormalizedResult) {
        if !self.also_found_on.contains(&other.source) {
            self.also_found_on.push(other.source.clone());
        }
        self.source_variants.push(SourceVariant {
            source: other.source.clone(),
            url: other.url.clone(),
        });

        let base = &mut self.result;
        if base.thumbnail.is_none() {
            base.thumbnail = other.thumbnail;
        }
        if base.creator_name.is_none() {
            base.creator_name = other.creator_name;
        }
        if base.creator_url.is_none() {
            base.creator_url = other.creator_url;
        }
        if base.license.is_none() {
            base.license = other.license;
        }
        if base.formats.is_empty() {
            base.formats = other.formats;
        }
        base.stats.likes = max_stat(base.stats.likes, other.stats.likes);
        base.stats.downloads = max_stat(base.stats.downloads, other.stats.downloads);
        base.stats.views = max_stat(base.stats.views, other.stats.views);
        base.boosted = base.boosted || other.boosted;
    }
}

fn max_stat(a: Option<f64>, b: Option<f64>) -> Option<f64> {
    match (a, b) {
        (Some(a), Some(b)) => Some(a.max(b)),
        (Some(a), None) => Some(a),
        (None, b) => b,
    }
}

// ============================================================================
// KEYS AND SCORES
// ============================================================================

fn exact_key(item: &NormalizedResult) -> String {
    let url = item.url.trim().to_lowercase();
    if !url.is_empty() {
        url
    } else {
        format!("{}:{}:{}", item.source, item.id, item.title.to_lowercase())
    }
}

/// Normalized (title, creator) pair. `None` when the title carries no
/// alphanumeric content; such records never merge.
fn canonical_key(item: &NormalizedResult) -> Option<String> {
    let title: String = item
        .title
        .to_lowercase()
        .chars()
        .filter(char::is_ascii_alphanumeric)
        .collect();
    if title.is_empty() {
        return None;
    }
    let creator = item
        .creator_name
        .as_deref()
        .unwrap_or("")
        .trim()
        .to_lowercase();
    Some(format!("{title}|{creator}"))
}

fn days_since(now: DateTime<Utc>, then: DateTime<Utc>) -> f64 {
    ((now - then).num_seconds() as f64 / 86_400.0).max(0.0)
}

/// Popularity blended with freshness. Popularity is ln1p-damped so large
/// view counts cannot drown the freshness term.
fn trending_score(item: &NormalizedResult, now: DateTime<Utc>) -> f64 {
    let stats = &item.stats;
    let popularity = stats.likes.unwrap_or(0.0) * 1.3
        + stats.downloads.unwrap_or(0.0) * 1.1
        + stats.views.unwrap_or(0.0) * 0.08;
    let freshness = item
        .published_at
        .map(|published| 1.0 / (1.0 + days_since(now, published)))
        .unwrap_or(0.0);
    TRENDING_POPULARITY_WEIGHT * popularity.ln_1p() + TRENDING_FRESHNESS_WEIGHT * freshness
}

fn sort_key(item: &NormalizedResult, sort: SortMode, now: DateTime<Utc>) -> f64 {
    match sort {
        SortMode::Newest => item
            .published_at
            .or(item.updated_at)
            .map(|stamp| stamp.timestamp_millis() as f64)
            .unwrap_or(0.0),
        SortMode::Likes => item.stats.likes.unwrap_or(0.0),
        SortMode::Downloads => item.stats.downloads.unwrap_or(0.0),
        SortMode::Views => item.stats.views.unwrap_or(0.0),
        SortMode::Trending => trending_score(item, now),
        SortMode::Boosts => {
            trending_score(item, now) + if item.boosted { BOOST_BONUS } else { 0.0 }
        }
        SortMode::Relevant => item.score,
    }
}

// ============================================================================
// RANK + DEDUPE
// ============================================================================

/// Order, deduplicate and merge the combined result set of one request.
///
/// Deterministic given identical inputs: sort key desc, then raw score
/// desc, then title ascending.
pub fn rank_and_dedupe(
    items: Vec<NormalizedResult>,
    sort: SortMode,
    now: DateTime<Utc>,
) -> Vec<RankedResult> {
    let mut sorted = items;
    sorted.sort_by(|a, b| {
        let key_a = sort_key(a, sort, now);
        let key_b = sort_key(b, sort, now);
        key_b
            .partial_cmp(&key_a)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| {
                b.score
                    .partial_cmp(&a.score)
                    .unwrap_or(std::cmp::Ordering::Equal)
            })
            .then_with(|| a.title.cmp(&b.title))
    });

    let mut seen_exact: HashSet<String> = HashSet::new();
    let mut canonical_index: HashMap<String, usize> = HashMap::new();
    let mut out: Vec<RankedResult> = Vec::new();

    for item in sorted {
        if !seen_exact.insert(exact_key(&item)) {
            continue;
        }

        if let Some(key) = canonical_key(&item) {
            if let Some(&index) = canonical_index.get(&key) {
                // Merge only records from different providers; the same
                // provider repeating a title stays a separate result.
                if !out[index].also_found_on.contains(&item.source) {
                    out[index].merge(item);
                    continue;
                }
            } else {
                canonical_index.insert(key, out.len());
            }
        }
        out.push(RankedResult::from(item));
    }

    out
}
