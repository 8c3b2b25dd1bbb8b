//! Result Normalizer
//!
//! Converts an untyped, schema-less provider payload into a strongly-typed
//! sum of {valid result, validation error}. Normalization is a total
//! function: it either yields a fully valid [`NormalizedResult`] or fails
//! with a [`NormalizeError`]. Partial instances never escape.
//!
//! Field coercions: strings trim to none-if-empty, numbers reject negative
//! or non-finite values, dates parse to UTC or drop, arrays filter falsy
//! entries. Required fields and the http(s) URL constraint are enforced on
//! the fully built candidate.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use url::Url;

// ============================================================================
// ERRORS
// ============================================================================

/// Validation failure while normalizing a provider result.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum NormalizeError {
    /// The top-level provider payload was not an array of results.
    #[error("adapter payload must be an array of results")]
    PayloadNotArray,
    /// A single result candidate was not a JSON object.
    #[error("result must be a JSON object")]
    NotAnObject,
    /// id, source or title ended up empty after coercion.
    #[error("missing required fields")]
    MissingRequired,
    /// The result url is absent or not a well-formed http(s) URI.
    #[error("invalid result url: {0}")]
    InvalidUrl(String),
}

// ============================================================================
// ENUMS
// ============================================================================

/// Kind of fabrication asset a result describes.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum AssetType {
    /// Printable 3D model (the default).
    #[default]
    Model3d,
    /// 2D laser-cutting pattern.
    Laser2d,
    /// CNC routing/milling project.
    Cnc,
    /// 3D scan / open-access digitization.
    Scan3d,
    /// Parametric CAD file.
    Cad,
}

impl AssetType {
    /// Map a raw provider value onto the canonical enum, defaulting to
    /// [`AssetType::Model3d`] for anything unrecognized.
    pub fn from_raw(value: &str) -> Self {
        match value.trim().to_lowercase().as_str() {
            "laser" | "laser2d" => AssetType::Laser2d,
            "cnc" => AssetType::Cnc,
            "scan" | "scan3d" | "openaccess" => AssetType::Scan3d,
            "cad" => AssetType::Cad,
            _ => AssetType::Model3d,
        }
    }
}

impl std::fmt::Display for AssetType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AssetType::Model3d => write!(f, "model3d"),
            AssetType::Laser2d => write!(f, "laser2d"),
            AssetType::Cnc => write!(f, "cnc"),
            AssetType::Scan3d => write!(f, "scan3d"),
            AssetType::Cad => write!(f, "cad"),
        }
    }
}

/// What kind of entity a result refers to. Most results are assets; some
/// providers also surface users, collections and posts for the matching
/// result tabs.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum EntityType {
    #[default]
    Asset,
    User,
    Collection,
    Post,
}

impl EntityType {
    /// Map a raw provider value onto the canonical enum, defaulting to
    /// [`EntityType::Asset`].
    pub fn from_raw(value: &str) -> Self {
        match value.trim().to_lowercase().as_str() {
            "user" | "users" | "profile" | "creator" => EntityType::User,
            "collection" | "collections" | "board" | "list" => EntityType::Collection,
            "post" | "posts" | "article" | "topic" | "thread" => EntityType::Post,
            _ => EntityType::Asset,
        }
    }
}

// ============================================================================
// CANONICAL SCHEMA
// ============================================================================

/// Popularity counters, each non-negative or absent.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultStats {
    pub likes: Option<f64>,
    pub downloads: Option<f64>,
    pub views: Option<f64>,
}

/// A provider result in the canonical output schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NormalizedResult {
    pub id: String,
    pub source: String,
    pub title: String,
    pub url: String,
    pub thumbnail: Option<String>,
    pub creator_name: Option<String>,
    pub creator_url: Option<String>,
    pub stats: ResultStats,
    pub asset_type: AssetType,
    pub entity_type: EntityType,
    pub license: Option<String>,
    pub price: Option<f64>,
    pub currency: Option<String>,
    pub tags: Vec<String>,
    pub published_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
    pub formats: Vec<String>,
    pub source_label: Option<String>,
    pub source_icon_url: Option<String>,
    /// Editorially promoted item; feeds the `boosts` sort mode.
    pub boosted: bool,
    /// Relevance score: provider base score plus intent-match boosts.
    pub score: f64,
}

// ============================================================================
// FIELD COERCIONS
// ============================================================================

fn clean_string(value: Option<&Value>) -> Option<String> {
    match value {
        Some(Value::String(text)) => {
            let trimmed = text.trim();
            (!trimmed.is_empty()).then(|| trimmed.to_string())
        }
        Some(Value::Number(number)) => Some(number.to_string()),
        _ => None,
    }
}

fn clean_number(value: Option<&Value>) -> Option<f64> {
    let number = match value {
        Some(Value::Number(number)) => number.as_f64(),
        Some(Value::String(text)) => text.trim().parse::<f64>().ok(),
        _ => None,
    }?;
    (number.is_finite() && number >= 0.0).then_some(number)
}

fn clean_date(value: Option<&Value>) -> Option<DateTime<Utc>> {
    match value {
        Some(Value::String(text)) => {
            let trimmed = text.trim();
            if trimmed.is_empty() {
                return None;
            }
            if let Ok(parsed) = DateTime::parse_from_rfc3339(trimmed) {
                return Some(parsed.with_timezone(&Utc));
            }
            NaiveDate::parse_from_str(trimmed, "%Y-%m-%d")
                .ok()
                .and_then(|date| date.and_hms_opt(0, 0, 0))
                .map(|naive| naive.and_utc())
        }
        Some(Value::Number(number)) => {
            // Numeric timestamps arrive as epoch milliseconds.
            let millis = number.as_i64()?;
            DateTime::<Utc>::from_timestamp_millis(millis)
        }
        _ => None,
    }
}

fn clean_array(value: Option<&Value>) -> Vec<String> {
    match value {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(|item| match item {
                Value::String(text) if !text.trim().is_empty() => Some(text.trim().to_string()),
                Value::Number(number) => Some(number.to_string()),
                _ => None,
            })
            .collect(),
        _ => Vec::new(),
    }
}

fn clean_bool(value: Option<&Value>) -> bool {
    matches!(value, Some(Value::Bool(true)))
}

fn is_http_url(value: &str) -> bool {
    Url::parse(value)
        .map(|url| matches!(url.scheme(), "http" | "https"))
        .unwrap_or(false)
}

/// First non-null value among the given keys, looked up on `primary` first
/// and then on `meta`.
fn pick<'a>(primary: &'a Value, meta: &'a Value, keys: &[&str]) -> Option<&'a Value> {
    for object in [primary, meta] {
        for key in keys {
            match object.get(key) {
                Some(Value::Null) | None => continue,
                Some(found) => return Some(found),
            }
        }
    }
    None
}

// ============================================================================
// NORMALIZATION
// ============================================================================

/// Validate the top-level shape of a provider payload.
///
/// Providers must return an array of result candidates; anything else is a
/// contract violation surfaced as a provider-level error.
pub fn normalize_payload(payload: Value) -> Result<Vec<Value>, NormalizeError> {
    match payload {
        Value::Array(items) => Ok(items),
        _ => Err(NormalizeError::PayloadNotArray),
    }
}

/// Normalize one raw provider result into the canonical schema.
///
/// Purely functional: the caller decides whether to drop the offending item
/// or halt. Normalization is idempotent; feeding a serialized
/// [`NormalizedResult`] back through yields an identical value.
pub fn normalize_result(item: &Value) -> Result<NormalizedResult, NormalizeError> {
    if !item.is_object() {
        return Err(NormalizeError::NotAnObject);
    }
    let empty = Value::Object(serde_json::Map::new());
    let meta = match item.get("meta") {
        Some(meta) if meta.is_object() => meta,
        _ => &empty,
    };

    let source = clean_string(item.get("source")).unwrap_or_else(|| "unknown".to_string());
    let title = clean_string(item.get("title")).unwrap_or_else(|| "Untitled".to_string());
    let url = clean_string(item.get("url"));
    let id = clean_string(item.get("id")).unwrap_or_else(|| {
        let tail = url
            .clone()
            .or_else(|| clean_string(item.get("title")))
            .unwrap_or_else(|| "item".to_string());
        format!("{source}:{tail}")
    });

    let stats = item.get("stats").filter(|value| value.is_object());
    let stats_field = |keys: &[&str]| match stats {
        Some(stats) => pick(stats, meta, keys),
        None => pick(&empty, meta, keys),
    };

    let candidate = NormalizedResult {
        id,
        source,
        title,
        url: url.clone().unwrap_or_default(),
        thumbnail: clean_string(item.get("thumbnail")),
        creator_name: clean_string(pick(item, &empty, &["creatorName", "author"])),
        creator_url: clean_string(pick(item, meta, &["creatorUrl"])),
        stats: ResultStats {
            likes: clean_number(stats_field(&["likes"])),
            downloads: clean_number(stats_field(&["downloads", "download_count", "collects"])),
            views: clean_number(stats_field(&["views", "visits"])),
        },
        asset_type: clean_string(pick(item, meta, &["assetType"]))
            .map(|value| AssetType::from_raw(&value))
            .unwrap_or_default(),
        entity_type: clean_string(pick(
            item,
            meta,
            &["entityType", "resultType", "kind", "type"],
        ))
        .map(|value| EntityType::from_raw(&value))
        .unwrap_or_default(),
        license: clean_string(pick(item, meta, &["license", "store_license"])),
        price: clean_number(pick(item, meta, &["price"])),
        currency: clean_string(pick(item, meta, &["currency"])),
        tags: clean_array(pick(item, meta, &["tags"])),
        published_at: clean_date(pick(item, meta, &["publishedAt", "createdAt"])),
        updated_at: clean_date(pick(item, meta, &["updatedAt"])),
        formats: clean_array(pick(item, meta, &["formats"])),
        source_label: clean_string(item.get("sourceLabel")),
        source_icon_url: clean_string(item.get("sourceIconUrl")),
        boosted: clean_bool(pick(item, meta, &["boosted"])),
        score: item.get("score").and_then(Value::as_f64).unwrap_or(0.0),
    };

    if candidate.id.is_empty() || candidate.source.is_empty() || candidate.title.is_empty() {
        return Err(NormalizeError::MissingRequired);
    }
    match url {
        Some(url) if is_http_url(&url) => {}
        other => return Err(NormalizeError::InvalidUrl(other.unwrap_or_default())),
    }

    Ok(candidate)
}
