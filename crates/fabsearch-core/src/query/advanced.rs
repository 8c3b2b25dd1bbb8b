//! Advanced query token extraction
//!
//! Splits `key:value` tokens out of the raw query text. Repeated `source:`
//! tokens accumulate into a list; `type:`, `format:`, `license:` and
//! `price:` are singletons (last occurrence wins). The residual text is the
//! plain query used for provider calls.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

static TOKEN_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(?:^|\s)(source|type|format|license|price):(\S+)")
        .expect("advanced token pattern is valid")
});

/// A user-facing description of one extracted filter token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryChip {
    pub key: String,
    pub value: String,
}

/// The structured form of a raw query after advanced-token extraction.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdvancedQuery {
    /// Residual plain-text query with filter tokens stripped.
    pub query_text: String,
    /// Accumulated `source:` values, in order of appearance.
    pub source: Vec<String>,
    #[serde(rename = "type")]
    pub type_hint: Option<String>,
    pub format: Option<String>,
    pub license: Option<String>,
    pub price: Option<String>,
    /// Chips describing every extracted filter, sources first.
    pub chips: Vec<QueryChip>,
}

fn clean(value: &str) -> String {
    value.trim().to_lowercase()
}

/// Extract `key:value` filter tokens from a raw query.
///
/// Pure function: the same input always yields the same output.
pub fn parse_advanced(raw: &str) -> AdvancedQuery {
    let mut parsed = AdvancedQuery::default();

    for caps in TOKEN_PATTERN.captures_iter(raw) {
        let key = clean(&caps[1]);
        let value = clean(&caps[2]);
        if value.is_empty() {
            continue;
        }
        match key.as_str() {
            "source" => parsed.source.push(value),
            "type" => parsed.type_hint = Some(value),
            "format" => parsed.format = Some(value),
            "license" => parsed.license = Some(value),
            "price" => parsed.price = Some(value),
            _ => {}
        }
    }

    let stripped = TOKEN_PATTERN.replace_all(raw, " ");
    parsed.query_text = stripped.split_whitespace().collect::<Vec<_>>().join(" ");

    parsed.chips = parsed
        .source
        .iter()
        .map(|value| QueryChip {
            key: "source".to_string(),
            value: value.clone(),
        })
        .collect();
    for (key, value) in [
        ("type", &parsed.type_hint),
        ("format", &parsed.format),
        ("license", &parsed.license),
        ("price", &parsed.price),
    ] {
        if let Some(value) = value {
            parsed.chips.push(QueryChip {
                key: key.to_string(),
                value: value.clone(),
            });
        }
    }

    parsed
}
