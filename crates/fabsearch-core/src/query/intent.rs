//! Query intent detection and synonym expansion
//!
//! Tokenizes the plain query, detects format/license/free hints, and expands
//! each token through a static synonym table. The expanded term set is sent
//! to providers and reused for relevance boosting.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

/// File formats recognized as query hints.
const KNOWN_FORMATS: [&str; 6] = ["stl", "3mf", "svg", "dxf", "step", "obj"];

/// License tokens recognized as query hints.
const LICENSE_HINTS: [&str; 2] = ["cc-by", "commercial"];

/// Static token → aliases table used for query expansion.
///
/// The table is data, not behavior: the same input query always expands the
/// same way for a given table.
#[derive(Debug, Clone)]
pub struct SynonymTable {
    entries: HashMap<String, Vec<String>>,
}

impl SynonymTable {
    /// Build a table from `(token, aliases)` pairs.
    pub fn from_pairs<I, S>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (S, Vec<S>)>,
        S: Into<String>,
    {
        let entries = pairs
            .into_iter()
            .map(|(token, aliases)| {
                (
                    token.into().to_lowercase(),
                    aliases
                        .into_iter()
                        .map(|alias| alias.into().to_lowercase())
                        .collect(),
                )
            })
            .collect();
        Self { entries }
    }

    /// An empty table (no expansion).
    pub fn empty() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }

    /// Aliases for a token, if any.
    pub fn aliases(&self, token: &str) -> Option<&[String]> {
        self.entries.get(token).map(Vec::as_slice)
    }
}

impl Default for SynonymTable {
    /// The built-in maker-vocabulary table.
    fn default() -> Self {
        Self::from_pairs([
            ("box", vec!["case", "enclosure", "container"]),
            ("gear", vec!["cog", "gearbox"]),
            ("holder", vec!["stand", "mount", "bracket"]),
            ("organizer", vec!["organiser", "tray", "storage"]),
            ("vase", vec!["planter", "pot"]),
            ("keychain", vec!["keyring", "key-fob"]),
            ("sign", vec!["plaque", "nameplate"]),
            ("puzzle", vec!["brainteaser"]),
            ("drone", vec!["quadcopter", "uav"]),
            ("miniature", vec!["mini", "figurine"]),
        ])
    }
}

/// Structured interpretation of a plain query.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryIntent {
    /// Space-joined expanded term set, ready for provider calls.
    pub expanded_query: String,
    /// Expanded term set: original tokens followed by their aliases,
    /// deduplicated, first-seen order.
    pub tokens: Vec<String>,
    /// Format hints found among the original tokens.
    pub formats: Vec<String>,
    /// License hint, if one of the known license tokens appears.
    pub license_hint: Option<String>,
    /// Whether the query asks for free results.
    pub free_only: bool,
}

impl QueryIntent {
    /// Parse a plain query into structured intent.
    ///
    /// Pure function; no side effects. Identical input (and table) yields
    /// identical output.
    pub fn parse(query: &str, synonyms: &SynonymTable) -> Self {
        let lowered = query.to_lowercase();
        let tokens: Vec<&str> = lowered.split_whitespace().collect();

        let formats: Vec<String> = KNOWN_FORMATS
            .iter()
            .filter(|fmt| tokens.contains(fmt))
            .map(|fmt| (*fmt).to_string())
            .collect();
        let license_hint = tokens
            .iter()
            .find(|token| LICENSE_HINTS.contains(token))
            .map(|token| (*token).to_string());
        let free_only = tokens.contains(&"free");

        let mut expanded: Vec<String> = Vec::new();
        let mut seen: HashSet<String> = HashSet::new();
        for token in &tokens {
            if seen.insert((*token).to_string()) {
                expanded.push((*token).to_string());
            }
        }
        for token in &tokens {
            if let Some(aliases) = synonyms.aliases(token) {
                for alias in aliases {
                    if seen.insert(alias.clone()) {
                        expanded.push(alias.clone());
                    }
                }
            }
        }

        Self {
            expanded_query: expanded.join(" "),
            tokens: expanded,
            formats,
            license_hint,
            free_only,
        }
    }
}
