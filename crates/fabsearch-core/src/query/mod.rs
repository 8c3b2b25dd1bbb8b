//! Query Parsing Module
//!
//! Turns a raw user query into structured search intent:
//! - Advanced `key:value` filter tokens (source/type/format/license/price)
//! - Plain-text tokenization with synonym expansion
//! - Format/license/free hints used for relevance boosting

mod advanced;
mod intent;

pub use advanced::{AdvancedQuery, QueryChip, parse_advanced};
pub use intent::{QueryIntent, SynonymTable};
