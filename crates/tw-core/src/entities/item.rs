use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Section assigned to items whose search hit carried no section.
pub const DEFAULT_SECTION: &str = "general";

/// A content item matched to a trend.
///
/// `story_score` is `(trend.score / 100) * relevance_score`, rounded to three
/// decimals. Built by the scorer, never by hand outside tests.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
pub struct ScoredItem {
    pub item_id: String,
    pub section: String,
    pub relevance_score: f64,
    pub story_score: f64,
}

impl ScoredItem {
    /// Normalize an optional section name, falling back to `"general"`.
    #[must_use]
    pub fn section_or_default(section: Option<&str>) -> String {
        match section.map(str::trim) {
            Some(s) if !s.is_empty() => s.to_lowercase(),
            _ => DEFAULT_SECTION.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_or_blank_section_becomes_general() {
        assert_eq!(ScoredItem::section_or_default(None), "general");
        assert_eq!(ScoredItem::section_or_default(Some("  ")), "general");
        assert_eq!(ScoredItem::section_or_default(Some("Politics")), "politics");
    }
}
