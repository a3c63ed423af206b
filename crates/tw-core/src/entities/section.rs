use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::ScoredItem;

/// Scored items sharing one topical section.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
pub struct SectionGroup {
    pub name: String,
    /// Ordered by descending story score.
    pub items: Vec<ScoredItem>,
    pub count: usize,
    pub average_score: f64,
    pub confidence_contribution: f64,
}

impl SectionGroup {
    /// Title-cased section name for display (`"foreign_policy"` → `"Foreign Policy"`).
    #[must_use]
    pub fn display_name(&self) -> String {
        self.name
            .split(['_', '-', ' '])
            .filter(|w| !w.is_empty())
            .map(|w| {
                let mut chars = w.chars();
                chars.next().map_or_else(String::new, |first| {
                    first.to_uppercase().chain(chars).collect()
                })
            })
            .collect::<Vec<_>>()
            .join(" ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_name_title_cases_words() {
        let group = SectionGroup {
            name: "foreign_policy".into(),
            items: Vec::new(),
            count: 0,
            average_score: 0.0,
            confidence_contribution: 0.0,
        };
        assert_eq!(group.display_name(), "Foreign Policy");
    }
}
