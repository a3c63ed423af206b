//! Grouping of scored items by topical section.

use std::collections::BTreeMap;

use tw_core::entities::{DEFAULT_SECTION, ScoredItem, SectionGroup};

use crate::scorer::{mean_nonzero, round3};

/// Partition items by section and summarize each group.
///
/// Items with a blank section land in `"general"`. Each group's items are
/// ordered by descending story score, `average_score` is the mean non-zero
/// story score, and `confidence_contribution` is `average * size / total`.
/// Groups are ordered by descending average, ties broken by name.
#[must_use]
pub fn group_sections(items: &[ScoredItem]) -> Vec<SectionGroup> {
    if items.is_empty() {
        return Vec::new();
    }

    let mut buckets: BTreeMap<String, Vec<ScoredItem>> = BTreeMap::new();
    for item in items {
        let name = if item.section.trim().is_empty() {
            DEFAULT_SECTION.to_string()
        } else {
            item.section.clone()
        };
        buckets.entry(name).or_default().push(item.clone());
    }

    #[allow(clippy::cast_precision_loss)]
    let total = items.len() as f64;

    let mut groups: Vec<SectionGroup> = buckets
        .into_iter()
        .map(|(name, mut members)| {
            members.sort_by(|a, b| {
                b.story_score
                    .partial_cmp(&a.story_score)
                    .unwrap_or(std::cmp::Ordering::Equal)
                    .then_with(|| a.item_id.cmp(&b.item_id))
            });
            let average = mean_nonzero(&members);
            #[allow(clippy::cast_precision_loss)]
            let contribution = average * members.len() as f64 / total;
            SectionGroup {
                name,
                count: members.len(),
                items: members,
                average_score: round3(average),
                confidence_contribution: round3(contribution),
            }
        })
        .collect();

    groups.sort_by(|a, b| {
        b.average_score
            .partial_cmp(&a.average_score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.name.cmp(&b.name))
    });
    groups
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn item(id: &str, section: &str, story_score: f64) -> ScoredItem {
        ScoredItem {
            item_id: id.into(),
            section: section.into(),
            relevance_score: story_score,
            story_score,
        }
    }

    #[test]
    fn empty_input_yields_no_groups() {
        assert!(group_sections(&[]).is_empty());
    }

    #[test]
    fn groups_are_ordered_by_average_then_name() {
        let items = vec![
            item("a1", "politics", 0.81),
            item("a3", "technology", 0.45),
            item("a2", "politics", 0.72),
            item("b1", "world", 0.45),
        ];
        let groups = group_sections(&items);

        let names: Vec<_> = groups.iter().map(|g| g.name.as_str()).collect();
        assert_eq!(names, vec!["politics", "technology", "world"]);

        let politics = &groups[0];
        assert_eq!(politics.count, 2);
        assert_eq!(politics.items[0].item_id, "a1");
        assert_eq!(politics.average_score, 0.765);
        assert!((politics.confidence_contribution - 0.383).abs() < 1e-3);
    }

    #[test]
    fn blank_section_falls_back_to_general() {
        let groups = group_sections(&[item("a", "  ", 0.5)]);
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].name, "general");
        assert_eq!(groups[0].confidence_contribution, 0.5);
    }

    #[test]
    fn contributions_sum_to_overall_mean_without_zeros() {
        let items = vec![
            item("a", "tech", 0.9),
            item("b", "tech", 0.6),
            item("c", "world", 0.3),
        ];
        let total: f64 = group_sections(&items)
            .iter()
            .map(|g| g.confidence_contribution)
            .sum();
        assert!((total - 0.6).abs() < 1e-3);
    }
}
