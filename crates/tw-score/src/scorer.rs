//! Story and aggregate confidence scoring.
//!
//! A story score blends upstream trend popularity with search relevance:
//! `round3((trend.score / 100) * relevance)`.
//!
//! The aggregate combines the mean non-zero story score with a diminishing
//! article-count bonus, then applies a section diversity multiplier (capped
//! at 1.5) and a small boost for rising trends (capped at 1.05). A batch that
//! fails the threshold gate always reports `final_confidence == 0`.

use std::collections::BTreeMap;
use std::fmt;

use tw_config::{QueueConfig, ThresholdConfig};
use tw_core::entities::{ConfidenceFactors, ScoredItem, Trend};
use tw_core::enums::TrendCategory;

/// Item count at which the count bonus saturates.
const FULL_ARTICLE_COUNT: f64 = 10.0;
const COUNT_BONUS_WEIGHT: f64 = 0.2;
const DIVERSITY_CAP: f64 = 1.5;
const VELOCITY_BOOST_CAP: f64 = 0.05;

/// Round to three decimals, the precision of every reported score.
#[must_use]
pub fn round3(value: f64) -> f64 {
    (value * 1000.0).round() / 1000.0
}

/// Queue priority for a confidence score.
///
/// Rising trends are weighted by `rising_priority_multiplier` (1.5 by
/// default), everything else by `priority_multiplier` (1.2).
#[must_use]
pub fn priority_score(confidence: f64, category: TrendCategory, queue: &QueueConfig) -> f64 {
    let multiplier = match category {
        TrendCategory::Rising => queue.rising_priority_multiplier,
        TrendCategory::Top | TrendCategory::Breakout => queue.priority_multiplier,
    };
    round3(confidence * multiplier)
}

// ---------------------------------------------------------------------------
// Threshold gate
// ---------------------------------------------------------------------------

/// The first threshold a batch of scored items failed.
#[derive(Debug, Clone, PartialEq)]
pub enum GateFailure {
    TooFewArticles { found: usize, required: u32 },
    TooFewSections { found: usize, required: u32 },
    ThinSection {
        section: String,
        found: usize,
        required: u32,
    },
    WeakStory { score: f64, required: f64 },
}

impl fmt::Display for GateFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TooFewArticles { found, required } => {
                write!(f, "{found} articles, {required} required")
            }
            Self::TooFewSections { found, required } => {
                write!(f, "{found} sections, {required} required")
            }
            Self::ThinSection {
                section,
                found,
                required,
            } => write!(f, "section '{section}' has {found} articles, {required} required"),
            Self::WeakStory { score, required } => {
                write!(f, "weakest story scored {score}, {required} required")
            }
        }
    }
}

// ---------------------------------------------------------------------------
// MatchScorer
// ---------------------------------------------------------------------------

/// Scores search hits against a trend under a fixed set of thresholds.
#[derive(Debug, Clone)]
pub struct MatchScorer {
    thresholds: ThresholdConfig,
}

impl MatchScorer {
    #[must_use]
    pub const fn new(thresholds: ThresholdConfig) -> Self {
        Self { thresholds }
    }

    #[must_use]
    pub const fn thresholds(&self) -> &ThresholdConfig {
        &self.thresholds
    }

    /// Story score for one search hit.
    ///
    /// Zero when either the relevance or the trend score is zero. Relevance
    /// outside `[0, 1]` is clamped.
    #[must_use]
    pub fn score_item(&self, relevance: f64, trend: &Trend) -> f64 {
        if relevance.is_nan() || relevance <= 0.0 || trend.score == 0 {
            return 0.0;
        }
        round3(f64::from(trend.score) / 100.0 * relevance.min(1.0))
    }

    /// Build a [`ScoredItem`] for a search hit.
    #[must_use]
    pub fn score_hit(
        &self,
        item_id: &str,
        section: Option<&str>,
        relevance: f64,
        trend: &Trend,
    ) -> ScoredItem {
        ScoredItem {
            item_id: item_id.to_string(),
            section: ScoredItem::section_or_default(section),
            relevance_score: relevance.clamp(0.0, 1.0),
            story_score: self.score_item(relevance, trend),
        }
    }

    /// Whether an item clears the per-item floor applied before aggregation.
    #[must_use]
    pub fn clears_match_floor(&self, item: &ScoredItem) -> bool {
        item.story_score >= self.thresholds.min_match_score
    }

    /// Evaluate the threshold gate, returning the first failed check.
    ///
    /// Checks run in order: total items, distinct sections, smallest
    /// section, weakest non-zero story score.
    #[must_use]
    pub fn check_gate(&self, items: &[ScoredItem]) -> Option<GateFailure> {
        let t = &self.thresholds;

        if items.len() < t.min_total_articles as usize {
            return Some(GateFailure::TooFewArticles {
                found: items.len(),
                required: t.min_total_articles,
            });
        }

        let sections = section_counts(items);
        if sections.len() < t.min_sections_with_matches as usize {
            return Some(GateFailure::TooFewSections {
                found: sections.len(),
                required: t.min_sections_with_matches,
            });
        }

        if let Some((section, &found)) = sections.iter().min_by_key(|(_, count)| **count) {
            if found < t.min_articles_per_section as usize {
                return Some(GateFailure::ThinSection {
                    section: (*section).to_string(),
                    found,
                    required: t.min_articles_per_section,
                });
            }
        }

        let weakest = items
            .iter()
            .map(|item| item.story_score)
            .filter(|score| *score > 0.0)
            .fold(None, |min: Option<f64>, score| {
                Some(min.map_or(score, |m| m.min(score)))
            });
        if let Some(score) = weakest {
            if score < t.min_story_score {
                return Some(GateFailure::WeakStory {
                    score,
                    required: t.min_story_score,
                });
            }
        }

        None
    }

    /// Aggregate confidence for every item matched to `trend`.
    #[must_use]
    pub fn score_aggregate(&self, items: &[ScoredItem], trend: &Trend) -> ConfidenceFactors {
        let gate = self.check_gate(items);
        let threshold_penalty = if gate.is_some() { 1.0 } else { 0.0 };

        if items.is_empty() {
            return ConfidenceFactors {
                base_confidence: 0.0,
                article_count_bonus: 0.0,
                diversity_multiplier: 1.0,
                velocity_multiplier: 1.0,
                threshold_penalty,
                final_confidence: 0.0,
            };
        }

        let avg = mean_nonzero(items);

        #[allow(clippy::cast_precision_loss)]
        let count_bonus = (items.len() as f64 / FULL_ARTICLE_COUNT).min(1.0).sqrt();
        let base = avg * COUNT_BONUS_WEIGHT.mul_add(count_bonus, 1.0 - COUNT_BONUS_WEIGHT);

        let unique_sections = items
            .iter()
            .filter(|item| !item.section.trim().is_empty())
            .map(|item| item.section.as_str())
            .collect::<std::collections::BTreeSet<_>>()
            .len();
        #[allow(clippy::cast_precision_loss)]
        let diversity = (1.0 + unique_sections as f64 / 10.0).min(DIVERSITY_CAP);

        let velocity = velocity_multiplier(trend);

        let final_confidence = if gate.is_some() {
            0.0
        } else {
            (base * diversity * velocity).min(1.0)
        };

        ConfidenceFactors {
            base_confidence: round3(base),
            article_count_bonus: round3(count_bonus * COUNT_BONUS_WEIGHT * avg),
            diversity_multiplier: round3(diversity),
            velocity_multiplier: round3(velocity),
            threshold_penalty,
            final_confidence: round3(final_confidence),
        }
    }
}

/// Boost for rising trends with a reported velocity, in `[1.0, 1.05]`.
fn velocity_multiplier(trend: &Trend) -> f64 {
    match (trend.category, trend.velocity) {
        (TrendCategory::Rising, Some(v)) if v.is_finite() => {
            (1.0 + (v / 200.0).min(VELOCITY_BOOST_CAP)).max(1.0)
        }
        _ => 1.0,
    }
}

/// Mean of the non-zero story scores; zero-scored items do not dilute it.
pub(crate) fn mean_nonzero(items: &[ScoredItem]) -> f64 {
    let (sum, count) = items
        .iter()
        .map(|item| item.story_score)
        .filter(|score| *score > 0.0)
        .fold((0.0, 0_u32), |(sum, count), score| (sum + score, count + 1));
    if count == 0 {
        0.0
    } else {
        sum / f64::from(count)
    }
}

fn section_counts(items: &[ScoredItem]) -> BTreeMap<&str, usize> {
    let mut counts = BTreeMap::new();
    for item in items {
        *counts.entry(item.section.as_str()).or_insert(0) += 1;
    }
    counts
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use pretty_assertions::assert_eq;
    use rstest::rstest;
    use tw_core::entities::TrendSignal;
    use tw_core::enums::TrendOrigin;

    fn trend(score: u32, category: TrendCategory, velocity: Option<f64>) -> Trend {
        Trend::from_signal(
            TrendSignal {
                keyword: "AI Regulation".into(),
                score,
                category,
                velocity,
            },
            "US",
            TrendOrigin::Upstream,
            Utc::now(),
            Duration::minutes(120),
        )
        .unwrap()
    }

    fn item(id: &str, section: &str, story_score: f64) -> ScoredItem {
        ScoredItem {
            item_id: id.into(),
            section: section.into(),
            relevance_score: story_score,
            story_score,
        }
    }

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[rstest]
    #[case(0.9, 90, 0.81)]
    #[case(0.8, 90, 0.72)]
    #[case(0.333, 70, 0.233)]
    #[case(0.0, 90, 0.0)]
    #[case(0.9, 0, 0.0)]
    #[case(1.7, 50, 0.5)]
    fn story_score_formula(#[case] relevance: f64, #[case] score: u32, #[case] expected: f64) {
        let scorer = MatchScorer::new(ThresholdConfig::default());
        let t = trend(score, TrendCategory::Top, None);
        assert!(approx(scorer.score_item(relevance, &t), expected));
    }

    #[test]
    fn empty_aggregate_is_zero_with_neutral_multipliers() {
        let scorer = MatchScorer::new(ThresholdConfig::default());
        let factors = scorer.score_aggregate(&[], &trend(90, TrendCategory::Rising, Some(40.0)));

        assert_eq!(factors.base_confidence, 0.0);
        assert_eq!(factors.article_count_bonus, 0.0);
        assert_eq!(factors.diversity_multiplier, 1.0);
        assert_eq!(factors.velocity_multiplier, 1.0);
        assert_eq!(factors.final_confidence, 0.0);
        assert_eq!(factors.threshold_penalty, 1.0);
    }

    #[test]
    fn failing_gate_forces_zero_confidence() {
        let scorer = MatchScorer::new(ThresholdConfig::default());
        let items = vec![item("a", "politics", 0.9), item("b", "politics", 0.9)];
        let factors = scorer.score_aggregate(&items, &trend(90, TrendCategory::Top, None));

        assert_eq!(factors.threshold_penalty, 1.0);
        assert_eq!(factors.final_confidence, 0.0);
        assert!(factors.base_confidence > 0.0);
        assert!(!factors.passed());
    }

    #[test]
    fn diversity_caps_at_one_and_a_half() {
        let scorer = MatchScorer::new(ThresholdConfig::default());
        let items: Vec<_> = (0..50)
            .map(|i| item(&format!("a{i}"), &format!("section-{i}"), 0.5))
            .collect();
        let factors = scorer.score_aggregate(&items, &trend(50, TrendCategory::Top, None));
        assert_eq!(factors.diversity_multiplier, 1.5);
    }

    #[rstest]
    #[case(TrendCategory::Rising, Some(40.0), 1.05)]
    #[case(TrendCategory::Rising, Some(4.0), 1.02)]
    #[case(TrendCategory::Rising, Some(-80.0), 1.0)]
    #[case(TrendCategory::Rising, None, 1.0)]
    #[case(TrendCategory::Top, Some(400.0), 1.0)]
    fn velocity_multiplier_bounds(
        #[case] category: TrendCategory,
        #[case] velocity: Option<f64>,
        #[case] expected: f64,
    ) {
        let scorer = MatchScorer::new(ThresholdConfig::default());
        let items = vec![
            item("a", "politics", 0.5),
            item("b", "politics", 0.5),
            item("c", "tech", 0.5),
        ];
        let factors = scorer.score_aggregate(&items, &trend(50, category, velocity));
        assert!(approx(factors.velocity_multiplier, expected));
        assert!((1.0..=1.05).contains(&factors.velocity_multiplier));
    }

    #[test]
    fn zero_scores_do_not_dilute_average() {
        let scorer = MatchScorer::new(ThresholdConfig {
            min_total_articles: 1,
            ..ThresholdConfig::default()
        });
        let t = trend(50, TrendCategory::Top, None);
        let with_zero = vec![item("a", "tech", 0.6), item("b", "tech", 0.0)];
        let without_zero = vec![item("a", "tech", 0.6)];

        assert!(approx(mean_nonzero(&with_zero), mean_nonzero(&without_zero)));
        // The zero item still counts toward the article-count bonus.
        let a = scorer.score_aggregate(&with_zero, &t);
        let b = scorer.score_aggregate(&without_zero, &t);
        assert!(a.base_confidence > b.base_confidence);
    }

    #[test]
    fn reference_scenario_scores_high() {
        let scorer = MatchScorer::new(ThresholdConfig::default());
        let t = trend(90, TrendCategory::Rising, Some(78.0));
        let items: Vec<_> = [("a1", "politics", 0.9), ("a2", "politics", 0.8), ("a3", "technology", 0.5)]
            .into_iter()
            .map(|(id, section, relevance)| scorer.score_hit(id, Some(section), relevance, &t))
            .collect();

        let factors = scorer.score_aggregate(&items, &t);
        assert_eq!(factors.base_confidence, 0.6);
        assert_eq!(factors.article_count_bonus, 0.072);
        assert_eq!(factors.diversity_multiplier, 1.2);
        assert_eq!(factors.velocity_multiplier, 1.05);
        assert_eq!(factors.threshold_penalty, 0.0);
        assert_eq!(factors.final_confidence, 0.756);
        assert_eq!(factors.level(), tw_core::enums::ConfidenceLevel::High);
        assert_eq!(
            priority_score(factors.final_confidence, t.category, &QueueConfig::default()),
            1.134
        );
    }

    #[test]
    fn match_floor_drops_weak_items() {
        let scorer = MatchScorer::new(ThresholdConfig::default());
        let t = trend(90, TrendCategory::Rising, Some(78.0));
        let weak = scorer.score_hit("a4", Some("technology"), 0.3, &t);
        assert_eq!(weak.story_score, 0.27);
        assert!(!scorer.clears_match_floor(&weak));
    }

    #[test]
    fn gate_reports_first_failure() {
        let scorer = MatchScorer::new(ThresholdConfig {
            min_total_articles: 2,
            min_sections_with_matches: 2,
            ..ThresholdConfig::default()
        });
        let items = vec![item("a", "tech", 0.9), item("b", "tech", 0.9)];
        assert_eq!(
            scorer.check_gate(&items),
            Some(GateFailure::TooFewSections {
                found: 1,
                required: 2
            })
        );

        let weak = vec![item("a", "tech", 0.9), item("b", "world", 0.1)];
        assert!(matches!(
            scorer.check_gate(&weak),
            Some(GateFailure::WeakStory { .. })
        ));
    }

    #[test]
    fn thin_section_fails_gate() {
        let scorer = MatchScorer::new(ThresholdConfig {
            min_articles_per_section: 2,
            ..ThresholdConfig::default()
        });
        let items = vec![
            item("a", "tech", 0.9),
            item("b", "tech", 0.8),
            item("c", "world", 0.7),
        ];
        assert_eq!(
            scorer.check_gate(&items),
            Some(GateFailure::ThinSection {
                section: "world".into(),
                found: 1,
                required: 2
            })
        );
    }

    #[test]
    fn top_trends_use_default_priority_multiplier() {
        let queue = QueueConfig::default();
        assert_eq!(priority_score(0.5, TrendCategory::Top, &queue), 0.6);
        assert_eq!(priority_score(0.5, TrendCategory::Rising, &queue), 0.75);
    }
}
