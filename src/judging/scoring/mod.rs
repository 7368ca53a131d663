use std::cmp::Ordering;

use indexmap::IndexMap;
use itertools::Itertools;
use rust_decimal::{Decimal, prelude::ToPrimitive};
use serde::Serialize;

use crate::{
    events::criteria::Criterion,
    judging::reviews::Review,
    store::{EntityStore, ReviewFilter, StoreError},
};

pub mod bias;

/// Individual scores further than this from their criterion mean are
/// reported as outliers (in scale units).
pub const OUTLIER_THRESHOLD: f64 = 2.0;

#[derive(Debug, Clone, Serialize)]
pub struct CriterionBreakdown {
    pub criterion_name: String,
    pub average: f64,
    pub min_score: f64,
    pub max_score: f64,
    pub weight: f32,
}

#[derive(Debug, Clone, Serialize)]
pub struct LeaderboardEntry {
    pub submission_id: String,
    pub project_name: String,
    pub composite_score: f64,
    pub rank: i64,
    pub review_count: usize,
    pub per_criterion: IndexMap<String, CriterionBreakdown>,
}

/// A single judge score sitting far from its criterion's mean. These are
/// informational; nothing is filtered out of the leaderboard.
#[derive(Debug, Clone, Serialize)]
pub struct ScoreOutlier {
    pub judge_id: String,
    pub submission_id: String,
    pub criterion_id: String,
    pub judge_score: f64,
    pub mean_score: f64,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ScoreStatistics {
    pub avg_composite: f64,
    pub highest: f64,
    pub lowest: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct ScoreReport {
    pub leaderboard: Vec<LeaderboardEntry>,
    pub outliers: Vec<ScoreOutlier>,
    pub statistics: ScoreStatistics,
}

/// A submission together with the reviews it has received.
#[derive(Debug, Clone)]
pub struct SubmissionReviews {
    pub submission_id: String,
    pub project_name: String,
    pub reviews: Vec<Review>,
}

/// Aggregates per-criterion review scores into a ranked leaderboard.
///
/// Submissions without reviews are absent from the result, not errors.
/// Per-criterion means ignore reviews that are missing that criterion
/// (which validation prevents, but old data is tolerated). The composite
/// is the weight-normalized sum of the criterion means, over the criteria
/// that received at least one score. Ties keep the order in which
/// submissions were supplied.
pub fn aggregate_scores(
    criteria: &[Criterion],
    submissions: &[SubmissionReviews],
) -> ScoreReport {
    let mut leaderboard = Vec::new();
    let mut outliers = Vec::new();
    let mut composites = Vec::new();

    for sub in submissions {
        if sub.reviews.is_empty() {
            continue;
        }

        let parsed = sub
            .reviews
            .iter()
            .map(|review| (review.judge_id.clone(), review.scores()))
            .collect_vec();

        let mut per_criterion = IndexMap::new();
        let mut weighted_sum = Decimal::ZERO;
        let mut weight_sum = Decimal::ZERO;

        for criterion in criteria {
            let scores = parsed
                .iter()
                .filter_map(|(_, scores)| {
                    scores.get(&criterion.id).map(|score| *score as f64)
                })
                .collect::<Vec<_>>();
            if scores.is_empty() {
                continue;
            }

            let mean = scores.iter().sum::<f64>() / scores.len() as f64;
            let average = round_dp(mean, 2);

            if scores.len() >= 2 {
                for (judge_id, judge_scores) in &parsed {
                    if let Some(score) = judge_scores.get(&criterion.id)
                        && (*score as f64 - mean).abs() > OUTLIER_THRESHOLD
                    {
                        outliers.push(ScoreOutlier {
                            judge_id: judge_id.clone(),
                            submission_id: sub.submission_id.clone(),
                            criterion_id: criterion.id.clone(),
                            judge_score: *score as f64,
                            mean_score: average,
                        });
                    }
                }
            }

            let min_score = scores.iter().copied().fold(f64::MAX, f64::min);
            let max_score = scores.iter().copied().fold(f64::MIN, f64::max);
            per_criterion.insert(
                criterion.id.clone(),
                CriterionBreakdown {
                    criterion_name: criterion.name.clone(),
                    average,
                    min_score,
                    max_score,
                    weight: criterion.weight,
                },
            );

            let weight = Decimal::from_f32_retain(criterion.weight)
                .unwrap_or_default();
            weighted_sum +=
                Decimal::from_f64_retain(average).unwrap_or_default() * weight;
            weight_sum += weight;
        }

        let composite_score = if weight_sum > Decimal::ZERO {
            (weighted_sum / weight_sum)
                .round_dp(2)
                .to_f64()
                .unwrap_or(0.0)
        } else {
            0.0
        };

        composites.push(composite_score);
        leaderboard.push(LeaderboardEntry {
            submission_id: sub.submission_id.clone(),
            project_name: sub.project_name.clone(),
            composite_score,
            rank: 0,
            review_count: sub.reviews.len(),
            per_criterion,
        });
    }

    // stable sort: equal composites keep their input order
    leaderboard.sort_by(|a, b| {
        b.composite_score
            .partial_cmp(&a.composite_score)
            .unwrap_or(Ordering::Equal)
    });
    for (idx, entry) in leaderboard.iter_mut().enumerate() {
        entry.rank = idx as i64 + 1;
    }

    let statistics = if composites.is_empty() {
        ScoreStatistics::default()
    } else {
        ScoreStatistics {
            avg_composite: round_dp(
                composites.iter().sum::<f64>() / composites.len() as f64,
                2,
            ),
            highest: composites.iter().copied().fold(f64::MIN, f64::max),
            lowest: composites.iter().copied().fold(f64::MAX, f64::min),
        }
    };

    ScoreReport {
        leaderboard,
        outliers,
        statistics,
    }
}

/// Builds the event's leaderboard from the stored snapshot: criteria in
/// sort order, submissions in submission order (which fixes tie order),
/// and each submission's reviews.
pub fn event_leaderboard(
    store: &mut impl EntityStore,
    event_id: &str,
) -> Result<ScoreReport, StoreError> {
    let criteria = store.list_criteria(event_id)?;
    let submissions = store.list_submissions(event_id)?;
    let reviews = store.list_reviews(&ReviewFilter {
        event_id: Some(event_id.to_string()),
        ..Default::default()
    })?;

    let mut grouped = reviews
        .into_iter()
        .into_group_map_by(|review| review.submission_id.clone());

    let snapshot = submissions
        .into_iter()
        .map(|sub| SubmissionReviews {
            project_name: sub.display_name(),
            reviews: grouped.remove(&sub.id).unwrap_or_default(),
            submission_id: sub.id,
        })
        .collect_vec();

    Ok(aggregate_scores(&criteria, &snapshot))
}

pub(crate) fn round_dp(value: f64, places: u32) -> f64 {
    Decimal::from_f64_retain(value)
        .map(|d| d.round_dp(places))
        .and_then(|d| d.to_f64())
        .unwrap_or(value)
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::{SubmissionReviews, aggregate_scores};
    use crate::events::criteria::Criterion;
    use crate::judging::reviews::Review;

    fn criterion(id: &str, name: &str, weight: f32) -> Criterion {
        Criterion {
            id: id.to_string(),
            event_id: "event-1".to_string(),
            name: name.to_string(),
            scale_min: 0,
            scale_max: 10,
            weight,
            sort_order: 0,
        }
    }

    fn review(judge_id: &str, scores: &str) -> Review {
        Review {
            id: format!("r-{judge_id}"),
            submission_id: "sub-1".to_string(),
            judge_id: judge_id.to_string(),
            event_id: "event-1".to_string(),
            scores: scores.to_string(),
            notes: None,
            submitted_at: Utc::now().naive_utc(),
        }
    }

    fn entry(submission_id: &str, reviews: Vec<Review>) -> SubmissionReviews {
        SubmissionReviews {
            submission_id: submission_id.to_string(),
            project_name: submission_id.to_string(),
            reviews,
        }
    }

    #[test]
    fn weighted_composite_matches_hand_computation() {
        let criteria = [
            criterion("a", "Innovation", 2.0),
            criterion("b", "Execution", 1.0),
        ];
        let subs = [entry(
            "sub-1",
            vec![
                review("j1", r#"{"a": 8, "b": 9}"#),
                review("j2", r#"{"a": 6, "b": 7}"#),
            ],
        )];

        let report = aggregate_scores(&criteria, &subs);
        let top = &report.leaderboard[0];

        // a: mean 7.00, b: mean 8.00 -> (7*2 + 8*1) / 3 = 7.33
        assert_eq!(top.per_criterion["a"].average, 7.0);
        assert_eq!(top.per_criterion["b"].average, 8.0);
        assert_eq!(top.composite_score, 7.33);
        assert_eq!(top.rank, 1);
        assert_eq!(top.review_count, 2);
    }

    #[test]
    fn unreviewed_submissions_are_absent() {
        let criteria = [criterion("a", "Innovation", 1.0)];
        let subs = [
            entry("sub-1", vec![review("j1", r#"{"a": 5}"#)]),
            entry("sub-2", Vec::new()),
        ];

        let report = aggregate_scores(&criteria, &subs);
        assert_eq!(report.leaderboard.len(), 1);
        assert_eq!(report.leaderboard[0].submission_id, "sub-1");
    }

    #[test]
    fn ranks_descend_and_ties_keep_input_order() {
        let criteria = [criterion("a", "Innovation", 1.0)];
        let subs = [
            entry("low", vec![review("j1", r#"{"a": 3}"#)]),
            entry("tie-first", vec![review("j1", r#"{"a": 7}"#)]),
            entry("tie-second", vec![review("j2", r#"{"a": 7}"#)]),
            entry("high", vec![review("j3", r#"{"a": 9}"#)]),
        ];

        let report = aggregate_scores(&criteria, &subs);
        let order = report
            .leaderboard
            .iter()
            .map(|e| e.submission_id.as_str())
            .collect::<Vec<_>>();
        assert_eq!(order, vec!["high", "tie-first", "tie-second", "low"]);
        assert_eq!(
            report
                .leaderboard
                .iter()
                .map(|e| e.rank)
                .collect::<Vec<_>>(),
            vec![1, 2, 3, 4]
        );
    }

    #[test]
    fn outlier_scores_are_flagged_against_the_mean() {
        let criteria = [criterion("a", "Innovation", 1.0)];
        let subs = [entry(
            "sub-1",
            vec![
                review("j1", r#"{"a": 5}"#),
                review("j2", r#"{"a": 5}"#),
                review("j3", r#"{"a": 9}"#),
            ],
        )];

        let report = aggregate_scores(&criteria, &subs);
        // mean 6.33; only the 9 deviates by more than 2.0
        assert_eq!(report.outliers.len(), 1);
        let outlier = &report.outliers[0];
        assert_eq!(outlier.judge_id, "j3");
        assert_eq!(outlier.judge_score, 9.0);
        assert_eq!(outlier.mean_score, 6.33);
    }

    #[test]
    fn single_score_criteria_produce_no_outliers() {
        let criteria = [criterion("a", "Innovation", 1.0)];
        let subs = [entry("sub-1", vec![review("j1", r#"{"a": 10}"#)])];

        let report = aggregate_scores(&criteria, &subs);
        assert!(report.outliers.is_empty());
    }

    #[test]
    fn reviews_missing_a_criterion_are_excluded_from_its_mean() {
        let criteria = [
            criterion("a", "Innovation", 1.0),
            criterion("b", "Execution", 1.0),
        ];
        let subs = [entry(
            "sub-1",
            vec![
                review("j1", r#"{"a": 4, "b": 8}"#),
                review("j2", r#"{"a": 6}"#),
            ],
        )];

        let report = aggregate_scores(&criteria, &subs);
        let top = &report.leaderboard[0];
        assert_eq!(top.per_criterion["a"].average, 5.0);
        // b's mean comes from the single score, not a phantom zero
        assert_eq!(top.per_criterion["b"].average, 8.0);
    }

    #[test]
    fn no_criteria_means_zero_composites() {
        let subs = [entry("sub-1", vec![review("j1", r#"{"a": 5}"#)])];
        let report = aggregate_scores(&[], &subs);
        assert_eq!(report.leaderboard[0].composite_score, 0.0);
    }

    #[test]
    fn statistics_summarize_composites() {
        let criteria = [criterion("a", "Innovation", 1.0)];
        let subs = [
            entry("sub-1", vec![review("j1", r#"{"a": 4}"#)]),
            entry("sub-2", vec![review("j1", r#"{"a": 8}"#)]),
        ];

        let report = aggregate_scores(&criteria, &subs);
        assert_eq!(report.statistics.avg_composite, 6.0);
        assert_eq!(report.statistics.highest, 8.0);
        assert_eq!(report.statistics.lowest, 4.0);
    }

    #[test]
    fn empty_event_yields_empty_report() {
        let report = aggregate_scores(&[], &[]);
        assert!(report.leaderboard.is_empty());
        assert!(report.outliers.is_empty());
        assert_eq!(report.statistics.avg_composite, 0.0);
    }
}
