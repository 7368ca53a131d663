use std::cmp::Ordering;

use indexmap::IndexMap;
use serde::Serialize;

use crate::{
    judging::{reviews::Review, scoring::round_dp},
    store::{EntityStore, ReviewFilter, StoreError},
};

/// Judges whose average sits more than this many standard deviations from
/// the event average are flagged.
pub const BIAS_SIGMA: f64 = 1.5;

#[derive(Debug, Clone, Serialize)]
pub struct JudgeBias {
    pub judge_id: String,
    pub avg_score_given: f64,
    pub event_avg: f64,
    pub deviation: f64,
    pub is_outlier: bool,
}

/// Compares each judge's average score against the event-wide average.
/// Entries come back sorted by absolute deviation, most deviant first;
/// with zero spread in the data nobody is flagged. No reviews, no report.
pub fn bias_report(reviews: &[Review]) -> Vec<JudgeBias> {
    let mut judge_scores: IndexMap<&str, Vec<f64>> = IndexMap::new();
    let mut all_scores = Vec::new();

    for review in reviews {
        let entry = judge_scores
            .entry(review.judge_id.as_str())
            .or_default();
        for (_, score) in review.scores() {
            entry.push(score as f64);
            all_scores.push(score as f64);
        }
    }

    if all_scores.is_empty() {
        return Vec::new();
    }

    let event_avg = mean(&all_scores);
    let event_std = sample_stdev(&all_scores);

    let mut report = judge_scores
        .into_iter()
        .filter(|(_, scores)| !scores.is_empty())
        .map(|(judge_id, scores)| {
            let judge_avg = mean(&scores);
            let deviation = judge_avg - event_avg;
            JudgeBias {
                judge_id: judge_id.to_string(),
                avg_score_given: round_dp(judge_avg, 2),
                event_avg: round_dp(event_avg, 2),
                deviation: round_dp(deviation, 2),
                is_outlier: event_std > 0.0
                    && deviation.abs() > BIAS_SIGMA * event_std,
            }
        })
        .collect::<Vec<_>>();

    report.sort_by(|a, b| {
        b.deviation
            .abs()
            .partial_cmp(&a.deviation.abs())
            .unwrap_or(Ordering::Equal)
    });
    report
}

pub fn event_bias_report(
    store: &mut impl EntityStore,
    event_id: &str,
) -> Result<Vec<JudgeBias>, StoreError> {
    let reviews = store.list_reviews(&ReviewFilter {
        event_id: Some(event_id.to_string()),
        ..Default::default()
    })?;
    Ok(bias_report(&reviews))
}

fn mean(values: &[f64]) -> f64 {
    values.iter().sum::<f64>() / values.len() as f64
}

/// Sample standard deviation (n - 1 denominator); 0 for fewer than two
/// values.
fn sample_stdev(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let m = mean(values);
    (values.iter().map(|v| (v - m).powi(2)).sum::<f64>()
        / (values.len() - 1) as f64)
        .sqrt()
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::{bias_report, sample_stdev};
    use crate::judging::reviews::Review;

    fn review(judge_id: &str, n: usize, scores: &str) -> Review {
        Review {
            id: format!("r-{judge_id}-{n}"),
            submission_id: format!("sub-{n}"),
            judge_id: judge_id.to_string(),
            event_id: "event-1".to_string(),
            scores: scores.to_string(),
            notes: None,
            submitted_at: Utc::now().naive_utc(),
        }
    }

    #[test]
    fn no_reviews_no_report() {
        assert!(bias_report(&[]).is_empty());
    }

    #[test]
    fn generous_judge_is_flagged_mild_deviation_is_not() {
        // values 7,7,7,7,8,8,10,10: mean 8.0, sample stdev ~1.31, so the
        // 1.5-sigma line sits at ~1.96. j3 deviates by 2.0, j1 by 1.0.
        let reviews = [
            review("j1", 1, r#"{"a": 7, "b": 7}"#),
            review("j1", 2, r#"{"a": 7, "b": 7}"#),
            review("j2", 1, r#"{"a": 8, "b": 8}"#),
            review("j3", 1, r#"{"a": 10, "b": 10}"#),
        ];

        let report = bias_report(&reviews);
        assert_eq!(report.len(), 3);

        // sorted by absolute deviation, most deviant first
        assert_eq!(report[0].judge_id, "j3");
        assert_eq!(report[0].deviation, 2.0);
        assert!(report[0].is_outlier);

        assert_eq!(report[1].judge_id, "j1");
        assert_eq!(report[1].deviation, -1.0);
        assert!(!report[1].is_outlier);

        assert_eq!(report[2].judge_id, "j2");
        assert!(!report[2].is_outlier);
    }

    #[test]
    fn uniform_scores_flag_nobody() {
        let reviews = [
            review("j1", 1, r#"{"a": 7}"#),
            review("j2", 1, r#"{"a": 7}"#),
            review("j3", 1, r#"{"a": 7}"#),
        ];

        let report = bias_report(&reviews);
        assert!(report.iter().all(|entry| !entry.is_outlier));
        assert!(report.iter().all(|entry| entry.deviation == 0.0));
    }

    #[test]
    fn single_score_has_zero_stdev_and_no_flags() {
        let report = bias_report(&[review("j1", 1, r#"{"a": 9}"#)]);
        assert_eq!(report.len(), 1);
        assert!(!report[0].is_outlier);
        assert_eq!(report[0].avg_score_given, 9.0);
        assert_eq!(report[0].event_avg, 9.0);
    }

    #[test]
    fn stdev_uses_the_sample_formula() {
        // variance of [2, 4, 4, 4, 5, 5, 7, 9] with n-1 denominator is 4.571...
        let values = [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        let std = sample_stdev(&values);
        assert!((std - 2.138).abs() < 0.001);

        assert_eq!(sample_stdev(&[5.0]), 0.0);
        assert_eq!(sample_stdev(&[]), 0.0);
    }

    #[test]
    fn reviews_with_unparseable_scores_contribute_nothing() {
        let reviews = [
            review("j1", 1, "not json"),
            review("j2", 1, r#"{"a": 6}"#),
        ];
        let report = bias_report(&reviews);
        // j1 produced no usable values and is dropped from the report
        assert_eq!(report.len(), 1);
        assert_eq!(report[0].judge_id, "j2");
    }
}
