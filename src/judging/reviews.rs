use std::collections::HashMap;

use chrono::NaiveDateTime;
use diesel::prelude::*;
use indexmap::IndexMap;
use serde::Serialize;

use crate::{
    events::{EventStatus, criteria::Criterion},
    schema::reviews,
    store::{
        AssignmentFilter, EntityStore, NewReview, StoreError,
    },
};

/// A judge's scoring of one submission: one numeric value per criterion,
/// plus free-text notes. At most one review exists per (submission, judge);
/// re-submissions replace scores and notes in place.
#[derive(
    Queryable, Selectable, Identifiable, Insertable, Debug, Clone, Serialize,
)]
#[diesel(table_name = reviews)]
pub struct Review {
    pub id: String,
    pub submission_id: String,
    pub judge_id: String,
    pub event_id: String,
    pub scores: String,
    pub notes: Option<String>,
    pub submitted_at: NaiveDateTime,
}

impl Review {
    /// The criterion→score map. JSONB-ish columns sometimes hand back
    /// strings or worse; anything that is not an object of numbers
    /// degrades to an empty map rather than an error.
    pub fn scores(&self) -> IndexMap<String, f32> {
        parse_scores(&self.scores)
    }
}

pub(crate) fn parse_scores(raw: &str) -> IndexMap<String, f32> {
    match serde_json::from_str::<serde_json::Value>(raw) {
        Ok(serde_json::Value::Object(map)) => map
            .into_iter()
            .filter_map(|(key, value)| {
                value.as_f64().map(|v| (key, v as f32))
            })
            .collect(),
        _ => IndexMap::new(),
    }
}

/// Checks a scores map against the event's criteria: the key set must equal
/// the criterion id set exactly, and every value must lie on its
/// criterion's scale. All violations are collected, one message per
/// offending field, rather than failing on the first.
pub fn validate_scores(
    criteria: &[Criterion],
    scores: &IndexMap<String, f32>,
) -> Result<(), Vec<String>> {
    if criteria.is_empty() {
        return Err(vec!["event has no judging criteria".to_string()]);
    }

    let by_id: HashMap<&str, &Criterion> = criteria
        .iter()
        .map(|criterion| (criterion.id.as_str(), criterion))
        .collect();

    let mut violations = Vec::new();

    for (criterion_id, score) in scores {
        match by_id.get(criterion_id.as_str()) {
            None => {
                violations.push(format!("unknown criterion: {criterion_id}"));
            }
            Some(criterion) if !criterion.contains(*score) => {
                violations.push(format!(
                    "score {score} out of range [{}-{}] for '{}'",
                    criterion.scale_min, criterion.scale_max, criterion.name
                ));
            }
            Some(_) => {}
        }
    }

    for criterion in criteria {
        if !scores.contains_key(&criterion.id) {
            violations.push(format!("missing score for '{}'", criterion.name));
        }
    }

    if violations.is_empty() {
        Ok(())
    } else {
        Err(violations)
    }
}

#[derive(Debug)]
pub enum ReviewError {
    NotAssigned,
    EventNotFound,
    EventNotJudging { status: String },
    InvalidScores(Vec<String>),
    Store(StoreError),
}

impl std::fmt::Display for ReviewError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReviewError::NotAssigned => {
                write!(f, "not assigned to this submission")
            }
            ReviewError::EventNotFound => write!(f, "event not found"),
            ReviewError::EventNotJudging { status } => {
                write!(f, "event is not in judging phase (status: {status})")
            }
            ReviewError::InvalidScores(violations) => {
                write!(f, "invalid scores: {}", violations.join("; "))
            }
            ReviewError::Store(err) => write!(f, "{err}"),
        }
    }
}

impl std::error::Error for ReviewError {}

impl From<StoreError> for ReviewError {
    fn from(err: StoreError) -> Self {
        ReviewError::Store(err)
    }
}

/// Upserts a judge's review of a submission and completes the matching
/// assignment. The judge must hold an assignment for the submission, the
/// event must be in judging, and the scores must validate against the
/// event's criteria.
pub fn submit_review(
    store: &mut impl EntityStore,
    judge_id: &str,
    submission_id: &str,
    scores: IndexMap<String, f32>,
    notes: Option<String>,
) -> Result<Review, ReviewError> {
    let assignment = store
        .list_assignments(&AssignmentFilter {
            judge_id: Some(judge_id.to_string()),
            submission_id: Some(submission_id.to_string()),
            ..Default::default()
        })?
        .into_iter()
        .next()
        .ok_or(ReviewError::NotAssigned)?;

    let event = store
        .event(&assignment.event_id)?
        .ok_or(ReviewError::EventNotFound)?;
    if event.status() != Some(EventStatus::Judging) {
        return Err(ReviewError::EventNotJudging {
            status: event.status.clone(),
        });
    }

    let criteria = store.list_criteria(&assignment.event_id)?;
    validate_scores(&criteria, &scores).map_err(ReviewError::InvalidScores)?;

    let review = store.upsert_review(NewReview {
        submission_id: submission_id.to_string(),
        judge_id: judge_id.to_string(),
        event_id: assignment.event_id.clone(),
        scores,
        notes,
    })?;
    store.complete_assignment(judge_id, submission_id)?;

    Ok(review)
}
