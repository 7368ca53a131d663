use indexmap::IndexMap;
use serde::Serialize;

use crate::{
    judging::{JudgeAssignment, scoring::round_dp},
    store::{AssignmentFilter, EntityStore, StoreError},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum JudgeStatus {
    Done,
    OnTrack,
    NotStarted,
}

#[derive(Debug, Clone, Serialize)]
pub struct JudgeProgress {
    pub judge_id: String,
    pub assigned: i64,
    pub completed: i64,
    pub status: JudgeStatus,
}

#[derive(Debug, Clone, Serialize)]
pub struct PendingSubmission {
    pub submission_id: String,
    pub remaining_reviews: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProgressReport {
    pub progress_percent: f64,
    pub completed_reviews: i64,
    pub total_reviews: i64,
    pub judges_status: Vec<JudgeProgress>,
    pub pending_submissions: Vec<PendingSubmission>,
    pub all_complete: bool,
    pub reminders: Vec<String>,
}

/// Derives completion state from assignment statuses alone. Judges and
/// pending submissions are reported in first-seen order.
pub fn compute_progress(assignments: &[JudgeAssignment]) -> ProgressReport {
    let total = assignments.len() as i64;
    let completed =
        assignments.iter().filter(|a| a.is_completed()).count() as i64;

    let mut per_judge: IndexMap<&str, (i64, i64)> = IndexMap::new();
    for assignment in assignments {
        let entry = per_judge
            .entry(assignment.judge_id.as_str())
            .or_insert((0, 0));
        entry.0 += 1;
        if assignment.is_completed() {
            entry.1 += 1;
        }
    }

    let mut judges_status = Vec::with_capacity(per_judge.len());
    let mut reminders = Vec::new();
    for (judge_id, (assigned, done)) in &per_judge {
        let status = if *done == *assigned && *assigned > 0 {
            JudgeStatus::Done
        } else if *done > 0 {
            JudgeStatus::OnTrack
        } else {
            JudgeStatus::NotStarted
        };

        if status == JudgeStatus::NotStarted {
            reminders.push(format!(
                "Judge {judge_id} has not started reviewing yet."
            ));
        } else if *done * 2 < *assigned {
            reminders.push(format!(
                "Judge {judge_id} has completed {done}/{assigned} reviews."
            ));
        }

        judges_status.push(JudgeProgress {
            judge_id: judge_id.to_string(),
            assigned: *assigned,
            completed: *done,
            status,
        });
    }

    let mut pending: IndexMap<&str, i64> = IndexMap::new();
    for assignment in assignments {
        if !assignment.is_completed() {
            *pending
                .entry(assignment.submission_id.as_str())
                .or_insert(0) += 1;
        }
    }
    let pending_submissions = pending
        .into_iter()
        .map(|(submission_id, remaining_reviews)| PendingSubmission {
            submission_id: submission_id.to_string(),
            remaining_reviews,
        })
        .collect();

    let progress_percent = if total > 0 {
        round_dp(completed as f64 * 100.0 / total as f64, 1)
    } else {
        0.0
    };

    ProgressReport {
        progress_percent,
        completed_reviews: completed,
        total_reviews: total,
        judges_status,
        pending_submissions,
        // an empty set means nothing has been assigned yet, not completion
        all_complete: total > 0 && completed >= total,
        reminders,
    }
}

/// Progress for an event, straight from the stored assignment snapshot.
pub fn event_progress(
    store: &mut impl EntityStore,
    event_id: &str,
) -> Result<ProgressReport, StoreError> {
    let assignments = store.list_assignments(&AssignmentFilter {
        event_id: Some(event_id.to_string()),
        ..Default::default()
    })?;
    Ok(compute_progress(&assignments))
}
