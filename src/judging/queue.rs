use std::collections::HashMap;

use serde::Serialize;

use crate::{
    events::submissions::Submission,
    judging::{JudgeAssignment, reviews::Review},
    store::{AssignmentFilter, EntityStore, ReviewFilter, StoreError},
};

/// One stop on a judge's review queue.
#[derive(Debug, Clone, Serialize)]
pub struct QueueItem {
    pub submission: Submission,
    pub display_name: String,
    pub review: Option<Review>,
    pub is_completed: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct JudgeQueue {
    pub total_assigned: usize,
    pub completed: usize,
    pub remaining: usize,
    pub current_index: usize,
    pub items: Vec<QueueItem>,
}

#[derive(Debug)]
pub enum QueueError {
    /// The judge is not on the event's roster. Access control proper lives
    /// upstream; this is the last line of defence.
    NotEventJudge,
    Store(StoreError),
}

impl std::fmt::Display for QueueError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            QueueError::NotEventJudge => {
                write!(f, "not a judge for this event")
            }
            QueueError::Store(err) => write!(f, "{err}"),
        }
    }
}

impl std::error::Error for QueueError {}

impl From<StoreError> for QueueError {
    fn from(err: StoreError) -> Self {
        QueueError::Store(err)
    }
}

/// Builds the ordered, resumable review queue for one judge on one event.
/// An empty queue is a valid result, not an error.
pub fn judge_queue(
    store: &mut impl EntityStore,
    judge_id: &str,
    event_id: &str,
) -> Result<JudgeQueue, QueueError> {
    if !store.is_event_judge(event_id, judge_id)? {
        return Err(QueueError::NotEventJudge);
    }

    let assignments = store.list_assignments(&AssignmentFilter {
        event_id: Some(event_id.to_string()),
        judge_id: Some(judge_id.to_string()),
        ..Default::default()
    })?;
    let submissions = store.list_submissions(event_id)?;
    let reviews = store.list_reviews(&ReviewFilter {
        event_id: Some(event_id.to_string()),
        judge_id: Some(judge_id.to_string()),
        ..Default::default()
    })?;

    Ok(build_queue(&assignments, submissions, reviews))
}

/// Assembles the queue from a snapshot. Assignment creation order is queue
/// order; there is no re-sorting by difficulty or anything else, so a judge
/// always resumes exactly where they left off.
pub fn build_queue(
    assignments: &[JudgeAssignment],
    submissions: Vec<Submission>,
    reviews: Vec<Review>,
) -> JudgeQueue {
    let mut submission_map: HashMap<String, Submission> = submissions
        .into_iter()
        .map(|sub| (sub.id.clone(), sub))
        .collect();
    let mut review_map: HashMap<String, Review> = reviews
        .into_iter()
        .map(|review| (review.submission_id.clone(), review))
        .collect();

    let mut items = Vec::new();
    let mut current_index = 0;
    let mut found_uncompleted = false;

    for assignment in assignments {
        // an assignment whose submission vanished is skipped, not fatal
        let Some(submission) =
            submission_map.remove(&assignment.submission_id)
        else {
            continue;
        };

        let is_completed = assignment.is_completed();
        if !is_completed && !found_uncompleted {
            current_index = items.len();
            found_uncompleted = true;
        }

        let display_name = submission.display_name();
        items.push(QueueItem {
            submission,
            display_name,
            review: review_map.remove(&assignment.submission_id),
            is_completed,
        });
    }

    let completed = items.iter().filter(|item| item.is_completed).count();
    if !found_uncompleted && !items.is_empty() {
        current_index = items.len() - 1;
    }

    JudgeQueue {
        total_assigned: items.len(),
        completed,
        remaining: items.len() - completed,
        current_index,
        items,
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::build_queue;
    use crate::events::submissions::Submission;
    use crate::judging::{
        ASSIGNMENT_COMPLETED, ASSIGNMENT_PENDING, JudgeAssignment,
    };

    fn fixtures(
        statuses: &[&str],
    ) -> (Vec<JudgeAssignment>, Vec<Submission>) {
        let now = Utc::now().naive_utc();
        let assignments = statuses
            .iter()
            .enumerate()
            .map(|(i, status)| JudgeAssignment {
                id: format!("a-{i}"),
                event_id: "event-1".to_string(),
                judge_id: "judge-1".to_string(),
                submission_id: format!("sub-{i}"),
                status: status.to_string(),
                seq: i as i64,
                assigned_at: now,
            })
            .collect();
        let submissions = (0..statuses.len())
            .map(|i| Submission {
                id: format!("sub-{i}"),
                event_id: "event-1".to_string(),
                participant_id: format!("participant-{i}"),
                form_data: format!(r#"{{"project_name": "Project {i}"}}"#),
                submitted_at: now,
            })
            .collect();
        (assignments, submissions)
    }

    #[test]
    fn resumes_at_first_uncompleted_item() {
        let (assignments, submissions) = fixtures(&[
            ASSIGNMENT_COMPLETED,
            ASSIGNMENT_COMPLETED,
            ASSIGNMENT_COMPLETED,
            ASSIGNMENT_PENDING,
            ASSIGNMENT_PENDING,
        ]);
        let queue = build_queue(&assignments, submissions, Vec::new());

        assert_eq!(queue.current_index, 3);
        assert_eq!(queue.total_assigned, 5);
        assert_eq!(queue.completed, 3);
        assert_eq!(queue.remaining, 2);
    }

    #[test]
    fn fully_completed_queue_points_at_last_item() {
        let (assignments, submissions) = fixtures(&[ASSIGNMENT_COMPLETED; 5]);
        let queue = build_queue(&assignments, submissions, Vec::new());

        assert_eq!(queue.current_index, 4);
        assert_eq!(queue.remaining, 0);
    }

    #[test]
    fn empty_queue_is_valid() {
        let queue = build_queue(&[], Vec::new(), Vec::new());
        assert_eq!(queue.current_index, 0);
        assert_eq!(queue.total_assigned, 0);
        assert!(queue.items.is_empty());
    }

    #[test]
    fn items_keep_assignment_order_and_names() {
        let (assignments, submissions) =
            fixtures(&[ASSIGNMENT_PENDING, ASSIGNMENT_PENDING]);
        let queue = build_queue(&assignments, submissions, Vec::new());

        assert_eq!(queue.items[0].display_name, "Project 0");
        assert_eq!(queue.items[1].display_name, "Project 1");
        assert!(queue.items[0].review.is_none());
    }
}
