use indexmap::IndexMap;

use crate::{
    events::{Event, EventStatus, criteria::Criterion, submissions::Submission},
    judging::{EventJudge, JudgeAssignment, reviews::Review},
};

pub mod sqlite;

#[derive(Debug)]
pub enum StoreError {
    NotFound,
    /// A uniqueness or serialization conflict, e.g. two assignment runs
    /// racing over the same event. Safe to retry.
    Conflict(String),
    Database(String),
}

impl StoreError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, StoreError::Conflict(_))
    }
}

impl std::fmt::Display for StoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StoreError::NotFound => write!(f, "record not found"),
            StoreError::Conflict(msg) => write!(f, "store conflict: {msg}"),
            StoreError::Database(msg) => write!(f, "store error: {msg}"),
        }
    }
}

impl std::error::Error for StoreError {}

#[derive(Debug, Clone, Default)]
pub struct AssignmentFilter {
    pub event_id: Option<String>,
    pub judge_id: Option<String>,
    pub submission_id: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct ReviewFilter {
    pub event_id: Option<String>,
    pub judge_id: Option<String>,
    pub submission_id: Option<String>,
}

/// A judge/submission pairing to be installed by `replace_assignments`.
#[derive(Debug, Clone)]
pub struct NewAssignment {
    pub judge_id: String,
    pub submission_id: String,
}

#[derive(Debug, Clone)]
pub struct NewReview {
    pub submission_id: String,
    pub judge_id: String,
    pub event_id: String,
    pub scores: IndexMap<String, f32>,
    pub notes: Option<String>,
}

/// Access to the entity records backing the engine. Every analytic
/// component is a pure function of the snapshot it reads through this
/// trait; nothing holds process-wide state.
pub trait EntityStore {
    fn event(&mut self, event_id: &str) -> Result<Option<Event>, StoreError>;

    fn update_event_status(
        &mut self,
        event_id: &str,
        status: EventStatus,
    ) -> Result<(), StoreError>;

    fn list_event_judges(
        &mut self,
        event_id: &str,
    ) -> Result<Vec<EventJudge>, StoreError>;

    fn is_event_judge(
        &mut self,
        event_id: &str,
        judge_id: &str,
    ) -> Result<bool, StoreError>;

    /// Criteria in `sort_order`.
    fn list_criteria(
        &mut self,
        event_id: &str,
    ) -> Result<Vec<Criterion>, StoreError>;

    fn submission(
        &mut self,
        submission_id: &str,
    ) -> Result<Option<Submission>, StoreError>;

    fn list_submissions(
        &mut self,
        event_id: &str,
    ) -> Result<Vec<Submission>, StoreError>;

    /// Assignments in creation order.
    fn list_assignments(
        &mut self,
        filter: &AssignmentFilter,
    ) -> Result<Vec<JudgeAssignment>, StoreError>;

    /// Atomically discards the event's previous assignment set and installs
    /// the new one. Old and new sets are never merged; a failed transaction
    /// leaves the old set in place and is retryable.
    fn replace_assignments(
        &mut self,
        event_id: &str,
        drafts: &[NewAssignment],
    ) -> Result<Vec<JudgeAssignment>, StoreError>;

    fn list_reviews(
        &mut self,
        filter: &ReviewFilter,
    ) -> Result<Vec<Review>, StoreError>;

    /// Inserts the review, or replaces scores/notes on the existing row for
    /// the same (submission, judge) pair.
    fn upsert_review(
        &mut self,
        review: NewReview,
    ) -> Result<Review, StoreError>;

    fn complete_assignment(
        &mut self,
        judge_id: &str,
        submission_id: &str,
    ) -> Result<(), StoreError>;
}
