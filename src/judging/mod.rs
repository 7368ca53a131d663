use chrono::NaiveDateTime;
use diesel::prelude::*;
use serde::Serialize;

use crate::schema::{event_judges, judge_assignments};

pub mod assignment;
pub mod feedback;
pub mod progress;
pub mod queue;
pub mod reviews;
pub mod scoring;

pub const ASSIGNMENT_PENDING: &str = "pending";
pub const ASSIGNMENT_COMPLETED: &str = "completed";

/// Membership of a judge on an event's roster.
#[derive(
    Queryable, Selectable, Identifiable, Insertable, Debug, Clone, Serialize,
)]
#[diesel(table_name = event_judges)]
pub struct EventJudge {
    pub id: String,
    pub event_id: String,
    pub judge_id: String,
    pub name: String,
    pub invited_at: NaiveDateTime,
}

/// A judge's obligation to review one submission. Created in bulk by the
/// assignment engine; flips to completed exactly once, on the first
/// successful review upsert for the pair.
#[derive(
    Queryable, Selectable, Identifiable, Insertable, Debug, Clone, Serialize,
)]
#[diesel(table_name = judge_assignments)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct JudgeAssignment {
    pub id: String,
    pub event_id: String,
    pub judge_id: String,
    pub submission_id: String,
    pub status: String,
    pub seq: i64,
    pub assigned_at: NaiveDateTime,
}

impl JudgeAssignment {
    pub fn is_completed(&self) -> bool {
        self.status == ASSIGNMENT_COMPLETED
    }
}
