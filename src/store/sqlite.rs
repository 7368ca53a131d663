use chrono::Utc;
use diesel::{
    SqliteConnection,
    prelude::*,
    r2d2::{ConnectionManager, Pool, PooledConnection},
    result::DatabaseErrorKind,
};
use diesel_migrations::MigrationHarness;
use serde_json::Value;
use uuid::Uuid;

use crate::{
    MIGRATIONS,
    events::{Event, EventStatus, criteria::Criterion, submissions::Submission},
    judging::{
        ASSIGNMENT_COMPLETED, ASSIGNMENT_PENDING, EventJudge,
        JudgeAssignment, reviews::Review,
    },
    schema::{
        criteria, event_judges, events, judge_assignments, reviews, submissions,
    },
    store::{
        AssignmentFilter, EntityStore, NewAssignment, NewReview, ReviewFilter,
        StoreError,
    },
};

pub type DbPool = Pool<ConnectionManager<SqliteConnection>>;

pub fn open_pool(database_url: &str) -> Result<DbPool, StoreError> {
    Pool::builder()
        .max_size(if database_url == ":memory:" { 1 } else { 10 })
        .build(ConnectionManager::<SqliteConnection>::new(database_url))
        .map_err(|err| StoreError::Database(err.to_string()))
}

/// Diesel-backed implementation of [`EntityStore`] over a pooled SQLite
/// connection.
pub struct SqliteStore {
    conn: PooledConnection<ConnectionManager<SqliteConnection>>,
}

impl SqliteStore {
    pub fn new(pool: &DbPool) -> Result<Self, StoreError> {
        let conn = pool
            .get()
            .map_err(|err| StoreError::Database(err.to_string()))?;
        Ok(SqliteStore { conn })
    }

    pub fn run_migrations(&mut self) -> Result<(), StoreError> {
        self.conn
            .run_pending_migrations(MIGRATIONS)
            .map(|_| ())
            .map_err(|err| StoreError::Database(err.to_string()))
    }

    pub fn create_event(
        &mut self,
        name: &str,
        judges_per_submission: i64,
    ) -> Result<Event, StoreError> {
        let event = Event {
            id: Uuid::now_v7().to_string(),
            name: name.to_string(),
            status: EventStatus::Draft.as_str().to_string(),
            judges_per_submission,
            created_at: Utc::now().naive_utc(),
        };
        diesel::insert_into(events::table)
            .values(&event)
            .execute(&mut self.conn)
            .map_err(db_err)?;
        Ok(event)
    }

    pub fn add_event_judge(
        &mut self,
        event_id: &str,
        judge_id: &str,
        name: &str,
    ) -> Result<EventJudge, StoreError> {
        let judge = EventJudge {
            id: Uuid::now_v7().to_string(),
            event_id: event_id.to_string(),
            judge_id: judge_id.to_string(),
            name: name.to_string(),
            invited_at: Utc::now().naive_utc(),
        };
        diesel::insert_into(event_judges::table)
            .values(&judge)
            .execute(&mut self.conn)
            .map_err(db_err)?;
        Ok(judge)
    }

    /// Adds a judging criterion. Criteria are immutable once the event has
    /// left draft, so this refuses to touch a non-draft event.
    pub fn add_criterion(
        &mut self,
        event_id: &str,
        name: &str,
        scale_min: i64,
        scale_max: i64,
        weight: f32,
        sort_order: i64,
    ) -> Result<Criterion, StoreError> {
        let event = self.event(event_id)?.ok_or(StoreError::NotFound)?;
        if event.status() != Some(EventStatus::Draft) {
            return Err(StoreError::Conflict(format!(
                "criteria are frozen once the event leaves draft (status: {})",
                event.status
            )));
        }

        let criterion = Criterion {
            id: Uuid::now_v7().to_string(),
            event_id: event_id.to_string(),
            name: name.to_string(),
            scale_min,
            scale_max,
            weight,
            sort_order,
        };
        diesel::insert_into(criteria::table)
            .values(&criterion)
            .execute(&mut self.conn)
            .map_err(db_err)?;
        Ok(criterion)
    }

    pub fn add_submission(
        &mut self,
        event_id: &str,
        participant_id: &str,
        form_data: &Value,
    ) -> Result<Submission, StoreError> {
        let submission = Submission {
            id: Uuid::now_v7().to_string(),
            event_id: event_id.to_string(),
            participant_id: participant_id.to_string(),
            form_data: form_data.to_string(),
            submitted_at: Utc::now().naive_utc(),
        };
        diesel::insert_into(submissions::table)
            .values(&submission)
            .execute(&mut self.conn)
            .map_err(db_err)?;
        Ok(submission)
    }
}

impl EntityStore for SqliteStore {
    fn event(&mut self, event_id: &str) -> Result<Option<Event>, StoreError> {
        events::table
            .filter(events::id.eq(event_id))
            .first::<Event>(&mut self.conn)
            .optional()
            .map_err(db_err)
    }

    fn update_event_status(
        &mut self,
        event_id: &str,
        status: EventStatus,
    ) -> Result<(), StoreError> {
        diesel::update(events::table.filter(events::id.eq(event_id)))
            .set(events::status.eq(status.as_str()))
            .execute(&mut self.conn)
            .map_err(db_err)?;
        Ok(())
    }

    fn list_event_judges(
        &mut self,
        event_id: &str,
    ) -> Result<Vec<EventJudge>, StoreError> {
        event_judges::table
            .filter(event_judges::event_id.eq(event_id))
            .order((event_judges::invited_at.asc(), event_judges::id.asc()))
            .load::<EventJudge>(&mut self.conn)
            .map_err(db_err)
    }

    fn is_event_judge(
        &mut self,
        event_id: &str,
        judge_id: &str,
    ) -> Result<bool, StoreError> {
        diesel::dsl::select(diesel::dsl::exists(
            event_judges::table.filter(
                event_judges::event_id
                    .eq(event_id)
                    .and(event_judges::judge_id.eq(judge_id)),
            ),
        ))
        .get_result::<bool>(&mut self.conn)
        .map_err(db_err)
    }

    fn list_criteria(
        &mut self,
        event_id: &str,
    ) -> Result<Vec<Criterion>, StoreError> {
        criteria::table
            .filter(criteria::event_id.eq(event_id))
            .order((criteria::sort_order.asc(), criteria::id.asc()))
            .load::<Criterion>(&mut self.conn)
            .map_err(db_err)
    }

    fn submission(
        &mut self,
        submission_id: &str,
    ) -> Result<Option<Submission>, StoreError> {
        submissions::table
            .filter(submissions::id.eq(submission_id))
            .first::<Submission>(&mut self.conn)
            .optional()
            .map_err(db_err)
    }

    fn list_submissions(
        &mut self,
        event_id: &str,
    ) -> Result<Vec<Submission>, StoreError> {
        submissions::table
            .filter(submissions::event_id.eq(event_id))
            .order((submissions::submitted_at.asc(), submissions::id.asc()))
            .load::<Submission>(&mut self.conn)
            .map_err(db_err)
    }

    fn list_assignments(
        &mut self,
        filter: &AssignmentFilter,
    ) -> Result<Vec<JudgeAssignment>, StoreError> {
        let mut query = judge_assignments::table.into_boxed();
        if let Some(event_id) = &filter.event_id {
            query = query.filter(judge_assignments::event_id.eq(event_id));
        }
        if let Some(judge_id) = &filter.judge_id {
            query = query.filter(judge_assignments::judge_id.eq(judge_id));
        }
        if let Some(submission_id) = &filter.submission_id {
            query = query
                .filter(judge_assignments::submission_id.eq(submission_id));
        }
        query
            .order((
                judge_assignments::assigned_at.asc(),
                judge_assignments::seq.asc(),
            ))
            .load::<JudgeAssignment>(&mut self.conn)
            .map_err(db_err)
    }

    fn replace_assignments(
        &mut self,
        event_id: &str,
        drafts: &[NewAssignment],
    ) -> Result<Vec<JudgeAssignment>, StoreError> {
        let now = Utc::now().naive_utc();
        let rows = drafts
            .iter()
            .enumerate()
            .map(|(seq, draft)| JudgeAssignment {
                id: Uuid::now_v7().to_string(),
                event_id: event_id.to_string(),
                judge_id: draft.judge_id.clone(),
                submission_id: draft.submission_id.clone(),
                status: ASSIGNMENT_PENDING.to_string(),
                seq: seq as i64,
                assigned_at: now,
            })
            .collect::<Vec<_>>();

        self.conn
            .transaction(|conn| {
                diesel::delete(
                    judge_assignments::table
                        .filter(judge_assignments::event_id.eq(event_id)),
                )
                .execute(conn)?;
                diesel::insert_into(judge_assignments::table)
                    .values(&rows)
                    .execute(conn)?;
                Ok(())
            })
            .map_err(db_err)?;

        Ok(rows)
    }

    fn list_reviews(
        &mut self,
        filter: &ReviewFilter,
    ) -> Result<Vec<Review>, StoreError> {
        let mut query = reviews::table.into_boxed();
        if let Some(event_id) = &filter.event_id {
            query = query.filter(reviews::event_id.eq(event_id));
        }
        if let Some(judge_id) = &filter.judge_id {
            query = query.filter(reviews::judge_id.eq(judge_id));
        }
        if let Some(submission_id) = &filter.submission_id {
            query = query.filter(reviews::submission_id.eq(submission_id));
        }
        query
            .order((reviews::submitted_at.asc(), reviews::id.asc()))
            .load::<Review>(&mut self.conn)
            .map_err(db_err)
    }

    fn upsert_review(
        &mut self,
        review: NewReview,
    ) -> Result<Review, StoreError> {
        let now = Utc::now().naive_utc();
        let scores = serde_json::to_string(&review.scores)
            .map_err(|err| StoreError::Database(err.to_string()))?;

        let row = Review {
            id: Uuid::now_v7().to_string(),
            submission_id: review.submission_id.clone(),
            judge_id: review.judge_id.clone(),
            event_id: review.event_id.clone(),
            scores: scores.clone(),
            notes: review.notes.clone(),
            submitted_at: now,
        };

        diesel::insert_into(reviews::table)
            .values(&row)
            .on_conflict((reviews::submission_id, reviews::judge_id))
            .do_update()
            .set((
                reviews::scores.eq(&scores),
                reviews::notes.eq(review.notes.clone()),
                reviews::submitted_at.eq(now),
            ))
            .execute(&mut self.conn)
            .map_err(db_err)?;

        // re-read so a replaced review keeps its original id
        reviews::table
            .filter(
                reviews::submission_id
                    .eq(&review.submission_id)
                    .and(reviews::judge_id.eq(&review.judge_id)),
            )
            .first::<Review>(&mut self.conn)
            .map_err(db_err)
    }

    fn complete_assignment(
        &mut self,
        judge_id: &str,
        submission_id: &str,
    ) -> Result<(), StoreError> {
        diesel::update(
            judge_assignments::table.filter(
                judge_assignments::judge_id
                    .eq(judge_id)
                    .and(judge_assignments::submission_id.eq(submission_id)),
            ),
        )
        .set(judge_assignments::status.eq(ASSIGNMENT_COMPLETED))
        .execute(&mut self.conn)
        .map_err(db_err)?;
        Ok(())
    }
}

fn db_err(err: diesel::result::Error) -> StoreError {
    match err {
        diesel::result::Error::NotFound => StoreError::NotFound,
        diesel::result::Error::DatabaseError(
            DatabaseErrorKind::UniqueViolation
            | DatabaseErrorKind::SerializationFailure,
            info,
        ) => StoreError::Conflict(info.message().to_string()),
        other => StoreError::Database(other.to_string()),
    }
}
