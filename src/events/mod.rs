use chrono::NaiveDateTime;
use diesel::prelude::*;
use serde::{Deserialize, Serialize};

use crate::{
    schema::events,
    store::{EntityStore, StoreError},
};

pub mod criteria;
pub mod submissions;

#[derive(
    Queryable, Selectable, Identifiable, Insertable, Debug, Clone, Serialize,
)]
#[diesel(table_name = events)]
pub struct Event {
    pub id: String,
    pub name: String,
    pub status: String,
    pub judges_per_submission: i64,
    pub created_at: NaiveDateTime,
}

impl Event {
    pub fn status(&self) -> Option<EventStatus> {
        EventStatus::parse(&self.status)
    }
}

/// Lifecycle of an event. Transitions only move forward, one step at a
/// time; there is no way back to an earlier phase.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventStatus {
    Draft,
    Open,
    Judging,
    Closed,
}

impl EventStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            EventStatus::Draft => "draft",
            EventStatus::Open => "open",
            EventStatus::Judging => "judging",
            EventStatus::Closed => "closed",
        }
    }

    pub fn parse(status: &str) -> Option<Self> {
        match status {
            "draft" => Some(EventStatus::Draft),
            "open" => Some(EventStatus::Open),
            "judging" => Some(EventStatus::Judging),
            "closed" => Some(EventStatus::Closed),
            _ => None,
        }
    }

    pub fn can_transition_to(self, next: EventStatus) -> bool {
        matches!(
            (self, next),
            (EventStatus::Draft, EventStatus::Open)
                | (EventStatus::Open, EventStatus::Judging)
                | (EventStatus::Judging, EventStatus::Closed)
        )
    }
}

impl std::fmt::Display for EventStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug)]
pub enum TransitionError {
    EventNotFound,
    InvalidTransition { from: String, to: EventStatus },
    NoCriteria,
    Store(StoreError),
}

impl std::fmt::Display for TransitionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TransitionError::EventNotFound => write!(f, "event not found"),
            TransitionError::InvalidTransition { from, to } => {
                write!(f, "cannot transition from '{from}' to '{to}'")
            }
            TransitionError::NoCriteria => {
                write!(f, "add at least 1 judging criterion before opening")
            }
            TransitionError::Store(err) => write!(f, "{err}"),
        }
    }
}

impl std::error::Error for TransitionError {}

impl From<StoreError> for TransitionError {
    fn from(err: StoreError) -> Self {
        TransitionError::Store(err)
    }
}

/// Moves an event one step forward in its lifecycle. Opening requires the
/// event to have judging criteria, since they become immutable afterwards.
pub fn transition_status(
    store: &mut impl EntityStore,
    event_id: &str,
    next: EventStatus,
) -> Result<EventStatus, TransitionError> {
    let event = store
        .event(event_id)?
        .ok_or(TransitionError::EventNotFound)?;

    let valid = event
        .status()
        .is_some_and(|current| current.can_transition_to(next));
    if !valid {
        return Err(TransitionError::InvalidTransition {
            from: event.status.clone(),
            to: next,
        });
    }

    if next == EventStatus::Open && store.list_criteria(event_id)?.is_empty() {
        return Err(TransitionError::NoCriteria);
    }

    store.update_event_status(event_id, next)?;
    Ok(next)
}
