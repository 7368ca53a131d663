use std::collections::HashMap;

use indexmap::IndexMap;
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::{
    agent::{AgentOutcome, JudgingAgent},
    events::{EventStatus, submissions::Submission},
    store::{AssignmentFilter, EntityStore, NewAssignment, StoreError},
};

pub mod round_robin;

/// Strategy label for the deterministic path, degenerate inputs included.
pub const STRATEGY_ROUND_ROBIN: &str = "balanced_round_robin";
pub const STRATEGY_AGENT: &str = "agent";

/// A judge as the assignment strategies see one. `current_load` is the
/// number of assignments already in the store; it is passed to the external
/// strategy for its own balancing, while the round-robin path stays
/// deliberately load-naive.
#[derive(Debug, Clone, Serialize)]
pub struct RosterJudge {
    pub id: String,
    pub name: String,
    pub current_load: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssignmentDraft {
    pub judge_id: String,
    pub submission_id: String,
}

/// The outcome of one assignment run. `judge_loads` counts only this run's
/// assignments, keyed in roster order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssignmentSet {
    pub assignments: Vec<AssignmentDraft>,
    pub judge_loads: IndexMap<String, i64>,
    pub strategy: String,
}

#[derive(Debug)]
pub enum AssignError {
    EventNotFound,
    NotAcceptingAssignments { status: String },
    Store(StoreError),
}

impl AssignError {
    /// Whether retrying the run can succeed, e.g. after losing a
    /// replace-assignments race to a concurrent run.
    pub fn is_retryable(&self) -> bool {
        matches!(self, AssignError::Store(err) if err.is_retryable())
    }
}

impl std::fmt::Display for AssignError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AssignError::EventNotFound => write!(f, "event not found"),
            AssignError::NotAcceptingAssignments { status } => {
                write!(
                    f,
                    "event must be open or judging to assign judges \
                     (status: {status})"
                )
            }
            AssignError::Store(err) => write!(f, "{err}"),
        }
    }
}

impl std::error::Error for AssignError {}

impl From<StoreError> for AssignError {
    fn from(err: StoreError) -> Self {
        AssignError::Store(err)
    }
}

/// Recomputes the event's assignment set and atomically replaces the stored
/// one. The optional agent strategy is consulted first; the round-robin
/// fallback is the contract of record whenever the agent is absent,
/// declines, or proposes an empty set despite having judges and
/// submissions to work with.
pub fn assign_judges(
    store: &mut impl EntityStore,
    agent: Option<&dyn JudgingAgent>,
    event_id: &str,
) -> Result<AssignmentSet, AssignError> {
    let event = store
        .event(event_id)?
        .ok_or(AssignError::EventNotFound)?;
    if !matches!(
        event.status(),
        Some(EventStatus::Open | EventStatus::Judging)
    ) {
        return Err(AssignError::NotAcceptingAssignments {
            status: event.status.clone(),
        });
    }

    let judges = store.list_event_judges(event_id)?;
    let submissions = store.list_submissions(event_id)?;

    let existing = store.list_assignments(&AssignmentFilter {
        event_id: Some(event_id.to_string()),
        ..Default::default()
    })?;
    let mut load_map: HashMap<&str, i64> = HashMap::new();
    for assignment in &existing {
        *load_map.entry(assignment.judge_id.as_str()).or_insert(0) += 1;
    }

    let roster = judges
        .iter()
        .map(|judge| RosterJudge {
            id: judge.judge_id.clone(),
            name: judge.name.clone(),
            current_load: load_map
                .get(judge.judge_id.as_str())
                .copied()
                .unwrap_or(0),
        })
        .collect_vec();

    let set = propose_or_fallback(
        agent,
        &roster,
        &submissions,
        event.judges_per_submission,
    );

    let drafts = set
        .assignments
        .iter()
        .map(|draft| NewAssignment {
            judge_id: draft.judge_id.clone(),
            submission_id: draft.submission_id.clone(),
        })
        .collect_vec();
    store.replace_assignments(event_id, &drafts)?;

    info!(
        event = %event_id,
        count = drafts.len(),
        strategy = %set.strategy,
        "installed assignment set"
    );
    Ok(set)
}

fn propose_or_fallback(
    agent: Option<&dyn JudgingAgent>,
    roster: &[RosterJudge],
    submissions: &[Submission],
    judges_per_submission: i64,
) -> AssignmentSet {
    if let Some(agent) = agent {
        match agent.propose_assignment(roster, submissions, judges_per_submission)
        {
            AgentOutcome::Proposed(set) => {
                if set.assignments.is_empty()
                    && !roster.is_empty()
                    && !submissions.is_empty()
                {
                    warn!(
                        "assignment agent proposed an empty set, \
                         falling back to round robin"
                    );
                } else {
                    return set;
                }
            }
            AgentOutcome::Declined => {
                info!("assignment agent declined, using round robin");
            }
        }
    }
    round_robin::assign(roster, submissions, judges_per_submission)
}
