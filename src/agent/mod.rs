//! Optional external strategy seam. An agent may propose assignments,
//! validate entry forms or synthesize feedback; the deterministic
//! algorithms remain the contract of record, so every outcome here is
//! allowed to be `Declined`.

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

use crate::{
    events::{
        criteria::Criterion,
        submissions::{Submission, ValidationReport},
    },
    judging::{
        assignment::{AssignmentSet, RosterJudge},
        feedback::FeedbackSummary,
        reviews::Review,
    },
};

/// What came back from consulting an external strategy. Timeouts,
/// transport failures and malformed replies are all `Declined` — callers
/// fall back locally and never surface them as errors.
#[derive(Debug, Clone)]
pub enum AgentOutcome<T> {
    Proposed(T),
    Declined,
}

impl<T> AgentOutcome<T> {
    pub fn proposed(self) -> Option<T> {
        match self {
            AgentOutcome::Proposed(value) => Some(value),
            AgentOutcome::Declined => None,
        }
    }
}

pub trait JudgingAgent {
    fn propose_assignment(
        &self,
        judges: &[RosterJudge],
        submissions: &[Submission],
        judges_per_submission: i64,
    ) -> AgentOutcome<AssignmentSet>;

    fn propose_validation(
        &self,
        form_data: &Value,
    ) -> AgentOutcome<ValidationReport>;

    fn propose_feedback(
        &self,
        submission: &Submission,
        reviews: &[Review],
        criteria: &[Criterion],
    ) -> AgentOutcome<FeedbackSummary>;
}

/// Pulls a JSON object out of free-form agent text. Reasoning models wrap
/// their answers in `<think>` blocks and markdown fences; strip the
/// former, then slice from the first `{` to the last `}`.
pub fn extract_json_object(text: &str) -> Option<Value> {
    static THINK: Lazy<Regex> =
        Lazy::new(|| Regex::new(r"(?s)<think>.*?</think>").unwrap());

    let cleaned = THINK.replace_all(text, "");
    let start = cleaned.find('{')?;
    let end = cleaned.rfind('}')?;
    if end < start {
        return None;
    }
    serde_json::from_str(&cleaned[start..=end]).ok()
}
