use serde::{Deserialize, Serialize};

use crate::{
    agent::{AgentOutcome, JudgingAgent},
    store::{EntityStore, ReviewFilter, StoreError},
};

/// Synthesized feedback for a participant. Real synthesis needs the
/// external agent; without one the caller gets an honest placeholder.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedbackSummary {
    pub summary: String,
    pub strengths: Vec<String>,
    pub improvements: Vec<String>,
    pub overall_sentiment: String,
}

impl FeedbackSummary {
    pub fn unavailable() -> Self {
        FeedbackSummary {
            summary: "Feedback synthesis requires an external agent."
                .to_string(),
            strengths: Vec::new(),
            improvements: Vec::new(),
            overall_sentiment: "mixed".to_string(),
        }
    }
}

#[derive(Debug)]
pub enum FeedbackError {
    SubmissionNotFound,
    NoReviews,
    Store(StoreError),
}

impl std::fmt::Display for FeedbackError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FeedbackError::SubmissionNotFound => {
                write!(f, "submission not found")
            }
            FeedbackError::NoReviews => {
                write!(f, "no reviews exist for this submission")
            }
            FeedbackError::Store(err) => write!(f, "{err}"),
        }
    }
}

impl std::error::Error for FeedbackError {}

impl From<StoreError> for FeedbackError {
    fn from(err: StoreError) -> Self {
        FeedbackError::Store(err)
    }
}

pub fn generate_feedback(
    store: &mut impl EntityStore,
    agent: Option<&dyn JudgingAgent>,
    submission_id: &str,
) -> Result<FeedbackSummary, FeedbackError> {
    let submission = store
        .submission(submission_id)?
        .ok_or(FeedbackError::SubmissionNotFound)?;

    let reviews = store.list_reviews(&ReviewFilter {
        submission_id: Some(submission_id.to_string()),
        ..Default::default()
    })?;
    if reviews.is_empty() {
        return Err(FeedbackError::NoReviews);
    }

    let criteria = store.list_criteria(&submission.event_id)?;

    if let Some(agent) = agent {
        if let AgentOutcome::Proposed(feedback) =
            agent.propose_feedback(&submission, &reviews, &criteria)
        {
            return Ok(feedback);
        }
        tracing::info!(
            submission = %submission_id,
            "feedback agent declined, returning placeholder"
        );
    }

    Ok(FeedbackSummary::unavailable())
}
