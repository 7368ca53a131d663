use std::collections::HashSet;

use indexmap::IndexMap;

use crate::events::submissions::Submission;
use crate::judging::assignment::{
    AssignmentDraft, AssignmentSet, RosterJudge, STRATEGY_ROUND_ROBIN,
};

/// Balanced round-robin assignment: each submission receives
/// `min(judges_per_submission, |judges|)` distinct judges. The cursor
/// carries over from one submission to the next rather than resetting;
/// that carry-over is what spreads load evenly across the batch.
pub fn assign(
    judges: &[RosterJudge],
    submissions: &[Submission],
    judges_per_submission: i64,
) -> AssignmentSet {
    let mut judge_loads: IndexMap<String, i64> =
        judges.iter().map(|judge| (judge.id.clone(), 0)).collect();
    let mut assignments = Vec::new();

    if judges.is_empty() || submissions.is_empty() {
        return AssignmentSet {
            assignments,
            judge_loads,
            strategy: STRATEGY_ROUND_ROBIN.to_string(),
        };
    }

    let n_judges = judges.len();
    let per_submission =
        (judges_per_submission.max(0) as usize).min(n_judges);
    let mut cursor = 0usize;

    for submission in submissions {
        let mut taken: HashSet<&str> = HashSet::with_capacity(per_submission);

        for _ in 0..per_submission {
            // skip judges already holding this submission, bounded so a
            // full lap can never loop forever
            let mut attempts = 0;
            while taken.contains(judges[cursor % n_judges].id.as_str())
                && attempts < n_judges
            {
                cursor += 1;
                attempts += 1;
            }

            let judge = &judges[cursor % n_judges];
            taken.insert(judge.id.as_str());
            assignments.push(AssignmentDraft {
                judge_id: judge.id.clone(),
                submission_id: submission.id.clone(),
            });
            *judge_loads.entry(judge.id.clone()).or_insert(0) += 1;
            cursor += 1;
        }
    }

    AssignmentSet {
        assignments,
        judge_loads,
        strategy: STRATEGY_ROUND_ROBIN.to_string(),
    }
}
