use chrono::NaiveDateTime;
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::agent::{AgentOutcome, JudgingAgent};
use crate::schema::submissions;

#[derive(
    Queryable, Selectable, Identifiable, Insertable, Debug, Clone, Serialize,
)]
#[diesel(table_name = submissions)]
pub struct Submission {
    pub id: String,
    pub event_id: String,
    pub participant_id: String,
    pub form_data: String,
    pub submitted_at: NaiveDateTime,
}

impl Submission {
    /// The entry form answers. The engine treats these as opaque apart from
    /// display-name extraction; anything that is not a JSON object degrades
    /// to an empty map.
    pub fn form_data(&self) -> serde_json::Map<String, Value> {
        ensure_object(&self.form_data)
    }

    /// A human-readable label for the entry. Prefers well-known name keys,
    /// then the first non-empty string answer, then a truncated id.
    pub fn display_name(&self) -> String {
        let data = self.form_data();

        for key in ["project_name", "title", "name"] {
            if let Some(Value::String(value)) = data.get(key)
                && !value.is_empty()
            {
                return value.clone();
            }
        }

        data.values()
            .find_map(|value| match value {
                Value::String(s) if !s.is_empty() => Some(s.clone()),
                _ => None,
            })
            .unwrap_or_else(|| {
                format!("Submission {}", &self.id[..self.id.len().min(8)])
            })
    }
}

pub(crate) fn ensure_object(raw: &str) -> serde_json::Map<String, Value> {
    match serde_json::from_str(raw) {
        Ok(Value::Object(map)) => map,
        _ => serde_json::Map::new(),
    }
}

/// Verdict on an entry form, as produced by the external validation agent.
/// The pass-through default accepts everything unchanged.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct ValidationReport {
    pub valid: bool,
    pub warnings: Vec<String>,
    pub errors: Vec<String>,
    pub normalized: Value,
}

impl ValidationReport {
    pub fn pass_through(form_data: &Value) -> Self {
        ValidationReport {
            valid: true,
            warnings: Vec::new(),
            errors: Vec::new(),
            normalized: form_data.clone(),
        }
    }
}

/// Runs the agent's validation over raw form data, accepting the data
/// unchanged whenever the agent declines or is absent.
pub fn validate_form_data(
    agent: Option<&dyn JudgingAgent>,
    form_data: &Value,
) -> ValidationReport {
    if let Some(agent) = agent {
        match agent.propose_validation(form_data) {
            AgentOutcome::Proposed(report) => return report,
            AgentOutcome::Declined => {
                tracing::info!("validation agent declined, passing through");
            }
        }
    }
    ValidationReport::pass_through(form_data)
}
