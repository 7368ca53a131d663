use diesel::prelude::*;
use serde::Serialize;

use crate::schema::criteria;

/// A weighted, bounded scoring dimension. Criteria are fixed once the
/// event leaves draft, so every review taken during judging is scored
/// against the same set.
#[derive(
    Queryable, Selectable, Identifiable, Insertable, Debug, Clone, Serialize,
)]
#[diesel(table_name = criteria)]
pub struct Criterion {
    pub id: String,
    pub event_id: String,
    pub name: String,
    pub scale_min: i64,
    pub scale_max: i64,
    pub weight: f32,
    pub sort_order: i64,
}

impl Criterion {
    /// Whether a score lies on this criterion's scale (bounds inclusive).
    pub fn contains(&self, score: f32) -> bool {
        score >= self.scale_min as f32 && score <= self.scale_max as f32
    }
}
