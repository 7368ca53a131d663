//! Judging engine for hackathon-style events: judge assignment, review
//! queues, score aggregation, progress tracking and bias detection.

use diesel_migrations::{EmbeddedMigrations, embed_migrations};

pub mod agent;
pub mod config;
pub mod events;
pub mod judging;
pub mod schema;
pub mod store;


pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!();
