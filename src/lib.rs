//! Incremental job-listing harvester.
//!
//! Walks a session-carrying, paginated search API, flattens each listing
//! into a [`JobRecord`](crawler::models::JobRecord), and upserts the records
//! into Postgres keyed by `job_id` so repeated runs never duplicate rows.

pub mod config;
pub mod crawler;
pub mod scheduler;
pub mod storage;

pub use config::Config;
pub use crawler::service::{HarvestService, RunSummary};
pub use crawler::{DateRange, StopReason};
