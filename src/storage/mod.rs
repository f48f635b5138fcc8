use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use chrono::NaiveDate;

use crate::crawler::models::JobRecord;

pub mod memory;
pub mod postgres;

/// Destination for validated job records, keyed by `job_id`.
#[async_trait]
pub trait JobStore: Send + Sync {
    /// Create the destination table if it does not exist yet.
    async fn ensure_schema(&self) -> Result<()>;

    /// Insert new records and overwrite every non-key field of existing ones.
    /// Returns the number of records written.
    async fn upsert_jobs(&self, jobs: &[JobRecord]) -> Result<usize>;

    /// Date part of the newest stored `listing_date`.
    async fn last_listing_date(&self) -> Result<Option<NaiveDate>>;
}

#[async_trait]
impl<T: JobStore + ?Sized> JobStore for Arc<T> {
    async fn ensure_schema(&self) -> Result<()> {
        (**self).ensure_schema().await
    }

    async fn upsert_jobs(&self, jobs: &[JobRecord]) -> Result<usize> {
        (**self).upsert_jobs(jobs).await
    }

    async fn last_listing_date(&self) -> Result<Option<NaiveDate>> {
        (**self).last_listing_date().await
    }
}
