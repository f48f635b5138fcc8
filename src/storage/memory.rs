//! In-process store with the same upsert semantics as Postgres.

use std::collections::BTreeMap;
use std::sync::RwLock;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chrono::NaiveDate;

use crate::crawler::models::JobRecord;
use crate::storage::JobStore;

#[derive(Default)]
pub struct MemoryStore {
    rows: RwLock<BTreeMap<String, JobRecord>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.rows.read().map(|rows| rows.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn get(&self, job_id: &str) -> Option<JobRecord> {
        self.rows.read().ok()?.get(job_id).cloned()
    }

    /// All rows ordered by `job_id`.
    pub fn snapshot(&self) -> Vec<JobRecord> {
        self.rows
            .read()
            .map(|rows| rows.values().cloned().collect())
            .unwrap_or_default()
    }
}

#[async_trait]
impl JobStore for MemoryStore {
    async fn ensure_schema(&self) -> Result<()> {
        Ok(())
    }

    async fn upsert_jobs(&self, jobs: &[JobRecord]) -> Result<usize> {
        let mut rows = self
            .rows
            .write()
            .map_err(|_| anyhow!("memory store lock poisoned"))?;

        for job in jobs {
            rows.insert(job.job_id.clone(), job.clone());
        }

        Ok(jobs.len())
    }

    async fn last_listing_date(&self) -> Result<Option<NaiveDate>> {
        let rows = self
            .rows
            .read()
            .map_err(|_| anyhow!("memory store lock poisoned"))?;

        Ok(rows.values().map(|job| job.listing_date).max().map(|ts| ts.date()))
    }
}
