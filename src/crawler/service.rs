use anyhow::Context;
use chrono::{NaiveDateTime, Utc};
use tracing::{info, warn};

use crate::{
    crawler::{self, fetcher::PageSource, parser, validate, DateRange, StopReason},
    storage::JobStore,
};

/// What a completed run did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    pub pages: usize,
    pub candidates: usize,
    pub rejected: usize,
    pub loaded: usize,
    pub stop: StopReason,
}

/// Extract, transform, validate and load in one sequential pass.
pub struct HarvestService<P, S> {
    source: P,
    store: S,
    max_pages: u32,
}

impl<P, S> HarvestService<P, S>
where
    P: PageSource,
    S: JobStore,
{
    pub fn new(source: P, store: S, max_pages: u32) -> Self {
        Self {
            source,
            store,
            max_pages,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub async fn run(&self, window: DateRange) -> anyhow::Result<RunSummary> {
        self.run_at(window, Utc::now().naive_utc()).await
    }

    /// Same as [`run`](Self::run) with a fixed extraction instant, used as
    /// the listing date of listings that lack one.
    pub async fn run_at(&self, window: DateRange, now: NaiveDateTime) -> anyhow::Result<RunSummary> {
        info!(days = window.days(), "EXTRACTING");
        let extraction = crawler::crawl_pages(&self.source, window, self.max_pages).await;

        if let StopReason::TransportFailure(reason) = &extraction.stop {
            warn!(
                pages = extraction.pages.len(),
                %reason,
                "Pagination ended on a failed request; loading what was collected"
            );
        }

        info!(pages = extraction.pages.len(), "TRANSFORMING");
        let candidates = parser::flatten_pages(&extraction.pages, now);
        let candidate_count = candidates.len();

        info!(candidates = candidate_count, "VALIDATING");
        let validated = validate::validate_all(candidates);
        info!(
            valid = validated.records.len(),
            rejected = validated.rejected,
            "Extracted and transformed job records"
        );

        info!(records = validated.records.len(), "LOADING");
        self.store
            .ensure_schema()
            .await
            .context("Failed to prepare destination schema")?;
        let loaded = self
            .store
            .upsert_jobs(&validated.records)
            .await
            .context("Failed to load job batch")?;

        let summary = RunSummary {
            pages: extraction.pages.len(),
            candidates: candidate_count,
            rejected: validated.rejected,
            loaded,
            stop: extraction.stop,
        };

        info!(
            pages = summary.pages,
            loaded = summary.loaded,
            rejected = summary.rejected,
            stop = ?summary.stop,
            "DONE"
        );
        Ok(summary)
    }
}
