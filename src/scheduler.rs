use std::time::Duration;

use anyhow::{ensure, Context};
use chrono::{Local, NaiveDate};
use tokio::time::{interval, sleep, MissedTickBehavior};
use tracing::{error, info, warn};

use crate::crawler::{fetcher::PageSource, service::HarvestService, service::RunSummary, DateRange};
use crate::storage::JobStore;

/// Time window for the next run: an explicit `since` date wins, otherwise
/// the newest stored listing date, otherwise `default_days`.
pub async fn resolve_window<S: JobStore + ?Sized>(
    store: &S,
    since: Option<NaiveDate>,
    default_days: i64,
    today: NaiveDate,
) -> anyhow::Result<DateRange> {
    let last = match since {
        Some(date) => Some(date),
        None => {
            store
                .ensure_schema()
                .await
                .context("Failed to prepare destination schema")?;
            store.last_listing_date().await?
        }
    };

    match last {
        Some(date) => info!(last_listing_date = %date, "Last listing_date in database"),
        None => info!("No listing_date found in database"),
    }

    let window = DateRange::since(last, today, default_days);
    info!(days = window.days(), "Calculated daterange");
    Ok(window)
}

pub async fn run_once<P, S>(
    service: &HarvestService<P, S>,
    since: Option<NaiveDate>,
    default_days: i64,
) -> anyhow::Result<RunSummary>
where
    P: PageSource,
    S: JobStore,
{
    let today = Local::now().date_naive();
    let window = resolve_window(service.store(), since, default_days, today).await?;
    service.run(window).await
}

/// Runs once, then retries the whole run up to `retries` more times.
pub async fn run_with_retries<P, S>(
    service: &HarvestService<P, S>,
    default_days: i64,
    retries: u32,
    retry_delay: Duration,
) -> anyhow::Result<RunSummary>
where
    P: PageSource,
    S: JobStore,
{
    let mut attempt = 0u32;
    loop {
        match run_once(service, None, default_days).await {
            Ok(summary) => return Ok(summary),
            Err(e) if attempt < retries => {
                attempt += 1;
                let reason = format!("{:#}", e);
                warn!(attempt, retries, error = %reason, "Run failed, retrying");
                sleep(retry_delay).await;
            }
            Err(e) => return Err(e),
        }
    }
}

/// Runs the pipeline on a fixed interval. Runs are sequential, so two never
/// overlap against the same table.
pub async fn run_every<P, S>(
    service: &HarvestService<P, S>,
    every: Duration,
    default_days: i64,
    retries: u32,
    retry_delay: Duration,
) -> anyhow::Result<()>
where
    P: PageSource,
    S: JobStore,
{
    ensure!(!every.is_zero(), "schedule interval must be non-zero");

    let mut ticker = interval(every);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        ticker.tick().await;
        info!("Scheduled run starting");

        match run_with_retries(service, default_days, retries, retry_delay).await {
            Ok(summary) => info!(
                loaded = summary.loaded,
                rejected = summary.rejected,
                "Scheduled run finished"
            ),
            Err(e) => {
                let reason = format!("{:#}", e);
                error!(error = %reason, "Scheduled run failed");
            }
        }
    }
}
