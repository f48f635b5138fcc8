use chrono::NaiveDate;
use tracing::{debug, info, warn};

use crate::crawler::fetcher::{FetchOutcome, PageSource};
use crate::crawler::models::RawPage;
use crate::crawler::session::SessionState;

pub mod fetcher;
pub mod models;
pub mod parser;
pub mod service;
pub mod session;
pub mod validate;

/// Number of days back from today the search should cover. Always at least one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange(u32);

impl DateRange {
    pub fn new(days: i64) -> Self {
        Self(days.clamp(1, i64::from(u32::MAX)) as u32)
    }

    /// Window reaching back to `last`, or `default_days` when nothing is stored yet.
    pub fn since(last: Option<NaiveDate>, today: NaiveDate, default_days: i64) -> Self {
        match last {
            Some(date) => Self::new(today.signed_duration_since(date).num_days()),
            None => Self::new(default_days),
        }
    }

    pub fn days(self) -> u32 {
        self.0
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StopReason {
    /// The reported page count was reached.
    LastPage,
    /// `max_pages` was reached before the reported page count.
    PageCap,
    /// The server returned no payload.
    Exhausted,
    /// A request failed; pages before it were kept.
    TransportFailure(String),
}

#[derive(Debug)]
pub struct Extraction {
    pub pages: Vec<RawPage>,
    pub stop: StopReason,
}

/// Walks the result pages from page 1, threading the session from each
/// response into the next request.
pub async fn crawl_pages<S>(source: &S, window: DateRange, max_pages: u32) -> Extraction
where
    S: PageSource + ?Sized,
{
    let mut pages = Vec::new();
    let mut session: Option<SessionState> = None;
    let mut page_number = 1u32;

    info!(days = window.days(), "Starting paginated extraction");

    let stop = loop {
        let (page, cookies) = match source.fetch_page(page_number, session.as_ref(), window).await {
            FetchOutcome::Page { page, cookies } => (page, cookies),
            FetchOutcome::Exhausted => {
                debug!(page = page_number, "No payload returned, stopping");
                break StopReason::Exhausted;
            }
            FetchOutcome::TransportFailure(e) => {
                warn!(page = page_number, error = %e, "Fetch failed, continuing with pages already collected");
                break StopReason::TransportFailure(e.to_string());
            }
        };

        let total_pages = page.total_pages.unwrap_or(1);
        debug!(
            page = page_number,
            total_pages,
            listings = page.listings().len(),
            new_cookies = cookies.len(),
            "Fetched page"
        );

        session = SessionState::advance(session, &page, cookies);
        pages.push(page);

        if page_number >= total_pages {
            break StopReason::LastPage;
        }
        if page_number >= max_pages {
            warn!(max_pages, total_pages, "Page cap reached before the last reported page");
            break StopReason::PageCap;
        }

        page_number += 1;
    };

    info!(pages = pages.len(), stop = ?stop, "Extraction finished");
    Extraction { pages, stop }
}
