use async_trait::async_trait;
use reqwest::header::COOKIE;
use reqwest::Client;
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, error};

use crate::config::{Config, SearchConfig};
use crate::crawler::models::RawPage;
use crate::crawler::session::{CookieJar, SessionState};
use crate::crawler::DateRange;

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("unexpected status {status} for page {page}")]
    Status { page: u32, status: u16 },

    #[error("could not decode page {page}: {source}")]
    Decode {
        page: u32,
        #[source]
        source: serde_json::Error,
    },
}

/// Result of asking for one page.
#[derive(Debug)]
pub enum FetchOutcome {
    Page { page: RawPage, cookies: CookieJar },
    /// The server answered but had nothing left to give.
    Exhausted,
    TransportFailure(FetchError),
}

#[async_trait]
pub trait PageSource: Send + Sync {
    async fn fetch_page(
        &self,
        page: u32,
        session: Option<&SessionState>,
        window: DateRange,
    ) -> FetchOutcome;
}

pub fn build_client(cfg: &Config) -> anyhow::Result<Client> {
    let client = Client::builder()
        .user_agent("job-harvest/0.1")
        .timeout(cfg.request_timeout)
        .build()?;
    Ok(client)
}

pub struct SearchApi {
    client: Client,
    search: SearchConfig,
}

impl SearchApi {
    pub fn new(client: Client, search: SearchConfig) -> Self {
        Self { client, search }
    }

    async fn request(
        &self,
        page: u32,
        session: Option<&SessionState>,
        window: DateRange,
    ) -> Result<Option<(RawPage, CookieJar)>, FetchError> {
        let mut req = self
            .client
            .get(&self.search.base_url)
            .query(&build_query(&self.search, page, session, window));

        if let Some(header) = session.and_then(SessionState::cookie_header) {
            req = req.header(COOKIE, header);
        }

        let res = req.send().await?;
        let status = res.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                page,
                status: status.as_u16(),
            });
        }

        let cookies = collect_cookies(&res);
        let body = res.bytes().await?;

        match decode_page(page, &body)? {
            Some(raw) => Ok(Some((raw, cookies))),
            None => Ok(None),
        }
    }
}

#[async_trait]
impl PageSource for SearchApi {
    async fn fetch_page(
        &self,
        page: u32,
        session: Option<&SessionState>,
        window: DateRange,
    ) -> FetchOutcome {
        debug!(page, days = window.days(), "Fetching search page");

        match self.request(page, session, window).await {
            Ok(Some((page, cookies))) => FetchOutcome::Page { page, cookies },
            Ok(None) => FetchOutcome::Exhausted,
            Err(e) => {
                error!(page, error = %e, "Failed to retrieve search page");
                FetchOutcome::TransportFailure(e)
            }
        }
    }
}

/// Query parameters for one page. Session-only parameters are left out on
/// the very first request.
pub fn build_query(
    search: &SearchConfig,
    page: u32,
    session: Option<&SessionState>,
    window: DateRange,
) -> Vec<(&'static str, String)> {
    let mut params = vec![("siteKey", search.site_key.clone())];

    if let Some(s) = session {
        params.push(("userqueryid", s.user_query_id.clone()));
        params.push(("userid", s.visitor_id.clone()));
        params.push(("usersessionid", s.session_id.clone()));
        params.push(("eventCaptureSessionId", s.event_session_id.clone()));
    }

    params.extend([
        ("where", search.location.clone()),
        ("page", page.to_string()),
        ("seekSelectAllPages", "true".to_string()),
        ("keywords", search.keywords.clone()),
        ("daterange", window.days().to_string()),
        (
            "hadPremiumListings",
            session.map_or(true, |s| s.had_premium_listings).to_string(),
        ),
        (
            "pageSize",
            session
                .and_then(|s| s.page_size)
                .unwrap_or(search.page_size)
                .to_string(),
        ),
    ]);

    if let Some(s) = session {
        params.push(("include", s.include.clone()));
    }

    params.push(("locale", search.locale.clone()));

    if let Some(s) = session {
        params.push(("solId", s.sol_id.clone()));
    }

    params
}

/// Empty bodies, `null` and `{}` all mean there is nothing more to read.
fn decode_page(page: u32, body: &[u8]) -> Result<Option<RawPage>, FetchError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(None);
    }

    let value: Value =
        serde_json::from_slice(body).map_err(|source| FetchError::Decode { page, source })?;

    match &value {
        Value::Null => return Ok(None),
        Value::Object(map) if map.is_empty() => return Ok(None),
        _ => {}
    }

    serde_json::from_value(value)
        .map(Some)
        .map_err(|source| FetchError::Decode { page, source })
}

/// Response cookies, later duplicates replacing earlier ones.
fn collect_cookies(res: &reqwest::Response) -> CookieJar {
    let mut jar: CookieJar = Vec::new();
    for cookie in res.cookies() {
        let name = cookie.name().to_string();
        let value = cookie.value().to_string();
        match jar.iter_mut().find(|(k, _)| *k == name) {
            Some(slot) => slot.1 = value,
            None => jar.push((name, value)),
        }
    }
    jar
}
