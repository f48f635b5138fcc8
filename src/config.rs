use std::env;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{anyhow, bail, Context};

/// Search API settings. Everything the fetcher needs besides the session.
#[derive(Debug, Clone)]
pub struct SearchConfig {
    pub base_url: String,
    pub site_key: String,
    pub locale: String,
    pub keywords: String,
    pub location: String,
    pub page_size: u32,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub search: SearchConfig,
    pub database_url: Option<String>,
    pub default_daterange_days: i64,
    pub max_pages: u32,
    pub request_timeout: Duration,
    pub db_max_connections: u32,
    pub schedule_interval: Duration,
    pub run_retries: u32,
    pub retry_delay: Duration,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &str| {
            lookup(key)
                .filter(|v| !v.trim().is_empty())
                .ok_or_else(|| anyhow!("missing required environment variable {}", key))
        };
        let text = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());

        Ok(Self {
            search: SearchConfig {
                base_url: required("JOB_API_BASE_URL")?,
                site_key: text("JOB_API_SITE_KEY", "AU-Main"),
                locale: text("JOB_API_LOCALE", "en-AU"),
                keywords: text("JOB_SEARCH_KEYWORDS", "Data Engineer"),
                location: text("JOB_SEARCH_WHERE", "All Sydney NSW"),
                page_size: parse_or(&lookup, "JOB_API_PAGE_SIZE", 22)?,
            },
            database_url: lookup("DATABASE_URL").filter(|v| !v.trim().is_empty()),
            default_daterange_days: parse_or(&lookup, "DEFAULT_DATERANGE_DAYS", 7)?,
            max_pages: parse_or(&lookup, "MAX_PAGES", 500)?,
            request_timeout: Duration::from_secs(parse_or(&lookup, "REQUEST_TIMEOUT_SECS", 30)?),
            db_max_connections: parse_or(&lookup, "DB_MAX_CONNECTIONS", 5)?,
            schedule_interval: schedule_interval(&lookup)?,
            run_retries: parse_or(&lookup, "RUN_RETRIES", 1)?,
            retry_delay: Duration::from_secs(parse_or(&lookup, "RETRY_DELAY_SECS", 300)?),
        })
    }

    pub fn database_url(&self) -> anyhow::Result<&str> {
        self.database_url
            .as_deref()
            .ok_or_else(|| anyhow!("DATABASE_URL is not set"))
    }
}

fn schedule_interval<F>(lookup: &F) -> anyhow::Result<Duration>
where
    F: Fn(&str) -> Option<String>,
{
    let hours: u64 = parse_or(lookup, "SCHEDULE_INTERVAL_HOURS", 24)?;
    if hours == 0 {
        bail!("SCHEDULE_INTERVAL_HOURS must be at least 1");
    }

    let secs = hours
        .checked_mul(3600)
        .with_context(|| format!("SCHEDULE_INTERVAL_HOURS {} is too large", hours))?;
    Ok(Duration::from_secs(secs))
}

fn parse_or<T, F>(lookup: &F, key: &str, default: T) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("invalid value {:?} for {}", raw, key)),
        None => Ok(default),
    }
}
