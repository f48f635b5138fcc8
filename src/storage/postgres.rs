use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime};
use sqlx::{postgres::PgPoolOptions, PgPool, Postgres, Transaction};
use tracing::{debug, info};

use crate::crawler::models::JobRecord;
use crate::storage::JobStore;

const CREATE_TABLE: &str = r#"
    CREATE TABLE IF NOT EXISTS job_data (
        job_id VARCHAR PRIMARY KEY,
        job_title VARCHAR,
        company VARCHAR,
        company_logo_url VARCHAR,
        location VARCHAR,
        area VARCHAR,
        suburb VARCHAR,
        work_type VARCHAR,
        work_arrangement VARCHAR,
        salary VARCHAR,
        listing_date TIMESTAMP,
        teaser TEXT,
        classification VARCHAR,
        sub_classification VARCHAR,
        is_premium BOOLEAN,
        is_standout BOOLEAN,
        job_location_label VARCHAR,
        job_advertiser_id VARCHAR,
        request_token VARCHAR
    )
"#;

const UPSERT_JOB: &str = r#"
    INSERT INTO job_data (
        job_id,
        job_title,
        company,
        company_logo_url,
        location,
        area,
        suburb,
        work_type,
        work_arrangement,
        salary,
        listing_date,
        teaser,
        classification,
        sub_classification,
        is_premium,
        is_standout,
        job_location_label,
        job_advertiser_id,
        request_token
    )
    VALUES (
        $1,$2,$3,$4,$5,$6,$7,$8,$9,$10,
        $11,$12,$13,$14,$15,$16,$17,$18,$19
    )
    ON CONFLICT (job_id) DO UPDATE SET
        job_title = EXCLUDED.job_title,
        company = EXCLUDED.company,
        company_logo_url = EXCLUDED.company_logo_url,
        location = EXCLUDED.location,
        area = EXCLUDED.area,
        suburb = EXCLUDED.suburb,
        work_type = EXCLUDED.work_type,
        work_arrangement = EXCLUDED.work_arrangement,
        salary = EXCLUDED.salary,
        listing_date = EXCLUDED.listing_date,
        teaser = EXCLUDED.teaser,
        classification = EXCLUDED.classification,
        sub_classification = EXCLUDED.sub_classification,
        is_premium = EXCLUDED.is_premium,
        is_standout = EXCLUDED.is_standout,
        job_location_label = EXCLUDED.job_location_label,
        job_advertiser_id = EXCLUDED.job_advertiser_id,
        request_token = EXCLUDED.request_token
"#;

pub struct Storage {
    pool: PgPool,
}

impl Storage {
    pub async fn new(database_url: &str, max_connections: u32) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await
            .context("Failed to connect to Postgres")?;

        Ok(Self { pool })
    }

    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn upsert_job_tx(tx: &mut Transaction<'_, Postgres>, job: &JobRecord) -> Result<()> {
        sqlx::query(UPSERT_JOB)
            .bind(&job.job_id)
            .bind(&job.job_title)
            .bind(&job.company)
            .bind(&job.company_logo_url)
            .bind(&job.location)
            .bind(&job.area)
            .bind(&job.suburb)
            .bind(&job.work_type)
            .bind(&job.work_arrangement)
            .bind(&job.salary)
            .bind(job.listing_date)
            .bind(&job.teaser)
            .bind(&job.classification)
            .bind(&job.sub_classification)
            .bind(job.is_premium)
            .bind(job.is_standout)
            .bind(&job.job_location_label)
            .bind(&job.job_advertiser_id)
            .bind(&job.request_token)
            .execute(&mut **tx)
            .await
            .with_context(|| format!("Failed to upsert job {}", job.job_id))?;

        Ok(())
    }
}

#[async_trait]
impl JobStore for Storage {
    async fn ensure_schema(&self) -> Result<()> {
        sqlx::query(CREATE_TABLE)
            .execute(&self.pool)
            .await
            .context("Failed to create job_data table")?;

        info!("Ensured job_data table exists");
        Ok(())
    }

    async fn upsert_jobs(&self, jobs: &[JobRecord]) -> Result<usize> {
        let mut tx = self.pool.begin().await?;
        let mut saved = 0usize;

        for job in jobs {
            Self::upsert_job_tx(&mut tx, job).await?;
            saved += 1;
        }

        tx.commit().await.context("Failed to commit job batch")?;
        debug!(saved, "Committed job batch");
        Ok(saved)
    }

    async fn last_listing_date(&self) -> Result<Option<NaiveDate>> {
        let max = sqlx::query_scalar::<_, Option<NaiveDateTime>>("SELECT MAX(listing_date) FROM job_data")
            .fetch_one(&self.pool)
            .await
            .context("Failed to read last listing_date")?;

        Ok(max.map(|ts| ts.date()))
    }
}
