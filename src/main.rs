use anyhow::Context;
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use job_harvest::config::Config;
use job_harvest::crawler::fetcher::{self, SearchApi};
use job_harvest::crawler::service::HarvestService;
use job_harvest::crawler::DateRange;
use job_harvest::scheduler;
use job_harvest::storage::{memory::MemoryStore, postgres::Storage, JobStore};

#[derive(Parser)]
#[command(name = "job-harvest")]
#[command(about = "Harvest job listings from the search API into Postgres")]
#[command(version)]
struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the pipeline once
    Run {
        /// Harvest listings since this date (YYYY-MM-DD) instead of the newest stored one
        #[arg(long, conflicts_with = "days")]
        since: Option<NaiveDate>,
        /// Fixed window in days
        #[arg(long)]
        days: Option<i64>,
        /// Load into an in-memory store instead of Postgres
        #[arg(long)]
        dry_run: bool,
    },

    /// Run the pipeline on the configured interval, forever
    Schedule,

    /// Print the newest stored listing date
    LastDate,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let default_filter = if cli.verbose {
        "job_harvest=debug,sqlx=warn"
    } else {
        "job_harvest=info,sqlx=warn"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cfg = Config::from_env().context("Failed to load configuration")?;

    match cli.command {
        Commands::Run {
            since,
            days,
            dry_run: true,
        } => {
            let store = MemoryStore::new();
            run(&cfg, store, since, days).await
        }
        Commands::Run { since, days, .. } => {
            let store = connect(&cfg).await?;
            run(&cfg, store, since, days).await
        }
        Commands::Schedule => {
            let store = connect(&cfg).await?;
            let service = build_service(&cfg, store)?;
            info!(every_secs = cfg.schedule_interval.as_secs(), "Starting schedule");
            scheduler::run_every(
                &service,
                cfg.schedule_interval,
                cfg.default_daterange_days,
                cfg.run_retries,
                cfg.retry_delay,
            )
            .await
        }
        Commands::LastDate => {
            let store = connect(&cfg).await?;
            store.ensure_schema().await?;
            match store.last_listing_date().await? {
                Some(date) => println!("{}", date.format("%Y-%m-%d")),
                None => println!("none"),
            }
            Ok(())
        }
    }
}

async fn connect(cfg: &Config) -> anyhow::Result<Storage> {
    Storage::new(cfg.database_url()?, cfg.db_max_connections).await
}

fn build_service<S: JobStore>(cfg: &Config, store: S) -> anyhow::Result<HarvestService<SearchApi, S>> {
    let client = fetcher::build_client(cfg)?;
    let api = SearchApi::new(client, cfg.search.clone());
    Ok(HarvestService::new(api, store, cfg.max_pages))
}

async fn run<S: JobStore>(
    cfg: &Config,
    store: S,
    since: Option<NaiveDate>,
    days: Option<i64>,
) -> anyhow::Result<()> {
    let service = build_service(cfg, store)?;

    let summary = match days {
        Some(days) => service.run(DateRange::new(days)).await?,
        None => scheduler::run_once(&service, since, cfg.default_daterange_days).await?,
    };

    println!("\n==============================");
    println!("PAGES FETCHED:    {}", summary.pages);
    println!("LISTINGS SEEN:    {}", summary.candidates);
    println!("RECORDS REJECTED: {}", summary.rejected);
    println!("RECORDS LOADED:   {}", summary.loaded);
    println!("STOPPED BECAUSE:  {:?}", summary.stop);
    println!("==============================\n");

    Ok(())
}
