//! `MailSift` - email triage and structured analysis from the command line.

#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

mod cli;

use std::path::Path;
use std::process::ExitCode;

use anyhow::{Context, bail};
use clap::Parser;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use mailsift_core::pipeline::Orchestrator;
use mailsift_core::{AnalyzerConfig, Database, RunSummary, credentials};
use mailsift_llm::HttpClient;

use cli::{Cli, Commands};

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "mailsift=info,mailsift_core=info,mailsift_llm=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();
    let config_path = cli.config.unwrap_or_else(cli::default_config_path);
    let database_path = cli.database.unwrap_or_else(cli::default_database_path);

    match cli.command {
        Commands::Run { batch_size } => {
            let config = AnalyzerConfig::load(&config_path)
                .await
                .with_context(|| format!("failed to load config from {}", config_path.display()))?;
            let summary = run_batch(&config, &database_path, batch_size).await?;
            print_summary(&summary);
            if summary.is_aborted() {
                return Ok(ExitCode::FAILURE);
            }
        }
        Commands::Stats => {
            let db = open_database(&database_path).await?;
            let stats = db.analyses().stats().await?;
            let pending = db.emails().count_unanalyzed().await?;

            println!("Analyzed emails:  {}", stats.total);
            println!("Awaiting analysis: {pending}");
            println!("Action needed:    {}", stats.action_needed);
            println!("High priority:    {}", stats.high_priority);
            println!(
                "Sentiment:        {} positive, {} neutral, {} negative",
                stats.positive, stats.neutral, stats.negative
            );
            match stats.average_confidence {
                Some(avg) => println!("Mean confidence:  {avg:.2}"),
                None => println!("Mean confidence:  n/a"),
            }
        }
        Commands::Show { email_id } => {
            let db = open_database(&database_path).await?;
            let analyses = db.analyses().list_for_email(&email_id).await?;
            if analyses.is_empty() {
                println!("No analysis stored for {email_id}.");
                return Ok(ExitCode::FAILURE);
            }
            println!("{}", serde_json::to_string_pretty(&analyses)?);
        }
        Commands::SetKey { key } => {
            credentials::store_api_key(&key).context("failed to store API key")?;
            println!("API key stored in the system keyring.");
        }
        Commands::ClearKey => {
            credentials::delete_api_key().context("failed to remove API key")?;
            println!("API key removed from the system keyring.");
        }
    }

    Ok(ExitCode::SUCCESS)
}

/// Run one batch with a client built from config and stored credentials.
async fn run_batch(
    config: &AnalyzerConfig,
    database_path: &Path,
    batch_size: Option<usize>,
) -> anyhow::Result<RunSummary> {
    let Some(api_key) = credentials::resolve_api_key()? else {
        bail!(
            "no API key found: set {} or run `mailsift set-key <KEY>`",
            credentials::API_KEY_ENV
        );
    };

    let endpoint = config.inference.endpoint()?;
    info!("Using inference endpoint {}", endpoint.base_url);
    let client = HttpClient::with_timeout(endpoint, api_key, config.inference.timeout)?;

    let db = open_database(database_path).await?;
    let emails = db.emails();
    let analyses = db.analyses();

    let batch_size = batch_size.unwrap_or(config.batch.batch_size);
    let summary = Orchestrator::new(&client, &emails, &analyses, config)
        .run(batch_size)
        .await?;
    Ok(summary)
}

/// Open the database, creating its directory if needed.
async fn open_database(path: &Path) -> anyhow::Result<Database> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    let path_str = path.to_string_lossy();
    Database::open(&path_str)
        .await
        .with_context(|| format!("failed to open database at {path_str}"))
}

fn print_summary(summary: &RunSummary) {
    println!(
        "attempted={} processed={} skipped={} failed={} pauses={}",
        summary.attempted, summary.processed, summary.skipped, summary.failed, summary.pauses
    );
    if let Some(reason) = &summary.aborted {
        println!(
            "Aborted at {} during {}: {}",
            reason.email_id, reason.stage, reason.message
        );
    }
}
