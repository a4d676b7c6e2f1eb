use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use autoapply_client::{ListingExtractor, ReqwestListingFetcher, ReqwestSubmitter, build_client};
use autoapply_core::apply::{ApplyService, TracingRunReporter};
use autoapply_core::config::SessionConfig;
use autoapply_core::credentials::extract_cookie;
use autoapply_core::models::RunSummary;
use autoapply_db::{Database, LedgerConfig, LedgerRepository};

#[derive(Parser)]
#[command(name = "autoapply", version, about = "Automated job-application pipeline")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch the listing and apply to every posting not yet in the ledger
    Run {
        /// Submit applications but leave the ledger untouched
        #[arg(long, default_value_t = false)]
        dry_run: bool,

        /// Print the run summary as JSON
        #[arg(long, default_value_t = false)]
        json: bool,
    },

    /// Show the most recent ledger log entries
    Logs {
        /// Number of entries to show
        #[arg(short, long, default_value_t = 20)]
        limit: usize,

        /// Print entries as JSON
        #[arg(long, default_value_t = false)]
        json: bool,
    },

    /// Show how many postings have been applied to
    Status {
        /// Number of recent applications to list
        #[arg(short, long, default_value_t = 10)]
        limit: usize,
    },

    /// Print the effective configuration (cookies redacted)
    Config,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    // Setup tracing
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("autoapply=info".parse()?))
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = SessionConfig::from_env().context("Invalid configuration")?;

    match cli.command {
        Commands::Run { dry_run, json } => {
            let config = SessionConfig {
                dry_run: config.dry_run || dry_run,
                ..config
            };
            cmd_run(Arc::new(config), json).await?;
        }
        Commands::Logs { limit, json } => {
            let repo = open_ledger(&config).await?;
            cmd_logs(&repo, limit, json).await?;
        }
        Commands::Status { limit } => {
            let repo = open_ledger(&config).await?;
            cmd_status(&config, &repo, limit).await?;
        }
        Commands::Config => cmd_config(&config)?,
    }

    Ok(())
}

/// Open (and create if needed) the SQLite ledger at `LEDGER_PATH`.
async fn open_ledger(config: &SessionConfig) -> Result<LedgerRepository> {
    let db = Database::open(&LedgerConfig::from_session(config))
        .await
        .with_context(|| format!("Failed to open ledger at {}", config.ledger_path.display()))?;
    tracing::debug!(path = %config.ledger_path.display(), "Ledger ready");
    Ok(db.ledger())
}

async fn cmd_run(config: Arc<SessionConfig>, json: bool) -> Result<()> {
    let ledger = open_ledger(&config).await?;
    let client = build_client(&config).context("Failed to create HTTP client")?;

    let service = ApplyService::new(
        ReqwestListingFetcher::with_client(client.clone(), config.clone()),
        ListingExtractor::new(),
        ReqwestSubmitter::with_client(client, config.clone()),
        ledger,
        &config,
    );

    let summary = service.run(&TracingRunReporter).await;

    if json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        print_summary(&summary);
    }

    Ok(())
}

fn print_summary(summary: &RunSummary) {
    let elapsed = summary.end_time - summary.start_time;
    println!(
        "Run finished in {:.1}s{}",
        elapsed.num_milliseconds() as f64 / 1000.0,
        if summary.dry_run { " (dry run)" } else { "" }
    );
    println!("  found:       {}", summary.total_found);
    println!("  new:         {}", summary.new_postings);
    println!("  applied:     {}", summary.applied);
    println!("  errors:      {}", summary.errors);
    if summary.unconfirmed > 0 {
        println!("  unconfirmed: {}", summary.unconfirmed);
    }
}

async fn cmd_logs(repo: &LedgerRepository, limit: usize, json: bool) -> Result<()> {
    let logs = repo
        .fetch_recent_logs(limit)
        .await
        .context("Failed to read ledger logs")?;

    if json {
        println!("{}", serde_json::to_string_pretty(&logs)?);
        return Ok(());
    }

    if logs.is_empty() {
        println!("No log entries yet");
        return Ok(());
    }

    for entry in &logs {
        println!(
            "  {} {:<10} {:<12} {}",
            entry.timestamp.format("%Y-%m-%d %H:%M:%S UTC"),
            entry.action.as_str(),
            entry.posting_id.as_str(),
            entry.message,
        );
    }

    println!("\nShowing {} most recent entries", logs.len());

    Ok(())
}

async fn cmd_status(config: &SessionConfig, repo: &LedgerRepository, limit: usize) -> Result<()> {
    repo.health_check().await.context("Ledger is not reachable")?;
    let count = repo
        .count_applied()
        .await
        .context("Failed to count applied postings")?;
    let recent = repo
        .fetch_applied(limit)
        .await
        .context("Failed to read applied postings")?;

    println!("Ledger: {} (reachable)", config.ledger_path.display());
    println!("Applied postings: {count}");

    if !recent.is_empty() {
        println!("\nMost recent:");
        for record in &recent {
            println!(
                "  {} {}",
                record.applied_at.format("%Y-%m-%d %H:%M:%S UTC"),
                config.posting_url(record.posting_id.as_str()),
            );
        }
    }

    Ok(())
}

fn cmd_config(config: &SessionConfig) -> Result<()> {
    let mut view = serde_json::to_value(config)?;
    if let Some(map) = view.as_object_mut() {
        let cookies = if config.cookies.is_empty() {
            "<unset>".to_string()
        } else {
            format!("<redacted, {} bytes>", config.cookies.len())
        };
        map.insert("cookies".into(), cookies.into());
        map.insert(
            "csrf_token_present".into(),
            extract_cookie(Some(&config.cookies), &config.csrf_cookie_name)
                .is_some()
                .into(),
        );
    }
    println!("{}", serde_json::to_string_pretty(&view)?);
    Ok(())
}
