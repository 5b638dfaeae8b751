use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use quickref_indexer::Indexer;
use quickref_ingest::{
    append_to_json_store, extract_team_members, load_issues_csv, load_json_store, next_assignee,
    recommended_action, save_team_members,
};
use quickref_retrieval::RetrievalEngine;
use quickref_vector_store::{Embedder, HashingEmbedder, IssueRecord, VectorStore};
use std::path::PathBuf;
use std::sync::Arc;

mod config;

use config::AppConfig;

#[derive(Parser)]
#[command(name = "quickref")]
#[command(about = "Incremental similarity index over issue tickets", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to the TOML configuration file
    #[arg(short, long, global = true, default_value = "quickref.toml")]
    config: PathBuf,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Quiet mode: log only warnings/errors (stdout is reserved for JSON)
    #[arg(long, global = true)]
    quiet: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Load an issue CSV export into the normalized JSON store
    Ingest(IngestArgs),

    /// Index new/changed records from the JSON store into the vector store
    Index(IndexArgs),

    /// Find stored issues similar to a summary text
    Query(QueryArgs),

    /// Suggest the next assignee from the round-robin rotation
    #[command(name = "next-assignee")]
    NextAssignee(OutputArgs),

    /// Look up the recommended action recorded for an issue key
    Action(ActionArgs),
}

#[derive(Args)]
struct IngestArgs {
    /// CSV file to ingest (overrides the configured path)
    #[arg(long)]
    csv: Option<PathBuf>,

    /// Also tally team members and write team_members.{csv,json}
    #[arg(long)]
    team: bool,

    /// Output machine-readable JSON
    #[arg(long)]
    json: bool,
}

#[derive(Args)]
struct IndexArgs {
    /// Output machine-readable JSON
    #[arg(long)]
    json: bool,
}

#[derive(Args)]
struct QueryArgs {
    /// Summary text to search with
    #[arg(long)]
    summary: String,

    /// Issue key of the query itself, suppressed from the results
    #[arg(long)]
    key: Option<String>,

    /// Maximum number of references (overrides the configured top_k)
    #[arg(long)]
    top_k: Option<usize>,

    /// Minimum similarity score (overrides the configured threshold)
    #[arg(long)]
    threshold: Option<f32>,

    /// Output machine-readable JSON
    #[arg(long)]
    json: bool,
}

#[derive(Args)]
struct OutputArgs {
    /// Output machine-readable JSON
    #[arg(long)]
    json: bool,
}

#[derive(Args)]
struct ActionArgs {
    /// Issue key to look up
    #[arg(long)]
    key: String,

    /// Output machine-readable JSON
    #[arg(long)]
    json: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let mut cli = Cli::parse();

    // Keep stdout clean for JSON parsing.
    let json_output = match &cli.command {
        Commands::Ingest(args) => args.json,
        Commands::Index(args) => args.json,
        Commands::Query(args) => args.json,
        Commands::NextAssignee(args) => args.json,
        Commands::Action(args) => args.json,
    };
    if json_output {
        cli.quiet = true;
    }

    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"));
    if cli.quiet {
        builder.filter_level(log::LevelFilter::Warn);
    } else if cli.verbose {
        builder.filter_level(log::LevelFilter::Debug);
    }
    builder.target(env_logger::Target::Stderr).init();

    let app = AppConfig::load(&cli.config)?;

    match cli.command {
        Commands::Ingest(args) => run_ingest(args, app).await?,
        Commands::Index(args) => run_index(args, app).await?,
        Commands::Query(args) => run_query(args, app).await?,
        Commands::NextAssignee(args) => run_next_assignee(args, app).await?,
        Commands::Action(args) => run_action(args, app).await?,
    }

    Ok(())
}

fn embedder_for(app: &AppConfig) -> Arc<dyn Embedder> {
    Arc::new(HashingEmbedder::new(app.store.dimension))
}

async fn run_ingest(args: IngestArgs, app: AppConfig) -> Result<()> {
    let csv_path = args.csv.unwrap_or_else(|| app.ingest.issues_csv.clone());
    let load = load_issues_csv(&csv_path)?;
    let summary =
        append_to_json_store(&load.records, &app.ingest.json_store, &app.store.key_field).await?;

    let mut team_csv = None;
    if args.team || app.ingest.load_team_members {
        let members = extract_team_members(&load.records);
        team_csv = Some(save_team_members(&members, &app.ingest.team_dir)?);
    }

    if args.json {
        println!(
            "{}",
            serde_json::to_string_pretty(&serde_json::json!({
                "loaded": load.records.len(),
                "skipped_rows": load.skipped,
                "added": summary.added,
                "skipped_duplicates": summary.skipped_duplicates,
                "store_total": summary.total,
                "team_members_csv": team_csv,
            }))?
        );
    } else {
        println!(
            "Ingested {} rows ({} skipped): {} added, {} duplicates, store holds {}",
            load.records.len(),
            load.skipped,
            summary.added,
            summary.skipped_duplicates,
            summary.total
        );
        if let Some(path) = team_csv {
            println!("Team members written to {}", path.display());
        }
    }
    Ok(())
}

async fn run_index(args: IndexArgs, app: AppConfig) -> Result<()> {
    let records = load_json_store(&app.ingest.json_store).await?;
    let embedder = embedder_for(&app);
    let indexer = Indexer::new(VectorStore::open(app.store), embedder);
    let delta = indexer.apply(&records).await?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&delta)?);
    } else {
        println!(
            "Index {}: {} added, {} skipped, {} rows total",
            delta.outcome.as_str(),
            delta.added,
            delta.skipped,
            delta.index_size
        );
    }
    Ok(())
}

async fn run_query(args: QueryArgs, app: AppConfig) -> Result<()> {
    let top_k = args.top_k.unwrap_or(app.store.top_k);
    let threshold = args.threshold.unwrap_or(app.store.score_threshold);

    let mut record = IssueRecord::new();
    record.set("Summary", args.summary);
    if let Some(key) = args.key {
        record.set(&app.store.key_field, key);
    }

    let embedder = embedder_for(&app);
    let engine = RetrievalEngine::new(VectorStore::open(app.store), embedder);
    let results = engine.query(&[record], top_k, threshold).await?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&results)?);
        return Ok(());
    }

    for result in &results {
        if result.diagnostics.dimension_mismatch {
            println!("Embedding width does not match the stored index; no references.");
            continue;
        }
        if result.references.is_empty() {
            println!(
                "No references at or above {:.2} ({} rows considered, best score {:.4})",
                threshold,
                result.diagnostics.rows_considered,
                result.diagnostics.max_score.unwrap_or(0.0)
            );
            continue;
        }
        for reference in &result.references {
            println!(
                "{:.4}  {}  {}  {}",
                reference.score,
                reference.key,
                reference.owner.as_deref().unwrap_or("-"),
                reference.summary
            );
        }
    }
    Ok(())
}

async fn run_next_assignee(args: OutputArgs, app: AppConfig) -> Result<()> {
    let next = next_assignee(&app.ingest.rotation_csv, &app.ingest.json_store).await?;
    if args.json {
        println!(
            "{}",
            serde_json::to_string_pretty(&serde_json::json!({ "assignee": next }))?
        );
    } else {
        match next {
            Some(name) => println!("{name}"),
            None => println!("No assignees known yet."),
        }
    }
    Ok(())
}

async fn run_action(args: ActionArgs, app: AppConfig) -> Result<()> {
    let action = recommended_action(&args.key, &app.ingest.json_store).await?;
    if args.json {
        println!(
            "{}",
            serde_json::to_string_pretty(&serde_json::json!({
                "key": args.key,
                "action": action,
            }))?
        );
    } else {
        match action {
            Some(action) => println!("{action}"),
            None => println!("No recommended action recorded for {}.", args.key),
        }
    }
    Ok(())
}
