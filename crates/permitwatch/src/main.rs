use std::path::PathBuf;

use anyhow::Result;
use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use permitwatch_core::config::PipelineConfig;
use permitwatch_core::pipeline;
use permitwatch_core::source::SocrataSource;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(author, version, about = "Housing permit unit-count pipeline", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Fetch the permit dataset and publish the JSON summary artifacts
    Run(RunArgs),
}

#[derive(Args, Debug, Default)]
struct RunArgs {
    /// Directory the artifacts are written into
    #[arg(long, default_value = "public_data")]
    output_dir: PathBuf,
    /// Count completions on or after this date (Pacific time)
    #[arg(long)]
    since: Option<NaiveDate>,
    /// Rows requested per page
    #[arg(long)]
    page_size: Option<usize>,
    /// Skip writing the dated raw snapshot
    #[arg(long)]
    no_snapshot: bool,
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    match cli.command {
        Command::Run(args) => run(args),
    }
}

fn run(args: RunArgs) -> Result<()> {
    let mut config = PipelineConfig::default();
    if let Ok(url) = std::env::var("SF_API_URL") {
        config.api_url = url;
    }
    config.app_token = std::env::var("SOCRATA_APP_TOKEN").ok();
    config.output_dir = args.output_dir;
    if let Some(since) = args.since {
        config.since_date = since;
    }
    if let Some(page_size) = args.page_size {
        config.page_size = page_size;
    }
    config.write_snapshot = !args.no_snapshot;

    let source = SocrataSource::new(&config);
    let summary = pipeline::run(&config, &source)?;
    info!(
        "run complete: {} units across {} sites ({} rows fetched)",
        summary.total_units, summary.representatives, summary.raw_rows
    );
    Ok(())
}
