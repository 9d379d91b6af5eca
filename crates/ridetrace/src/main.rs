mod settings;
mod summary;

use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use ridetrace_core::extract::ExtractedDataset;
use ridetrace_core::fetch::{build_http_client, RemoteSource};
use ridetrace_core::locate::DEFAULT_BATCH_PATTERN;
use ridetrace_core::pipeline::{prepare_dataset, render_dataset, BatchContext};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::settings::Settings;

const LOG_FORMAT_VAR: &str = "RIDETRACE_LOG_FORMAT";

#[derive(Parser, Debug)]
#[command(author, version, about = "Fetch ride datasets and chart altitude over time", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Render charts for batch files already on disk
    Render(RenderArgs),
    /// Download and extract a dataset archive
    Fetch(FetchArgs),
    /// Fetch a dataset, then render every batch file in it
    Run(RunArgs),
}

#[derive(Args, Debug)]
struct RenderArgs {
    /// Root directory searched for batch files
    #[arg(short, long)]
    input: PathBuf,
    #[command(flatten)]
    batch: BatchArgs,
}

#[derive(Args, Debug)]
struct BatchArgs {
    /// Glob pattern, relative to the dataset root
    #[arg(long, default_value = DEFAULT_BATCH_PATTERN)]
    pattern: String,
    /// Directory charts are written to (created if missing)
    #[arg(short, long, default_value = ".")]
    output_dir: PathBuf,
    /// Maximum files processed concurrently
    #[arg(long)]
    workers: Option<usize>,
    /// Process only the first N matches, in sorted order
    #[arg(long)]
    limit: Option<usize>,
    /// Also write the run report as JSON to this path
    #[arg(long)]
    report: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct FetchArgs {
    /// Dataset identifier, e.g. an athlete UUID
    #[arg(long)]
    identifier: String,
    /// Overrides RIDETRACE_BASE_URL
    #[arg(long)]
    base_url: Option<String>,
    /// Extraction directory; defaults to ./<identifier>
    #[arg(long)]
    dest: Option<PathBuf>,
    /// Where the archive is staged while downloading; defaults to the system temp dir
    #[arg(long)]
    staging_dir: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct RunArgs {
    #[command(flatten)]
    fetch: FetchArgs,
    #[command(flatten)]
    batch: BatchArgs,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    let cli = Cli::parse();
    let settings = Settings::from_env()?;

    match cli.command {
        Command::Render(args) => handle_render(&settings, &args.input, args.batch).await,
        Command::Fetch(args) => handle_fetch(&settings, args).await.map(|_| ()),
        Command::Run(args) => {
            let dataset = handle_fetch(&settings, args.fetch).await?;
            handle_render(&settings, &dataset.root, args.batch).await
        }
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let json = env::var(LOG_FORMAT_VAR)
        .map(|value| value.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

async fn handle_fetch(settings: &Settings, args: FetchArgs) -> Result<ExtractedDataset> {
    let settings = settings.clone().with_base_url(args.base_url);
    let remote = RemoteSource::new(settings.base_url.clone());
    let client = build_http_client(settings.http_timeout)?;

    let staging_dir = args.staging_dir.unwrap_or_else(env::temp_dir);
    fs::create_dir_all(&staging_dir).with_context(|| {
        format!("failed to create staging directory {}", staging_dir.display())
    })?;
    let destination = args
        .dest
        .unwrap_or_else(|| PathBuf::from(&args.identifier));

    info!(
        identifier = %args.identifier,
        url = %remote.archive_url(&args.identifier),
        destination = %destination.display(),
        "fetching dataset"
    );

    let dataset = prepare_dataset(
        &client,
        &remote,
        &args.identifier,
        &staging_dir,
        &destination,
    )
    .await
    .with_context(|| format!("failed to prepare dataset {}", args.identifier))?;

    println!(
        "Extracted {} entries into {}",
        dataset.entries.len(),
        dataset.root.display()
    );
    Ok(dataset)
}

async fn handle_render(settings: &Settings, input: &Path, args: BatchArgs) -> Result<()> {
    if !input.is_dir() {
        bail!("input root {} is not a directory", input.display());
    }
    fs::create_dir_all(&args.output_dir).with_context(|| {
        format!("failed to create output directory {}", args.output_dir.display())
    })?;

    let settings = settings.clone().with_workers(args.workers);
    let ctx = Arc::new(BatchContext::new(input, &args.output_dir));

    let report = render_dataset(ctx, &args.pattern, settings.workers, args.limit)
        .await
        .with_context(|| format!("failed to process batch files under {}", input.display()))?;

    if report.total() == 0 {
        warn!(pattern = %args.pattern, root = %input.display(), "no batch files matched");
    } else {
        println!("{}", summary::render_table(&report));
    }
    println!(
        "{} rendered, {} failed, {} total",
        report.rendered(),
        report.failed(),
        report.total()
    );

    if let Some(path) = &args.report {
        summary::write_json(&report, path)?;
        info!(path = %path.display(), "wrote run report");
    }

    Ok(())
}
