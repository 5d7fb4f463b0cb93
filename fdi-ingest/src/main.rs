//! fdi-ingest - Financial disclosure ingest
//!
//! Downloads the yearly disclosure archive, writes the normalized records
//! (newest filing first) and fetches one PDF per record. Failed fetches are
//! listed in `failed_files.json` and can be re-attempted with `retry`.

use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::Datelike;
use clap::{Parser, Subcommand};
use fdi_common::config::TomlConfig;
use fdi_common::events::EventBus;
use fdi_ingest::{
    ArchiveFetcher, ArchiveHandle, ArchiveNormalizer, DocumentRetriever, FailureManifest,
    IngestSettings, Pipeline, RecordSet, RetrievalReport, SettingsOverrides,
};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Command-line arguments for fdi-ingest
#[derive(Parser, Debug)]
#[command(name = "fdi-ingest")]
#[command(about = "Financial disclosure archive ingest and document download")]
#[command(version)]
struct Args {
    /// TOML configuration file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Root folder for every persisted artifact
    #[arg(short, long, global = true)]
    output_dir: Option<PathBuf>,

    /// Archive request timeout (seconds)
    #[arg(long, global = true, env = "FDI_ARCHIVE_TIMEOUT")]
    archive_timeout: Option<u64>,

    /// Per-document request timeout (seconds)
    #[arg(long, global = true, env = "FDI_DOCUMENT_TIMEOUT")]
    document_timeout: Option<u64>,

    /// Concurrent document downloads (1 = sequential)
    #[arg(short, long, global = true, env = "FDI_WORKERS")]
    workers: Option<usize>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Fetch, normalize and retrieve documents (default)
    Run {
        /// Archive year (defaults to the current year)
        #[arg(short, long)]
        year: Option<i32>,
    },
    /// Download the archive only
    Fetch {
        #[arg(short, long)]
        year: Option<i32>,
    },
    /// Normalize an archive already on disk
    Normalize {
        /// Archive file
        #[arg(long)]
        archive: PathBuf,
        /// Where to write the normalized JSON (defaults to the output folder)
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Retrieve documents for a normalized record file
    Retrieve {
        /// Normalized JSON (defaults to the output folder)
        #[arg(long)]
        records: Option<PathBuf>,
        #[arg(short, long)]
        year: Option<i32>,
    },
    /// Re-attempt the documents listed in a failure manifest
    Retry {
        /// Failure manifest (defaults to the output folder)
        #[arg(long)]
        manifest: Option<PathBuf>,
        #[arg(short, long)]
        year: Option<i32>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let toml_config = TomlConfig::load_or_default(args.config.as_deref());

    let settings = IngestSettings::resolve(
        &toml_config,
        SettingsOverrides {
            output_dir: args.output_dir.clone(),
            archive_timeout_secs: args.archive_timeout,
            document_timeout_secs: args.document_timeout,
            workers: args.workers,
        },
    );

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| settings.log_level.as_str().into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!(
        "Starting fdi-ingest v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );
    settings.log_summary();

    let layout = settings.layout();
    layout
        .ensure_directory_exists()
        .context("Failed to initialize output folder")?;

    match args.command.unwrap_or(Command::Run { year: None }) {
        Command::Run { year } => {
            let year = year.unwrap_or_else(current_year);
            let pipeline = Pipeline::new(&settings, EventBus::new(256))?;
            let report = pipeline
                .run(year)
                .await
                .with_context(|| format!("Ingest run for {} failed", year))?;

            println!("Archive: {}", report.archive.path.display());
            println!(
                "Normalized records: {} ({})",
                report.record_count,
                report.records_path.display()
            );
            print_summary(&report.retrieval);
        }
        Command::Fetch { year } => {
            let year = year.unwrap_or_else(current_year);
            let fetcher = ArchiveFetcher::new(
                settings.archive_url_template.clone(),
                settings.archive_timeout,
                layout.clone(),
            )?;
            let archive = fetcher.fetch(year).await?;
            println!(
                "Downloaded {} ({} bytes)",
                archive.path.display(),
                archive.size_bytes
            );
        }
        Command::Normalize { archive, out } => {
            let handle = ArchiveHandle::from_path(&archive)
                .with_context(|| format!("Cannot open archive {}", archive.display()))?;
            let sink = out.unwrap_or_else(|| layout.records_path());
            let normalizer = ArchiveNormalizer::new(settings.record_tag.clone());

            let records = tokio::task::spawn_blocking({
                let sink = sink.clone();
                move || normalizer.normalize(&handle, Some(&sink))
            })
            .await??;

            println!("Normalized {} records into {}", records.len(), sink.display());
        }
        Command::Retrieve { records, year } => {
            let year = year.unwrap_or_else(current_year);
            let path = records.unwrap_or_else(|| layout.records_path());
            let records = RecordSet::load_json(&path)
                .with_context(|| format!("Cannot read records from {}", path.display()))?;

            let report = build_retriever(&settings)?.retrieve(&records, year).await?;
            print_summary(&report);
        }
        Command::Retry { manifest, year } => {
            let year = year.unwrap_or_else(current_year);
            let path = manifest.unwrap_or_else(|| layout.failure_manifest_path());
            let manifest = FailureManifest::load(&path)
                .with_context(|| format!("Cannot read failure manifest {}", path.display()))?;

            let report = build_retriever(&settings)?.retry(manifest, year).await?;
            print_summary(&report);
        }
    }

    Ok(())
}

fn current_year() -> i32 {
    chrono::Local::now().year()
}

fn build_retriever(settings: &IngestSettings) -> Result<DocumentRetriever> {
    Ok(DocumentRetriever::new(
        settings.document_url_template.clone(),
        settings.document_timeout,
        settings.layout(),
        settings.retrieval_strategy(),
    )?)
}

fn print_summary(report: &RetrievalReport) {
    println!();
    println!("Download Summary:");
    println!("Total Records: {}", report.considered);
    println!("Skipped (no DocID): {}", report.skipped);
    println!("Successful Downloads: {}", report.retrieved.len());
    println!("Failed Downloads: {}", report.failed.len());
    if let Some(path) = &report.manifest_path {
        println!("Failed downloads logged to {}", path.display());
    }
}
