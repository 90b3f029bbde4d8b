use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::Utc;
use clap::{Parser, Subcommand, ValueEnum};
use propx_adapters::map_record;
use propx_core::{DataSource, RawRecord, SchemaVersion};
use propx_search::{SearchConfig, SearchMode, SearchOutcome, SearchPipeline, DEFAULT_MAX_PROPERTIES, DEMO_ADDRESS};
use propx_storage::ArtifactStore;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "propx-cli")]
#[command(about = "PropertyDetails extractor command-line interface")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Search comparables around an address using the configured mode.
    Search {
        address: String,
        #[arg(default_value_t = DEFAULT_MAX_PROPERTIES)]
        max_properties: usize,
    },
    /// Generate a synthetic batch regardless of PROPX_MODE.
    Sample {
        #[arg(default_value_t = 3)]
        count: usize,
        #[arg(long, default_value = DEMO_ADDRESS)]
        address: String,
    },
    /// Map one raw source payload into a versioned PropertyDetails record.
    Map {
        source: SourceArg,
        raw: PathBuf,
        #[arg(long, default_value = "v6.2")]
        schema: SchemaVersion,
        /// Listing id; defaults to the file stem.
        #[arg(long)]
        id: Option<String>,
    },
    Serve,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum SourceArg {
    Zillow,
    Reapi,
}

impl From<SourceArg> for DataSource {
    fn from(arg: SourceArg) -> Self {
        match arg {
            SourceArg::Zillow => DataSource::Zillow,
            SourceArg::Reapi => DataSource::Reapi,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    let config = SearchConfig::from_env();

    match cli.command {
        Commands::Search { address, max_properties } => {
            let outcome = SearchPipeline::new(config)?.run(&address, max_properties).await?;
            print_outcome(&outcome)?;
        }
        Commands::Sample { count, address } => {
            let config = SearchConfig {
                mode: SearchMode::Sample,
                ..config
            };
            let outcome = SearchPipeline::new(config)?.run(&address, count).await?;
            print_outcome(&outcome)?;
        }
        Commands::Map { source, raw, schema, id } => {
            let source = DataSource::from(source);
            let payload: serde_json::Value = ArtifactStore::load_json(&raw).await?;
            let identifier = id
                .or_else(|| raw.file_stem().map(|s| s.to_string_lossy().into_owned()))
                .unwrap_or_default();
            let record = RawRecord {
                source,
                identifier,
                fetched_at: Utc::now(),
                payload,
            };
            let mapped = map_record(&record, schema)
                .with_context(|| format!("{} is not a {source} property payload", raw.display()))?;

            let store = ArtifactStore::new(config.output_dir.clone());
            let tag = format!("PROPERTY_DETAILS_{}", source.source_id().to_uppercase());
            let artifact = store.store_json(&tag, record.fetched_at, &mapped).await?;
            info!(path = %artifact.path.display(), hash = %artifact.content_hash, "mapped record stored");
            println!("{}", serde_json::to_string_pretty(&mapped)?);
        }
        Commands::Serve => {
            propx_web::serve_from_env().await?;
        }
    }

    Ok(())
}

fn print_outcome(outcome: &SearchOutcome) -> Result<()> {
    let summary = &outcome.envelope.summary;
    println!("{}", serde_json::to_string_pretty(&outcome.envelope)?);
    eprintln!(
        "search complete: found={} successful={} failed={} artifact={} sha256={}",
        summary.total_found,
        summary.successful_extractions,
        summary.failed_extractions,
        outcome.artifact.path.display(),
        outcome.artifact.content_hash
    );
    Ok(())
}
