//! Search orchestration: configuration, sample generation, aggregation and
//! the one-shot search pipeline.

use std::path::PathBuf;

use propx_adapters::AdapterError;
use thiserror::Error;

pub mod aggregate;
pub mod config;
pub mod generator;
pub mod pipeline;

pub use aggregate::Aggregator;
pub use config::{SearchConfig, SearchMode, SourceRegistry, DEMO_ADDRESS};
pub use generator::SampleGenerator;
pub use pipeline::{SearchOutcome, SearchPipeline, DEFAULT_MAX_PROPERTIES, MAX_PROPERTIES};

pub const CRATE_NAME: &str = "propx-search";

#[derive(Debug, Error)]
pub enum SearchError {
    #[error("Address is required")]
    MissingAddress,
    #[error("required file not found: {}", .0.display())]
    MissingArtifact(PathBuf),
    #[error("configuration error: {0}")]
    Config(String),
    #[error("listing search failed: {0}")]
    Search(#[from] AdapterError),
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl SearchError {
    /// True for errors caused by the caller's input rather than the system.
    pub fn is_client_error(&self) -> bool {
        matches!(self, SearchError::MissingAddress)
    }
}

/// Build a pipeline from the environment and run one search.
pub async fn run_search_from_env(address: &str, max_properties: usize) -> Result<SearchOutcome, SearchError> {
    SearchPipeline::new(SearchConfig::from_env())?
        .run(address, max_properties)
        .await
}
