//! Source adapter contracts, field mapping, and live/fixture adapters.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use propx_core::{DataSource, RawRecord};
use propx_storage::{FetchError, HttpFetcher};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use thiserror::Error;

pub mod fixture;
pub mod mapper;
pub mod reapi;
pub mod vocab;
pub mod zillow;

pub use fixture::{FixtureAdapter, FixtureSearch};
pub use mapper::{lot_acres, map_record};
pub use reapi::ReapiAdapter;
pub use zillow::ZillowAdapter;

pub const CRATE_NAME: &str = "propx-adapters";

#[derive(Debug, Clone, PartialEq)]
pub enum FetchOutcome {
    Found(RawRecord),
    /// The source answered but had nothing for this identifier.
    Empty,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListingSummary {
    pub listing_id: String,
    pub address: Option<String>,
}

#[derive(Debug, Error)]
pub enum AdapterError {
    #[error("{0}")]
    Message(String),
    #[error(transparent)]
    Fetch(#[from] FetchError),
    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),
}

#[async_trait]
pub trait SourceAdapter: Send + Sync {
    fn source(&self) -> DataSource;

    /// `identifier` is a listing id for the listing-site source and a street
    /// address for the property-records source.
    async fn fetch(&self, identifier: &str) -> Result<FetchOutcome, AdapterError>;
}

#[async_trait]
pub trait ListingSearch: Send + Sync {
    async fn search(&self, address: &str, limit: usize) -> Result<Vec<ListingSummary>, AdapterError>;
}

/// Where and how to reach one live source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceEndpoint {
    pub base_url: String,
    pub host: Option<String>,
    pub api_key: String,
}

/// The listing search plus one adapter per enabled source.
#[derive(Clone)]
pub struct SourceSet {
    pub search: Arc<dyn ListingSearch>,
    pub zillow: Option<Arc<dyn SourceAdapter>>,
    pub reapi: Option<Arc<dyn SourceAdapter>>,
}

impl SourceSet {
    /// Listing search always runs against the Zillow endpoint; `zillow_details`
    /// controls whether per-listing Zillow records are fetched as well.
    pub fn live(
        http: HttpFetcher,
        zillow: SourceEndpoint,
        zillow_details: bool,
        reapi: Option<SourceEndpoint>,
    ) -> Self {
        let zillow = Arc::new(ZillowAdapter::new(http.clone(), zillow));
        Self {
            search: zillow.clone(),
            zillow: zillow_details.then(|| zillow as Arc<dyn SourceAdapter>),
            reapi: reapi.map(|endpoint| Arc::new(ReapiAdapter::new(http, endpoint)) as Arc<dyn SourceAdapter>),
        }
    }

    pub fn fixtures(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        Self {
            search: Arc::new(FixtureSearch::new(&root)),
            zillow: Some(Arc::new(FixtureAdapter::new(DataSource::Zillow, &root))),
            reapi: Some(Arc::new(FixtureAdapter::new(DataSource::Reapi, &root))),
        }
    }

    /// Drop the adapter for `source`; its slots in a run stay null.
    pub fn without(mut self, source: DataSource) -> Self {
        match source {
            DataSource::Zillow => self.zillow = None,
            DataSource::Reapi => self.reapi = None,
        }
        self
    }

    pub fn adapter(&self, source: DataSource) -> Option<&Arc<dyn SourceAdapter>> {
        match source {
            DataSource::Zillow => self.zillow.as_ref(),
            DataSource::Reapi => self.reapi.as_ref(),
        }
    }
}

pub(crate) fn read_json_file<T: DeserializeOwned>(path: impl AsRef<Path>) -> Result<T> {
    let path = path.as_ref();
    let data = std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    serde_json::from_str(&data).with_context(|| format!("parsing {}", path.display()))
}
