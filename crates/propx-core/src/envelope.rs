//! Search result envelope returned by the pipeline and written to disk.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{DataSource, SchemaVersion, VersionedPropertyDetails};

/// One comparable property as seen by both sources. Either side may be
/// missing when that source produced nothing for the item.
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractionItem {
    pub zillow: Option<VersionedPropertyDetails>,
    pub reapi: Option<VersionedPropertyDetails>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemFailure {
    pub index: usize,
    pub data_source: DataSource,
    pub error: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ExtractionSummary {
    pub total_found: usize,
    pub zillow_count: usize,
    pub reapi_count: usize,
    pub successful_extractions: usize,
    pub failed_extractions: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractionEnvelope {
    pub subject_address: String,
    pub search_timestamp: DateTime<Utc>,
    #[serde(default)]
    pub schema_version: SchemaVersion,
    #[serde(default)]
    pub mode: String,
    pub zillow_properties: Vec<Option<VersionedPropertyDetails>>,
    pub reapi_properties: Vec<Option<VersionedPropertyDetails>>,
    pub summary: ExtractionSummary,
    #[serde(default)]
    pub failures: Vec<ItemFailure>,
}

impl ExtractionEnvelope {
    /// Re-pin every record to `version` and update the envelope label.
    pub fn with_version(mut self, version: SchemaVersion) -> Self {
        let repin = |list: Vec<Option<VersionedPropertyDetails>>| {
            list.into_iter()
                .map(|item| item.map(|record| record.with_version(version)))
                .collect::<Vec<_>>()
        };
        self.zillow_properties = repin(self.zillow_properties);
        self.reapi_properties = repin(self.reapi_properties);
        self.schema_version = version;
        self
    }
}
