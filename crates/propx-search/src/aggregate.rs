use chrono::{DateTime, Utc};
use propx_core::{ExtractionEnvelope, ExtractionItem, ExtractionSummary, ItemFailure, SchemaVersion};

use crate::config::SearchMode;

/// Zips per-item records into an envelope. Counts come from the sequences
/// themselves, so they always agree with what is serialized.
#[derive(Debug, Clone, Copy)]
pub struct Aggregator {
    pub schema_version: SchemaVersion,
    pub mode: SearchMode,
}

impl Aggregator {
    pub fn new(schema_version: SchemaVersion, mode: SearchMode) -> Self {
        Self { schema_version, mode }
    }

    pub fn aggregate(
        &self,
        subject_address: &str,
        searched_at: DateTime<Utc>,
        items: Vec<ExtractionItem>,
        failures: Vec<ItemFailure>,
    ) -> ExtractionEnvelope {
        let successful = items
            .iter()
            .filter(|item| item.zillow.is_some() || item.reapi.is_some())
            .count();
        let (zillow_properties, reapi_properties): (Vec<_>, Vec<_>) = items
            .into_iter()
            .map(|item| {
                (
                    item.zillow.map(|r| r.with_version(self.schema_version)),
                    item.reapi.map(|r| r.with_version(self.schema_version)),
                )
            })
            .unzip();

        let summary = ExtractionSummary {
            total_found: zillow_properties.len(),
            zillow_count: zillow_properties.len(),
            reapi_count: reapi_properties.len(),
            successful_extractions: successful,
            failed_extractions: zillow_properties.len() - successful,
        };

        ExtractionEnvelope {
            subject_address: subject_address.trim().to_string(),
            search_timestamp: searched_at,
            schema_version: self.schema_version,
            mode: self.mode.as_str().to_string(),
            zillow_properties,
            reapi_properties,
            summary,
            failures,
        }
    }
}

/// Split an envelope back into items, e.g. to replay a stored run.
pub fn into_items(envelope: ExtractionEnvelope) -> (Vec<ExtractionItem>, Vec<ItemFailure>) {
    let len = envelope
        .zillow_properties
        .len()
        .max(envelope.reapi_properties.len());
    let mut zillow = envelope.zillow_properties.into_iter();
    let mut reapi = envelope.reapi_properties.into_iter();
    let items = (0..len)
        .map(|_| ExtractionItem {
            zillow: zillow.next().flatten(),
            reapi: reapi.next().flatten(),
        })
        .collect();
    (items, envelope.failures)
}
