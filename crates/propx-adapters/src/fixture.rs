//! Offline adapters that replay captured raw payloads from `fixtures/`.
//!
//! Layout: `fixtures/<source_id>/<slug>.json` holds the raw payload a live
//! fetch for that identifier would return, and `fixtures/zillow/search.json`
//! holds one property search response.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::Utc;
use propx_core::{DataSource, RawRecord};
use serde_json::Value as JsonValue;
use tracing::debug;

use crate::zillow::parse_search_results;
use crate::{read_json_file, AdapterError, FetchOutcome, ListingSearch, ListingSummary, SourceAdapter};

pub const SEARCH_FIXTURE: &str = "search.json";

/// `"7709 Palmbrook Dr, Tampa"` -> `"7709-palmbrook-dr-tampa"`.
pub fn fixture_slug(identifier: &str) -> String {
    let mut slug = String::with_capacity(identifier.len());
    for ch in identifier.trim().chars() {
        if ch.is_ascii_alphanumeric() {
            slug.push(ch.to_ascii_lowercase());
        } else if !slug.is_empty() && !slug.ends_with('-') {
            slug.push('-');
        }
    }
    while slug.ends_with('-') {
        slug.pop();
    }
    slug
}

#[derive(Debug, Clone)]
pub struct FixtureAdapter {
    source: DataSource,
    dir: PathBuf,
}

impl FixtureAdapter {
    pub fn new(source: DataSource, fixtures_root: &Path) -> Self {
        Self {
            source,
            dir: fixtures_root.join(source.source_id()),
        }
    }

    pub fn fixture_path(&self, identifier: &str) -> PathBuf {
        self.dir.join(format!("{}.json", fixture_slug(identifier)))
    }
}

#[async_trait]
impl SourceAdapter for FixtureAdapter {
    fn source(&self) -> DataSource {
        self.source
    }

    async fn fetch(&self, identifier: &str) -> Result<FetchOutcome, AdapterError> {
        if fixture_slug(identifier).is_empty() {
            return Err(AdapterError::Message(format!(
                "{} fixture lookup needs a non-empty identifier",
                self.source
            )));
        }
        let path = self.fixture_path(identifier);
        if !path.exists() {
            debug!(source = %self.source, path = %path.display(), "no fixture for identifier");
            return Ok(FetchOutcome::Empty);
        }
        let payload: JsonValue = read_json_file(&path)?;
        Ok(FetchOutcome::Found(RawRecord {
            source: self.source,
            identifier: identifier.trim().to_string(),
            fetched_at: Utc::now(),
            payload,
        }))
    }
}

#[derive(Debug, Clone)]
pub struct FixtureSearch {
    path: PathBuf,
}

impl FixtureSearch {
    pub fn new(fixtures_root: &Path) -> Self {
        Self {
            path: fixtures_root
                .join(DataSource::Zillow.source_id())
                .join(SEARCH_FIXTURE),
        }
    }
}

#[async_trait]
impl ListingSearch for FixtureSearch {
    async fn search(&self, address: &str, limit: usize) -> Result<Vec<ListingSummary>, AdapterError> {
        let response: JsonValue = read_json_file(&self.path)?;
        let results = parse_search_results(&response, limit);
        debug!(address, found = results.len(), "fixture search complete");
        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slugs_fold_punctuation_and_case() {
        assert_eq!(
            fixture_slug("7711 Palmbrook Dr, Tampa, FL 33615"),
            "7711-palmbrook-dr-tampa-fl-33615"
        );
        assert_eq!(fixture_slug("  45102311 "), "45102311");
        assert_eq!(fixture_slug(" , "), "");
    }
}
