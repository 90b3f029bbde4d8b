use std::time::Duration;

use anyhow::Context;
use chrono::Utc;
use propx_adapters::{map_record, FetchOutcome, SourceSet};
use propx_core::{DataSource, ExtractionEnvelope, ExtractionItem, ItemFailure};
use propx_storage::{ArtifactStore, HttpClientConfig, HttpFetcher, StoredArtifact};
use tracing::{debug, info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::aggregate::{into_items, Aggregator};
use crate::config::{SearchConfig, SearchMode, SourceRegistry};
use crate::generator::SampleGenerator;
use crate::SearchError;

pub const DEFAULT_MAX_PROPERTIES: usize = 25;
/// Upper bound on items per run.
pub const MAX_PROPERTIES: usize = 100;

#[derive(Debug, Clone)]
pub struct SearchOutcome {
    pub envelope: ExtractionEnvelope,
    pub artifact: StoredArtifact,
}

pub struct SearchPipeline {
    config: SearchConfig,
    sources: Option<SourceSet>,
    store: ArtifactStore,
}

impl SearchPipeline {
    /// Validates everything the configured mode needs up front: the registry and
    /// keys for enabled sources in live runs, the fixtures directory for fixture runs.
    pub fn new(config: SearchConfig) -> Result<Self, SearchError> {
        let sources = match config.mode {
            SearchMode::Live => {
                let registry = SourceRegistry::load(&config.registry_path())?;
                // Listing search uses the Zillow endpoint even when Zillow records are disabled.
                let zillow = registry.endpoint(DataSource::Zillow, config.rapidapi_key.as_deref())?;
                let reapi = if registry.is_enabled(DataSource::Reapi) {
                    Some(registry.endpoint(DataSource::Reapi, config.reapi_key.as_deref())?)
                } else {
                    None
                };
                let http = HttpFetcher::new(HttpClientConfig {
                    timeout: Duration::from_secs(config.http_timeout_secs),
                    user_agent: Some(config.user_agent.clone()),
                })?;
                Some(SourceSet::live(
                    http,
                    zillow,
                    registry.is_enabled(DataSource::Zillow),
                    reapi,
                ))
            }
            SearchMode::Fixture => {
                let dir = config.fixtures_dir();
                if !dir.is_dir() {
                    return Err(SearchError::MissingArtifact(dir));
                }
                let registry = SourceRegistry::load(&config.registry_path())?;
                Some(
                    DataSource::ALL
                        .into_iter()
                        .filter(|s| !registry.is_enabled(*s))
                        .fold(SourceSet::fixtures(dir), SourceSet::without),
                )
            }
            SearchMode::Sample => None,
            SearchMode::Snapshot => {
                if config.snapshot_path.is_none() {
                    return Err(SearchError::Config(
                        "snapshot mode needs PROPX_SNAPSHOT_PATH".to_string(),
                    ));
                }
                None
            }
        };

        let store = ArtifactStore::new(config.output_dir.clone());
        Ok(Self {
            config,
            sources,
            store,
        })
    }

    pub fn config(&self) -> &SearchConfig {
        &self.config
    }

    pub async fn run(&self, address: &str, max_properties: usize) -> Result<SearchOutcome, SearchError> {
        let address = address.trim();
        if address.is_empty() {
            return Err(SearchError::MissingAddress);
        }
        let limit = max_properties.min(MAX_PROPERTIES);
        if limit < max_properties {
            debug!(requested = max_properties, limit, "clamping property count");
        }

        let run_id = Uuid::new_v4();
        let span = info_span!("search_run", %run_id, mode = %self.config.mode, address);
        self.run_inner(address, limit).instrument(span).await
    }

    async fn run_inner(&self, address: &str, limit: usize) -> Result<SearchOutcome, SearchError> {
        let searched_at = Utc::now();
        let (items, failures) = match self.config.mode {
            SearchMode::Sample => (self.sample_items(limit), Vec::new()),
            SearchMode::Snapshot => self.snapshot_items(limit).await?,
            SearchMode::Live | SearchMode::Fixture => self.source_items(address, limit).await?,
        };

        let aggregator = Aggregator::new(self.config.schema_version, self.config.mode);
        let envelope = aggregator.aggregate(address, searched_at, items, failures);
        let tag = format!("PROPERTY_SEARCH_{}", self.config.mode.as_str().to_uppercase());
        let artifact = self.store.store_json(&tag, searched_at, &envelope).await?;

        info!(
            total = envelope.summary.total_found,
            successful = envelope.summary.successful_extractions,
            failed = envelope.summary.failed_extractions,
            path = %artifact.path.display(),
            hash = %artifact.content_hash,
            "search complete"
        );
        Ok(SearchOutcome { envelope, artifact })
    }

    fn sample_items(&self, limit: usize) -> Vec<ExtractionItem> {
        let version = self.config.schema_version;
        let now = Utc::now();
        match self.config.sample_seed {
            Some(seed) => {
                let mut gen = SampleGenerator::seeded(seed, self.config.center, now);
                (0..limit).map(|_| gen.generate_item(version)).collect()
            }
            None => {
                let mut gen = SampleGenerator::from_entropy(self.config.center, now);
                (0..limit).map(|_| gen.generate_item(version)).collect()
            }
        }
    }

    async fn snapshot_items(&self, limit: usize) -> Result<(Vec<ExtractionItem>, Vec<ItemFailure>), SearchError> {
        let path = self
            .config
            .snapshot_path
            .clone()
            .ok_or_else(|| SearchError::Config("snapshot mode needs PROPX_SNAPSHOT_PATH".to_string()))?;
        if !path.is_file() {
            return Err(SearchError::MissingArtifact(path));
        }
        let envelope: ExtractionEnvelope = ArtifactStore::load_json(&path)
            .await
            .with_context(|| format!("loading snapshot {}", path.display()))?;

        let (mut items, mut failures) = into_items(envelope);
        items.truncate(limit);
        failures.retain(|f| f.index < limit);
        Ok((items, failures))
    }

    /// Strictly sequential: one item at a time, with a pause between items.
    async fn source_items(
        &self,
        address: &str,
        limit: usize,
    ) -> Result<(Vec<ExtractionItem>, Vec<ItemFailure>), SearchError> {
        let sources = self
            .sources
            .as_ref()
            .ok_or_else(|| SearchError::Config(format!("{} mode has no sources", self.config.mode)))?;

        let listings = sources.search.search(address, limit).await?;
        info!(found = listings.len(), "listing search complete");

        let delay = self.config.item_delay();
        let mut items = Vec::with_capacity(listings.len());
        let mut failures = Vec::new();

        for (index, listing) in listings.iter().enumerate() {
            if index > 0 && !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }

            let zillow = self
                .fetch_mapped(sources, DataSource::Zillow, index, Some(&listing.listing_id), &mut failures)
                .await;
            let reapi = self
                .fetch_mapped(sources, DataSource::Reapi, index, listing.address.as_deref(), &mut failures)
                .await;
            items.push(ExtractionItem { zillow, reapi });
        }

        Ok((items, failures))
    }

    async fn fetch_mapped(
        &self,
        sources: &SourceSet,
        source: DataSource,
        index: usize,
        identifier: Option<&str>,
        failures: &mut Vec<ItemFailure>,
    ) -> Option<propx_core::VersionedPropertyDetails> {
        let adapter = sources.adapter(source)?;
        let mut fail = |error: String| {
            warn!(index, %source, %error, "item fetch failed");
            failures.push(ItemFailure {
                index,
                data_source: source,
                error,
            });
        };

        let Some(identifier) = identifier else {
            fail("listing has no identifier for this source".to_string());
            return None;
        };

        match adapter.fetch(identifier).await {
            Ok(FetchOutcome::Found(raw)) => {
                let mapped = map_record(&raw, self.config.schema_version);
                if mapped.is_none() {
                    fail(format!("{source} payload is missing its top-level container"));
                }
                mapped
            }
            Ok(FetchOutcome::Empty) => {
                debug!(index, %source, identifier, "source has no record");
                None
            }
            Err(err) => {
                fail(err.to_string());
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::{Path, PathBuf};

    use propx_core::SchemaVersion;
    use tempfile::{tempdir, TempDir};

    use crate::config::{FIXTURES_DIR, REGISTRY_FILE};

    fn workspace_root() -> PathBuf {
        Path::new(env!("CARGO_MANIFEST_DIR"))
            .join("../..")
            .canonicalize()
            .expect("workspace root")
    }

    fn config(mode: SearchMode, out: &Path) -> SearchConfig {
        SearchConfig {
            mode,
            output_dir: out.to_path_buf(),
            workspace_root: workspace_root(),
            item_delay_ms: 0,
            sample_seed: Some(5),
            ..SearchConfig::default()
        }
    }

    fn registry_yaml(zillow_enabled: bool, reapi_enabled: bool) -> String {
        format!(
            "sources:\n  - source_id: zillow\n    display_name: Zillow\n    enabled: {zillow_enabled}\n    base_url: https://zillow.example\n    host: zillow.example\n  - source_id: reapi\n    display_name: REAPI\n    enabled: {reapi_enabled}\n    base_url: https://reapi.example/v2\n"
        )
    }

    fn workspace_with_registry(zillow_enabled: bool, reapi_enabled: bool) -> TempDir {
        let dir = tempdir().expect("tempdir");
        std::fs::write(
            dir.path().join(REGISTRY_FILE),
            registry_yaml(zillow_enabled, reapi_enabled),
        )
        .expect("write registry");
        dir
    }

    fn copy_dir(from: &Path, to: &Path) {
        std::fs::create_dir_all(to).expect("create dir");
        for entry in std::fs::read_dir(from).expect("read dir") {
            let entry = entry.expect("dir entry");
            let target = to.join(entry.file_name());
            if entry.path().is_dir() {
                copy_dir(&entry.path(), &target);
            } else {
                std::fs::copy(entry.path(), &target).expect("copy fixture");
            }
        }
    }

    fn files_in(dir: &Path) -> usize {
        std::fs::read_dir(dir).map(|d| d.count()).unwrap_or(0)
    }

    #[tokio::test]
    async fn blank_address_is_rejected_before_anything_is_written() {
        let dir = tempdir().expect("tempdir");
        let pipeline = SearchPipeline::new(config(SearchMode::Sample, dir.path())).unwrap();
        let err = pipeline.run("   ", 3).await.unwrap_err();
        assert!(matches!(err, SearchError::MissingAddress));
        assert_eq!(files_in(dir.path()), 0);
    }

    #[tokio::test]
    async fn sample_run_fills_both_sequences() {
        let dir = tempdir().expect("tempdir");
        let pipeline = SearchPipeline::new(config(SearchMode::Sample, dir.path())).unwrap();
        let outcome = pipeline
            .run("7709 Palmbrook Dr, Tampa, FL 33615", 3)
            .await
            .unwrap();
        let env = &outcome.envelope;
        assert_eq!(env.summary.total_found, 3);
        assert_eq!(env.zillow_properties.len(), 3);
        assert_eq!(env.reapi_properties.len(), 3);
        for record in env.zillow_properties.iter().flatten() {
            assert_eq!(record.data_source(), DataSource::Zillow);
        }
        for record in env.reapi_properties.iter().flatten() {
            assert_eq!(record.data_source(), DataSource::Reapi);
        }
        assert!(outcome.artifact.path.exists());
        assert!(outcome
            .artifact
            .path
            .file_name()
            .unwrap()
            .to_string_lossy()
            .starts_with("PROPERTY_SEARCH_SAMPLE_"));
    }

    #[tokio::test]
    async fn fixture_run_records_missing_sources_as_nulls() {
        let dir = tempdir().expect("tempdir");
        let pipeline = SearchPipeline::new(config(SearchMode::Fixture, dir.path())).unwrap();
        let outcome = pipeline
            .run("7709 Palmbrook Dr, Tampa, FL 33615", 10)
            .await
            .unwrap();
        let env = &outcome.envelope;
        assert_eq!(env.summary.total_found, 4);
        assert!(env.zillow_properties.iter().all(Option::is_some));
        assert!(env.reapi_properties[3].is_none());
        assert_eq!(env.summary.successful_extractions, 4);
        assert!(env.failures.is_empty());
    }

    #[tokio::test]
    async fn snapshot_run_reversions_a_prior_envelope() {
        let dir = tempdir().expect("tempdir");
        let first = SearchPipeline::new(config(SearchMode::Sample, dir.path()))
            .unwrap()
            .run("7709 Palmbrook Dr", 4)
            .await
            .unwrap();

        let replay_dir = dir.path().join("replay");
        let snapshot = SearchConfig {
            schema_version: SchemaVersion::V5_7,
            snapshot_path: Some(first.artifact.path.clone()),
            ..config(SearchMode::Snapshot, &replay_dir)
        };
        let outcome = SearchPipeline::new(snapshot)
            .unwrap()
            .run("7709 Palmbrook Dr", 2)
            .await
            .unwrap();
        let env = &outcome.envelope;
        assert_eq!(env.summary.total_found, 2);
        assert_eq!(env.schema_version, SchemaVersion::V5_7);
        assert_eq!(env.mode, "snapshot");
        let json = serde_json::to_value(env).unwrap();
        let first_record = &json["reapi_properties"][0]["PropertyDetails"];
        assert!(first_record.get("environmental_factors").is_none());
        assert!(first_record["identification"].get("apn").is_none());
    }

    #[tokio::test]
    async fn snapshot_without_file_is_a_missing_artifact() {
        let dir = tempdir().expect("tempdir");
        let cfg = SearchConfig {
            snapshot_path: Some(dir.path().join("nope.json")),
            ..config(SearchMode::Snapshot, dir.path())
        };
        let err = SearchPipeline::new(cfg)
            .unwrap()
            .run("7709 Palmbrook Dr", 2)
            .await
            .unwrap_err();
        assert!(matches!(err, SearchError::MissingArtifact(_)));
    }

    #[test]
    fn live_mode_without_keys_is_a_config_error() {
        let dir = tempdir().expect("tempdir");
        let result = SearchPipeline::new(config(SearchMode::Live, dir.path()));
        assert!(matches!(result, Err(SearchError::Config(_))));
    }

    #[test]
    fn live_mode_only_needs_keys_for_enabled_sources() {
        let workspace = workspace_with_registry(true, false);
        let cfg = SearchConfig {
            workspace_root: workspace.path().to_path_buf(),
            rapidapi_key: Some("k".to_string()),
            reapi_key: None,
            ..config(SearchMode::Live, workspace.path())
        };
        let pipeline = SearchPipeline::new(cfg).expect("disabled source needs no key");
        let sources = pipeline.sources.as_ref().expect("live sources");
        assert!(sources.adapter(DataSource::Zillow).is_some());
        assert!(sources.adapter(DataSource::Reapi).is_none());
    }

    #[test]
    fn live_listing_search_needs_the_rapidapi_key_even_with_zillow_disabled() {
        let workspace = workspace_with_registry(false, true);
        let with_key = SearchConfig {
            workspace_root: workspace.path().to_path_buf(),
            rapidapi_key: Some("k".to_string()),
            reapi_key: Some("r".to_string()),
            ..config(SearchMode::Live, workspace.path())
        };
        let pipeline = SearchPipeline::new(with_key.clone()).expect("keys present");
        let sources = pipeline.sources.as_ref().expect("live sources");
        assert!(sources.adapter(DataSource::Zillow).is_none());
        assert!(sources.adapter(DataSource::Reapi).is_some());

        let without_key = SearchConfig {
            rapidapi_key: None,
            ..with_key
        };
        assert!(matches!(
            SearchPipeline::new(without_key),
            Err(SearchError::Config(_))
        ));
    }

    #[tokio::test]
    async fn fixture_run_leaves_disabled_source_slots_null() {
        let workspace = workspace_with_registry(true, false);
        copy_dir(
            &workspace_root().join(FIXTURES_DIR),
            &workspace.path().join(FIXTURES_DIR),
        );
        let out = workspace.path().join("output");
        let cfg = SearchConfig {
            workspace_root: workspace.path().to_path_buf(),
            ..config(SearchMode::Fixture, &out)
        };
        let outcome = SearchPipeline::new(cfg)
            .unwrap()
            .run("7709 Palmbrook Dr, Tampa, FL 33615", 3)
            .await
            .unwrap();
        let env = &outcome.envelope;
        assert_eq!(env.summary.total_found, 3);
        assert!(env.zillow_properties.iter().all(Option::is_some));
        assert!(env.reapi_properties.iter().all(Option::is_none));
        assert!(env.failures.is_empty());
    }

    #[test]
    fn fixture_mode_needs_the_fixtures_directory() {
        let dir = tempdir().expect("tempdir");
        let cfg = SearchConfig {
            workspace_root: dir.path().to_path_buf(),
            ..config(SearchMode::Fixture, dir.path())
        };
        assert!(matches!(
            SearchPipeline::new(cfg),
            Err(SearchError::MissingArtifact(_))
        ));
    }
}
