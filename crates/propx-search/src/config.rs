//! Environment configuration and the `sources.yaml` registry.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use anyhow::Context;
use propx_adapters::SourceEndpoint;
use propx_core::{Coordinates, DataSource, SchemaVersion};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::SearchError;

pub const REGISTRY_FILE: &str = "sources.yaml";
pub const FIXTURES_DIR: &str = "fixtures";

/// Subject property used by the demo route and as the default search center.
pub const DEMO_ADDRESS: &str = "7709 Palmbrook Dr, Tampa, FL 33615";
pub const DEFAULT_CENTER: Coordinates = Coordinates {
    lat: 28.015482,
    lon: -82.565594,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchMode {
    /// Both external APIs over HTTP.
    Live,
    /// Raw payloads replayed from `fixtures/`.
    Fixture,
    /// Synthetic properties from the sample generator.
    #[default]
    Sample,
    /// A previously written envelope, re-versioned.
    Snapshot,
}

impl SearchMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            SearchMode::Live => "live",
            SearchMode::Fixture => "fixture",
            SearchMode::Sample => "sample",
            SearchMode::Snapshot => "snapshot",
        }
    }
}

impl fmt::Display for SearchMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SearchMode {
    type Err = SearchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "live" => Ok(SearchMode::Live),
            "fixture" | "fixtures" => Ok(SearchMode::Fixture),
            "sample" | "mock" => Ok(SearchMode::Sample),
            "snapshot" => Ok(SearchMode::Snapshot),
            other => Err(SearchError::Config(format!(
                "unknown mode `{other}` (expected live, fixture, sample or snapshot)"
            ))),
        }
    }
}

#[derive(Debug, Clone)]
pub struct SearchConfig {
    pub mode: SearchMode,
    pub schema_version: SchemaVersion,
    pub output_dir: PathBuf,
    pub snapshot_path: Option<PathBuf>,
    pub workspace_root: PathBuf,
    pub rapidapi_key: Option<String>,
    pub reapi_key: Option<String>,
    pub http_timeout_secs: u64,
    pub item_delay_ms: u64,
    pub user_agent: String,
    pub center: Coordinates,
    pub sample_seed: Option<u64>,
    pub web_port: u16,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            mode: SearchMode::default(),
            schema_version: SchemaVersion::default(),
            output_dir: PathBuf::from("./output"),
            snapshot_path: None,
            workspace_root: PathBuf::from("."),
            rapidapi_key: None,
            reapi_key: None,
            http_timeout_secs: 30,
            item_delay_ms: 1000,
            user_agent: "propx-bot/0.1".to_string(),
            center: DEFAULT_CENTER,
            sample_seed: None,
            web_port: 5000,
        }
    }
}

fn env_string(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn env_parse<T: FromStr>(key: &str) -> Option<T> {
    let raw = env_string(key)?;
    match raw.parse() {
        Ok(value) => Some(value),
        Err(_) => {
            warn!(key, value = %raw, "ignoring unparseable environment value");
            None
        }
    }
}

impl SearchConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            mode: env_parse("PROPX_MODE").unwrap_or(defaults.mode),
            schema_version: env_parse("PROPX_SCHEMA_VERSION").unwrap_or(defaults.schema_version),
            output_dir: env_string("PROPX_OUTPUT_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.output_dir),
            snapshot_path: env_string("PROPX_SNAPSHOT_PATH").map(PathBuf::from),
            workspace_root: env_string("PROPX_WORKSPACE_ROOT")
                .map(PathBuf::from)
                .unwrap_or(defaults.workspace_root),
            rapidapi_key: env_string("RAPIDAPI_KEY"),
            reapi_key: env_string("REAPI_KEY"),
            http_timeout_secs: env_parse("PROPX_HTTP_TIMEOUT_SECS").unwrap_or(defaults.http_timeout_secs),
            item_delay_ms: env_parse("PROPX_ITEM_DELAY_MS").unwrap_or(defaults.item_delay_ms),
            user_agent: env_string("PROPX_USER_AGENT").unwrap_or(defaults.user_agent),
            center: Coordinates {
                lat: env_parse("PROPX_CENTER_LAT").unwrap_or(defaults.center.lat),
                lon: env_parse("PROPX_CENTER_LON").unwrap_or(defaults.center.lon),
            },
            sample_seed: env_parse("PROPX_SAMPLE_SEED"),
            web_port: env_parse("PROPX_WEB_PORT").unwrap_or(defaults.web_port),
        }
    }

    pub fn fixtures_dir(&self) -> PathBuf {
        self.workspace_root.join(FIXTURES_DIR)
    }

    pub fn registry_path(&self) -> PathBuf {
        self.workspace_root.join(REGISTRY_FILE)
    }

    /// Only calls to external sources are paced.
    pub fn item_delay(&self) -> std::time::Duration {
        match self.mode {
            SearchMode::Live => std::time::Duration::from_millis(self.item_delay_ms),
            SearchMode::Fixture | SearchMode::Sample | SearchMode::Snapshot => std::time::Duration::ZERO,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SourceRegistry {
    pub sources: Vec<SourceConfig>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SourceConfig {
    pub source_id: String,
    pub display_name: String,
    pub enabled: bool,
    pub base_url: String,
    #[serde(default)]
    pub host: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

impl SourceRegistry {
    pub fn load(path: &Path) -> Result<Self, SearchError> {
        if !path.exists() {
            return Err(SearchError::MissingArtifact(path.to_path_buf()));
        }
        let text = std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
        let registry = serde_yaml::from_str(&text).with_context(|| format!("parsing {}", path.display()))?;
        Ok(registry)
    }

    pub fn get(&self, source: DataSource) -> Option<&SourceConfig> {
        self.sources
            .iter()
            .find(|s| DataSource::from_source_id(&s.source_id) == Some(source))
    }

    pub fn is_enabled(&self, source: DataSource) -> bool {
        self.get(source).is_some_and(|s| s.enabled)
    }

    pub fn endpoint(&self, source: DataSource, api_key: Option<&str>) -> Result<SourceEndpoint, SearchError> {
        let entry = self.get(source).ok_or_else(|| {
            SearchError::Config(format!("{REGISTRY_FILE} has no entry for `{}`", source.source_id()))
        })?;
        let api_key = api_key
            .filter(|k| !k.is_empty())
            .ok_or_else(|| SearchError::Config(format!("live mode needs an API key for {source}")))?;
        Ok(SourceEndpoint {
            base_url: entry.base_url.clone(),
            host: entry.host.clone(),
            api_key: api_key.to_string(),
        })
    }
}
