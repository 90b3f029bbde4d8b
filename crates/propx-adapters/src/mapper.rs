//! Field Mapper: raw source payloads into versioned PropertyDetails.
//!
//! Everything here is pure. A payload missing the source's top-level
//! container maps to `None`; anything malformed below that becomes null.

use std::collections::BTreeSet;

use propx_core::{DataSource, RawRecord, SchemaVersion, VersionedPropertyDetails};
use serde_json::Value as JsonValue;

use crate::{reapi, zillow};

pub const SQFT_PER_ACRE: f64 = 43_560.0;

pub fn map_record(raw: &RawRecord, version: SchemaVersion) -> Option<VersionedPropertyDetails> {
    let details = match raw.source {
        DataSource::Zillow => zillow::map_payload(&raw.payload, &raw.identifier, raw.fetched_at)?,
        DataSource::Reapi => reapi::map_payload(&raw.payload, raw.fetched_at)?,
    };
    Some(VersionedPropertyDetails::new(details, version))
}

/// Acres to two decimals; `None` for a missing, zero or negative lot.
pub fn lot_acres(lot_sqft: Option<i64>) -> Option<f64> {
    match lot_sqft {
        Some(sqft) if sqft > 0 => Some((sqft as f64 / SQFT_PER_ACRE * 100.0).round() / 100.0),
        _ => None,
    }
}

/// `"street, city, state zip"` from whichever parts are present.
pub fn full_address(
    street: Option<&str>,
    city: Option<&str>,
    state: Option<&str>,
    postal_code: Option<&str>,
) -> Option<String> {
    let state_zip = [state, postal_code]
        .into_iter()
        .flatten()
        .collect::<Vec<_>>()
        .join(" ");
    let parts = [street, city, Some(state_zip.as_str())]
        .into_iter()
        .flatten()
        .filter(|p| !p.is_empty())
        .collect::<Vec<_>>();
    if parts.is_empty() {
        None
    } else {
        Some(parts.join(", "))
    }
}

/// Case-insensitive membership over a source's free-form feature list.
#[derive(Debug, Clone, Default)]
pub struct FeatureSet {
    features: Option<BTreeSet<String>>,
}

impl FeatureSet {
    pub fn from_json(value: Option<&JsonValue>) -> Self {
        let features = value.and_then(JsonValue::as_array).map(|items| {
            items
                .iter()
                .filter_map(JsonValue::as_str)
                .map(|s| s.trim().to_lowercase())
                .collect()
        });
        Self { features }
    }

    /// `None` when the source supplied no feature list at all.
    pub fn flag(&self, name: &str) -> Option<bool> {
        self.features
            .as_ref()
            .map(|set| set.contains(&name.to_lowercase()))
    }
}

pub(crate) fn json_at<'a>(value: &'a JsonValue, path: &[&str]) -> Option<&'a JsonValue> {
    let mut cur = value;
    for segment in path {
        cur = cur.get(*segment)?;
    }
    if cur.is_null() {
        None
    } else {
        Some(cur)
    }
}

/// Non-empty string at `path`.
pub(crate) fn json_str<'a>(value: &'a JsonValue, path: &[&str]) -> Option<&'a str> {
    json_at(value, path)?
        .as_str()
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

/// String or number at `path`, rendered as a string. Ids and census codes
/// show up as either.
pub(crate) fn json_string(value: &JsonValue, path: &[&str]) -> Option<String> {
    match json_at(value, path)? {
        JsonValue::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        JsonValue::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

pub(crate) fn json_f64(value: &JsonValue, path: &[&str]) -> Option<f64> {
    let v = json_at(value, path)?;
    v.as_f64()
        .or_else(|| v.as_str().and_then(|s| s.trim().parse().ok()))
}

pub(crate) fn json_i64(value: &JsonValue, path: &[&str]) -> Option<i64> {
    let v = json_at(value, path)?;
    v.as_i64()
        .or_else(|| v.as_f64().map(|f| f.round() as i64))
        .or_else(|| v.as_str().and_then(|s| s.trim().parse::<f64>().ok()).map(|f| f.round() as i64))
}

pub(crate) fn json_u32(value: &JsonValue, path: &[&str]) -> Option<u32> {
    json_i64(value, path).and_then(|n| u32::try_from(n).ok())
}
