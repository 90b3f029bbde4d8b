//! Core domain model for the PropertyDetails extractor.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value as JsonValue;

pub mod envelope;
pub mod schema;

pub use envelope::{ExtractionEnvelope, ExtractionItem, ExtractionSummary, ItemFailure};
pub use schema::{SchemaVersion, Section};

pub const CRATE_NAME: &str = "propx-core";

/// Which upstream produced a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DataSource {
    /// Listing-site source (Zillow through RapidAPI).
    #[serde(rename = "Zillow")]
    Zillow,
    /// Property-records source (Real Estate API).
    #[serde(rename = "REAPI")]
    Reapi,
}

impl DataSource {
    pub const ALL: [DataSource; 2] = [DataSource::Zillow, DataSource::Reapi];

    pub fn as_str(&self) -> &'static str {
        match self {
            DataSource::Zillow => "Zillow",
            DataSource::Reapi => "REAPI",
        }
    }

    /// Registry key used in `sources.yaml` and under `fixtures/`.
    pub fn source_id(&self) -> &'static str {
        match self {
            DataSource::Zillow => "zillow",
            DataSource::Reapi => "reapi",
        }
    }

    pub fn from_source_id(source_id: &str) -> Option<Self> {
        match source_id.trim().to_ascii_lowercase().as_str() {
            "zillow" => Some(DataSource::Zillow),
            "reapi" => Some(DataSource::Reapi),
            _ => None,
        }
    }
}

impl fmt::Display for DataSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Untouched source payload handed from an adapter to the mapper.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawRecord {
    pub source: DataSource,
    /// Listing id (Zillow zpid) or address (REAPI) the payload was fetched for.
    pub identifier: String,
    pub fetched_at: DateTime<Utc>,
    pub payload: JsonValue,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub lat: f64,
    pub lon: f64,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Identification {
    pub apn: Option<String>,
    pub address_full: Option<String>,
    pub street: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub postal_code: Option<String>,
    pub zoning: Option<String>,
    pub property_type: Option<String>,
    pub property_use: Option<String>,
    #[serde(rename = "landUse")]
    pub land_use: Option<String>,
    #[serde(rename = "legalDescription")]
    pub legal_description: Option<String>,
    #[serde(rename = "propertyClass")]
    pub property_class: Option<String>,
    pub exterior_materials: Vec<String>,
    pub interior_materials: Vec<String>,
    pub year_built: Option<i32>,
    pub living_sqft: Option<i64>,
    pub building_sqft: Option<i64>,
    pub lot_sqft: Option<i64>,
    pub lot_acres: Option<f64>,
    pub floor_count: Option<f64>,
    pub story_count: Option<f64>,
    pub bedrooms: Option<u32>,
    pub bathrooms_full: Option<u32>,
    pub bathrooms_half: Option<u32>,
    pub basement: Option<bool>,
    pub basement_type: Option<String>,
    #[serde(rename = "basementFinishedPercent")]
    pub basement_finished_percent: Option<f64>,
    #[serde(rename = "basementSquareFeet")]
    pub basement_sqft: Option<i64>,
    #[serde(rename = "basementSquareFeetFinished")]
    pub basement_sqft_finished: Option<i64>,
    #[serde(rename = "basementSquareFeetUnfinished")]
    pub basement_sqft_unfinished: Option<i64>,
    pub unit_count: Option<u32>,
    pub building_count: Option<u32>,
    pub attic: Option<bool>,
    pub foundation_type: Option<String>,
    pub roof_type: Option<String>,
    pub roof_construction_type: Option<String>,
    pub parking_type: Option<String>,
    pub parking_spaces: Option<u32>,
    pub parking_space_sqft: Option<i64>,
    pub adu_present: Option<bool>,
    pub adu_sqft: Option<i64>,
    pub pool: Option<bool>,
    pub deck: Option<bool>,
    pub deck_area: Option<i64>,
    pub patio: Option<bool>,
    pub patio_area: Option<i64>,
    pub porch_type: Option<String>,
    pub porch_area: Option<i64>,
    pub rv_parking: Option<bool>,
    pub fireplace: Option<bool>,
    pub fireplaces: Option<u32>,
    pub air_conditioning_type: Option<String>,
    pub heating_type: Option<String>,
    pub heating_fuel_type: Option<String>,
    pub water_type: Option<String>,
    pub sewer_type: Option<String>,
    pub gated_community: Option<bool>,
    pub age_restricted: Option<bool>,
    pub historic_district: Option<bool>,
    pub site_elevation_ft: Option<f64>,
    pub schools: Vec<JsonValue>,
    pub hoa: Option<bool>,
    pub hoa_fee_annual: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Location {
    pub lat: Option<f64>,
    pub lon: Option<f64>,
    pub county_fips: Option<String>,
    pub subdivision: Option<String>,
    pub neighborhood: Option<String>,
    pub census_block: Option<String>,
    pub census_block_group: Option<String>,
    pub census_tract: Option<String>,
    pub school_district: Option<String>,
    pub flood_zone: Option<String>,
}

/// Reserved for a downstream classifier; nothing in this workspace fills it.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AiFields {
    pub architectural_styles: Vec<String>,
    pub finish_quality_score: Option<f64>,
    pub finish_quality_label: Option<String>,
    pub curb_appeal_score: Option<f64>,
    pub curb_appeal_label: Option<String>,
    pub condition_score: Option<f64>,
    pub condition_label: Option<String>,
    pub property_uniqueness_score: Option<f64>,
    pub street_quality_score: Option<f64>,
    pub solar_panels: Option<bool>,
    pub occupied: Option<bool>,
    pub road_relations: Vec<String>,
    pub golf_course_relation: Option<bool>,
    pub golf_course_distance_ft: Option<f64>,
    pub commercial_relation: Option<bool>,
    pub commercial_distance_ft: Option<f64>,
    pub commercial_relation_type: Option<String>,
    pub railroad_relation: Option<bool>,
    pub railroad_distance_ft: Option<f64>,
    pub school_relation: Option<bool>,
    pub school_distance_ft: Option<f64>,
    pub water_relation_type: Option<String>,
    pub water_relation: Option<bool>,
    pub water_distance_ft: Option<f64>,
    pub split_level: Option<bool>,
    pub lot_type: Option<String>,
    pub professional_photos: Option<bool>,
    pub staged: Option<bool>,
    pub property_notes: Option<String>,
}

/// Listing event, only ever produced from the listing-site source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MlsEvent {
    pub price: i64,
    pub date: String,
    pub event: String,
    pub source: String,
}

/// Recorded transaction, only ever produced from the property-records source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaleEvent {
    pub price: i64,
    pub date: String,
    #[serde(default)]
    pub transaction_type: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PriceHistory {
    pub property_market_status: Option<String>,
    pub list_price: Option<i64>,
    pub listed_date: Option<String>,
    pub last_sale_price: Option<i64>,
    pub last_sale_date: Option<String>,
    pub property_strategy_type: Option<String>,
    pub listing_description: Option<String>,
    pub mls_history: Vec<MlsEvent>,
    pub sale_history: Vec<SaleEvent>,
}

pub const UNASSIGNED_CLASSIFICATION: &str = "unassigned";

fn unassigned() -> String {
    UNASSIGNED_CLASSIFICATION.to_string()
}

/// One photo. Photos carry no caption; a `caption` key in input is dropped
/// on deserialization and never emitted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Photo {
    pub sources: Vec<PhotoSource>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhotoSource {
    pub url: String,
    pub width: u32,
    pub height: u32,
    #[serde(default = "unassigned")]
    pub classification_type: String,
}

impl PhotoSource {
    pub fn unassigned(url: impl Into<String>, width: u32, height: u32) -> Self {
        Self {
            url: url.into(),
            width,
            height,
            classification_type: unassigned(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HazardRating {
    pub severity: String,
    pub trend: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EnvironmentalFactors {
    pub flood: Option<HazardRating>,
    pub wildfire: Option<HazardRating>,
    pub heat: Option<HazardRating>,
    pub wind: Option<HazardRating>,
    pub air: Option<HazardRating>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetaData {
    pub data_source: DataSource,
    #[serde(default)]
    pub source_property_id: Option<String>,
    pub fetch_timestamp: DateTime<Utc>,
    #[serde(default)]
    pub api_version: String,
}

impl MetaData {
    pub fn new(data_source: DataSource, fetch_timestamp: DateTime<Utc>) -> Self {
        Self {
            data_source,
            source_property_id: None,
            fetch_timestamp,
            api_version: SchemaVersion::default().as_str().to_string(),
        }
    }
}

/// Superset of every schema version's sections. Serialize through
/// [`VersionedPropertyDetails`] to get a version-shaped document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertyDetails {
    #[serde(default)]
    pub identification: Identification,
    #[serde(default)]
    pub location: Location,
    #[serde(default)]
    pub ai_fields: AiFields,
    #[serde(default)]
    pub price_history: PriceHistory,
    #[serde(default)]
    pub photos: Vec<Photo>,
    #[serde(default)]
    pub environmental_factors: EnvironmentalFactors,
    #[serde(default)]
    pub discrepancy_logs: Option<JsonValue>,
    #[serde(default)]
    pub comp_to_subject: Option<JsonValue>,
    pub meta_data: MetaData,
}

impl PropertyDetails {
    pub fn empty(data_source: DataSource, fetch_timestamp: DateTime<Utc>) -> Self {
        Self {
            identification: Identification::default(),
            location: Location::default(),
            ai_fields: AiFields::default(),
            price_history: PriceHistory::default(),
            photos: Vec::new(),
            environmental_factors: EnvironmentalFactors::default(),
            discrepancy_logs: None,
            comp_to_subject: None,
            meta_data: MetaData::new(data_source, fetch_timestamp),
        }
    }
}

/// A record pinned to one schema version.
///
/// Serializes as `{"PropertyDetails": {...}}` containing exactly the version's
/// sections and fields, in the version's order.
#[derive(Debug, Clone, PartialEq)]
pub struct VersionedPropertyDetails {
    version: SchemaVersion,
    details: PropertyDetails,
}

pub const ROOT_KEY: &str = "PropertyDetails";

impl VersionedPropertyDetails {
    pub fn new(mut details: PropertyDetails, version: SchemaVersion) -> Self {
        details.meta_data.api_version = version.as_str().to_string();
        Self { version, details }
    }

    pub fn version(&self) -> SchemaVersion {
        self.version
    }

    pub fn details(&self) -> &PropertyDetails {
        &self.details
    }

    pub fn data_source(&self) -> DataSource {
        self.details.meta_data.data_source
    }

    /// Re-pin to another version. Fields the target lacks are dropped from the
    /// emitted document; fields it adds come out null.
    pub fn with_version(self, version: SchemaVersion) -> Self {
        Self::new(self.details, version)
    }

    pub fn to_json(&self) -> serde_json::Result<JsonValue> {
        let full = serde_json::to_value(&self.details)?;
        let mut root = serde_json::Map::new();
        root.insert(ROOT_KEY.to_string(), self.version.shape(full));
        Ok(JsonValue::Object(root))
    }
}

impl Serialize for VersionedPropertyDetails {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        use serde::ser::Error as _;
        self.to_json()
            .map_err(S::Error::custom)?
            .serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for VersionedPropertyDetails {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        struct Wire {
            #[serde(rename = "PropertyDetails")]
            details: PropertyDetails,
        }

        let wire = Wire::deserialize(deserializer)?;
        let version = if wire.details.meta_data.api_version.is_empty() {
            SchemaVersion::default()
        } else {
            wire.details
                .meta_data
                .api_version
                .parse()
                .map_err(de::Error::custom)?
        };
        Ok(Self::new(wire.details, version))
    }
}
