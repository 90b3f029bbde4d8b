//! Schema versions and their per-section field sets.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum SchemaVersion {
    #[serde(rename = "v5.7")]
    V5_7,
    #[serde(rename = "v6.0")]
    V6_0,
    #[default]
    #[serde(rename = "v6.2")]
    V6_2,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Section {
    Identification,
    Location,
    AiFields,
    PriceHistory,
    Photos,
    EnvironmentalFactors,
    DiscrepancyLogs,
    CompToSubject,
    MetaData,
}

impl Section {
    pub fn key(&self) -> &'static str {
        match self {
            Section::Identification => "identification",
            Section::Location => "location",
            Section::AiFields => "ai_fields",
            Section::PriceHistory => "price_history",
            Section::Photos => "photos",
            Section::EnvironmentalFactors => "environmental_factors",
            Section::DiscrepancyLogs => "discrepancy_logs",
            Section::CompToSubject => "comp_to_subject",
            Section::MetaData => "meta_data",
        }
    }
}

const SECTIONS_V5_7: &[Section] = &[
    Section::Identification,
    Section::Location,
    Section::AiFields,
    Section::PriceHistory,
    Section::Photos,
    Section::MetaData,
];

const SECTIONS_V6_0: &[Section] = &[
    Section::Identification,
    Section::Location,
    Section::AiFields,
    Section::PriceHistory,
    Section::Photos,
    Section::EnvironmentalFactors,
    Section::MetaData,
];

const SECTIONS_V6_2: &[Section] = &[
    Section::Identification,
    Section::Location,
    Section::AiFields,
    Section::PriceHistory,
    Section::Photos,
    Section::EnvironmentalFactors,
    Section::DiscrepancyLogs,
    Section::CompToSubject,
    Section::MetaData,
];

const IDENT_V5_7: &[&str] = &[
    "address_full",
    "street",
    "city",
    "state",
    "postal_code",
    "property_type",
    "year_built",
    "living_sqft",
    "lot_sqft",
    "bedrooms",
    "bathrooms_full",
    "bathrooms_half",
    "heating_type",
    "exterior_materials",
    "interior_materials",
];

const IDENT_V6_0: &[&str] = &[
    "apn",
    "address_full",
    "street",
    "city",
    "state",
    "postal_code",
    "zoning",
    "property_type",
    "property_use",
    "landUse",
    "legalDescription",
    "propertyClass",
    "exterior_materials",
    "interior_materials",
    "year_built",
    "living_sqft",
    "building_sqft",
    "lot_sqft",
    "lot_acres",
    "floor_count",
    "bedrooms",
    "bathrooms_full",
    "bathrooms_half",
    "basement",
    "basement_type",
    "basementFinishedPercent",
    "basementSquareFeet",
    "basementSquareFeetFinished",
    "basementSquareFeetUnfinished",
    "unit_count",
    "building_count",
    "attic",
    "foundation_type",
    "roof_type",
    "roof_construction_type",
    "parking_type",
    "parking_spaces",
    "parking_space_sqft",
    "pool",
    "deck",
    "deck_area",
    "patio",
    "patio_area",
    "porch_type",
    "porch_area",
    "rv_parking",
    "fireplace",
    "fireplaces",
    "air_conditioning_type",
    "heating_type",
    "heating_fuel_type",
    "water_type",
    "sewer_type",
    "hoa",
    "hoa_fee_annual",
];

const IDENT_V6_2: &[&str] = &[
    "apn",
    "street",
    "city",
    "state",
    "postal_code",
    "address_full",
    "zoning",
    "property_type",
    "property_use",
    "landUse",
    "legalDescription",
    "propertyClass",
    "exterior_materials",
    "interior_materials",
    "year_built",
    "living_sqft",
    "building_sqft",
    "lot_sqft",
    "lot_acres",
    "floor_count",
    "story_count",
    "bedrooms",
    "bathrooms_full",
    "bathrooms_half",
    "basement",
    "basement_type",
    "basementFinishedPercent",
    "basementSquareFeet",
    "basementSquareFeetFinished",
    "basementSquareFeetUnfinished",
    "unit_count",
    "building_count",
    "attic",
    "foundation_type",
    "roof_type",
    "roof_construction_type",
    "parking_type",
    "parking_spaces",
    "parking_space_sqft",
    "adu_present",
    "adu_sqft",
    "pool",
    "deck",
    "deck_area",
    "patio",
    "patio_area",
    "porch_type",
    "porch_area",
    "rv_parking",
    "fireplace",
    "fireplaces",
    "air_conditioning_type",
    "heating_type",
    "heating_fuel_type",
    "water_type",
    "sewer_type",
    "gated_community",
    "age_restricted",
    "historic_district",
    "site_elevation_ft",
    "schools",
    "hoa",
    "hoa_fee_annual",
];

const LOCATION_V5_7: &[&str] = &["lat", "lon", "county_fips", "subdivision", "neighborhood"];

const LOCATION_V6_0: &[&str] = &[
    "lat",
    "lon",
    "county_fips",
    "census_block",
    "census_block_group",
    "census_tract",
    "subdivision",
    "neighborhood",
    "flood_zone",
];

const LOCATION_V6_2: &[&str] = &[
    "lat",
    "lon",
    "county_fips",
    "subdivision",
    "neighborhood",
    "census_block",
    "census_block_group",
    "census_tract",
    "school_district",
    "flood_zone",
];

const AI_LEGACY: &[&str] = &[
    "architectural_styles",
    "finish_quality_score",
    "condition_score",
    "road_relations",
];

const AI_V6_2: &[&str] = &[
    "architectural_styles",
    "finish_quality_score",
    "finish_quality_label",
    "curb_appeal_score",
    "curb_appeal_label",
    "condition_score",
    "condition_label",
    "property_uniqueness_score",
    "street_quality_score",
    "solar_panels",
    "occupied",
    "road_relations",
    "golf_course_relation",
    "golf_course_distance_ft",
    "commercial_relation",
    "commercial_distance_ft",
    "commercial_relation_type",
    "railroad_relation",
    "railroad_distance_ft",
    "school_relation",
    "school_distance_ft",
    "water_relation_type",
    "water_relation",
    "water_distance_ft",
    "split_level",
    "lot_type",
    "professional_photos",
    "staged",
    "property_notes",
];

const PRICE_V5_7: &[&str] = &[
    "property_market_status",
    "list_price",
    "last_sale_price",
    "mls_history",
    "sale_history",
];

const PRICE_V6_0: &[&str] = &[
    "property_market_status",
    "list_price",
    "listed_date",
    "last_sale_price",
    "last_sale_date",
    "mls_history",
    "sale_history",
];

const PRICE_V6_2: &[&str] = &[
    "property_market_status",
    "list_price",
    "listed_date",
    "last_sale_price",
    "last_sale_date",
    "property_strategy_type",
    "listing_description",
    "mls_history",
    "sale_history",
];

const META: &[&str] = &[
    "data_source",
    "source_property_id",
    "fetch_timestamp",
    "api_version",
];

impl SchemaVersion {
    pub const ALL: [SchemaVersion; 3] = [SchemaVersion::V5_7, SchemaVersion::V6_0, SchemaVersion::V6_2];

    pub fn as_str(&self) -> &'static str {
        match self {
            SchemaVersion::V5_7 => "v5.7",
            SchemaVersion::V6_0 => "v6.0",
            SchemaVersion::V6_2 => "v6.2",
        }
    }

    /// Top-level sections in emission order.
    pub fn sections(&self) -> &'static [Section] {
        match self {
            SchemaVersion::V5_7 => SECTIONS_V5_7,
            SchemaVersion::V6_0 => SECTIONS_V6_0,
            SchemaVersion::V6_2 => SECTIONS_V6_2,
        }
    }

    pub fn has_section(&self, section: Section) -> bool {
        self.sections().contains(&section)
    }

    /// Ordered field list for an object section. `None` means the section is
    /// emitted as-is (photo lists, hazard ratings, opaque blocks).
    pub fn section_fields(&self, section: Section) -> Option<&'static [&'static str]> {
        let fields = match (section, self) {
            (Section::Identification, SchemaVersion::V5_7) => IDENT_V5_7,
            (Section::Identification, SchemaVersion::V6_0) => IDENT_V6_0,
            (Section::Identification, SchemaVersion::V6_2) => IDENT_V6_2,
            (Section::Location, SchemaVersion::V5_7) => LOCATION_V5_7,
            (Section::Location, SchemaVersion::V6_0) => LOCATION_V6_0,
            (Section::Location, SchemaVersion::V6_2) => LOCATION_V6_2,
            (Section::AiFields, SchemaVersion::V6_2) => AI_V6_2,
            (Section::AiFields, _) => AI_LEGACY,
            (Section::PriceHistory, SchemaVersion::V5_7) => PRICE_V5_7,
            (Section::PriceHistory, SchemaVersion::V6_0) => PRICE_V6_0,
            (Section::PriceHistory, SchemaVersion::V6_2) => PRICE_V6_2,
            (Section::MetaData, _) => META,
            _ => return None,
        };
        Some(fields)
    }

    /// Project a superset document onto this version: only the version's
    /// sections, each object section reduced to the version's fields in order.
    /// Fields absent from the input come out as null.
    pub fn shape(&self, full: JsonValue) -> JsonValue {
        let mut full = match full {
            JsonValue::Object(map) => map,
            other => return other,
        };

        let mut out = Map::new();
        for section in self.sections() {
            let value = full.remove(section.key()).unwrap_or(JsonValue::Null);
            let value = match (self.section_fields(*section), value) {
                (Some(fields), JsonValue::Object(mut source)) => {
                    let mut projected = Map::new();
                    for field in fields {
                        let v = source.remove(*field).unwrap_or(JsonValue::Null);
                        projected.insert((*field).to_string(), v);
                    }
                    JsonValue::Object(projected)
                }
                (_, value) => value,
            };
            out.insert(section.key().to_string(), value);
        }
        JsonValue::Object(out)
    }
}

impl fmt::Display for SchemaVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownSchemaVersion(pub String);

impl fmt::Display for UnknownSchemaVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown schema version `{}` (expected v5.7, v6.0 or v6.2)", self.0)
    }
}

impl std::error::Error for UnknownSchemaVersion {}

impl FromStr for SchemaVersion {
    type Err = UnknownSchemaVersion;

    /// Accepts `v6.2`, `6.2` and suffixed labels such as `v6.2_CLIENT_APPROVED`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let bare = trimmed
            .strip_prefix('v')
            .or_else(|| trimmed.strip_prefix('V'))
            .unwrap_or(trimmed);
        let head = bare.split(['_', ' ', '-']).next().unwrap_or_default();
        match head {
            "5.7" => Ok(SchemaVersion::V5_7),
            "6.0" => Ok(SchemaVersion::V6_0),
            "6.2" => Ok(SchemaVersion::V6_2),
            _ => Err(UnknownSchemaVersion(s.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn keys(value: &JsonValue) -> Vec<String> {
        value.as_object().unwrap().keys().cloned().collect()
    }

    #[test]
    fn parses_labels_with_and_without_prefix() {
        assert_eq!("v6.2".parse::<SchemaVersion>().unwrap(), SchemaVersion::V6_2);
        assert_eq!("6.0".parse::<SchemaVersion>().unwrap(), SchemaVersion::V6_0);
        assert_eq!(
            "v5.7_CLIENT_APPROVED".parse::<SchemaVersion>().unwrap(),
            SchemaVersion::V5_7
        );
        assert!("v7.1".parse::<SchemaVersion>().is_err());
    }

    #[test]
    fn section_sets_grow_with_version() {
        assert!(!SchemaVersion::V5_7.has_section(Section::EnvironmentalFactors));
        assert!(SchemaVersion::V6_0.has_section(Section::EnvironmentalFactors));
        assert!(!SchemaVersion::V6_0.has_section(Section::DiscrepancyLogs));
        assert!(SchemaVersion::V6_2.has_section(Section::CompToSubject));
        assert_eq!(SchemaVersion::V6_2.sections().last(), Some(&Section::MetaData));
    }

    #[test]
    fn field_counts_match_each_version() {
        let ident = |v: SchemaVersion| v.section_fields(Section::Identification).unwrap().len();
        assert_eq!(ident(SchemaVersion::V5_7), 15);
        assert_eq!(ident(SchemaVersion::V6_0), 55);
        assert_eq!(ident(SchemaVersion::V6_2), 63);
        assert_eq!(
            SchemaVersion::V6_2.section_fields(Section::AiFields).unwrap().len(),
            29
        );
        assert_eq!(
            SchemaVersion::V6_0.section_fields(Section::AiFields).unwrap().len(),
            4
        );
        assert!(SchemaVersion::V6_2.section_fields(Section::Photos).is_none());
    }

    #[test]
    fn shape_drops_unknown_fields_and_fills_missing_with_null() {
        let full = json!({
            "identification": {"apn": "123", "city": "Tampa", "story_count": 2.0},
            "location": {"lat": 28.0, "lon": -82.5},
            "environmental_factors": {"flood": null},
            "meta_data": {"data_source": "REAPI"},
            "comp_to_subject": null,
        });

        let v57 = SchemaVersion::V5_7.shape(full.clone());
        assert_eq!(
            keys(&v57),
            vec!["identification", "location", "ai_fields", "price_history", "photos", "meta_data"]
        );
        assert!(v57["identification"].get("apn").is_none());
        assert_eq!(v57["identification"]["city"], "Tampa");
        assert_eq!(v57["identification"]["year_built"], JsonValue::Null);

        let v62 = SchemaVersion::V6_2.shape(full);
        let ident = keys(&v62["identification"]);
        assert_eq!(&ident[..6], ["apn", "street", "city", "state", "postal_code", "address_full"]);
        assert_eq!(v62["identification"]["story_count"], 2.0);
        assert_eq!(v62["ai_fields"], JsonValue::Null);
        assert_eq!(keys(&v62["meta_data"]), META);
    }
}
