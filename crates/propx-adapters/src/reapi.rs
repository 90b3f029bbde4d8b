//! Property-records source (Real Estate API).

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use propx_core::{
    DataSource, Identification, Location, PriceHistory, PropertyDetails, RawRecord, SaleEvent,
};
use propx_storage::HttpFetcher;
use serde_json::{json, Value as JsonValue};
use tracing::debug;

use crate::mapper::{
    full_address, json_at, json_f64, json_i64, json_str, json_string, json_u32, lot_acres,
    FeatureSet,
};
use crate::vocab::{AC_TYPE, FOUNDATION_TYPE, HEATING_TYPE, PROPERTY_TYPE, ROOF_TYPE};
use crate::{AdapterError, FetchOutcome, SourceAdapter, SourceEndpoint};

fn owned(value: Option<&str>) -> Option<String> {
    value.map(str::to_string)
}

/// Expects `{"data": {"property": {...}}}`.
pub fn map_payload(payload: &JsonValue, fetched_at: DateTime<Utc>) -> Option<PropertyDetails> {
    let data = payload.get("data")?;
    let prop = data.get("property").unwrap_or(&JsonValue::Null);
    let address = prop.get("address").unwrap_or(&JsonValue::Null);
    let building = prop.get("building").unwrap_or(&JsonValue::Null);
    let construction = building.get("construction").unwrap_or(&JsonValue::Null);
    let parking = building.get("parking").unwrap_or(&JsonValue::Null);
    let features = FeatureSet::from_json(json_at(building, &["other_features"]));

    let street = json_str(address, &["line"]);
    let city = json_str(address, &["city"]);
    let state = json_str(address, &["state_code"]);
    let postal_code = json_str(address, &["postal_code"]);
    let lot_sqft = json_i64(prop, &["lot_size", "size"]);
    let stories = json_f64(building, &["stories"]);
    let fireplace = features.flag("fireplace");
    let porch = features.flag("porch");

    let identification = Identification {
        apn: json_string(prop, &["parcel_number"]),
        address_full: full_address(street, city, state, postal_code),
        street: owned(street),
        city: owned(city),
        state: owned(state),
        postal_code: owned(postal_code),
        zoning: owned(json_str(prop, &["zoning"])),
        property_type: PROPERTY_TYPE.map(json_str(prop, &["type"])),
        property_use: owned(json_str(prop, &["sub_type"])),
        land_use: owned(json_str(prop, &["land_use"])),
        legal_description: owned(json_str(prop, &["legal_description"])),
        property_class: owned(json_str(prop, &["property_class"])),
        exterior_materials: json_str(construction, &["exterior_walls"])
            .map(|walls| vec![walls.to_string()])
            .unwrap_or_default(),
        year_built: json_i64(building, &["year_built"]).and_then(|y| i32::try_from(y).ok()),
        living_sqft: json_i64(building, &["size", "living_area"]),
        building_sqft: json_i64(building, &["size", "gross_area"]),
        lot_sqft,
        lot_acres: lot_acres(lot_sqft),
        floor_count: stories,
        story_count: stories,
        bedrooms: json_u32(building, &["rooms", "beds"]),
        bathrooms_full: json_u32(building, &["rooms", "baths"]),
        bathrooms_half: json_u32(building, &["rooms", "partial_baths"]),
        basement: features.flag("basement"),
        attic: features.flag("attic"),
        foundation_type: FOUNDATION_TYPE.map(json_str(construction, &["foundation"])),
        roof_type: ROOF_TYPE.map(json_str(construction, &["roof"])),
        roof_construction_type: owned(json_str(construction, &["roof_construction"])),
        parking_type: owned(json_str(parking, &["garage_type"])),
        parking_spaces: json_u32(parking, &["garage_spaces"]),
        parking_space_sqft: json_i64(parking, &["garage_sqft"]),
        pool: features.flag("pool"),
        deck: features.flag("deck"),
        patio: features.flag("patio"),
        porch_type: porch.and_then(|p| p.then(|| "Open".to_string())),
        rv_parking: features.flag("rv"),
        fireplace,
        fireplaces: fireplace.map(u32::from),
        air_conditioning_type: AC_TYPE.map(json_str(building, &["cooling"])),
        heating_type: HEATING_TYPE.map(json_str(building, &["heating"])),
        heating_fuel_type: owned(json_str(building, &["heating_fuel"])),
        water_type: owned(json_str(building, &["water_source"])),
        sewer_type: owned(json_str(building, &["sewer"])),
        hoa: features.flag("hoa"),
        hoa_fee_annual: json_i64(prop, &["hoa", "fee_annual"]),
        ..Identification::default()
    };

    let location = Location {
        lat: json_f64(address, &["coordinate", "lat"]),
        lon: json_f64(address, &["coordinate", "lon"]),
        county_fips: json_string(prop, &["census", "county_fips"])
            .or_else(|| json_string(prop, &["county_fips"])),
        subdivision: owned(json_str(prop, &["community", "name"])),
        neighborhood: owned(
            json_str(prop, &["neighborhood"]).or_else(|| json_str(prop, &["neighborhood", "name"])),
        ),
        census_block: json_string(prop, &["census", "block"]),
        census_block_group: json_string(prop, &["census", "block_group"]),
        census_tract: json_string(prop, &["census", "tract"]),
        school_district: owned(json_str(prop, &["school_district"])),
        flood_zone: owned(json_str(prop, &["flood", "zone"])),
    };

    let price_history = PriceHistory {
        property_market_status: owned(json_str(prop, &["market", "status"])),
        list_price: json_i64(prop, &["market", "list_price"]),
        listed_date: owned(json_str(prop, &["market", "listed_date"])),
        last_sale_price: json_i64(prop, &["market", "last_sale_price"]),
        last_sale_date: owned(json_str(prop, &["market", "last_sale_date"])),
        sale_history: sale_history(prop),
        ..PriceHistory::default()
    };

    let mut record = PropertyDetails::empty(DataSource::Reapi, fetched_at);
    record.identification = identification;
    record.location = location;
    record.price_history = price_history;
    record.meta_data.source_property_id = json_string(prop, &["id"]);
    Some(record)
}

fn sale_history(prop: &JsonValue) -> Vec<SaleEvent> {
    let Some(entries) = json_at(prop, &["sale_history"]).and_then(JsonValue::as_array) else {
        return Vec::new();
    };
    entries
        .iter()
        .filter_map(|entry| {
            Some(SaleEvent {
                price: json_i64(entry, &["price"])?,
                date: json_str(entry, &["date"])?.to_string(),
                transaction_type: owned(json_str(entry, &["transaction_type"])),
            })
        })
        .collect()
}

#[derive(Debug, Clone)]
pub struct ReapiAdapter {
    http: HttpFetcher,
    endpoint: SourceEndpoint,
}

impl ReapiAdapter {
    pub fn new(http: HttpFetcher, endpoint: SourceEndpoint) -> Self {
        Self { http, endpoint }
    }
}

#[async_trait]
impl SourceAdapter for ReapiAdapter {
    fn source(&self) -> DataSource {
        DataSource::Reapi
    }

    async fn fetch(&self, identifier: &str) -> Result<FetchOutcome, AdapterError> {
        let address = identifier.trim();
        if address.is_empty() {
            return Err(AdapterError::Message("reapi fetch needs an address".to_string()));
        }

        let url = format!("{}/PropertyDetail", self.endpoint.base_url.trim_end_matches('/'));
        let response = self
            .http
            .post_json(
                &url,
                &json!({"address": address}),
                &[("x-api-key", self.endpoint.api_key.as_str())],
            )
            .await?;

        if json_at(&response, &["data"]).is_none() {
            debug!(address, "reapi returned no data block");
            return Ok(FetchOutcome::Empty);
        }

        Ok(FetchOutcome::Found(RawRecord {
            source: DataSource::Reapi,
            identifier: address.to_string(),
            fetched_at: Utc::now(),
            payload: response,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn fetched_at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 5, 28, 18, 23, 4).single().unwrap()
    }

    fn sample_payload() -> JsonValue {
        json!({"data": {"property": {
            "id": 144568423,
            "parcel_number": "U25281709I000001000140",
            "address": {
                "line": "7709 Palmbrook Dr", "city": "Tampa", "state_code": "FL", "postal_code": "33615",
                "coordinate": {"lat": 28.015482, "lon": -82.565594}
            },
            "type": "Single Family Residential",
            "sub_type": "Single Family Residence",
            "zoning": "RSC-6",
            "building": {
                "year_built": 1977,
                "size": {"living_area": 2200, "gross_area": 2500},
                "stories": 1.0,
                "rooms": {"beds": 4, "baths": 2, "partial_baths": 1},
                "construction": {"exterior_walls": "Block", "foundation": "Slab", "roof": "Asphalt Shingle", "roof_construction": "Gable"},
                "heating": "Forced Air",
                "cooling": "Central Air",
                "parking": {"garage_spaces": 2, "garage_type": "Attached Garage", "garage_sqft": 400},
                "other_features": ["Pool", "fireplace", "hoa"]
            },
            "lot_size": {"size": 10890},
            "census": {"block": "3015", "block_group": 5, "tract": "011612"},
            "flood": {"zone": "X"},
            "hoa": {"fee_annual": 850},
            "market": {"status": "OffMarket", "last_sale_price": 205000, "last_sale_date": "2013-10-23"},
            "sale_history": [
                {"price": 205000, "date": "2013-10-23", "transaction_type": "ArmsLengthResidential"},
                {"price": 187500},
                {"price": 125000, "date": "1997-08-30"}
            ]
        }}})
    }

    #[test]
    fn maps_building_lot_and_census_data() {
        let record = map_payload(&sample_payload(), fetched_at()).unwrap();
        let ident = &record.identification;
        assert_eq!(ident.apn.as_deref(), Some("U25281709I000001000140"));
        assert_eq!(ident.property_type.as_deref(), Some("SFR"));
        assert_eq!(ident.lot_acres, Some(0.25));
        assert_eq!(ident.foundation_type.as_deref(), Some("Concrete Slab"));
        assert_eq!(ident.roof_type.as_deref(), Some("AsphaltShingle"));
        assert_eq!(ident.heating_type.as_deref(), Some("ForcedAirUnit"));
        assert_eq!(ident.air_conditioning_type.as_deref(), Some("Central"));
        assert_eq!(ident.exterior_materials, vec!["Block".to_string()]);
        assert_eq!(record.location.census_block_group.as_deref(), Some("5"));
        assert_eq!(record.location.flood_zone.as_deref(), Some("X"));
        assert_eq!(record.meta_data.source_property_id.as_deref(), Some("144568423"));
    }

    #[test]
    fn feature_flags_follow_the_feature_list() {
        let record = map_payload(&sample_payload(), fetched_at()).unwrap();
        let ident = &record.identification;
        assert_eq!(ident.pool, Some(true));
        assert_eq!(ident.deck, Some(false));
        assert_eq!(ident.fireplace, Some(true));
        assert_eq!(ident.fireplaces, Some(1));
        assert_eq!(ident.porch_type, None);
        assert_eq!(ident.hoa, Some(true));
        assert_eq!(ident.hoa_fee_annual, Some(850));

        let mut payload = sample_payload();
        payload["data"]["property"]["building"]["other_features"] = JsonValue::Null;
        let record = map_payload(&payload, fetched_at()).unwrap();
        assert_eq!(record.identification.pool, None);
        assert_eq!(record.identification.fireplaces, None);
    }

    #[test]
    fn sale_history_keeps_complete_entries_and_no_mls_events() {
        let record = map_payload(&sample_payload(), fetched_at()).unwrap();
        let history = &record.price_history;
        assert_eq!(history.sale_history.len(), 2);
        assert_eq!(history.sale_history[1].transaction_type, None);
        assert!(history.mls_history.is_empty());
        assert_eq!(history.list_price, None);
    }

    #[test]
    fn missing_property_block_maps_to_all_nulls() {
        let record = map_payload(&json!({"data": {}}), fetched_at()).unwrap();
        assert_eq!(record.identification.address_full, None);
        assert_eq!(record.identification.lot_acres, None);
        assert_eq!(record.meta_data.data_source, DataSource::Reapi);
    }
}
