//! Listing-site source (Zillow via RapidAPI).
//!
//! Only the fields Zillow exposes as-is are mapped; everything else in the
//! schema stays null.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use propx_core::{
    DataSource, Identification, Location, MlsEvent, Photo, PhotoSource, PriceHistory,
    PropertyDetails, RawRecord,
};
use propx_storage::HttpFetcher;
use serde_json::{json, Value as JsonValue};
use tracing::{debug, warn};

use crate::mapper::{full_address, json_at, json_f64, json_i64, json_str, json_string, json_u32, lot_acres};
use crate::vocab::{HEATING_TYPE, PROPERTY_TYPE};
use crate::{AdapterError, FetchOutcome, ListingSearch, ListingSummary, SourceAdapter, SourceEndpoint};

pub const DEFAULT_PHOTO_SIZE: (u32, u32) = (1024, 768);

const PHOTO_SIZE_PATTERNS: &[(&str, (u32, u32))] = &[
    ("uncropped_scaled_within_1536_1024", (1536, 1024)),
    ("uncropped_scaled_within_1344_1008", (1344, 1008)),
    ("uncropped_scaled_within_1024_768", (1024, 768)),
    ("uncropped_scaled_within_960_720", (960, 720)),
];

/// Width and height from Zillow's scaled-image URL naming.
pub fn photo_dimensions(url: &str) -> (u32, u32) {
    PHOTO_SIZE_PATTERNS
        .iter()
        .find(|(pattern, _)| url.contains(pattern))
        .map(|(_, size)| *size)
        .unwrap_or(DEFAULT_PHOTO_SIZE)
}

/// Expects `{"property": {...}, "photos": {"images": [...]}}`.
pub fn map_payload(
    payload: &JsonValue,
    identifier: &str,
    fetched_at: DateTime<Utc>,
) -> Option<PropertyDetails> {
    let prop = payload.get("property")?;
    let details = prop.get("propertyDetails").unwrap_or(&JsonValue::Null);

    let street = json_str(prop, &["address", "streetAddress"]);
    let city = json_str(prop, &["address", "city"]);
    let state = json_str(prop, &["address", "state"]);
    let zipcode = json_str(prop, &["address", "zipcode"]);
    let lot_sqft = json_i64(details, &["lotSize"]);

    let identification = Identification {
        address_full: full_address(street, city, state, zipcode),
        street: street.map(str::to_string),
        city: city.map(str::to_string),
        state: state.map(str::to_string),
        postal_code: zipcode.map(str::to_string),
        property_type: PROPERTY_TYPE.map(json_str(details, &["homeType"])),
        year_built: json_i64(details, &["yearBuilt"]).and_then(|y| i32::try_from(y).ok()),
        living_sqft: json_i64(details, &["livingArea"]),
        lot_sqft,
        lot_acres: lot_acres(lot_sqft),
        bedrooms: json_u32(details, &["bedrooms"]),
        bathrooms_full: json_f64(details, &["bathrooms"])
            .filter(|b| *b >= 0.0)
            .map(|b| b.floor() as u32),
        bathrooms_half: None,
        heating_type: HEATING_TYPE.map(json_str(details, &["heating", "type"])),
        ..Identification::default()
    };

    let location = Location {
        lat: json_f64(prop, &["latitude"]),
        lon: json_f64(prop, &["longitude"]),
        ..Location::default()
    };

    let price_history = PriceHistory {
        property_market_status: json_str(prop, &["homeStatus"]).map(str::to_string),
        list_price: json_i64(prop, &["price"]),
        mls_history: mls_history(prop),
        ..PriceHistory::default()
    };

    let mut record = PropertyDetails::empty(DataSource::Zillow, fetched_at);
    record.identification = identification;
    record.location = location;
    record.price_history = price_history;
    record.photos = photos(payload);
    record.meta_data.source_property_id = json_string(prop, &["zpid"])
        .or_else(|| Some(identifier.trim().to_string()).filter(|id| !id.is_empty()));
    Some(record)
}

fn mls_history(prop: &JsonValue) -> Vec<MlsEvent> {
    let Some(entries) = json_at(prop, &["priceHistory"]).and_then(JsonValue::as_array) else {
        return Vec::new();
    };
    entries
        .iter()
        .filter_map(|entry| {
            let price = json_i64(entry, &["price"]).filter(|p| *p != 0)?;
            let date = json_str(entry, &["date"])?;
            Some(MlsEvent {
                price,
                date: date.to_string(),
                event: json_str(entry, &["event"]).unwrap_or("Unknown").to_string(),
                source: DataSource::Zillow.as_str().to_string(),
            })
        })
        .collect()
}

fn photos(payload: &JsonValue) -> Vec<Photo> {
    let Some(images) = json_at(payload, &["photos", "images"]).and_then(JsonValue::as_array) else {
        return Vec::new();
    };
    images
        .iter()
        .filter_map(JsonValue::as_str)
        .map(|url| {
            let (width, height) = photo_dimensions(url);
            Photo {
                sources: vec![PhotoSource::unassigned(url, width, height)],
            }
        })
        .collect()
}

/// `props[]` of a property search response, reduced to id and address.
pub fn parse_search_results(response: &JsonValue, limit: usize) -> Vec<ListingSummary> {
    let Some(props) = json_at(response, &["props"]).and_then(JsonValue::as_array) else {
        return Vec::new();
    };
    props
        .iter()
        .filter_map(|p| {
            Some(ListingSummary {
                listing_id: json_string(p, &["zpid"])?,
                address: json_str(p, &["address"]).map(str::to_string),
            })
        })
        .take(limit)
        .collect()
}

#[derive(Debug, Clone)]
pub struct ZillowAdapter {
    http: HttpFetcher,
    endpoint: SourceEndpoint,
}

impl ZillowAdapter {
    pub fn new(http: HttpFetcher, endpoint: SourceEndpoint) -> Self {
        Self { http, endpoint }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.endpoint.base_url.trim_end_matches('/'), path)
    }

    fn headers(&self) -> Vec<(&str, &str)> {
        let mut headers = vec![("x-rapidapi-key", self.endpoint.api_key.as_str())];
        if let Some(host) = &self.endpoint.host {
            headers.push(("x-rapidapi-host", host.as_str()));
        }
        headers
    }
}

#[async_trait]
impl SourceAdapter for ZillowAdapter {
    fn source(&self) -> DataSource {
        DataSource::Zillow
    }

    async fn fetch(&self, identifier: &str) -> Result<FetchOutcome, AdapterError> {
        let zpid = identifier.trim();
        if zpid.is_empty() {
            return Err(AdapterError::Message("zillow fetch needs a zpid".to_string()));
        }

        let headers = self.headers();
        let property = self
            .http
            .get_json(&self.url("property"), &[("zpid", zpid)], &headers)
            .await?;
        if property.is_null() || property.as_object().is_some_and(|o| o.is_empty()) {
            return Ok(FetchOutcome::Empty);
        }

        // The property endpoint returns the listing at the top level.
        let property = match property.get("property") {
            Some(inner) => inner.clone(),
            None => property,
        };

        let photos = match self
            .http
            .get_json(&self.url("photos"), &[("zpid", zpid)], &headers)
            .await
        {
            Ok(photos) => photos,
            Err(err) => {
                warn!(zpid, error = %err, "zillow photo fetch failed; continuing without photos");
                JsonValue::Null
            }
        };

        debug!(zpid, "zillow property fetched");
        Ok(FetchOutcome::Found(RawRecord {
            source: DataSource::Zillow,
            identifier: zpid.to_string(),
            fetched_at: Utc::now(),
            payload: json!({"property": property, "photos": photos}),
        }))
    }
}

#[async_trait]
impl ListingSearch for ZillowAdapter {
    async fn search(&self, address: &str, limit: usize) -> Result<Vec<ListingSummary>, AdapterError> {
        let headers = self.headers();
        let response = self
            .http
            .get_json(
                &self.url("propertyExtendedSearch"),
                &[
                    ("location", address),
                    ("status_type", "ForSale"),
                    ("home_type", "Houses"),
                    ("sort", "Newest"),
                    ("page", "1"),
                ],
                &headers,
            )
            .await?;
        let results = parse_search_results(&response, limit);
        debug!(address, found = results.len(), "zillow search complete");
        Ok(results)
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
        json!({
            "property": {
                "zpid": 45102311,
                "address": {"streetAddress": "7711 Palmbrook Dr", "city": "Tampa", "state": "FL", "zipcode": "33615"},
                "propertyDetails": {
                    "homeType": "SINGLE_FAMILY",
                    "yearBuilt": 1978,
                    "livingArea": 1840,
                    "lotSize": 8712,
                    "bedrooms": 3,
                    "bathrooms": 2.5,
                    "heating": {"type": "Heat pump"}
                },
                "latitude": 28.01561,
                "longitude": -82.56533,
                "price": 389000,
                "homeStatus": "FOR_SALE",
                "priceHistory": [
                    {"price": 389000, "date": "2025-04-02", "event": "Listed for sale"},
                    {"price": null, "date": "2024-01-01", "event": "Listing removed"},
                    {"price": 214000, "date": "2016-07-19"}
                ]
            },
            "photos": {"images": [
                "https://photos.zillowstatic.com/fp/a-uncropped_scaled_within_1536_1024.jpg",
                "https://photos.zillowstatic.com/fp/b-p_e.jpg",
                {"url": "ignored"}
            ]}
        })
    }

    #[test]
    fn maps_as_is_listing_fields() {
        let record = map_payload(&sample_payload(), "45102311", fetched_at()).unwrap();
        let ident = &record.identification;
        assert_eq!(ident.address_full.as_deref(), Some("7711 Palmbrook Dr, Tampa, FL 33615"));
        assert_eq!(ident.property_type.as_deref(), Some("SFR"));
        assert_eq!(ident.bathrooms_full, Some(2));
        assert_eq!(ident.bathrooms_half, None);
        assert_eq!(ident.heating_type.as_deref(), Some("HeatPump"));
        assert_eq!(ident.lot_acres, Some(0.2));
        assert!(ident.apn.is_none());
        assert!(record.location.census_tract.is_none());
        assert_eq!(record.meta_data.source_property_id.as_deref(), Some("45102311"));
    }

    #[test]
    fn price_history_skips_incomplete_events_and_never_fills_sales() {
        let record = map_payload(&sample_payload(), "45102311", fetched_at()).unwrap();
        let history = &record.price_history;
        assert_eq!(history.mls_history.len(), 2);
        assert_eq!(history.mls_history[1].event, "Unknown");
        assert!(history.mls_history.iter().all(|e| e.source == "Zillow"));
        assert!(history.sale_history.is_empty());
        assert_eq!(history.list_price, Some(389_000));
    }

    #[test]
    fn photos_take_dimensions_from_url_pattern() {
        let record = map_payload(&sample_payload(), "45102311", fetched_at()).unwrap();
        assert_eq!(record.photos.len(), 2);
        let first = &record.photos[0].sources[0];
        assert_eq!((first.width, first.height), (1536, 1024));
        let second = &record.photos[1].sources[0];
        assert_eq!((second.width, second.height), DEFAULT_PHOTO_SIZE);
        assert_eq!(second.classification_type, "unassigned");
    }

    #[test]
    fn unknown_home_type_maps_to_other_and_missing_stays_null() {
        let mut payload = sample_payload();
        payload["property"]["propertyDetails"]["homeType"] = json!("YURT");
        let record = map_payload(&payload, "1", fetched_at()).unwrap();
        assert_eq!(record.identification.property_type.as_deref(), Some("Other"));

        payload["property"]["propertyDetails"] = JsonValue::Null;
        let record = map_payload(&payload, "1", fetched_at()).unwrap();
        assert_eq!(record.identification.property_type, None);
        assert_eq!(record.identification.heating_type, None);
    }

    #[test]
    fn search_results_respect_limit_and_skip_rows_without_id() {
        let response = json!({"props": [
            {"zpid": 1, "address": "1 A St"},
            {"address": "no id"},
            {"zpid": "2", "address": "2 B St"},
            {"zpid": 3}
        ]});
        let found = parse_search_results(&response, 2);
        assert_eq!(found.len(), 2);
        assert_eq!(found[1].listing_id, "2");
        assert!(parse_search_results(&json!({}), 10).is_empty());
    }
}
