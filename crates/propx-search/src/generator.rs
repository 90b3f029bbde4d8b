//! Synthetic comparable properties around a subject location.
//!
//! One synthetic property yields a raw payload for each source. Both go
//! through the same field mapper as live data.

use chrono::{DateTime, Duration, NaiveDate, Utc};
use propx_adapters::map_record;
use propx_core::{Coordinates, DataSource, ExtractionItem, RawRecord, SchemaVersion};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use serde_json::{json, Value as JsonValue};

const STREETS: &[&str] = &[
    "Palmbrook Dr",
    "Westchase Blvd",
    "Carrollwood Blvd",
    "Dale Mabry Hwy",
    "Linebaugh Ave",
    "Gunn Hwy",
    "Van Dyke Rd",
    "Sheldon Rd",
    "Bruce B Downs Blvd",
    "Fletcher Ave",
    "Fowler Ave",
    "Bearss Ave",
    "Waters Ave",
    "Hillsborough Ave",
    "Kennedy Blvd",
    "Gandy Blvd",
];

const NEIGHBORHOODS: &[&str] = &[
    "Town N Country",
    "Westchase",
    "Carrollwood",
    "Temple Terrace",
    "Brandon",
    "Riverview",
    "Valrico",
    "Fishhawk Ranch",
    "New Tampa",
    "Lutz",
    "Land O' Lakes",
    "Wesley Chapel",
    "Twelve Oaks Village",
    "Countryway",
    "Northdale",
    "University Area",
];

const SUBDIVISIONS: &[&str] = &[
    "Twelve Oaks Village Unit No 2",
    "Westchase",
    "Carrollwood Village",
    "Hunter's Green",
    "Fishhawk Ranch",
    "Bloomingdale",
    "Valrico",
    "Cross Creek",
    "Heritage Harbor",
    "Tampa Palms",
    "New Tampa",
    "Countryway",
    "Northdale",
    "University Square",
];

const POSTAL_CODES: &[&str] = &["33615", "33618", "33624", "33625", "33626", "33647"];
const ZONING: &[&str] = &["RSC-6", "RSC-4", "PD", "R-1", "R-2"];
const ROOFS: &[&str] = &["Asphalt Shingle", "Tile", "Metal"];
const ROOF_CONSTRUCTION: &[&str] = &["Gable", "Hip"];
const FUELS: &[&str] = &["Electric", "Gas"];
const FLOOD_ZONES: &[&str] = &["X", "AE", "A"];
const MARKET_STATUS: &[&str] = &["OffMarket", "Active", "Pending"];
const HILLSBOROUGH_FIPS: &str = "12057";

pub const YEAR_BUILT_RANGE: (i32, i32) = (1970, 2023);
pub const COORDINATE_JITTER_DEG: f64 = 0.03;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SampleKind {
    Sfr,
    Townhome,
    Condo,
}

impl SampleKind {
    const ALL: [SampleKind; 3] = [SampleKind::Sfr, SampleKind::Townhome, SampleKind::Condo];

    pub fn living_sqft_range(&self) -> (i64, i64) {
        match self {
            SampleKind::Sfr => (1200, 4500),
            SampleKind::Townhome => (1000, 2800),
            SampleKind::Condo => (800, 2200),
        }
    }

    pub fn lot_sqft_range(&self) -> (i64, i64) {
        match self {
            SampleKind::Sfr => (6000, 15000),
            SampleKind::Townhome => (0, 3000),
            SampleKind::Condo => (0, 0),
        }
    }

    pub fn price_range(&self) -> (i64, i64) {
        match self {
            SampleKind::Sfr => (200_000, 800_000),
            SampleKind::Townhome => (150_000, 450_000),
            SampleKind::Condo => (100_000, 350_000),
        }
    }

    /// Listing-site vocabulary.
    fn home_type(&self) -> &'static str {
        match self {
            SampleKind::Sfr => "SINGLE_FAMILY",
            SampleKind::Townhome => "TOWNHOUSE",
            SampleKind::Condo => "CONDO",
        }
    }

    /// Property-records vocabulary.
    fn records_type(&self) -> &'static str {
        match self {
            SampleKind::Sfr => "Single Family Residential",
            SampleKind::Townhome => "Townhouse",
            SampleKind::Condo => "Condominium",
        }
    }
}

/// Bedroom choices per living-area band. Bands never step backwards.
pub fn bedroom_choices(living_sqft: i64) -> &'static [u32] {
    match living_sqft {
        s if s < 1200 => &[2, 3],
        s if s < 2000 => &[3, 4],
        s if s < 3000 => &[3, 4, 5],
        _ => &[4, 5, 6],
    }
}

pub fn bathroom_choices(living_sqft: i64) -> &'static [u32] {
    match living_sqft {
        s if s < 1200 => &[1, 2],
        s if s < 2000 => &[2, 3],
        s if s < 3000 => &[2, 3, 4],
        _ => &[3, 4, 5],
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SyntheticSale {
    pub date: NaiveDate,
    pub price: i64,
}

/// Attributes drawn for one synthetic property before rendering into
/// source payloads.
#[derive(Debug, Clone, PartialEq)]
pub struct SyntheticProperty {
    pub kind: SampleKind,
    pub street: String,
    pub postal_code: String,
    pub coordinates: Coordinates,
    pub year_built: i32,
    pub living_sqft: i64,
    pub lot_sqft: i64,
    pub bedrooms: u32,
    pub bathrooms_full: u32,
    pub bathrooms_half: u32,
    pub list_price: i64,
    pub listed_date: NaiveDate,
    pub sales: Vec<SyntheticSale>,
    pub zpid: u64,
    pub record_id: u64,
}

pub struct SampleGenerator<R> {
    rng: R,
    center: Coordinates,
    now: DateTime<Utc>,
}

impl SampleGenerator<StdRng> {
    pub fn seeded(seed: u64, center: Coordinates, now: DateTime<Utc>) -> Self {
        Self::new(StdRng::seed_from_u64(seed), center, now)
    }

    pub fn from_entropy(center: Coordinates, now: DateTime<Utc>) -> Self {
        Self::new(StdRng::from_entropy(), center, now)
    }
}

impl<R: Rng> SampleGenerator<R> {
    pub fn new(rng: R, center: Coordinates, now: DateTime<Utc>) -> Self {
        Self { rng, center, now }
    }

    fn pick<'a>(&mut self, options: &'a [&'a str]) -> &'a str {
        options.choose(&mut self.rng).copied().unwrap_or_default()
    }

    fn pick_u32(&mut self, options: &[u32]) -> u32 {
        options.choose(&mut self.rng).copied().unwrap_or_default()
    }

    fn jitter(&mut self, base: f64) -> f64 {
        let value = base + self.rng.gen_range(-COORDINATE_JITTER_DEG..=COORDINATE_JITTER_DEG);
        (value * 1e6).round() / 1e6
    }

    pub fn draw(&mut self) -> SyntheticProperty {
        let kind = SampleKind::ALL[self.rng.gen_range(0..SampleKind::ALL.len())];
        let (lo, hi) = kind.living_sqft_range();
        let living_sqft = self.rng.gen_range(lo..=hi);
        let (lo, hi) = kind.lot_sqft_range();
        let lot_sqft = if hi > 0 { self.rng.gen_range(lo..=hi) } else { 0 };
        let year_built = self.rng.gen_range(YEAR_BUILT_RANGE.0..=YEAR_BUILT_RANGE.1);

        let (lo, hi) = kind.price_range();
        let mut price = self.rng.gen_range(lo..=hi) as f64;
        if year_built > 2010 {
            price *= self.rng.gen_range(1.1..=1.3);
        }
        if living_sqft > 2500 {
            price *= self.rng.gen_range(1.1..=1.2);
        }
        let list_price = price as i64;

        let bedrooms = self.pick_u32(bedroom_choices(living_sqft));
        let bathrooms_full = self.pick_u32(bathroom_choices(living_sqft));
        let bathrooms_half = if self.rng.gen_bool(0.3) { self.rng.gen_range(0..=1) } else { 0 };

        let street_number: u32 = self.rng.gen_range(1000..=9999);
        let street = format!("{street_number} {}", self.pick(STREETS));
        let postal_code = self.pick(POSTAL_CODES).to_string();
        let coordinates = Coordinates {
            lat: self.jitter(self.center.lat),
            lon: self.jitter(self.center.lon),
        };

        let today = self.now.date_naive();
        let listed_date = today - Duration::days(self.rng.gen_range(1..=90));
        let sales = self.sale_history(list_price, year_built, today);

        SyntheticProperty {
            kind,
            street,
            postal_code,
            coordinates,
            year_built,
            living_sqft,
            lot_sqft,
            bedrooms,
            bathrooms_full,
            bathrooms_half,
            list_price,
            listed_date,
            sales,
            zpid: self.rng.gen_range(10_000_000..=99_999_999),
            record_id: self.rng.gen_range(100_000_000..=999_999_999),
        }
    }

    /// 1-3 prior sales, 2-15 years back, discounted at 3-7% a year. Oldest first.
    fn sale_history(&mut self, current_price: i64, year_built: i32, today: NaiveDate) -> Vec<SyntheticSale> {
        use chrono::Datelike;

        let max_back = (today.year() - year_built).clamp(2, 15);
        let count = self.rng.gen_range(1..=3);
        let mut sales = (0..count)
            .map(|_| {
                let years_back = self.rng.gen_range(2..=max_back);
                let days = i64::from(years_back) * 365 + self.rng.gen_range(0..=365);
                let rate: f64 = self.rng.gen_range(0.03..=0.07);
                SyntheticSale {
                    date: today - Duration::days(days),
                    price: (current_price as f64 / (1.0 + rate).powi(years_back)) as i64,
                }
            })
            .collect::<Vec<_>>();
        sales.sort_by_key(|s| s.date);
        sales
    }

    fn zillow_payload(&mut self, p: &SyntheticProperty) -> JsonValue {
        let images = (1..=2)
            .map(|n| {
                let photo_id: u32 = self.rng.gen_range(1_000_000..=9_999_999);
                format!(
                    "https://photos.zillowstatic.com/fp/property_{photo_id}_{n}-uncropped_scaled_within_1024_768.jpg"
                )
            })
            .collect::<Vec<_>>();

        json!({
            "property": {
                "zpid": p.zpid,
                "address": {
                    "streetAddress": p.street,
                    "city": "Tampa",
                    "state": "FL",
                    "zipcode": p.postal_code,
                },
                "propertyDetails": {
                    "homeType": p.kind.home_type(),
                    "yearBuilt": p.year_built,
                    "livingArea": p.living_sqft,
                    "lotSize": p.lot_sqft,
                    "bedrooms": p.bedrooms,
                    "bathrooms": p.bathrooms_full,
                    "heating": {"type": "Forced air"},
                },
                "latitude": p.coordinates.lat,
                "longitude": p.coordinates.lon,
                "price": p.list_price,
                "homeStatus": "FOR_SALE",
                "priceHistory": [{
                    "price": p.list_price,
                    "date": p.listed_date.format("%Y-%m-%d").to_string(),
                    "event": "Listed",
                }],
            },
            "photos": {"images": images},
        })
    }

    fn reapi_payload(&mut self, p: &SyntheticProperty) -> JsonValue {
        let garage_spaces = match p.kind {
            SampleKind::Condo => self.pick_u32(&[0, 1]),
            _ => self.pick_u32(&[1, 2, 3]),
        };
        let mut features = Vec::new();
        if p.kind == SampleKind::Sfr && self.rng.gen_bool(0.2) {
            features.push("pool");
        }
        for (feature, odds) in [("fireplace", 0.3), ("deck", 0.5), ("patio", 0.5), ("attic", 0.5), ("hoa", 0.5)] {
            if self.rng.gen_bool(odds) {
                features.push(feature);
            }
        }
        let hoa_fee = (features.contains(&"hoa")).then(|| self.rng.gen_range(300..=1200));
        let subdivision = self.pick(SUBDIVISIONS);
        let legal = format!(
            "LOT {} BLOCK {} {}",
            self.rng.gen_range(1..=50),
            self.rng.gen_range(1..=10),
            subdivision.to_uppercase()
        );
        let last_sale = p.sales.last();
        let sale_history = p
            .sales
            .iter()
            .map(|s| {
                json!({
                    "price": s.price,
                    "date": s.date.format("%Y-%m-%d").to_string(),
                    "transaction_type": "ArmsLengthResidential",
                })
            })
            .collect::<Vec<_>>();

        let building = json!({
            "year_built": p.year_built,
            "size": {
                "living_area": p.living_sqft,
                "gross_area": (p.living_sqft as f64 * self.rng.gen_range(1.1..=1.3)) as i64,
            },
            "stories": self.pick_u32(&[1, 2]),
            "rooms": {"beds": p.bedrooms, "baths": p.bathrooms_full, "partial_baths": p.bathrooms_half},
            "construction": {
                "exterior_walls": "Concrete Block",
                "foundation": "Slab",
                "roof": self.pick(ROOFS),
                "roof_construction": self.pick(ROOF_CONSTRUCTION),
            },
            "heating": "Forced Air",
            "cooling": "Central Air",
            "heating_fuel": self.pick(FUELS),
            "water_source": "Public",
            "sewer": "Public",
            "parking": {
                "garage_spaces": garage_spaces,
                "garage_type": if garage_spaces > 0 { "Attached Garage" } else { "None" },
                "garage_sqft": garage_spaces * 200,
            },
            "other_features": features,
        });
        let census = json!({
            "block": self.rng.gen_range(1000..=9999).to_string(),
            "block_group": self.rng.gen_range(1..=9).to_string(),
            "tract": self.rng.gen_range(100_000..=999_999).to_string(),
            "county_fips": HILLSBOROUGH_FIPS,
        });
        let market = json!({
            "status": self.pick(MARKET_STATUS),
            "list_price": p.list_price,
            "listed_date": p.listed_date.format("%Y-%m-%d").to_string(),
            "last_sale_price": last_sale.map(|s| s.price),
            "last_sale_date": last_sale.map(|s| s.date.format("%Y-%m-%d").to_string()),
        });
        let parcel_number = format!(
            "U{}I{}{}",
            self.rng.gen_range(10_000_000..=99_999_999),
            self.rng.gen_range(100_000..=999_999),
            self.rng.gen_range(1000..=9999)
        );
        let sub_type = match p.kind {
            SampleKind::Sfr => "Single Family Residence",
            SampleKind::Townhome => "Townhouse",
            SampleKind::Condo => "Condominium",
        };

        json!({"data": {"property": {
            "id": p.record_id,
            "parcel_number": parcel_number,
            "address": {
                "line": p.street,
                "city": "Tampa",
                "state_code": "FL",
                "postal_code": p.postal_code,
                "coordinate": {"lat": p.coordinates.lat, "lon": p.coordinates.lon},
            },
            "type": p.kind.records_type(),
            "sub_type": sub_type,
            "land_use": "RESIDENTIAL",
            "legal_description": legal,
            "property_class": "Residential",
            "zoning": self.pick(ZONING),
            "building": building,
            "lot_size": {"size": p.lot_sqft},
            "community": {"name": subdivision},
            "neighborhood": self.pick(NEIGHBORHOODS),
            "census": census,
            "flood": {"zone": self.pick(FLOOD_ZONES)},
            "hoa": {"fee_annual": hoa_fee},
            "market": market,
            "sale_history": sale_history,
        }}})
    }

    /// Raw payloads for both sources describing one synthetic property.
    pub fn generate(&mut self) -> (RawRecord, RawRecord) {
        let property = self.draw();
        let zillow = RawRecord {
            source: DataSource::Zillow,
            identifier: property.zpid.to_string(),
            fetched_at: self.now,
            payload: self.zillow_payload(&property),
        };
        let reapi = RawRecord {
            source: DataSource::Reapi,
            identifier: format!("{}, Tampa, FL {}", property.street, property.postal_code),
            fetched_at: self.now,
            payload: self.reapi_payload(&property),
        };
        (zillow, reapi)
    }

    pub fn generate_item(&mut self, version: SchemaVersion) -> ExtractionItem {
        let (zillow, reapi) = self.generate();
        ExtractionItem {
            zillow: map_record(&zillow, version),
            reapi: map_record(&reapi, version),
        }
    }
}
