//! Fixed source-to-output vocabularies for enumerated fields.
//!
//! Lookups are total: any unrecognized value maps to the table's fallback.
//! A missing value stays missing.

pub struct VocabularyTable {
    name: &'static str,
    entries: &'static [(&'static str, &'static str)],
    fallback: &'static str,
}

impl VocabularyTable {
    pub const fn new(
        name: &'static str,
        entries: &'static [(&'static str, &'static str)],
        fallback: &'static str,
    ) -> Self {
        Self {
            name,
            entries,
            fallback,
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn lookup(&self, raw: &str) -> &'static str {
        let key = normalize_key(raw);
        self.entries
            .iter()
            .find(|(k, _)| *k == key)
            .map(|(_, v)| *v)
            .unwrap_or(self.fallback)
    }

    pub fn map(&self, raw: Option<&str>) -> Option<String> {
        raw.map(|value| self.lookup(value).to_string())
    }
}

/// `"Single Family"`, `"single-family"` and `"SINGLE_FAMILY"` share a key.
pub fn normalize_key(raw: &str) -> String {
    let mut key = String::with_capacity(raw.len());
    let mut pending_sep = false;
    for ch in raw.trim().chars() {
        if ch.is_whitespace() || ch == '-' || ch == '_' {
            pending_sep = true;
            continue;
        }
        if pending_sep && !key.is_empty() {
            key.push('_');
        }
        pending_sep = false;
        key.extend(ch.to_uppercase());
    }
    key
}

pub const PROPERTY_TYPE: VocabularyTable = VocabularyTable::new(
    "property_type",
    &[
        ("SINGLE_FAMILY", "SFR"),
        ("SINGLE_FAMILY_RESIDENTIAL", "SFR"),
        ("SINGLE_FAMILY_RESIDENCE", "SFR"),
        ("RESIDENTIAL", "SFR"),
        ("SFR", "SFR"),
        ("TOWNHOUSE", "Townhome"),
        ("TOWNHOME", "Townhome"),
        ("CONDO", "Condo"),
        ("CONDOMINIUM", "Condo"),
        ("MULTI_FAMILY", "MFR"),
        ("APARTMENT", "MFR"),
        ("MANUFACTURED", "Manufactured"),
        ("MANUFACTURED_HOME", "Manufactured"),
        ("MOBILE", "MobileHome"),
        ("MOBILE_HOME", "MobileHome"),
        ("LOT", "Land"),
        ("LAND", "Land"),
        ("VACANT", "Land"),
        ("VACANT_LAND", "Land"),
    ],
    "Other",
);

pub const HEATING_TYPE: VocabularyTable = VocabularyTable::new(
    "heating_type",
    &[
        ("FORCED_AIR", "ForcedAirUnit"),
        ("HEAT_PUMP", "HeatPump"),
        ("RADIANT", "Radiant"),
        ("BASEBOARD", "Baseboard"),
        ("ELECTRIC", "Electric"),
        ("GAS", "Gas"),
        ("NONE", "None"),
    ],
    "Other",
);

pub const AC_TYPE: VocabularyTable = VocabularyTable::new(
    "air_conditioning_type",
    &[
        ("CENTRAL_AIR", "Central"),
        ("CENTRAL", "Central"),
        ("WINDOW_UNIT", "WindowUnit"),
        ("NONE", "None"),
    ],
    "Other",
);

pub const FOUNDATION_TYPE: VocabularyTable = VocabularyTable::new(
    "foundation_type",
    &[
        ("SLAB", "Concrete Slab"),
        ("CONCRETE_SLAB", "Concrete Slab"),
        ("CRAWL_SPACE", "Crawlspace"),
        ("CRAWLSPACE", "Crawlspace"),
        ("BASEMENT", "Basement"),
        ("PIER", "Pier"),
    ],
    "Other",
);

pub const ROOF_TYPE: VocabularyTable = VocabularyTable::new(
    "roof_type",
    &[
        ("ASPHALT_SHINGLE", "AsphaltShingle"),
        ("METAL", "Metal"),
        ("TILE", "Tile"),
        ("SLATE", "Slate"),
    ],
    "Other",
);

pub const ALL_TABLES: [&VocabularyTable; 5] = [
    &PROPERTY_TYPE,
    &HEATING_TYPE,
    &AC_TYPE,
    &FOUNDATION_TYPE,
    &ROOF_TYPE,
];
