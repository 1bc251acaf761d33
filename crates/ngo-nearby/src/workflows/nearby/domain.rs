use std::collections::HashSet;
use std::fmt;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// One batch entry, parsed from `"<name>, <addressLine>, <city>"`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LocationRecord {
    pub name: String,
    pub address_line: String,
    pub city: String,
}

impl LocationRecord {
    /// Splits on every comma and trims each field. Commas inside a field are not
    /// escapable, so anything after the third field is dropped. Every field must
    /// be non-empty after trimming.
    pub fn parse(raw: &str) -> Result<Self, RecordParseError> {
        let mut fields = raw.split(',').map(str::trim);

        let name = next_field(&mut fields, RecordField::Name)?;
        let address_line = next_field(&mut fields, RecordField::AddressLine)?;
        let city = next_field(&mut fields, RecordField::City)?;

        Ok(Self {
            name,
            address_line,
            city,
        })
    }

    /// Free text sent to the geocoder.
    pub fn geocode_query(&self) -> String {
        format!("{}, {}", self.address_line, self.city)
    }
}

fn next_field<'a>(
    fields: &mut impl Iterator<Item = &'a str>,
    field: RecordField,
) -> Result<String, RecordParseError> {
    match fields.next() {
        Some(value) if !value.is_empty() => Ok(value.to_string()),
        _ => Err(RecordParseError::MissingField(field)),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordField {
    Name,
    AddressLine,
    City,
}

impl fmt::Display for RecordField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            RecordField::Name => "name",
            RecordField::AddressLine => "address line",
            RecordField::City => "city",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RecordParseError {
    #[error("location record is missing its {0}")]
    MissingField(RecordField),
}

/// Longitude/latitude pair in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub lng: f64,
    pub lat: f64,
}

impl Coordinate {
    pub const fn new(lng: f64, lat: f64) -> Self {
        Self { lng, lat }
    }

    /// GeoJSON ordering: `[lng, lat]`.
    pub fn position(&self) -> [f64; 2] {
        [self.lng, self.lat]
    }
}

/// Axis-aligned search window in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BoundingBox {
    pub west: f64,
    pub south: f64,
    pub east: f64,
    pub north: f64,
}

impl BoundingBox {
    /// Provider wire form: `west,south,east,north`.
    pub fn to_query_value(&self) -> String {
        format!("{},{},{},{}", self.west, self.south, self.east, self.north)
    }
}

/// A configured search category.
///
/// `key` names the bucket in [`NgoSearchResult::nearby_places`]; `query` is the
/// category text sent to the provider; `marker` is the `type` tag on this
/// category's map features. The default set files `temple` results under
/// `religious` and tags restaurant markers `restaurant`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaceCategory {
    pub key: String,
    pub query: String,
    pub marker: String,
}

impl PlaceCategory {
    /// The marker tag starts out equal to the key.
    pub fn new(key: impl Into<String>, query: impl Into<String>) -> Self {
        let key = key.into();
        Self {
            marker: key.clone(),
            key,
            query: query.into(),
        }
    }

    pub fn with_marker(mut self, marker: impl Into<String>) -> Self {
        self.marker = marker.into();
        self
    }
}

/// Ordered, duplicate-free set of categories searched for every record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CategorySet(Vec<PlaceCategory>);

impl CategorySet {
    pub fn new(categories: Vec<PlaceCategory>) -> Result<Self, CategoryParseError> {
        if categories.is_empty() {
            return Err(CategoryParseError::Empty);
        }

        let mut seen = HashSet::new();
        for category in &categories {
            if category.key.is_empty() || category.query.is_empty() || category.marker.is_empty()
            {
                return Err(CategoryParseError::BlankEntry);
            }
            if !seen.insert(category.key.as_str()) {
                return Err(CategoryParseError::DuplicateKey(category.key.clone()));
            }
        }

        Ok(Self(categories))
    }

    /// `restaurants` (provider `restaurant`, marker `restaurant`) and
    /// `religious` (provider `temple`, marker `religious`).
    pub fn standard() -> Self {
        Self(vec![
            PlaceCategory::new("restaurants", "restaurant").with_marker("restaurant"),
            PlaceCategory::new("religious", "temple"),
        ])
    }

    /// Parses comma-separated `key[:query[:marker]]` entries. A missing query or
    /// marker falls back to the key.
    pub fn parse(raw: &str) -> Result<Self, CategoryParseError> {
        let categories = raw
            .split(',')
            .map(str::trim)
            .filter(|entry| !entry.is_empty())
            .map(|entry| {
                let mut parts = entry.splitn(3, ':').map(str::trim);
                let key = parts.next().unwrap_or_default();
                let query = parts.next().unwrap_or(key);
                let marker = parts.next().unwrap_or(key);
                PlaceCategory::new(key, query).with_marker(marker)
            })
            .collect();

        Self::new(categories)
    }

    /// Marker tag for a category key, if the key is configured.
    pub fn marker_for(&self, key: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|category| category.key == key)
            .map(|category| category.marker.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = &PlaceCategory> {
        self.0.iter()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(|category| category.key.as_str())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CategoryParseError {
    #[error("at least one category is required")]
    Empty,
    #[error("category entries need a non-empty key, query and marker")]
    BlankEntry,
    #[error("category key '{0}' is listed more than once")]
    DuplicateKey(String),
}

/// A point of interest returned by the place search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Place {
    pub id: String,
    pub name: String,
    pub address: String,
    pub coordinates: Coordinate,
    pub category: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NearbyLocation {
    pub name: String,
    pub city: String,
}

/// Aggregate for one successfully geocoded record. `nearby_places` keeps the
/// configured category order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NgoSearchResult {
    pub name: String,
    pub location: NearbyLocation,
    pub coordinates: Coordinate,
    pub nearby_places: IndexMap<String, Vec<Place>>,
}

impl NgoSearchResult {
    pub fn new(record: LocationRecord, coordinates: Coordinate) -> Self {
        Self {
            name: record.name,
            location: NearbyLocation {
                name: record.address_line,
                city: record.city,
            },
            coordinates,
            nearby_places: IndexMap::new(),
        }
    }

    pub fn places(&self, category_key: &str) -> &[Place] {
        self.nearby_places
            .get(category_key)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }
}
