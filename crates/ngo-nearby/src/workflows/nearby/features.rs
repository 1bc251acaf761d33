//! Point-feature collection consumed by the map layer.
//!
//! The renderer picks marker colour, radius and opacity from each feature's
//! `type` property: `"main"` for the geocoded location itself, otherwise the
//! marker tag of the category the place was filed under (`restaurant`,
//! `religious` for the standard set).

use serde::Serialize;

use super::domain::{CategorySet, Coordinate, NgoSearchResult};

pub const MAIN_MARKER: &str = "main";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MapFeatureCollection {
    #[serde(rename = "type")]
    kind: &'static str,
    pub features: Vec<MapFeature>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MapFeature {
    #[serde(rename = "type")]
    kind: &'static str,
    pub geometry: PointGeometry,
    pub properties: MarkerProperties,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PointGeometry {
    #[serde(rename = "type")]
    kind: &'static str,
    pub coordinates: [f64; 2],
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MarkerProperties {
    #[serde(rename = "type")]
    pub marker: String,
    pub name: String,
    pub location: String,
}

impl MapFeature {
    fn point(coordinate: Coordinate, properties: MarkerProperties) -> Self {
        Self {
            kind: "Feature",
            geometry: PointGeometry {
                kind: "Point",
                coordinates: coordinate.position(),
            },
            properties,
        }
    }
}

impl MapFeatureCollection {
    /// For each result: the main marker first, then its places category by category.
    /// Keys missing from `categories` are tagged with the key itself.
    pub fn from_results(results: &[NgoSearchResult], categories: &CategorySet) -> Self {
        let mut features = Vec::new();

        for result in results {
            features.push(MapFeature::point(
                result.coordinates,
                MarkerProperties {
                    marker: MAIN_MARKER.to_string(),
                    name: result.name.clone(),
                    location: format!("{}, {}", result.location.name, result.location.city),
                },
            ));

            for (key, places) in &result.nearby_places {
                let marker = categories.marker_for(key).unwrap_or(key);
                features.extend(places.iter().map(|place| {
                    MapFeature::point(
                        place.coordinates,
                        MarkerProperties {
                            marker: marker.to_string(),
                            name: place.name.clone(),
                            location: place.address.clone(),
                        },
                    )
                }));
            }
        }

        Self {
            kind: "FeatureCollection",
            features,
        }
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }
}
