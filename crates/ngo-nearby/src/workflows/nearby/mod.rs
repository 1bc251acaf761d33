//! Geocode-then-search pipeline: turns `"<name>, <addressLine>, <city>"`
//! records into per-location buckets of nearby points of interest.

pub mod bbox;
pub mod domain;
pub mod features;
pub mod geocoding;
pub mod orchestrator;
pub mod places;
pub mod provider;
pub mod router;

#[cfg(test)]
mod tests;

use std::sync::Arc;

use crate::config::{ProviderConfig, SearchSettings};

pub use domain::{
    BoundingBox, CategorySet, Coordinate, LocationRecord, NearbyLocation, NgoSearchResult, Place,
    PlaceCategory, RecordParseError,
};
pub use features::{MapFeature, MapFeatureCollection};
pub use geocoding::{GeocodeError, Geocoder, GeocodingClient};
pub use orchestrator::{BatchReport, DegradedSearch, SearchOrchestrator, SkipReason, SkippedRecord};
pub use places::{PlaceSearchClient, PlaceSearcher};
pub use provider::{HttpTransport, ProviderError, ProviderTransport};
pub use router::{nearby_router, NearbySearchRequest};

/// Orchestrator wired to the real provider over HTTP.
pub type HttpSearchOrchestrator =
    SearchOrchestrator<GeocodingClient<HttpTransport>, PlaceSearchClient<HttpTransport>>;

/// Builds both clients on one shared HTTP transport.
pub fn http_orchestrator(
    provider: &ProviderConfig,
    settings: SearchSettings,
) -> Result<HttpSearchOrchestrator, ProviderError> {
    let transport = Arc::new(HttpTransport::new(provider)?);
    let geocoder = GeocodingClient::new(provider.clone(), Arc::clone(&transport));
    let places = PlaceSearchClient::new(provider.clone(), transport);
    Ok(SearchOrchestrator::new(
        Arc::new(geocoder),
        Arc::new(places),
        settings,
    ))
}
