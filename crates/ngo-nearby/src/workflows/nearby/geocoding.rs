use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, error};

use crate::config::ProviderConfig;

use super::domain::Coordinate;
use super::provider::{ProviderError, ProviderTransport};

/// Why a query produced no coordinate.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GeocodeError {
    #[error("no geocoding match for '{query}'")]
    NotFound { query: String },
    #[error(transparent)]
    Service(#[from] ProviderError),
}

/// Resolves free text to a coordinate, keeping "no match" apart from
/// "provider unavailable".
#[async_trait]
pub trait Geocoder: Send + Sync {
    async fn resolve(&self, query: &str) -> Result<Coordinate, GeocodeError>;
}

pub struct GeocodingClient<T> {
    config: ProviderConfig,
    transport: Arc<T>,
}

impl<T> GeocodingClient<T>
where
    T: ProviderTransport,
{
    pub fn new(config: ProviderConfig, transport: Arc<T>) -> Self {
        Self { config, transport }
    }

    /// Answers with the first feature's coordinate. Failures are logged and
    /// collapse to `None`; use [`Geocoder::resolve`] to see which one happened.
    pub async fn geocode(&self, query: &str) -> Option<Coordinate> {
        match self.resolve(query).await {
            Ok(coordinate) => Some(coordinate),
            Err(err) => {
                error!(%query, error = %err, "error geocoding location");
                None
            }
        }
    }
}

#[async_trait]
impl<T> Geocoder for GeocodingClient<T>
where
    T: ProviderTransport,
{
    async fn resolve(&self, query: &str) -> Result<Coordinate, GeocodeError> {
        let url = self.config.endpoint(query, &[])?;
        let collection = self.transport.fetch(url).await?;

        let coordinate = collection
            .features
            .first()
            .map(|feature| feature.coordinate())
            .ok_or_else(|| GeocodeError::NotFound {
                query: query.to_string(),
            })?;

        debug!(%query, lng = coordinate.lng, lat = coordinate.lat, "geocoded");
        Ok(coordinate)
    }
}
