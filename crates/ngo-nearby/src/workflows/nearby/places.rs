use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::config::{ProviderConfig, DEFAULT_SEARCH_LIMIT};

use super::domain::{BoundingBox, Place};
use super::provider::{ProviderError, ProviderFeature, ProviderTransport};

/// Finds points of interest of one provider category inside a bounding box.
#[async_trait]
pub trait PlaceSearcher: Send + Sync {
    async fn find(
        &self,
        bbox: &BoundingBox,
        category: &str,
        limit: usize,
    ) -> Result<Vec<Place>, ProviderError>;
}

pub struct PlaceSearchClient<T> {
    config: ProviderConfig,
    transport: Arc<T>,
}

impl<T> PlaceSearchClient<T>
where
    T: ProviderTransport,
{
    pub fn new(config: ProviderConfig, transport: Arc<T>) -> Self {
        Self { config, transport }
    }

    /// Searches with the default limit of 50.
    pub async fn search_default(&self, bbox: &BoundingBox, category: &str) -> Vec<Place> {
        self.search(bbox, category, DEFAULT_SEARCH_LIMIT).await
    }

    /// Never fails: provider errors are logged and yield an empty list.
    pub async fn search(&self, bbox: &BoundingBox, category: &str, limit: usize) -> Vec<Place> {
        match self.find(bbox, category, limit).await {
            Ok(places) => places,
            Err(err) => {
                warn!(%category, error = %err, "error searching places within bbox");
                Vec::new()
            }
        }
    }
}

#[async_trait]
impl<T> PlaceSearcher for PlaceSearchClient<T>
where
    T: ProviderTransport,
{
    async fn find(
        &self,
        bbox: &BoundingBox,
        category: &str,
        limit: usize,
    ) -> Result<Vec<Place>, ProviderError> {
        let params = [
            ("bbox", bbox.to_query_value()),
            ("types", "poi".to_string()),
            ("limit", limit.to_string()),
        ];
        let url = self.config.endpoint(category, &params)?;
        let collection = self.transport.fetch(url).await?;

        let reported = collection.features.len();
        let places: Vec<Place> = collection
            .features
            .into_iter()
            .take(limit)
            .map(place_from_feature)
            .collect();

        debug!(%category, reported, kept = places.len(), "place search complete");
        Ok(places)
    }
}

fn place_from_feature(feature: ProviderFeature) -> Place {
    let coordinates = feature.coordinate();
    Place {
        id: feature.id,
        name: feature.text,
        address: feature.place_name,
        coordinates,
        category: feature.properties.category.unwrap_or_default(),
    }
}
