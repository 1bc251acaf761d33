use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;

use super::features::MapFeatureCollection;
use super::geocoding::Geocoder;
use super::orchestrator::SearchOrchestrator;
use super::places::PlaceSearcher;

#[derive(Debug, Clone, Deserialize)]
pub struct NearbySearchRequest {
    pub records: Vec<String>,
    #[serde(default)]
    pub include_report: bool,
}

/// Router builder exposing the batch search over HTTP.
pub fn nearby_router<G, P>(orchestrator: Arc<SearchOrchestrator<G, P>>) -> Router
where
    G: Geocoder + 'static,
    P: PlaceSearcher + 'static,
{
    Router::new()
        .route("/api/v1/nearby/search", post(search_handler::<G, P>))
        .route("/api/v1/nearby/features", post(features_handler::<G, P>))
        .with_state(orchestrator)
}

pub(crate) async fn search_handler<G, P>(
    State(orchestrator): State<Arc<SearchOrchestrator<G, P>>>,
    Json(request): Json<NearbySearchRequest>,
) -> Response
where
    G: Geocoder + 'static,
    P: PlaceSearcher + 'static,
{
    if request.records.is_empty() {
        return empty_batch_response();
    }

    if request.include_report {
        let report = orchestrator.run_with_report(&request.records).await;
        (StatusCode::OK, Json(report)).into_response()
    } else {
        let results = orchestrator.run(&request.records).await;
        (StatusCode::OK, Json(results)).into_response()
    }
}

pub(crate) async fn features_handler<G, P>(
    State(orchestrator): State<Arc<SearchOrchestrator<G, P>>>,
    Json(request): Json<NearbySearchRequest>,
) -> Response
where
    G: Geocoder + 'static,
    P: PlaceSearcher + 'static,
{
    if request.records.is_empty() {
        return empty_batch_response();
    }

    let results = orchestrator.run(&request.records).await;
    let categories = &orchestrator.settings().categories;
    let collection = MapFeatureCollection::from_results(&results, categories);
    (StatusCode::OK, Json(collection)).into_response()
}

fn empty_batch_response() -> Response {
    let payload = json!({
        "error": "records must contain at least one location",
    });
    (StatusCode::BAD_REQUEST, Json(payload)).into_response()
}
