use super::common::*;
use axum::body::Body;
use axum::extract::State;
use axum::http::{header, Request, StatusCode};
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

use crate::config::SearchSettings;
use crate::workflows::nearby::domain::Coordinate;
use crate::workflows::nearby::router::{nearby_router, search_handler, NearbySearchRequest};

fn router() -> axum::Router {
    let geocoder =
        ScriptedGeocoder::default().answer("123 Main St, Springfield", Coordinate::new(10.0, 20.0));
    let places = ScriptedPlaces::default().answer(
        "restaurant",
        vec![place("poi.1", "Luigi's"), place("poi.2", "Moe's")],
    );
    let (orchestrator, _, _) =
        scripted_orchestrator(geocoder, places, SearchSettings::default());
    nearby_router(Arc::new(orchestrator))
}

fn post(uri: &str, payload: Value) -> Request<Body> {
    Request::post(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(serde_json::to_vec(&payload).unwrap()))
        .unwrap()
}

async fn read_json(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn search_route_returns_results_in_order() {
    let response = router()
        .oneshot(post(
            "/api/v1/nearby/search",
            json!({ "records": [HELPING_HANDS, "Ghost Aid, 0 Nowhere, Atlantis"] }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = read_json(response).await;
    let results = body.as_array().expect("array of results");
    assert_eq!(results.len(), 1);
    assert_eq!(results[0]["name"], "Helping Hands");
    assert_eq!(results[0]["location"]["city"], "Springfield");
    assert_eq!(results[0]["nearbyPlaces"]["restaurants"].as_array().unwrap().len(), 2);
    assert_eq!(results[0]["nearbyPlaces"]["religious"], json!([]));

}

#[tokio::test]
async fn search_route_includes_report_on_request() {
    let response = router()
        .oneshot(post(
            "/api/v1/nearby/search",
            json!({
                "records": ["Ghost Aid, 0 Nowhere, Atlantis"],
                "include_report": true
            }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = read_json(response).await;
    assert_eq!(body["submitted"], 1);
    assert_eq!(body["results"], json!([]));
    assert_eq!(body["skipped"][0]["name"], "Ghost Aid");
    assert_eq!(body["skipped"][0]["reason"]["kind"], "not_found");
}

#[tokio::test]
async fn features_route_returns_marker_collection() {
    let response = router()
        .oneshot(post(
            "/api/v1/nearby/features",
            json!({ "records": [HELPING_HANDS] }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = read_json(response).await;
    assert_eq!(body["type"], "FeatureCollection");
    let features = body["features"].as_array().expect("features array");
    assert_eq!(features.len(), 3);
    assert_eq!(features[0]["properties"]["type"], "main");
    assert_eq!(features[0]["geometry"]["coordinates"], json!([10.0, 20.0]));
    assert_eq!(features[1]["properties"]["type"], "restaurant");
}

#[tokio::test]
async fn empty_batches_are_rejected() {
    let (orchestrator, _, _) = scripted_orchestrator(
        ScriptedGeocoder::default(),
        ScriptedPlaces::default(),
        SearchSettings::default(),
    );

    let response = search_handler(
        State(Arc::new(orchestrator)),
        axum::Json(NearbySearchRequest {
            records: Vec::new(),
            include_report: false,
        }),
    )
    .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}
