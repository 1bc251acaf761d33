use std::collections::HashMap;
use std::io::Write;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tracing_subscriber::fmt::MakeWriter;
use url::Url;

use crate::config::{ProviderConfig, SearchSettings};
use crate::workflows::nearby::domain::{BoundingBox, Coordinate, Place};
use crate::workflows::nearby::geocoding::{GeocodeError, Geocoder, GeocodingClient};
use crate::workflows::nearby::orchestrator::SearchOrchestrator;
use crate::workflows::nearby::places::{PlaceSearchClient, PlaceSearcher};
use crate::workflows::nearby::provider::{
    FeatureCollection, FeatureProperties, ProviderError, ProviderFeature, ProviderTransport,
};

pub(super) const HELPING_HANDS: &str = "Helping Hands, 123 Main St, Springfield";

pub(super) fn provider_config() -> ProviderConfig {
    ProviderConfig::new(
        Url::parse("https://api.example.test/geocoding/v5/mapbox.places").expect("valid url"),
        "pk.test-token",
    )
}

pub(super) fn feature(id: &str, name: &str, center: [f64; 2], category: &str) -> ProviderFeature {
    ProviderFeature {
        id: id.to_string(),
        text: name.to_string(),
        place_name: format!("{name}, 1 Market St, Springfield"),
        center,
        properties: FeatureProperties {
            category: Some(category.to_string()),
        },
    }
}

pub(super) fn collection(features: Vec<ProviderFeature>) -> FeatureCollection {
    FeatureCollection { features }
}

pub(super) fn place(id: &str, name: &str) -> Place {
    Place {
        id: id.to_string(),
        name: name.to_string(),
        address: format!("{name}, Springfield"),
        coordinates: Coordinate::new(10.01, 20.01),
        category: "restaurant".to_string(),
    }
}

/// Answers by matching a needle against the request path; unmatched requests
/// get an empty feature list.
#[derive(Default)]
pub(super) struct FakeTransport {
    responses: Vec<(String, Result<FeatureCollection, ProviderError>)>,
    requests: Mutex<Vec<Url>>,
}

impl FakeTransport {
    pub(super) fn respond(
        mut self,
        path_needle: &str,
        response: Result<FeatureCollection, ProviderError>,
    ) -> Self {
        self.responses.push((path_needle.to_string(), response));
        self
    }

    pub(super) fn requests(&self) -> Vec<Url> {
        self.requests.lock().expect("request log poisoned").clone()
    }
}

#[async_trait]
impl ProviderTransport for FakeTransport {
    async fn fetch(&self, url: Url) -> Result<FeatureCollection, ProviderError> {
        self.requests
            .lock()
            .expect("request log poisoned")
            .push(url.clone());

        self.responses
            .iter()
            .find(|(needle, _)| url.path().contains(needle.as_str()))
            .map(|(_, response)| response.clone())
            .unwrap_or_else(|| Ok(collection(Vec::new())))
    }
}

pub(super) type ClientOrchestrator =
    SearchOrchestrator<GeocodingClient<FakeTransport>, PlaceSearchClient<FakeTransport>>;

pub(super) fn client_orchestrator(
    transport: FakeTransport,
    settings: SearchSettings,
) -> (ClientOrchestrator, Arc<FakeTransport>) {
    let transport = Arc::new(transport);
    let geocoder = GeocodingClient::new(provider_config(), Arc::clone(&transport));
    let places = PlaceSearchClient::new(provider_config(), Arc::clone(&transport));
    let orchestrator = SearchOrchestrator::new(Arc::new(geocoder), Arc::new(places), settings);
    (orchestrator, transport)
}

/// Geocoder answering from a fixed table, optionally slowed per query.
#[derive(Default)]
pub(super) struct ScriptedGeocoder {
    answers: HashMap<String, Result<Coordinate, GeocodeError>>,
    delays: HashMap<String, Duration>,
    in_flight: AtomicUsize,
    peak: AtomicUsize,
    calls: Mutex<Vec<String>>,
}

impl ScriptedGeocoder {
    pub(super) fn answer(mut self, query: &str, coordinate: Coordinate) -> Self {
        self.answers.insert(query.to_string(), Ok(coordinate));
        self
    }

    pub(super) fn fail(mut self, query: &str, error: GeocodeError) -> Self {
        self.answers.insert(query.to_string(), Err(error));
        self
    }

    pub(super) fn delay(mut self, query: &str, delay: Duration) -> Self {
        self.delays.insert(query.to_string(), delay);
        self
    }

    pub(super) fn peak_in_flight(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }

    pub(super) fn calls(&self) -> Vec<String> {
        self.calls.lock().expect("call log poisoned").clone()
    }
}

#[async_trait]
impl Geocoder for ScriptedGeocoder {
    async fn resolve(&self, query: &str) -> Result<Coordinate, GeocodeError> {
        self.calls
            .lock()
            .expect("call log poisoned")
            .push(query.to_string());

        let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(current, Ordering::SeqCst);

        if let Some(delay) = self.delays.get(query) {
            tokio::time::sleep(*delay).await;
        }

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        self.answers
            .get(query)
            .cloned()
            .unwrap_or_else(|| {
                Err(GeocodeError::NotFound {
                    query: query.to_string(),
                })
            })
    }
}

/// Place searcher answering per provider category; unknown categories are empty.
#[derive(Default)]
pub(super) struct ScriptedPlaces {
    answers: HashMap<String, Result<Vec<Place>, ProviderError>>,
    calls: Mutex<Vec<(BoundingBox, String, usize)>>,
}

impl ScriptedPlaces {
    pub(super) fn answer(mut self, category: &str, places: Vec<Place>) -> Self {
        self.answers.insert(category.to_string(), Ok(places));
        self
    }

    pub(super) fn fail(mut self, category: &str, error: ProviderError) -> Self {
        self.answers.insert(category.to_string(), Err(error));
        self
    }

    pub(super) fn calls(&self) -> Vec<(BoundingBox, String, usize)> {
        self.calls.lock().expect("call log poisoned").clone()
    }
}

#[async_trait]
impl PlaceSearcher for ScriptedPlaces {
    async fn find(
        &self,
        bbox: &BoundingBox,
        category: &str,
        limit: usize,
    ) -> Result<Vec<Place>, ProviderError> {
        self.calls
            .lock()
            .expect("call log poisoned")
            .push((*bbox, category.to_string(), limit));

        self.answers
            .get(category)
            .cloned()
            .unwrap_or_else(|| Ok(Vec::new()))
    }
}

pub(super) fn scripted_orchestrator(
    geocoder: ScriptedGeocoder,
    places: ScriptedPlaces,
    settings: SearchSettings,
) -> (
    SearchOrchestrator<ScriptedGeocoder, ScriptedPlaces>,
    Arc<ScriptedGeocoder>,
    Arc<ScriptedPlaces>,
) {
    let geocoder = Arc::new(geocoder);
    let places = Arc::new(places);
    let orchestrator =
        SearchOrchestrator::new(Arc::clone(&geocoder), Arc::clone(&places), settings);
    (orchestrator, geocoder, places)
}

/// In-memory sink for `tracing` output.
#[derive(Clone, Default)]
pub(super) struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

impl CapturedLogs {
    pub(super) fn contents(&self) -> String {
        let bytes = self.0.lock().expect("log buffer poisoned");
        String::from_utf8_lossy(&bytes).into_owned()
    }
}

impl Write for CapturedLogs {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0
            .lock()
            .expect("log buffer poisoned")
            .extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for CapturedLogs {
    type Writer = CapturedLogs;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

/// Routes this thread's `tracing` events into a buffer until the guard drops.
pub(super) fn capture_logs() -> (CapturedLogs, tracing::subscriber::DefaultGuard) {
    let logs = CapturedLogs::default();
    let subscriber = tracing_subscriber::fmt()
        .with_writer(logs.clone())
        .with_ansi(false)
        .with_max_level(tracing::Level::DEBUG)
        .finish();
    let guard = tracing::subscriber::set_default(subscriber);
    (logs, guard)
}
