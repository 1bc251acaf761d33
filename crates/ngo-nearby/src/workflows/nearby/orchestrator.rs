use std::collections::HashSet;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{error, info, warn};

use crate::config::SearchSettings;

use super::bbox;
use super::domain::{LocationRecord, NgoSearchResult};
use super::geocoding::{GeocodeError, Geocoder};
use super::places::PlaceSearcher;

/// Drives geocode → bounding box → per-category search for a batch of records.
///
/// Records that cannot be parsed or geocoded are logged and left out of the
/// results; category searches that fail are stored as empty lists. Output
/// order always follows input order, whatever the configured concurrency.
pub struct SearchOrchestrator<G, P> {
    geocoder: Arc<G>,
    places: Arc<P>,
    settings: Arc<SearchSettings>,
}

impl<G, P> SearchOrchestrator<G, P>
where
    G: Geocoder + 'static,
    P: PlaceSearcher + 'static,
{
    pub fn new(geocoder: Arc<G>, places: Arc<P>, settings: SearchSettings) -> Self {
        Self {
            geocoder,
            places,
            settings: Arc::new(settings),
        }
    }

    pub fn settings(&self) -> &SearchSettings {
        &self.settings
    }

    /// One result per successfully geocoded record, in input order.
    pub async fn run(&self, records: &[String]) -> Vec<NgoSearchResult> {
        self.run_with_report(records).await.results
    }

    /// Same results as [`Self::run`] plus the reasons behind every omission.
    pub async fn run_with_report(&self, records: &[String]) -> BatchReport {
        let started_at = Utc::now();

        let outcomes = if self.settings.concurrency <= 1 || records.len() <= 1 {
            self.run_sequential(records).await
        } else {
            self.run_bounded(records).await
        };

        let mut report = BatchReport {
            started_at,
            finished_at: started_at,
            submitted: records.len(),
            results: Vec::new(),
            skipped: Vec::new(),
            degraded: Vec::new(),
        };

        for outcome in outcomes {
            match outcome {
                RecordOutcome::Found { result, degraded } => {
                    report.results.push(result);
                    report.degraded.extend(degraded);
                }
                RecordOutcome::Skipped(skipped) => report.skipped.push(skipped),
            }
        }
        report.finished_at = Utc::now();

        info!(
            submitted = report.submitted,
            resolved = report.results.len(),
            skipped = report.skipped.len(),
            degraded = report.degraded.len(),
            "nearby search batch finished"
        );

        report
    }

    async fn run_sequential(&self, records: &[String]) -> Vec<RecordOutcome> {
        let mut outcomes = Vec::with_capacity(records.len());
        for (index, raw) in records.iter().enumerate() {
            let outcome = process_record(
                index,
                raw,
                self.geocoder.as_ref(),
                self.places.as_ref(),
                &self.settings,
            )
            .await;
            outcomes.push(outcome);
        }
        outcomes
    }

    async fn run_bounded(&self, records: &[String]) -> Vec<RecordOutcome> {
        let semaphore = Arc::new(Semaphore::new(self.settings.concurrency));
        let mut tasks = JoinSet::new();

        for (index, raw) in records.iter().enumerate() {
            let Ok(permit) = Arc::clone(&semaphore).acquire_owned().await else {
                break;
            };
            let geocoder = Arc::clone(&self.geocoder);
            let places = Arc::clone(&self.places);
            let settings = Arc::clone(&self.settings);
            let raw = raw.clone();

            tasks.spawn(async move {
                let outcome =
                    process_record(index, &raw, geocoder.as_ref(), places.as_ref(), &settings)
                        .await;
                drop(permit);
                (index, outcome)
            });
        }

        let mut indexed = Vec::with_capacity(records.len());
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(pair) => indexed.push(pair),
                Err(err) => error!(error = %err, "nearby search task did not complete"),
            }
        }

        let finished: HashSet<usize> = indexed.iter().map(|(index, _)| *index).collect();
        for (index, raw) in records.iter().enumerate() {
            if !finished.contains(&index) {
                error!(index, record = %raw, "dropping record whose search task failed");
                indexed.push((
                    index,
                    RecordOutcome::Skipped(SkippedRecord::new(index, raw, SkipReason::Aborted)),
                ));
            }
        }

        indexed.sort_by_key(|(index, _)| *index);
        indexed.into_iter().map(|(_, outcome)| outcome).collect()
    }
}

enum RecordOutcome {
    Found {
        result: NgoSearchResult,
        degraded: Vec<DegradedSearch>,
    },
    Skipped(SkippedRecord),
}

async fn process_record<G, P>(
    index: usize,
    raw: &str,
    geocoder: &G,
    places: &P,
    settings: &SearchSettings,
) -> RecordOutcome
where
    G: Geocoder + ?Sized,
    P: PlaceSearcher + ?Sized,
{
    let record = match LocationRecord::parse(raw) {
        Ok(record) => record,
        Err(err) => {
            error!(index, record = %raw, error = %err, "skipping malformed location record");
            return RecordOutcome::Skipped(SkippedRecord::new(
                index,
                raw,
                SkipReason::Malformed(err.to_string()),
            ));
        }
    };

    let coordinates = match geocoder.resolve(&record.geocode_query()).await {
        Ok(coordinates) => coordinates,
        Err(err) => {
            error!(
                index,
                error = %err,
                "coordinates not found for {}, {}, {}",
                record.name,
                record.address_line,
                record.city
            );
            return RecordOutcome::Skipped(SkippedRecord::new(index, raw, SkipReason::from(err)));
        }
    };

    let bbox = bbox::build_with_margin(coordinates, settings.margin);
    let mut result = NgoSearchResult::new(record, coordinates);
    let mut degraded = Vec::new();

    for category in settings.categories.iter() {
        let found = match places.find(&bbox, &category.query, settings.limit).await {
            Ok(found) => found,
            Err(err) => {
                warn!(
                    index,
                    name = %result.name,
                    category = %category.key,
                    error = %err,
                    "place search failed; storing no results for category"
                );
                degraded.push(DegradedSearch {
                    index,
                    name: result.name.clone(),
                    category: category.key.clone(),
                    error: err.to_string(),
                });
                Vec::new()
            }
        };
        result.nearby_places.insert(category.key.clone(), found);
    }

    RecordOutcome::Found { result, degraded }
}

/// Everything a batch produced, including what it had to leave out.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchReport {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub submitted: usize,
    pub results: Vec<NgoSearchResult>,
    pub skipped: Vec<SkippedRecord>,
    pub degraded: Vec<DegradedSearch>,
}

/// A record with no entry in the results.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SkippedRecord {
    pub index: usize,
    pub raw: String,
    pub name: String,
    pub reason: SkipReason,
}

impl SkippedRecord {
    fn new(index: usize, raw: &str, reason: SkipReason) -> Self {
        let name = raw.split(',').next().unwrap_or_default().trim().to_string();
        Self {
            index,
            raw: raw.to_string(),
            name,
            reason,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum SkipReason {
    Malformed(String),
    NotFound,
    ServiceError(String),
    Aborted,
}

impl From<GeocodeError> for SkipReason {
    fn from(err: GeocodeError) -> Self {
        match err {
            GeocodeError::NotFound { .. } => Self::NotFound,
            GeocodeError::Service(source) => Self::ServiceError(source.to_string()),
        }
    }
}

/// A category search that failed and was recorded as empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DegradedSearch {
    pub index: usize,
    pub name: String,
    pub category: String,
    pub error: String,
}
