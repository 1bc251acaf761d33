use crate::infra::{collect_records, print_json};
use clap::Args;
use ngo_nearby::config::AppConfig;
use ngo_nearby::error::AppError;
use ngo_nearby::telemetry::{self, LogSink};
use ngo_nearby::workflows::nearby::{http_orchestrator, MapFeatureCollection};
use std::path::PathBuf;
use tracing::info;

#[derive(Args, Debug, Default)]
pub(crate) struct SearchArgs {
    /// Location record formatted "<name>, <address line>, <city>" (repeatable)
    #[arg(long = "record")]
    pub(crate) records: Vec<String>,
    /// File with one record per line; blank lines and `#` comments are ignored
    #[arg(long)]
    pub(crate) input: Option<PathBuf>,
    /// Print a map feature collection instead of the search results
    #[arg(long, conflicts_with = "report")]
    pub(crate) features: bool,
    /// Print the full batch report, including skipped records
    #[arg(long)]
    pub(crate) report: bool,
    /// Override how many records are processed at once
    #[arg(long, value_parser = parse_concurrency)]
    pub(crate) concurrency: Option<usize>,
}

fn parse_concurrency(raw: &str) -> Result<usize, String> {
    match raw.trim().parse::<usize>() {
        Ok(value) if value > 0 => Ok(value),
        _ => Err(format!("'{raw}' is not a positive number of workers")),
    }
}

pub(crate) async fn run_search(args: SearchArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;
    telemetry::init_with_sink(&config.telemetry, LogSink::Stderr)?;

    if let Some(concurrency) = args.concurrency {
        config.search.concurrency = concurrency;
    }

    let records = collect_records(args.records, args.input.as_deref())?;
    if records.is_empty() {
        return Err(AppError::Input(
            "provide at least one --record or a non-empty --input file".to_string(),
        ));
    }

    let orchestrator = http_orchestrator(&config.provider, config.search)?;
    info!(
        records = records.len(),
        categories = orchestrator.settings().categories.len(),
        concurrency = orchestrator.settings().concurrency,
        "starting nearby search batch"
    );

    if args.report {
        let report = orchestrator.run_with_report(&records).await;
        print_json(&report)
    } else if args.features {
        let results = orchestrator.run(&records).await;
        print_json(&MapFeatureCollection::from_results(
            &results,
            &orchestrator.settings().categories,
        ))
    } else {
        let results = orchestrator.run(&records).await;
        print_json(&results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn concurrency_must_be_positive() {
        assert_eq!(parse_concurrency("4"), Ok(4));
        assert!(parse_concurrency("0").is_err());
        assert!(parse_concurrency("many").is_err());
    }
}
