use metrics_exporter_prometheus::PrometheusHandle;
use ngo_nearby::error::AppError;
use serde::Serialize;
use std::io::{BufRead, BufReader, Read, Write};
use std::path::Path;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// Inline records first, then the file's records in line order.
pub(crate) fn collect_records(
    inline: Vec<String>,
    input: Option<&Path>,
) -> Result<Vec<String>, AppError> {
    let mut records: Vec<String> = inline
        .into_iter()
        .filter(|record| !record.trim().is_empty())
        .collect();

    if let Some(path) = input {
        let file = std::fs::File::open(path)?;
        records.extend(read_record_lines(file)?);
    }

    Ok(records)
}

pub(crate) fn read_record_lines<R: Read>(reader: R) -> Result<Vec<String>, AppError> {
    let mut records = Vec::new();
    for line in BufReader::new(reader).lines() {
        let line = line?;
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        records.push(trimmed.to_string());
    }
    Ok(records)
}

pub(crate) fn print_json<T: Serialize>(value: &T) -> Result<(), AppError> {
    let rendered = serde_json::to_string_pretty(value)
        .map_err(|err| AppError::Io(std::io::Error::other(err)))?;
    let mut stdout = std::io::stdout().lock();
    writeln!(stdout, "{rendered}")?;
    Ok(())
}
