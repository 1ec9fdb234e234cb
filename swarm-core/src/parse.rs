//! Parsing of the benchmark tool's output.
//!
//! The benchmark (ApacheBench) prints a text summary to stdout and writes a
//! percentile CSV (`-e`) with the columns `Percentage served,Time in ms`.

use swarm_types::LatencySample;
use thiserror::Error;

const COMPLETE_MARKER: &str = "Complete requests:";
const FAILED_MARKER: &str = "Failed requests:";
const RPS_MARKER: &str = "Requests per second:";
const RPS_SUFFIX: &str = "[#/sec] (mean)";
const TPR_MARKER: &str = "Time per request:";
const TPR_SUFFIX: &str = "[ms] (mean)";

const LATENCY_COLUMN: &str = "Time in ms";
const WEIGHT_COLUMN: &str = "Percentage served";

/// Errors reading benchmark output.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    /// A summary line the benchmark always prints is missing.
    #[error("benchmark output is missing {0:?}")]
    MissingMarker(&'static str),

    /// A marker was found but its value is not a number.
    #[error("invalid value {value:?} after {marker:?}")]
    InvalidNumber {
        /// Marker the value followed.
        marker: &'static str,
        /// Offending text.
        value: String,
    },

    /// The latency CSV lacks a required column.
    #[error("latency csv has no {0:?} column")]
    MissingColumn(&'static str),

    /// The latency CSV could not be read.
    #[error("latency csv: {0}")]
    Csv(String),

    /// The latency CSV had a header but no rows.
    #[error("latency csv has no rows")]
    NoSamples,
}

/// The four numbers taken from the benchmark's text summary.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BenchmarkSummary {
    /// Requests that completed.
    pub completed: u64,
    /// Requests that failed.
    pub failed: u64,
    /// Mean time per request in milliseconds.
    pub mean_latency_ms: f64,
    /// Throughput in requests per second.
    pub requests_per_second: f64,
}

/// Read the summary numbers out of the benchmark's stdout.
pub fn parse_benchmark_summary(output: &str) -> Result<BenchmarkSummary, ParseError> {
    let mean_latency_ms = parse_number(output, TPR_MARKER, Some(TPR_SUFFIX))?;
    let requests_per_second = parse_number(output, RPS_MARKER, Some(RPS_SUFFIX))?;
    let failed = parse_number(output, FAILED_MARKER, None)?;
    let completed = parse_number(output, COMPLETE_MARKER, None)?;

    Ok(BenchmarkSummary {
        completed: completed as u64,
        failed: failed as u64,
        mean_latency_ms,
        requests_per_second,
    })
}

/// Read the percentile CSV into latency samples, one per row.
pub fn parse_latency_csv(text: &str) -> Result<Vec<LatencySample>, ParseError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_reader(text.as_bytes());

    let headers = reader
        .headers()
        .map_err(|e| ParseError::Csv(e.to_string()))?
        .clone();
    let latency_idx = headers
        .iter()
        .position(|h| h == LATENCY_COLUMN)
        .ok_or(ParseError::MissingColumn(LATENCY_COLUMN))?;
    let weight_idx = headers.iter().position(|h| h == WEIGHT_COLUMN);

    let mut samples = Vec::new();
    for record in reader.records() {
        let record = record.map_err(|e| ParseError::Csv(e.to_string()))?;
        let latency = field_as_f64(&record, latency_idx, LATENCY_COLUMN)?;
        let weight = match weight_idx {
            Some(idx) => field_as_f64(&record, idx, WEIGHT_COLUMN)?,
            None => 1.0,
        };
        samples.push(LatencySample::new(latency, weight));
    }

    if samples.is_empty() {
        return Err(ParseError::NoSamples);
    }
    Ok(samples)
}

fn field_as_f64(
    record: &csv::StringRecord,
    idx: usize,
    column: &'static str,
) -> Result<f64, ParseError> {
    let raw = record.get(idx).ok_or(ParseError::MissingColumn(column))?;
    raw.parse().map_err(|_| ParseError::InvalidNumber {
        marker: column,
        value: raw.to_string(),
    })
}

/// Find the first line starting with `marker` (and, when given, whose value
/// is followed by `suffix`) and parse the value after it.
fn parse_number(
    output: &str,
    marker: &'static str,
    suffix: Option<&str>,
) -> Result<f64, ParseError> {
    let value = output
        .lines()
        .filter_map(|line| line.trim_start().strip_prefix(marker))
        .map(str::trim)
        .find_map(|rest| match suffix {
            Some(suffix) => rest.strip_suffix(suffix).map(str::trim),
            None => rest.split_whitespace().next(),
        })
        .ok_or(ParseError::MissingMarker(marker))?;

    value.parse().map_err(|_| ParseError::InvalidNumber {
        marker,
        value: value.to_string(),
    })
}
