//! Attack result presentation: summary text, percentile CSV export and the
//! browser-suite tally.

use anyhow::{Context, Result};
use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use swarm_client::AttackOutcome;
use swarm_types::{AggregateReport, AggregationError, NodeResult};

/// The human summary printed after a benchmark attack.
pub fn render_summary(report: &AggregateReport) -> String {
    let mut out = String::new();

    if report.transport_failed_nodes > 0 {
        let _ = writeln!(
            out,
            "     {} of your bees didn't make it to the action. They might be taking a little \
             longer than normal to find their machine guns, or may have been terminated without \
             using \"bees down\".",
            report.transport_failed_nodes
        );
    }
    if report.timed_out_nodes > 0 {
        let _ = writeln!(
            out,
            "     Target timed out without fully responding to {} bees.",
            report.timed_out_nodes
        );
    }

    let summary = match &report.summary {
        Ok(summary) => summary,
        Err(AggregationError::NoNodeCompleted) => {
            out.push_str(
                "     No bees completed the mission. Apparently your bees are peace-loving hippies.\n",
            );
            return out;
        }
        Err(e @ AggregationError::NoCompletedRequests) => {
            let _ = writeln!(out, "     No data to report: {}.", e);
            return out;
        }
    };

    let _ = writeln!(out, "     Complete requests:\t\t{}", summary.total_completed);
    let _ = writeln!(out, "     Failed requests:\t\t{}", summary.total_failed);
    let _ = writeln!(
        out,
        "     Requests per second:\t{:.6} [#/sec]",
        summary.requests_per_second
    );
    let _ = writeln!(
        out,
        "     Time per request:\t\t{:.6} [ms] (mean of bees)",
        summary.mean_latency_ms
    );
    for (label, percentile) in [("50%", 49), ("90%", 89)] {
        if let Some(latency) = summary.latency_at(percentile) {
            let _ = writeln!(out, "     {} responses faster than:\t{:.6} [ms]", label, latency);
        }
    }
    let _ = writeln!(out, "Mission Assessment: {}", summary.verdict);
    out
}

/// Fail early if `path` cannot be written, without truncating it.
pub fn check_writable(path: &Path) -> Result<()> {
    std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map(|_| ())
        .with_context(|| {
            format!(
                "{} is not writable; check permissions or choose a different filename",
                path.display()
            )
        })
}

/// Write the percentile table: one row per percentile, the fleet-wide value
/// first, then each successful bee's own value.
pub fn write_percentile_csv(path: &Path, outcome: &AttackOutcome) -> Result<()> {
    let Some(summary) = outcome.report.summary() else {
        anyhow::bail!("no percentile data to export");
    };

    let successful: Vec<_> = outcome
        .nodes
        .iter()
        .filter_map(|o| o.result.metrics().map(|m| (&o.node, m)))
        .collect();

    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("Failed to create {}", path.display()))?;

    let mut header = vec!["% faster than".to_string(), "all bees [ms]".to_string()];
    header.extend(successful.iter().map(|(node, _)| format!("bee {} [ms]", node.id)));
    writer.write_record(&header)?;

    for entry in &summary.percentiles {
        let mut row = vec![
            entry.percentile.to_string(),
            entry.latency_ms.to_string(),
        ];
        row.extend(successful.iter().map(|(_, metrics)| {
            metrics
                .samples
                .get(entry.percentile)
                .map(|s| s.latency_ms.to_string())
                .unwrap_or_default()
        }));
        writer.write_record(&row)?;
    }

    writer.flush()?;
    Ok(())
}

/// Pass and fail counts across downloaded browser-suite reports.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SuiteTally {
    /// `<td>passed</td>` cells.
    pub passed: usize,
    /// `<td>failed</td>` cells.
    pub failed: usize,
}

/// Count results across every `results_<node>_<run>.html` in `dir`, then
/// delete those reports.
pub fn tally_browser_results(dir: &Path) -> Result<SuiteTally> {
    let mut tally = SuiteTally::default();
    let mut reports: Vec<PathBuf> = Vec::new();

    for entry in std::fs::read_dir(dir).with_context(|| format!("Failed to read {}", dir.display()))? {
        let path = entry?.path();
        let is_report = path
            .file_name()
            .and_then(|n| n.to_str())
            .is_some_and(is_report_name);
        if is_report {
            reports.push(path);
        }
    }

    for report in &reports {
        let html = std::fs::read_to_string(report)
            .with_context(|| format!("Failed to read {}", report.display()))?;
        tally.passed += html.matches("<td>passed</td>").count();
        tally.failed += html.matches("<td>failed</td>").count();
    }

    for report in &reports {
        if let Err(e) = std::fs::remove_file(report) {
            tracing::warn!("Could not remove {}: {}", report.display(), e);
        }
    }
    Ok(tally)
}

fn is_report_name(name: &str) -> bool {
    name.strip_prefix("results_")
        .and_then(|rest| rest.strip_suffix(".html"))
        .and_then(|middle| middle.split_once('_'))
        .is_some_and(|(node, run)| !node.is_empty() && !run.is_empty())
}

/// One line per node that did not succeed, for the log.
pub fn failed_nodes(outcome: &AttackOutcome) -> Vec<String> {
    outcome
        .nodes
        .iter()
        .filter_map(|o| match &o.result {
            NodeResult::Success(_) => None,
            NodeResult::Timeout { reason } => Some(format!("{}: timed out ({})", o.node, reason)),
            NodeResult::TransportError { detail } => Some(format!("{}: {}", o.node, detail)),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use swarm_client::NodeOutcome;
    use swarm_types::{
        AttackSummary, InstanceId, LatencySample, Node, NodeMetrics, Percentile, Verdict,
    };

    fn summary(mean: f64) -> AttackSummary {
        AttackSummary {
            total_completed: 100,
            total_failed: 3,
            requests_per_second: 512.25,
            mean_latency_ms: mean,
            percentiles: (0..100)
                .map(|p| Percentile {
                    percentile: p,
                    latency_ms: p as f64 * 2.0,
                })
                .collect(),
            verdict: Verdict::from_mean_latency(mean),
        }
    }

    fn report(summary: Result<AttackSummary, AggregationError>) -> AggregateReport {
        AggregateReport {
            successful_nodes: 2,
            timed_out_nodes: 0,
            transport_failed_nodes: 0,
            summary,
        }
    }

    fn metrics(offset: f64) -> NodeMetrics {
        NodeMetrics {
            completed: 50,
            failed: 0,
            mean_latency_ms: 10.0,
            requests_per_second: 100.0,
            samples: (0..=100)
                .map(|p| LatencySample::new(offset + p as f64, p as f64))
                .collect(),
        }
    }

    #[test]
    fn summary_prints_counts_percentiles_and_verdict() {
        let text = render_summary(&report(Ok(summary(120.0))));
        assert!(text.contains("Complete requests:\t\t100"));
        assert!(text.contains("Failed requests:\t\t3"));
        assert!(text.contains("50% responses faster than:\t98.000000 [ms]"));
        assert!(text.contains("90% responses faster than:\t178.000000 [ms]"));
        assert!(text.contains("Mission Assessment: Target crushed bee offensive."));
    }

    #[test]
    fn summary_without_completed_bees() {
        let mut report = report(Err(AggregationError::NoNodeCompleted));
        report.successful_nodes = 0;
        report.transport_failed_nodes = 3;
        let text = render_summary(&report);
        assert!(text.contains("3 of your bees didn't make it"));
        assert!(text.contains("peace-loving hippies"));
        assert!(!text.contains("Mission Assessment"));
    }

    #[test]
    fn csv_has_one_column_per_successful_bee() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.csv");
        let outcome = AttackOutcome {
            report: report(Ok(summary(120.0))),
            nodes: vec![
                NodeOutcome {
                    node: Node::new(InstanceId::new("i-a"), "a.test", 0),
                    result: NodeResult::Success(metrics(0.0)),
                },
                NodeOutcome {
                    node: Node::new(InstanceId::new("i-b"), "b.test", 1),
                    result: NodeResult::transport_error("refused"),
                },
                NodeOutcome {
                    node: Node::new(InstanceId::new("i-c"), "c.test", 2),
                    result: NodeResult::Success(metrics(1000.0)),
                },
            ],
        };

        write_percentile_csv(&path, &outcome).unwrap();

        let mut reader = csv::Reader::from_path(&path).unwrap();
        let header: Vec<String> = reader.headers().unwrap().iter().map(String::from).collect();
        assert_eq!(
            header,
            vec!["% faster than", "all bees [ms]", "bee i-a [ms]", "bee i-c [ms]"]
        );
        let rows: Vec<csv::StringRecord> = reader.records().map(|r| r.unwrap()).collect();
        assert_eq!(rows.len(), 100);
        assert_eq!(&rows[10][0], "10");
        assert_eq!(&rows[10][1], "20");
        assert_eq!(&rows[10][2], "10");
        assert_eq!(&rows[10][3], "1010");
    }

    #[test]
    fn check_writable_rejects_missing_directory() {
        assert!(check_writable(Path::new("/nonexistent-dir-xyz/out.csv")).is_err());
        let dir = tempfile::tempdir().unwrap();
        assert!(check_writable(&dir.path().join("ok.csv")).is_ok());
    }

    #[test]
    fn browser_tally_counts_and_cleans_up() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("results_0_0.html"),
            "<td>passed</td><td>passed</td><td>failed</td>",
        )
        .unwrap();
        std::fs::write(dir.path().join("results_1_0.html"), "<td>passed</td>").unwrap();
        std::fs::write(dir.path().join("Suite1.html"), "<td>passed</td>").unwrap();

        let tally = tally_browser_results(dir.path()).unwrap();
        assert_eq!(tally, SuiteTally { passed: 3, failed: 1 });
        assert!(!dir.path().join("results_0_0.html").exists());
        assert!(dir.path().join("Suite1.html").exists());
    }

    #[test]
    fn report_names() {
        assert!(is_report_name("results_0_12.html"));
        assert!(!is_report_name("results.html"));
        assert!(!is_report_name("results_3.html"));
        assert!(!is_report_name("Suite1.html"));
    }

    #[test]
    fn failed_nodes_lists_non_successes() {
        let outcome = AttackOutcome {
            report: report(Ok(summary(120.0))),
            nodes: vec![
                NodeOutcome {
                    node: Node::new(InstanceId::new("i-a"), "a.test", 0),
                    result: NodeResult::timeout("reading csv"),
                },
                NodeOutcome {
                    node: Node::new(InstanceId::new("i-b"), "b.test", 1),
                    result: NodeResult::Success(NodeMetrics::empty()),
                },
            ],
        };
        assert_eq!(
            failed_nodes(&outcome),
            vec!["bee 0 (i-a): timed out (reading csv)".to_string()]
        );
    }
}
