use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::{ProbeData, ProbeKind, ProbeResult, Severity};

/// Run-level escalation ladder, strictly ordered: critical beats warning
/// beats healthy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OverallStatus {
	Healthy,
	Warning,
	Critical,
}

impl std::fmt::Display for OverallStatus {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self {
			OverallStatus::Healthy => write!(f, "HEALTHY"),
			OverallStatus::Warning => write!(f, "WARNING"),
			OverallStatus::Critical => write!(f, "CRITICAL"),
		}
	}
}

/// Query-time statistics across servers with a successful resolution probe.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PerfStats {
	pub min_ms: f64,
	pub avg_ms: f64,
	pub max_ms: f64,
}

/// One run's aggregate picture. Also the shape of a history entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregateSummary {
	pub timestamp: DateTime<Utc>,
	pub servers_checked: usize,
	pub critical_issues: usize,
	pub warnings: usize,
	pub total_event_errors: u64,
	pub total_event_warnings: u64,
	/// Omitted entirely when no server resolved successfully; never
	/// synthesized zeros.
	#[serde(skip_serializing_if = "Option::is_none", default)]
	pub performance: Option<PerfStats>,
	#[serde(default)]
	pub alert_messages: Vec<String>,
}

impl AggregateSummary {
	/// The three-value status ladder. Critical issues dominate; any warning
	/// or alert message escalates past healthy.
	pub fn overall_status(&self) -> OverallStatus {
		if self.critical_issues > 0 {
			OverallStatus::Critical
		} else if self.warnings > 0 || !self.alert_messages.is_empty() {
			OverallStatus::Warning
		} else {
			OverallStatus::Healthy
		}
	}

	/// Attach evaluated alert messages. Alerts that are not backed 1:1 by a
	/// warning-severity probe result are added to the warning count.
	pub fn attach_alerts(&mut self, messages: Vec<String>, advisory_count: usize) {
		self.warnings += advisory_count;
		self.alert_messages = messages;
	}
}

/// Fold one run's probe results into an aggregate summary.
///
/// Critical issues count only error-severity Resolution and ServiceConfig
/// results; event-log error totals are tracked separately so transient log
/// noise is never double-counted as infrastructure failure. Performance
/// stats cover only servers whose resolution probe succeeded.
pub fn aggregate(
	results: &[ProbeResult],
	servers_checked: usize,
	timestamp: DateTime<Utc>,
) -> AggregateSummary {
	let mut critical_issues = 0;
	let mut warnings = 0;
	let mut total_event_errors: u64 = 0;
	let mut total_event_warnings: u64 = 0;
	let mut query_times: Vec<f64> = Vec::new();

	for result in results {
		match result.severity {
			Severity::Error => {
				if matches!(result.kind, ProbeKind::Resolution | ProbeKind::ServiceConfig) {
					critical_issues += 1;
				} else {
					// Secondary-probe errors cannot occur under the
					// derivation rules, but tolerate them as warnings.
					warnings += 1;
				}
			}
			Severity::Warning => warnings += 1,
			Severity::Ok => {}
		}

		match &result.data {
			ProbeData::EventLog { errors, warnings: w, .. } => {
				total_event_errors += errors;
				total_event_warnings += w;
			}
			ProbeData::Resolution { elapsed_ms, .. } if result.success => {
				query_times.push(*elapsed_ms);
			}
			_ => {}
		}
	}

	let performance = if query_times.is_empty() {
		None
	} else {
		let min = query_times.iter().cloned().fold(f64::INFINITY, f64::min);
		let max = query_times.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
		let avg = query_times.iter().sum::<f64>() / query_times.len() as f64;
		Some(PerfStats { min_ms: min, avg_ms: avg, max_ms: max })
	};

	AggregateSummary {
		timestamp,
		servers_checked,
		critical_issues,
		warnings,
		total_event_errors,
		total_event_warnings,
		performance,
		alert_messages: Vec::new(),
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::fault::ProbeFailure;
	use crate::model::Server;

	fn server() -> Server {
		Server { name: "DC1".into(), fqdn: "dc1.corp.example.com".into(), os: None }
	}

	fn resolution_ok(ms: f64) -> ProbeResult {
		ProbeResult::success(
			&server(),
			ProbeKind::Resolution,
			ProbeData::Resolution { addresses: vec!["10.0.0.1".parse().unwrap()], elapsed_ms: ms },
			false,
		)
	}

	fn resolution_failed() -> ProbeResult {
		ProbeResult::failure(
			&server(),
			ProbeKind::Resolution,
			&ProbeFailure::Unreachable("RPC server unavailable".into()),
		)
	}

	fn event_log(errors: u64, warnings: u64) -> ProbeResult {
		ProbeResult::success(
			&server(),
			ProbeKind::EventLog,
			ProbeData::EventLog { errors, warnings, top_groups: Vec::new() },
			false,
		)
	}

	#[test]
	fn test_event_errors_not_counted_as_critical() {
		let results = vec![resolution_ok(30.0), event_log(12, 4)];
		let summary = aggregate(&results, 1, Utc::now());
		assert_eq!(summary.critical_issues, 0);
		assert_eq!(summary.total_event_errors, 12);
		assert_eq!(summary.total_event_warnings, 4);
	}

	#[test]
	fn test_critical_counts_resolution_and_service_errors_only() {
		let results = vec![
			resolution_failed(),
			ProbeResult::failure(
				&server(),
				ProbeKind::ServiceConfig,
				&ProbeFailure::AccessDenied("forbidden".into()),
			),
			ProbeResult::failure(
				&server(),
				ProbeKind::EventLog,
				&ProbeFailure::Other("log query failed".into()),
			),
		];
		let summary = aggregate(&results, 1, Utc::now());
		// The event-log failure degrades to a warning, not a critical issue
		assert_eq!(summary.critical_issues, 2);
		assert_eq!(summary.warnings, 1);
	}

	#[test]
	fn test_status_ladder_all_branches() {
		let healthy = aggregate(&[resolution_ok(20.0)], 1, Utc::now());
		assert_eq!(healthy.overall_status(), OverallStatus::Healthy);

		let mut warning = aggregate(&[resolution_ok(20.0)], 1, Utc::now());
		warning.attach_alerts(vec!["advisory".into()], 1);
		assert_eq!(warning.overall_status(), OverallStatus::Warning);

		let warn_from_probe = aggregate(
			&[ProbeResult::success(
				&server(),
				ProbeKind::Resolution,
				ProbeData::Resolution {
					addresses: vec!["10.0.0.1".parse().unwrap()],
					elapsed_ms: 2000.0,
				},
				true,
			)],
			1,
			Utc::now(),
		);
		assert_eq!(warn_from_probe.overall_status(), OverallStatus::Warning);

		let critical = aggregate(&[resolution_failed()], 1, Utc::now());
		assert_eq!(critical.overall_status(), OverallStatus::Critical);
	}

	#[test]
	fn test_performance_only_over_successful_resolutions() {
		let results = vec![resolution_ok(50.0), resolution_failed()];
		let summary = aggregate(&results, 2, Utc::now());
		let perf = summary.performance.unwrap();
		assert_eq!(perf.min_ms, 50.0);
		assert_eq!(perf.avg_ms, 50.0);
		assert_eq!(perf.max_ms, 50.0);
		assert_eq!(summary.critical_issues, 1);
	}

	#[test]
	fn test_performance_omitted_when_no_resolution_succeeds() {
		let summary = aggregate(&[resolution_failed()], 1, Utc::now());
		assert!(summary.performance.is_none());
	}

	#[test]
	fn test_performance_min_avg_max() {
		let results = vec![resolution_ok(10.0), resolution_ok(20.0), resolution_ok(60.0)];
		let summary = aggregate(&results, 3, Utc::now());
		let perf = summary.performance.unwrap();
		assert_eq!(perf.min_ms, 10.0);
		assert_eq!(perf.max_ms, 60.0);
		assert!((perf.avg_ms - 30.0).abs() < 1e-9);
	}

	#[test]
	fn test_aggregation_is_deterministic() {
		let results = vec![
			resolution_ok(42.0),
			resolution_failed(),
			event_log(3, 7),
		];
		let ts = Utc::now();
		let a = aggregate(&results, 2, ts);
		let b = aggregate(&results, 2, ts);
		assert_eq!(
			serde_json::to_string(&a).unwrap(),
			serde_json::to_string(&b).unwrap(),
		);
	}
}
