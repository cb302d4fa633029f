use std::net::IpAddr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::fault::ProbeFailure;

/// One domain controller as discovered by the directory collaborator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Server {
	pub name: String,
	pub fqdn: String,
	/// Operating system string, informational only.
	#[serde(default)]
	pub os: Option<String>,
}

/// Escalation level of a single probe result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Severity {
	Ok,
	Warning,
	Error,
}

/// The fixed probe set, in canonical report order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProbeKind {
	Resolution,
	ServiceConfig,
	Scavenging,
	EventLog,
	Performance,
}

impl ProbeKind {
	pub fn label(&self) -> &'static str {
		match self {
			ProbeKind::Resolution => "resolution",
			ProbeKind::ServiceConfig => "service/config",
			ProbeKind::Scavenging => "scavenging",
			ProbeKind::EventLog => "event log",
			ProbeKind::Performance => "performance",
		}
	}
}

/// One event-id group from the event-log probe: how often it fired and one
/// representative message (already truncated).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventGroup {
	pub id: u32,
	pub level: EventLevel,
	pub count: usize,
	pub sample_message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventLevel {
	Error,
	Warning,
}

/// One timed lookup from the performance probe.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PerfSample {
	pub target: String,
	pub elapsed_ms: Option<f64>,
	pub over_threshold: bool,
	pub error: Option<String>,
}

/// Kind-specific payload carried by a ProbeResult.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ProbeData {
	Resolution {
		addresses: Vec<IpAddr>,
		elapsed_ms: f64,
	},
	ServiceConfig {
		running: bool,
		forward_zones: usize,
		reverse_zones: usize,
		forwarders: Vec<IpAddr>,
		listen_addresses: Vec<IpAddr>,
	},
	Scavenging {
		enabled: bool,
		interval_hours: u64,
		last_run: Option<DateTime<Utc>>,
		zones_with_scavenging: usize,
	},
	EventLog {
		errors: u64,
		warnings: u64,
		top_groups: Vec<EventGroup>,
	},
	Performance {
		samples: Vec<PerfSample>,
	},
	/// Probe failed before producing any payload.
	None,
}

/// Outcome of one probe against one server. Created by the runner, consumed
/// by the aggregator, never mutated afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProbeResult {
	pub server: String,
	pub fqdn: String,
	pub kind: ProbeKind,
	pub success: bool,
	pub severity: Severity,
	pub data: ProbeData,
	pub error: Option<String>,
	pub hint: Option<String>,
}

/// Derive the severity of a probe outcome. This is the only place severity
/// is computed.
///
/// A failed Resolution or ServiceConfig probe is an infrastructure error.
/// Failures of the remaining kinds degrade to warnings. A successful probe
/// that crossed a configured threshold (slow query, stale scavenging, down
/// service) is a warning.
pub fn derive_severity(kind: ProbeKind, success: bool, degraded: bool) -> Severity {
	if !success {
		return match kind {
			ProbeKind::Resolution | ProbeKind::ServiceConfig => Severity::Error,
			_ => Severity::Warning,
		};
	}
	if degraded {
		Severity::Warning
	} else {
		Severity::Ok
	}
}

impl ProbeResult {
	/// A successful probe. `degraded` marks a crossed threshold.
	pub fn success(server: &Server, kind: ProbeKind, data: ProbeData, degraded: bool) -> Self {
		ProbeResult {
			server: server.name.clone(),
			fqdn: server.fqdn.clone(),
			kind,
			success: true,
			severity: derive_severity(kind, true, degraded),
			data,
			error: None,
			hint: None,
		}
	}

	/// A failed probe, carrying the classified failure and its hint.
	pub fn failure(server: &Server, kind: ProbeKind, failure: &ProbeFailure) -> Self {
		ProbeResult {
			server: server.name.clone(),
			fqdn: server.fqdn.clone(),
			kind,
			success: false,
			severity: derive_severity(kind, false, false),
			data: ProbeData::None,
			error: Some(failure.to_string()),
			hint: failure.remediation_hint().map(|h| h.to_string()),
		}
	}

	/// A probe that could not complete but still produced a payload worth
	/// reporting (e.g. performance samples that all failed).
	pub fn failed_with_data(
		server: &Server,
		kind: ProbeKind,
		data: ProbeData,
		error: String,
	) -> Self {
		ProbeResult {
			server: server.name.clone(),
			fqdn: server.fqdn.clone(),
			kind,
			success: false,
			severity: derive_severity(kind, false, false),
			data,
			error: Some(error),
			hint: None,
		}
	}

}

// ---------------------------------------------------------------------------
// Data returned by the remote collaborators, before it is folded into
// ProbeResult payloads.
// ---------------------------------------------------------------------------

/// A successful timed name resolution.
#[derive(Debug, Clone)]
pub struct Resolved {
	pub addresses: Vec<IpAddr>,
	pub elapsed_ms: f64,
}

/// One zone as reported by the DNS server.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ZoneInfo {
	pub name: String,
	#[serde(default)]
	pub reverse: bool,
	#[serde(default)]
	pub scavenging_enabled: bool,
}

/// Zone list plus server-level configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfigInfo {
	pub zones: Vec<ZoneInfo>,
	#[serde(default)]
	pub forwarders: Vec<IpAddr>,
	#[serde(default)]
	pub listen_addresses: Vec<IpAddr>,
}

/// Server-wide scavenging state. Scavenging counts as enabled when the
/// configured interval is greater than zero.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScavengingInfo {
	pub interval_hours: u64,
	pub last_run: Option<DateTime<Utc>>,
}

impl ScavengingInfo {
	pub fn enabled(&self) -> bool {
		self.interval_hours > 0
	}
}

/// One raw event-log record from the remote collaborator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventRecord {
	pub id: u32,
	pub level: EventLevel,
	pub message: String,
	pub timestamp: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
	use super::*;

	fn server() -> Server {
		Server {
			name: "DC1".into(),
			fqdn: "dc1.corp.example.com".into(),
			os: None,
		}
	}

	#[test]
	fn test_failed_resolution_is_error() {
		assert_eq!(
			derive_severity(ProbeKind::Resolution, false, false),
			Severity::Error,
		);
		assert_eq!(
			derive_severity(ProbeKind::ServiceConfig, false, false),
			Severity::Error,
		);
	}

	#[test]
	fn test_failed_secondary_probe_is_warning() {
		assert_eq!(
			derive_severity(ProbeKind::EventLog, false, false),
			Severity::Warning,
		);
		assert_eq!(
			derive_severity(ProbeKind::Scavenging, false, false),
			Severity::Warning,
		);
		assert_eq!(
			derive_severity(ProbeKind::Performance, false, false),
			Severity::Warning,
		);
	}

	#[test]
	fn test_threshold_crossing_is_warning() {
		assert_eq!(
			derive_severity(ProbeKind::Resolution, true, true),
			Severity::Warning,
		);
	}

	#[test]
	fn test_clean_success_is_ok() {
		assert_eq!(
			derive_severity(ProbeKind::Performance, true, false),
			Severity::Ok,
		);
	}

	#[test]
	fn test_failure_result_carries_hint() {
		let f = ProbeFailure::Unreachable("RPC endpoint refused".into());
		let r = ProbeResult::failure(&server(), ProbeKind::ServiceConfig, &f);
		assert!(!r.success);
		assert_eq!(r.severity, Severity::Error);
		assert!(r.hint.as_deref().unwrap().contains("firewall"));
	}

	#[test]
	fn test_scavenging_enabled_from_interval() {
		let off = ScavengingInfo { interval_hours: 0, last_run: None };
		let on = ScavengingInfo { interval_hours: 168, last_run: None };
		assert!(!off.enabled());
		assert!(on.enabled());
	}
}
