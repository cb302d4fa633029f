use std::net::IpAddr;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::warn;

/// Alert thresholds. Merged field-by-field against defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlertThresholds {
	pub max_query_time_ms: f64,
	pub max_event_errors: u64,
	pub max_event_warnings: u64,
}

/// Email settings for alert dispatch. Merged field-by-field against defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmailSettings {
	pub server: String,
	pub from: String,
	pub recipients: Vec<String>,
	pub subject: String,
}

/// Complete, resolved audit configuration. Every field has a value;
/// immutable for the duration of the run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditConfig {
	pub output_dir: PathBuf,
	pub event_lookback_days: i64,
	pub query_timeout_secs: u64,
	pub max_parallel_probes: usize,
	pub alerting_enabled: bool,
	pub alert_thresholds: AlertThresholds,
	pub email: EmailSettings,
	pub test_hostnames: Vec<String>,
	pub custom_dns_servers: Vec<IpAddr>,
	pub history_enabled: bool,
	pub stale_record_days: i64,
	pub history_retention_days: i64,
}

impl Default for AuditConfig {
	fn default() -> Self {
		AuditConfig {
			output_dir: PathBuf::from("reports"),
			event_lookback_days: 7,
			query_timeout_secs: 5,
			max_parallel_probes: 5,
			alerting_enabled: false,
			alert_thresholds: AlertThresholds {
				max_query_time_ms: 1000.0,
				max_event_errors: 10,
				max_event_warnings: 20,
			},
			email: EmailSettings {
				server: String::new(),
				from: "dns-audit@localhost".into(),
				recipients: Vec::new(),
				subject: "DNS health audit alerts".into(),
			},
			test_hostnames: vec![
				"www.google.com".into(),
				"www.cloudflare.com".into(),
			],
			custom_dns_servers: Vec::new(),
			history_enabled: true,
			stale_record_days: 30,
			history_retention_days: 30,
		}
	}
}

/// A partially-specified configuration as parsed from disk. Any field may be
/// absent; absent fields keep their default after the merge.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PartialConfig {
	pub output_dir: Option<PathBuf>,
	pub event_lookback_days: Option<i64>,
	pub query_timeout_secs: Option<u64>,
	pub max_parallel_probes: Option<usize>,
	pub alerting_enabled: Option<bool>,
	pub alert_thresholds: Option<PartialThresholds>,
	pub email: Option<PartialEmail>,
	pub test_hostnames: Option<Vec<String>>,
	pub custom_dns_servers: Option<Vec<IpAddr>>,
	pub history_enabled: Option<bool>,
	pub stale_record_days: Option<i64>,
	pub history_retention_days: Option<i64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PartialThresholds {
	pub max_query_time_ms: Option<f64>,
	pub max_event_errors: Option<u64>,
	pub max_event_warnings: Option<u64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PartialEmail {
	pub server: Option<String>,
	pub from: Option<String>,
	pub recipients: Option<Vec<String>>,
	pub subject: Option<String>,
}

/// Merge a partial configuration over the defaults, field by field.
/// Nested objects merge recursively: a partially-specified thresholds or
/// email block only overrides the fields it names.
pub fn resolve_config(partial: PartialConfig) -> AuditConfig {
	let mut cfg = AuditConfig::default();

	if let Some(v) = partial.output_dir {
		cfg.output_dir = v;
	}
	if let Some(v) = partial.event_lookback_days {
		cfg.event_lookback_days = v;
	}
	if let Some(v) = partial.query_timeout_secs {
		cfg.query_timeout_secs = v;
	}
	if let Some(v) = partial.max_parallel_probes {
		cfg.max_parallel_probes = v.max(1);
	}
	if let Some(v) = partial.alerting_enabled {
		cfg.alerting_enabled = v;
	}
	if let Some(t) = partial.alert_thresholds {
		if let Some(v) = t.max_query_time_ms {
			cfg.alert_thresholds.max_query_time_ms = v;
		}
		if let Some(v) = t.max_event_errors {
			cfg.alert_thresholds.max_event_errors = v;
		}
		if let Some(v) = t.max_event_warnings {
			cfg.alert_thresholds.max_event_warnings = v;
		}
	}
	if let Some(e) = partial.email {
		if let Some(v) = e.server {
			cfg.email.server = v;
		}
		if let Some(v) = e.from {
			cfg.email.from = v;
		}
		if let Some(v) = e.recipients {
			cfg.email.recipients = v;
		}
		if let Some(v) = e.subject {
			cfg.email.subject = v;
		}
	}
	if let Some(v) = partial.test_hostnames {
		cfg.test_hostnames = v;
	}
	if let Some(v) = partial.custom_dns_servers {
		cfg.custom_dns_servers = v;
	}
	if let Some(v) = partial.history_enabled {
		cfg.history_enabled = v;
	}
	if let Some(v) = partial.stale_record_days {
		cfg.stale_record_days = v;
	}
	if let Some(v) = partial.history_retention_days {
		cfg.history_retention_days = v;
	}

	cfg
}

/// Where the effective configuration came from. Returned alongside the
/// config so the caller can log it once the subscriber is installed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
	/// Parsed from the file and merged over defaults.
	File,
	/// No file existed; defaults were written out for future edits.
	DefaultsWritten,
	/// The file existed but could not be used; defaults apply.
	DefaultsFallback(String),
}

/// Load the configuration file and resolve it against the defaults.
///
/// A missing file is written out with default values so the operator has
/// something to edit; a file that cannot be read, written or parsed falls
/// back to the defaults. Config problems never fail the run.
pub fn load_or_init(path: &Path) -> (AuditConfig, ConfigSource) {
	match std::fs::read_to_string(path) {
		Ok(content) => match serde_json::from_str::<PartialConfig>(&content) {
			Ok(partial) => (resolve_config(partial), ConfigSource::File),
			Err(e) => (
				AuditConfig::default(),
				ConfigSource::DefaultsFallback(format!(
					"config file {} is not valid: {}",
					path.display(),
					e,
				)),
			),
		},
		Err(_) => {
			let cfg = AuditConfig::default();
			match serde_json::to_string_pretty(&cfg) {
				Ok(body) => {
					if let Err(e) = std::fs::write(path, body) {
						warn!("could not write default config to {}: {}", path.display(), e);
					}
				}
				Err(e) => warn!("could not serialize default config: {}", e),
			}
			(cfg, ConfigSource::DefaultsWritten)
		}
	}
}
