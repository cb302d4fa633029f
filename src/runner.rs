use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use tokio::sync::Semaphore;
use tracing::{error, info};

use crate::admin::DnsAdmin;
use crate::config::AuditConfig;
use crate::fault::ProbeFailure;
use crate::model::{
	EventGroup, EventLevel, EventRecord, PerfSample, ProbeData, ProbeKind, ProbeResult,
	ScavengingInfo, Server,
};
use crate::resolve::NameResolver;

/// Scavenging that last ran more than this many days ago counts as stale.
const STALE_SCAVENGE_DAYS: i64 = 7;

/// At most this many event groups are rendered per server; the rest are
/// counted but not listed.
const EVENT_GROUP_LIMIT: usize = 10;

/// Representative event messages are truncated to this many characters.
const EVENT_MESSAGE_MAX: usize = 200;

/// Truncate an event message to the report limit.
pub fn truncate_message(message: &str) -> String {
	message.chars().take(EVENT_MESSAGE_MAX).collect()
}

/// Group raw event records by event id and return total error/warning counts
/// plus the most frequent groups (at most EVENT_GROUP_LIMIT, ordered by
/// count descending, then id ascending for stable output).
pub fn group_events(events: &[EventRecord]) -> (u64, u64, Vec<EventGroup>) {
	let mut errors: u64 = 0;
	let mut warnings: u64 = 0;
	let mut groups: HashMap<u32, EventGroup> = HashMap::new();

	for event in events {
		match event.level {
			EventLevel::Error => errors += 1,
			EventLevel::Warning => warnings += 1,
		}
		groups
			.entry(event.id)
			.and_modify(|g| g.count += 1)
			.or_insert_with(|| EventGroup {
				id: event.id,
				level: event.level,
				count: 1,
				sample_message: truncate_message(&event.message),
			});
	}

	let mut top: Vec<EventGroup> = groups.into_values().collect();
	top.sort_by(|a, b| b.count.cmp(&a.count).then(a.id.cmp(&b.id)));
	top.truncate(EVENT_GROUP_LIMIT);

	(errors, warnings, top)
}

/// Scavenging is stale when it is enabled but has not run within the stale
/// window (or has never run).
pub fn scavenging_stale(info: &ScavengingInfo, now: DateTime<Utc>) -> bool {
	if !info.enabled() {
		return false;
	}
	match info.last_run {
		Some(last) => now - last > ChronoDuration::days(STALE_SCAVENGE_DAYS),
		None => true,
	}
}

/// Run the full probe set against one server. Always returns results in the
/// canonical kind order; every failure is encoded in a result, never raised.
async fn probe_server(
	server: &Server,
	resolver: &dyn NameResolver,
	admin: &dyn DnsAdmin,
	config: &AuditConfig,
	now: DateTime<Utc>,
) -> Vec<ProbeResult> {
	let mut results = Vec::new();

	// Resolution probe
	match resolver.resolve(&server.fqdn).await {
		Ok(resolved) => {
			let slow = resolved.elapsed_ms > config.alert_thresholds.max_query_time_ms;
			results.push(ProbeResult::success(
				server,
				ProbeKind::Resolution,
				ProbeData::Resolution {
					addresses: resolved.addresses,
					elapsed_ms: resolved.elapsed_ms,
				},
				slow,
			));
		}
		Err(f) => results.push(ProbeResult::failure(server, ProbeKind::Resolution, &f)),
	}

	// Service/config probe, with the stopped-service short circuit: a down
	// service yields a single warning result and no zone/scavenging probes.
	match admin.service_running(&server.fqdn).await {
		Ok(true) => {
			let mut zones_with_scavenging = None;
			match admin.server_config(&server.fqdn).await {
				Ok(info) => {
					let forward = info.zones.iter().filter(|z| !z.reverse).count();
					let reverse = info.zones.len() - forward;
					zones_with_scavenging =
						Some(info.zones.iter().filter(|z| z.scavenging_enabled).count());
					results.push(ProbeResult::success(
						server,
						ProbeKind::ServiceConfig,
						ProbeData::ServiceConfig {
							running: true,
							forward_zones: forward,
							reverse_zones: reverse,
							forwarders: info.forwarders,
							listen_addresses: info.listen_addresses,
						},
						false,
					));
				}
				Err(f) => {
					results.push(ProbeResult::failure(server, ProbeKind::ServiceConfig, &f))
				}
			}

			match admin.scavenging(&server.fqdn).await {
				Ok(info) => {
					let stale = scavenging_stale(&info, now);
					results.push(ProbeResult::success(
						server,
						ProbeKind::Scavenging,
						ProbeData::Scavenging {
							enabled: info.enabled(),
							interval_hours: info.interval_hours,
							last_run: info.last_run,
							zones_with_scavenging: zones_with_scavenging.unwrap_or(0),
						},
						stale,
					));
				}
				Err(f) => {
					results.push(ProbeResult::failure(server, ProbeKind::Scavenging, &f))
				}
			}
		}
		Ok(false) => {
			// The probe itself worked; the finding is a degraded service.
			results.push(ProbeResult::success(
				server,
				ProbeKind::ServiceConfig,
				ProbeData::ServiceConfig {
					running: false,
					forward_zones: 0,
					reverse_zones: 0,
					forwarders: Vec::new(),
					listen_addresses: Vec::new(),
				},
				true,
			));
		}
		Err(f) => results.push(ProbeResult::failure(server, ProbeKind::ServiceConfig, &f)),
	}

	// Event-log probe
	let since = now - ChronoDuration::days(config.event_lookback_days);
	match admin.events_since(&server.fqdn, since).await {
		Ok(events) => {
			let (errors, warnings, top_groups) = group_events(&events);
			results.push(ProbeResult::success(
				server,
				ProbeKind::EventLog,
				ProbeData::EventLog { errors, warnings, top_groups },
				false,
			));
		}
		Err(ProbeFailure::NoData) => {
			results.push(ProbeResult::success(
				server,
				ProbeKind::EventLog,
				ProbeData::EventLog { errors: 0, warnings: 0, top_groups: Vec::new() },
				false,
			));
		}
		Err(f) => results.push(ProbeResult::failure(server, ProbeKind::EventLog, &f)),
	}

	// Performance probe: the external test hostnames plus the server's own
	// FQDN, each timed against the query-time threshold.
	let mut samples = Vec::new();
	for target in config.test_hostnames.iter().map(String::as_str).chain([server.fqdn.as_str()]) {
		match resolver.resolve(target).await {
			Ok(resolved) => samples.push(PerfSample {
				target: target.to_string(),
				elapsed_ms: Some(resolved.elapsed_ms),
				over_threshold: resolved.elapsed_ms > config.alert_thresholds.max_query_time_ms,
				error: None,
			}),
			Err(f) => samples.push(PerfSample {
				target: target.to_string(),
				elapsed_ms: None,
				over_threshold: false,
				error: Some(f.to_string()),
			}),
		}
	}
	let any_succeeded = samples.iter().any(|s| s.elapsed_ms.is_some());
	let degraded = samples.iter().any(|s| s.over_threshold || s.error.is_some());
	if any_succeeded {
		results.push(ProbeResult::success(
			server,
			ProbeKind::Performance,
			ProbeData::Performance { samples },
			degraded,
		));
	} else {
		results.push(ProbeResult::failed_with_data(
			server,
			ProbeKind::Performance,
			ProbeData::Performance { samples },
			"all performance lookups failed".to_string(),
		));
	}

	results
}

/// Run the probe set against every server, at most `maxParallelProbes`
/// servers in flight at a time. Output order is stable: discovery order,
/// then canonical probe kind order within each server.
pub async fn run_probes(
	servers: &[Server],
	resolver: Arc<dyn NameResolver>,
	admin: Arc<dyn DnsAdmin>,
	config: &AuditConfig,
) -> Vec<ProbeResult> {
	let now = Utc::now();
	let semaphore = Arc::new(Semaphore::new(config.max_parallel_probes.max(1)));
	let mut handles = Vec::new();

	for (idx, server) in servers.iter().enumerate() {
		let server = server.clone();
		let resolver = resolver.clone();
		let admin = admin.clone();
		let config = config.clone();
		let sem = semaphore.clone();

		handles.push(tokio::spawn(async move {
			let _permit = sem.acquire().await.expect("semaphore closed");
			info!("probing {} ({})", server.name, server.fqdn);
			let results =
				probe_server(&server, resolver.as_ref(), admin.as_ref(), &config, now).await;
			(idx, results)
		}));
	}

	// Collect by discovery index so one slow server cannot reorder output
	let mut slots: Vec<Option<Vec<ProbeResult>>> = vec![None; servers.len()];
	for handle in handles {
		match handle.await {
			Ok((idx, results)) => slots[idx] = Some(results),
			Err(e) => error!("probe task failed: {}", e),
		}
	}

	slots.into_iter().flatten().flatten().collect()
}
