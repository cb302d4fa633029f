use std::path::{Path, PathBuf};

use anyhow::Context;
use chrono::{DateTime, Utc};
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};

use crate::aggregate::AggregateSummary;
use crate::model::{ProbeData, ProbeResult, Severity};

/// Timestamp fragment used in report and log filenames, so successive runs
/// never collide.
pub fn run_stamp(ts: DateTime<Utc>) -> String {
	ts.format("%Y%m%d-%H%M%S").to_string()
}

fn severity_label(severity: Severity) -> &'static str {
	match severity {
		Severity::Ok => "OK",
		Severity::Warning => "WARNING",
		Severity::Error => "ERROR",
	}
}

fn describe(result: &ProbeResult) -> String {
	if let Some(error) = &result.error {
		let mut text = error.clone();
		if let Some(hint) = &result.hint {
			text.push_str(&format!(" Hint: {}", hint));
		}
		return text;
	}
	match &result.data {
		ProbeData::Resolution { addresses, elapsed_ms } => {
			let addrs: Vec<String> = addresses.iter().map(|a| a.to_string()).collect();
			format!("{} in {:.1} ms", addrs.join(", "), elapsed_ms)
		}
		ProbeData::ServiceConfig {
			running,
			forward_zones,
			reverse_zones,
			forwarders,
			..
		} => {
			if !running {
				"DNS service is not running".to_string()
			} else {
				format!(
					"{} forward / {} reverse zones, {} forwarder(s)",
					forward_zones,
					reverse_zones,
					forwarders.len(),
				)
			}
		}
		ProbeData::Scavenging { enabled, interval_hours, last_run, zones_with_scavenging } => {
			if !enabled {
				"scavenging disabled".to_string()
			} else {
				let last = last_run
					.map(|t| t.format("%Y-%m-%d %H:%M").to_string())
					.unwrap_or_else(|| "never".to_string());
				format!(
					"every {} h, last run {}, {} zone(s) scavenged",
					interval_hours, last, zones_with_scavenging,
				)
			}
		}
		ProbeData::EventLog { errors, warnings, .. } => {
			format!("{} error(s), {} warning(s) in the lookback window", errors, warnings)
		}
		ProbeData::Performance { samples } => {
			let over = samples.iter().filter(|s| s.over_threshold).count();
			format!("{} lookup(s), {} over threshold", samples.len(), over)
		}
		ProbeData::None => String::new(),
	}
}

/// Render the Markdown report document.
pub fn render_markdown(
	domain: &str,
	summary: &AggregateSummary,
	results: &[ProbeResult],
	stale_record_days: i64,
) -> String {
	let mut out = String::new();
	out.push_str(&format!("# DNS Health Audit — {}\n\n", domain));
	out.push_str(&format!(
		"Run: {}  \nOverall status: **{}**\n\n",
		summary.timestamp.format("%Y-%m-%d %H:%M:%S UTC"),
		summary.overall_status(),
	));

	out.push_str("## Executive summary\n\n");
	out.push_str(&format!("- Servers checked: {}\n", summary.servers_checked));
	out.push_str(&format!("- Critical issues: {}\n", summary.critical_issues));
	out.push_str(&format!("- Warnings: {}\n", summary.warnings));
	out.push_str(&format!(
		"- Event-log errors / warnings: {} / {}\n",
		summary.total_event_errors, summary.total_event_warnings,
	));
	match &summary.performance {
		Some(perf) => out.push_str(&format!(
			"- Query time (ms): min {:.1} / avg {:.1} / max {:.1}\n",
			perf.min_ms, perf.avg_ms, perf.max_ms,
		)),
		None => out.push_str("- Query time: no successful resolutions\n"),
	}
	out.push_str(&format!(
		"- Stale-record threshold: {} days (scavenging reference)\n",
		stale_record_days,
	));
	out.push('\n');

	if !summary.alert_messages.is_empty() {
		out.push_str("## Alerts\n\n");
		for message in &summary.alert_messages {
			out.push_str(&format!("- {}\n", message));
		}
		out.push('\n');
	}

	out.push_str("## Probe results\n\n");
	out.push_str("| Server | Probe | Status | Detail |\n");
	out.push_str("|---|---|---|---|\n");
	for result in results {
		out.push_str(&format!(
			"| {} | {} | {} | {} |\n",
			result.server,
			result.kind.label(),
			severity_label(result.severity),
			describe(result).replace('|', "\\|"),
		));
	}
	out.push('\n');

	// Event detail: top groups per server, already truncated by the runner
	let mut wrote_header = false;
	for result in results {
		if let ProbeData::EventLog { top_groups, .. } = &result.data {
			if top_groups.is_empty() {
				continue;
			}
			if !wrote_header {
				out.push_str("## Most frequent DNS events\n\n");
				wrote_header = true;
			}
			out.push_str(&format!("### {}\n\n", result.server));
			for group in top_groups {
				out.push_str(&format!(
					"- event {} ({:?}, {}x): {}\n",
					group.id, group.level, group.count, group.sample_message,
				));
			}
			out.push('\n');
		}
	}

	out
}

/// Render the HTML report document. Same content as the Markdown report in
/// a self-contained page.
pub fn render_html(
	domain: &str,
	summary: &AggregateSummary,
	results: &[ProbeResult],
	stale_record_days: i64,
) -> String {
	let status = summary.overall_status();
	let status_color = match status {
		crate::aggregate::OverallStatus::Healthy => "#2e7d32",
		crate::aggregate::OverallStatus::Warning => "#f9a825",
		crate::aggregate::OverallStatus::Critical => "#c62828",
	};

	let mut rows = String::new();
	for result in results {
		rows.push_str(&format!(
			"<tr><td>{}</td><td>{}</td><td>{}</td><td>{}</td></tr>\n",
			escape(&result.server),
			result.kind.label(),
			severity_label(result.severity),
			escape(&describe(result)),
		));
	}

	let mut alerts = String::new();
	if !summary.alert_messages.is_empty() {
		alerts.push_str("<h2>Alerts</h2>\n<ul>\n");
		for message in &summary.alert_messages {
			alerts.push_str(&format!("<li>{}</li>\n", escape(message)));
		}
		alerts.push_str("</ul>\n");
	}

	let perf = match &summary.performance {
		Some(p) => format!(
			"min {:.1} / avg {:.1} / max {:.1} ms",
			p.min_ms, p.avg_ms, p.max_ms,
		),
		None => "no successful resolutions".to_string(),
	};

	format!(
		r#"<!DOCTYPE html>
<html>
<head>
<meta charset="utf-8">
<title>DNS Health Audit — {domain}</title>
<style>
body {{ font-family: sans-serif; margin: 2em; }}
table {{ border-collapse: collapse; }}
td, th {{ border: 1px solid #ccc; padding: 4px 10px; text-align: left; }}
.status {{ color: {status_color}; }}
</style>
</head>
<body>
<h1>DNS Health Audit — {domain}</h1>
<p>Run: {run} — Overall status: <strong class="status">{status}</strong></p>
<h2>Executive summary</h2>
<ul>
<li>Servers checked: {servers}</li>
<li>Critical issues: {critical}</li>
<li>Warnings: {warnings}</li>
<li>Event-log errors / warnings: {ev_err} / {ev_warn}</li>
<li>Query time: {perf}</li>
<li>Stale-record threshold: {stale_days} days (scavenging reference)</li>
</ul>
{alerts}<h2>Probe results</h2>
<table>
<tr><th>Server</th><th>Probe</th><th>Status</th><th>Detail</th></tr>
{rows}</table>
</body>
</html>
"#,
		domain = escape(domain),
		run = summary.timestamp.format("%Y-%m-%d %H:%M:%S UTC"),
		status = status,
		status_color = status_color,
		servers = summary.servers_checked,
		critical = summary.critical_issues,
		warnings = summary.warnings,
		ev_err = summary.total_event_errors,
		ev_warn = summary.total_event_warnings,
		perf = perf,
		stale_days = stale_record_days,
		alerts = alerts,
		rows = rows,
	)
}

fn escape(text: &str) -> String {
	text.replace('&', "&amp;")
		.replace('<', "&lt;")
		.replace('>', "&gt;")
}

/// Write both report documents into the output directory. This is the one
/// write the run cannot survive failing.
pub fn write_reports(
	output_dir: &Path,
	domain: &str,
	summary: &AggregateSummary,
	results: &[ProbeResult],
	stale_record_days: i64,
) -> anyhow::Result<(PathBuf, PathBuf)> {
	let stamp = run_stamp(summary.timestamp);
	let md_path = output_dir.join(format!("dns-health-report-{}.md", stamp));
	let html_path = output_dir.join(format!("dns-health-report-{}.html", stamp));

	std::fs::write(&md_path, render_markdown(domain, summary, results, stale_record_days))
		.with_context(|| format!("failed to write {}", md_path.display()))?;
	std::fs::write(&html_path, render_html(domain, summary, results, stale_record_days))
		.with_context(|| format!("failed to write {}", html_path.display()))?;

	Ok((md_path, html_path))
}

/// Print the per-probe outcome table to the console.
pub fn print_summary_table(summary: &AggregateSummary, results: &[ProbeResult]) {
	let mut table = Table::new();
	table.load_preset(UTF8_FULL);
	table.set_content_arrangement(ContentArrangement::Dynamic);
	table.set_header(vec!["Server", "Probe", "Status", "Detail"]);

	for result in results {
		table.add_row(vec![
			result.server.clone(),
			result.kind.label().to_string(),
			severity_label(result.severity).to_string(),
			describe(result),
		]);
	}

	println!("{table}");
	println!(
		"Overall: {} ({} critical, {} warnings across {} servers)",
		summary.overall_status(),
		summary.critical_issues,
		summary.warnings,
		summary.servers_checked,
	);
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::aggregate::aggregate;
	use crate::fault::ProbeFailure;
	use crate::model::{ProbeKind, Server};

	fn sample_results() -> Vec<ProbeResult> {
		let dc1 = Server { name: "DC1".into(), fqdn: "dc1.corp.example.com".into(), os: None };
		let dc2 = Server { name: "DC2".into(), fqdn: "dc2.corp.example.com".into(), os: None };
		vec![
			ProbeResult::success(
				&dc1,
				ProbeKind::Resolution,
				ProbeData::Resolution {
					addresses: vec!["10.0.0.1".parse().unwrap()],
					elapsed_ms: 42.0,
				},
				false,
			),
			ProbeResult::failure(
				&dc2,
				ProbeKind::Resolution,
				&ProbeFailure::Unreachable("connection refused".into()),
			),
		]
	}

	#[test]
	fn test_run_stamp_format() {
		let ts = "2026-03-01T04:05:06Z".parse().unwrap();
		assert_eq!(run_stamp(ts), "20260301-040506");
	}

	#[test]
	fn test_markdown_contains_summary_and_hints() {
		let results = sample_results();
		let mut summary = aggregate(&results, 2, Utc::now());
		summary.attach_alerts(vec!["Server DC2 failed name resolution".into()], 0);
		let md = render_markdown("corp.example.com", &summary, &results, 30);
		assert!(md.contains("# DNS Health Audit — corp.example.com"));
		assert!(md.contains("Critical issues: 1"));
		assert!(md.contains("## Alerts"));
		assert!(md.contains("Hint:"));
	}

	#[test]
	fn test_reports_show_stale_record_threshold() {
		let results = sample_results();
		let summary = aggregate(&results, 2, Utc::now());
		let md = render_markdown("corp.example.com", &summary, &results, 45);
		assert!(md.contains("Stale-record threshold: 45 days"));
		let html = render_html("corp.example.com", &summary, &results, 45);
		assert!(html.contains("Stale-record threshold: 45 days"));
	}

	#[test]
	fn test_html_escapes_and_renders_status() {
		let results = sample_results();
		let summary = aggregate(&results, 2, Utc::now());
		let html = render_html("a<b", &summary, &results, 30);
		assert!(html.contains("a&lt;b"));
		assert!(html.contains("CRITICAL"));
	}

	#[test]
	fn test_write_reports_names_by_timestamp() {
		let dir = tempfile::tempdir().unwrap();
		let results = sample_results();
		let summary = aggregate(&results, 2, Utc::now());
		let (md, html) =
			write_reports(dir.path(), "corp.example.com", &summary, &results, 30).unwrap();
		let stamp = run_stamp(summary.timestamp);
		assert!(md.file_name().unwrap().to_str().unwrap().contains(&stamp));
		assert!(md.exists());
		assert!(html.exists());
	}

	#[test]
	fn test_write_reports_fails_on_bad_dir() {
		let results = sample_results();
		let summary = aggregate(&results, 2, Utc::now());
		let err = write_reports(
			Path::new("/nonexistent/output/dir"),
			"corp.example.com",
			&summary,
			&results,
			30,
		);
		assert!(err.is_err());
	}
}
