use async_trait::async_trait;
use tracing::{error, info};

use crate::aggregate::AggregateSummary;
use crate::config::{AuditConfig, EmailSettings};
use crate::model::{ProbeData, ProbeKind, ProbeResult, Severity};

/// Evaluated alerts for one run. `advisory_count` is the number of messages
/// that are not backed 1:1 by a warning-severity probe result; the
/// aggregator adds those to its warning count.
#[derive(Debug, Default)]
pub struct AlertReport {
	pub messages: Vec<String>,
	pub advisory_count: usize,
}

/// Evaluate every alert rule against the run. Rules are independent; all
/// applicable rules fire.
pub fn evaluate(
	results: &[ProbeResult],
	summary: &AggregateSummary,
	config: &AuditConfig,
) -> AlertReport {
	let mut report = AlertReport::default();
	let thresholds = &config.alert_thresholds;

	if summary.servers_checked == 0 {
		report.messages.push(
			"CRITICAL: no domain controllers were discovered; \
			 verify directory-service connectivity"
				.to_string(),
		);
		report.advisory_count += 1;
	}

	// Per-server rules are checked independently; one result can trip more
	// than one rule.
	for result in results {
		if result.kind == ProbeKind::Resolution && !result.success {
			let mut message = format!(
				"Server {} failed name resolution: {}",
				result.server,
				result.error.as_deref().unwrap_or("unknown error"),
			);
			if let Some(hint) = &result.hint {
				message.push_str(&format!(" ({})", hint));
			}
			report.messages.push(message);
		}

		// A service/config probe that failed outright is a critical issue
		// in the aggregate and must surface as an alert too, hint included.
		if result.kind == ProbeKind::ServiceConfig && !result.success {
			let mut message = format!(
				"Server {} DNS service/configuration probe failed: {}",
				result.server,
				result.error.as_deref().unwrap_or("unknown error"),
			);
			if let Some(hint) = &result.hint {
				message.push_str(&format!(" ({})", hint));
			}
			report.messages.push(message);
		}

		if let ProbeData::Resolution { elapsed_ms, .. } = &result.data {
			if result.success && *elapsed_ms > thresholds.max_query_time_ms {
				report.messages.push(format!(
					"Server {} query time {:.0} ms exceeds the {:.0} ms threshold",
					result.server, elapsed_ms, thresholds.max_query_time_ms,
				));
			}
		}

		if matches!(result.data, ProbeData::ServiceConfig { running: false, .. }) {
			report.messages.push(format!(
				"CRITICAL: DNS service is not running on {}",
				result.server,
			));
		}

		if let ProbeData::Scavenging { enabled, zones_with_scavenging, .. } = &result.data {
			if result.success {
				if *enabled && result.severity == Severity::Warning {
					report.messages.push(format!(
						"Scavenging on {} is enabled but has not run in over 7 days",
						result.server,
					));
				}
				if *zones_with_scavenging == 0 && has_zones(results, &result.server) {
					report.messages.push(format!(
						"No zones on {} have scavenging enabled; stale records will accumulate",
						result.server,
					));
					report.advisory_count += 1;
				}
			}
		}
	}

	if summary.total_event_errors > thresholds.max_event_errors {
		report.messages.push(format!(
			"Total DNS event-log errors ({}) exceed the threshold of {}",
			summary.total_event_errors, thresholds.max_event_errors,
		));
		report.advisory_count += 1;
	}
	if summary.total_event_warnings > thresholds.max_event_warnings {
		report.messages.push(format!(
			"Total DNS event-log warnings ({}) exceed the threshold of {}",
			summary.total_event_warnings, thresholds.max_event_warnings,
		));
		report.advisory_count += 1;
	}

	report
}

/// True when the server's service/config probe saw at least one zone.
fn has_zones(results: &[ProbeResult], server: &str) -> bool {
	results.iter().any(|r| {
		r.server == server
			&& matches!(
				r.data,
				ProbeData::ServiceConfig { forward_zones, reverse_zones, .. }
					if forward_zones + reverse_zones > 0
			)
	})
}

/// Mail collaborator: one best-effort notification per run.
#[async_trait]
pub trait Mailer: Send + Sync {
	async fn send(&self, settings: &EmailSettings, subject: &str, body: &str)
		-> anyhow::Result<()>;
}

/// SMTP mailer over the configured relay.
pub struct SmtpMailer;

#[async_trait]
impl Mailer for SmtpMailer {
	async fn send(
		&self,
		settings: &EmailSettings,
		subject: &str,
		body: &str,
	) -> anyhow::Result<()> {
		use lettre::message::header::ContentType;
		use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};

		let mut builder = Message::builder()
			.from(settings.from.parse()?)
			.subject(subject)
			.header(ContentType::TEXT_PLAIN);
		for recipient in &settings.recipients {
			builder = builder.to(recipient.parse()?);
		}
		let email = builder.body(body.to_string())?;

		let mailer = AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(
			settings.server.as_str(),
		)
		.build();
		mailer.send(email).await?;
		Ok(())
	}
}

/// Send all alert messages in a single notification. Dispatch failure is
/// logged, never fatal.
pub async fn dispatch(mailer: &dyn Mailer, config: &AuditConfig, messages: &[String]) {
	if !config.alerting_enabled || messages.is_empty() {
		return;
	}
	if config.email.server.is_empty() || config.email.recipients.is_empty() {
		info!("alerting enabled but no mail server/recipients configured, skipping dispatch");
		return;
	}

	let body = format!(
		"DNS health audit raised {} alert(s):\n\n{}\n",
		messages.len(),
		messages
			.iter()
			.map(|m| format!("  - {}", m))
			.collect::<Vec<_>>()
			.join("\n"),
	);
	match mailer.send(&config.email, &config.email.subject, &body).await {
		Ok(()) => info!("alert notification sent to {} recipient(s)", config.email.recipients.len()),
		Err(e) => error!("alert notification failed: {}", e),
	}
}
