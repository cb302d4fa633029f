use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::StatusCode;
use serde::Deserialize;

use crate::fault::ProbeFailure;
use crate::model::{EventRecord, ScavengingInfo, ServerConfigInfo};

/// Remote DNS administration collaborator: service status, zone and
/// scavenging configuration, and event-log retrieval for one server.
///
/// Implementations return `ProbeFailure` for everything, so the core only
/// ever switches on the taxonomy, never on error text.
#[async_trait]
pub trait DnsAdmin: Send + Sync {
	async fn service_running(&self, fqdn: &str) -> Result<bool, ProbeFailure>;
	async fn server_config(&self, fqdn: &str) -> Result<ServerConfigInfo, ProbeFailure>;
	async fn scavenging(&self, fqdn: &str) -> Result<ScavengingInfo, ProbeFailure>;
	async fn events_since(
		&self,
		fqdn: &str,
		since: DateTime<Utc>,
	) -> Result<Vec<EventRecord>, ProbeFailure>;
}

/// Map a non-success HTTP status onto the failure taxonomy.
///
/// 401/403 are privilege problems, 404 means the agent has no data for the
/// resource, 503 is the agent reporting its DNS service down. Everything
/// else is a generic probe failure.
pub fn classify_status(status: StatusCode) -> ProbeFailure {
	match status.as_u16() {
		401 | 403 => ProbeFailure::AccessDenied(format!("management agent returned {}", status)),
		404 => ProbeFailure::NoData,
		503 => ProbeFailure::NotRunning,
		_ => ProbeFailure::Other(format!("management agent returned {}", status)),
	}
}

/// Map a reqwest transport error onto the failure taxonomy. Connection and
/// timeout failures are the remote-access class the report attaches a
/// connectivity hint to.
pub fn classify_transport(e: &reqwest::Error) -> ProbeFailure {
	if e.is_connect() || e.is_timeout() {
		ProbeFailure::Unreachable(e.to_string())
	} else {
		ProbeFailure::Other(e.to_string())
	}
}

#[derive(Debug, Deserialize)]
struct ServiceStatus {
	running: bool,
}

#[derive(Debug, Deserialize)]
struct EventPage {
	#[serde(default)]
	events: Vec<EventRecord>,
}

/// HTTP client for the management agent running on each domain controller.
pub struct HttpAdmin {
	client: reqwest::Client,
	port: u16,
}

impl HttpAdmin {
	pub fn new(port: u16, timeout: Duration) -> anyhow::Result<Self> {
		let client = reqwest::Client::builder()
			.timeout(timeout)
			.connect_timeout(timeout)
			.build()?;
		Ok(HttpAdmin { client, port })
	}

	async fn get_json<T: serde::de::DeserializeOwned>(
		&self,
		fqdn: &str,
		path: &str,
		query: &[(&str, String)],
	) -> Result<T, ProbeFailure> {
		let url = format!("http://{}:{}{}", fqdn, self.port, path);
		let response = self
			.client
			.get(&url)
			.query(query)
			.send()
			.await
			.map_err(|e| classify_transport(&e))?;

		let status = response.status();
		if !status.is_success() {
			return Err(classify_status(status));
		}

		response
			.json::<T>()
			.await
			.map_err(|e| ProbeFailure::Other(format!("invalid agent response: {}", e)))
	}
}

#[async_trait]
impl DnsAdmin for HttpAdmin {
	async fn service_running(&self, fqdn: &str) -> Result<bool, ProbeFailure> {
		let status: ServiceStatus = self.get_json(fqdn, "/dns/service", &[]).await?;
		Ok(status.running)
	}

	async fn server_config(&self, fqdn: &str) -> Result<ServerConfigInfo, ProbeFailure> {
		self.get_json(fqdn, "/dns/config", &[]).await
	}

	async fn scavenging(&self, fqdn: &str) -> Result<ScavengingInfo, ProbeFailure> {
		self.get_json(fqdn, "/dns/scavenging", &[]).await
	}

	async fn events_since(
		&self,
		fqdn: &str,
		since: DateTime<Utc>,
	) -> Result<Vec<EventRecord>, ProbeFailure> {
		let query = [
			("since", since.to_rfc3339()),
			("levels", "error,warning".to_string()),
		];
		match self.get_json::<EventPage>(fqdn, "/dns/events", &query).await {
			Ok(page) => Ok(page.events),
			// Zero matching events is a clean outcome, not a failure
			Err(ProbeFailure::NoData) => Ok(Vec::new()),
			Err(e) => Err(e),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_privilege_statuses_map_to_access_denied() {
		assert!(matches!(
			classify_status(StatusCode::UNAUTHORIZED),
			ProbeFailure::AccessDenied(_)
		));
		assert!(matches!(
			classify_status(StatusCode::FORBIDDEN),
			ProbeFailure::AccessDenied(_)
		));
	}

	#[test]
	fn test_not_found_is_no_data() {
		assert_eq!(classify_status(StatusCode::NOT_FOUND), ProbeFailure::NoData);
	}

	#[test]
	fn test_service_unavailable_is_not_running() {
		assert_eq!(
			classify_status(StatusCode::SERVICE_UNAVAILABLE),
			ProbeFailure::NotRunning
		);
	}

	#[test]
	fn test_unmapped_status_is_generic() {
		assert!(matches!(
			classify_status(StatusCode::INTERNAL_SERVER_ERROR),
			ProbeFailure::Other(_)
		));
		assert!(matches!(
			classify_status(StatusCode::BAD_GATEWAY),
			ProbeFailure::Other(_)
		));
	}
}
